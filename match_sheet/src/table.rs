// ********* Tabular data source **********

use std::ops::Range;

use log::debug;
use snafu::prelude::*;

use crate::{RemoteError, RemoteSnafu, SyncResult};

/// A rectangular block of cells, row major. Rows may be ragged: the remote API
/// drops trailing empty cells.
pub type Grid = Vec<Vec<String>>;

/// How cell contents are returned by a read.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ValueRender {
    /// The value as displayed in the sheet.
    Formatted,
    /// The unevaluated formula, or the value when the cell has no formula.
    Formula,
}

/// How written strings are interpreted by the remote sheet.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputMode {
    /// Stored verbatim as strings.
    Raw,
    /// Parsed as if typed by a user: formulas are evaluated.
    UserEntered,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SheetProps {
    pub sheet_id: i64,
    pub title: String,
}

/// The operations this crate needs from a spreadsheet service.
///
/// Ranges are A1 strings, optionally qualified by a quoted sheet title.
pub trait TableClient {
    /// Properties of the sheet at `index` (0-based tab position).
    fn sheet_props(&self, spreadsheet_id: &str, index: usize) -> Result<SheetProps, RemoteError>;

    fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Grid, RemoteError>;

    fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError>;

    /// Appends rows after the last non-empty row of the table found at `range`.
    fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError>;

    /// Deletes the given 0-based, end-exclusive row ranges of a sheet.
    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        rows: &[Range<u32>],
    ) -> Result<(), RemoteError>;

    /// Restricts `cell` to one of `options`, shown as a dropdown.
    fn set_choice_validation(
        &self,
        spreadsheet_id: &str,
        cell: &str,
        options: &[String],
    ) -> Result<(), RemoteError>;
}

/// A handle on one sheet of a spreadsheet.
///
/// Borrowing the client keeps every access to the remote table explicit.
pub struct Worksheet<'c> {
    client: &'c dyn TableClient,
    spreadsheet_id: String,
    props: SheetProps,
}

impl<'c> Worksheet<'c> {
    pub fn open(
        client: &'c dyn TableClient,
        spreadsheet_id: &str,
        index: usize,
    ) -> SyncResult<Worksheet<'c>> {
        let props = client
            .sheet_props(spreadsheet_id, index)
            .context(RemoteSnafu {
                operation: format!("opening sheet {} of {}", index, spreadsheet_id),
            })?;
        debug!("Worksheet::open: {} -> {:?}", spreadsheet_id, props);
        Ok(Worksheet {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            props,
        })
    }

    pub fn title(&self) -> &str {
        &self.props.title
    }

    /// Qualifies an A1 range with this sheet's title.
    pub fn range(&self, a1: &str) -> String {
        qualified_range(Some(&self.props.title), a1)
    }

    pub fn read_all(&self, render: ValueRender) -> SyncResult<Grid> {
        let range = quote_sheet_title(&self.props.title);
        self.client
            .read_values(&self.spreadsheet_id, &range, render)
            .context(RemoteSnafu {
                operation: format!("reading {}", range),
            })
    }

    /// The rendered value of a single cell, empty when the cell is empty.
    pub fn read_cell(&self, a1: &str) -> SyncResult<String> {
        let range = self.range(a1);
        let grid = self
            .client
            .read_values(&self.spreadsheet_id, &range, ValueRender::Formatted)
            .context(RemoteSnafu {
                operation: format!("reading {}", range),
            })?;
        Ok(grid
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or_default())
    }

    /// Writes `values` with their top-left corner at the 1-based `(row, col)`.
    pub fn write_block(
        &self,
        row: u32,
        col: u32,
        values: &[Vec<String>],
        mode: InputMode,
    ) -> SyncResult<()> {
        let width = values.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        if values.is_empty() || width == 0 {
            debug!("write_block: nothing to write at row {}", row);
            return Ok(());
        }
        let a1 = block_range(row, col, values.len() as u32, width);
        let range = self.range(&a1);
        self.client
            .write_values(&self.spreadsheet_id, &range, values, mode)
            .context(RemoteSnafu {
                operation: format!("writing {}", range),
            })
    }

    pub fn append(&self, rows: &[Vec<String>], mode: InputMode) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = self.range("A1");
        self.client
            .append_rows(&self.spreadsheet_id, &range, rows, mode)
            .context(RemoteSnafu {
                operation: format!("appending {} rows to {}", rows.len(), range),
            })
    }

    /// Deletes 0-based, end-exclusive row ranges.
    pub fn delete_rows(&self, rows: &[Range<u32>]) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.client
            .delete_rows(&self.spreadsheet_id, self.props.sheet_id, rows)
            .context(RemoteSnafu {
                operation: format!("deleting rows of {}", self.props.title),
            })
    }
}

// ******** A1 notation *********

/// Column letters for a 1-based column index: 1 -> A, 27 -> AA.
pub fn column_letters(col: u32) -> String {
    let mut n = col;
    let mut letters: Vec<char> = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// `(2, 3)` -> `C2`. Both coordinates are 1-based.
pub fn rowcol_to_a1(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row)
}

/// `C2` -> `(2, 3)`. Lowercase letters are accepted, `$` anchors are ignored.
pub fn a1_to_rowcol(a1: &str) -> Option<(u32, u32)> {
    let cell = a1.trim().replace('$', "");
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            acc.checked_mul(26)?
                .checked_add((c.to_ascii_uppercase() as u32) - ('A' as u32) + 1)
        })?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, col))
}

/// The A1 range of a `rows` x `cols` block whose top-left cell is `(row, col)`.
pub fn block_range(row: u32, col: u32, rows: u32, cols: u32) -> String {
    format!(
        "{}:{}",
        rowcol_to_a1(row, col),
        rowcol_to_a1(row + rows - 1, col + cols - 1)
    )
}

pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// `B2` on sheet `Ballot` -> `'Ballot'!B2`. Without a title the range is left
/// as is, which the remote API resolves against the first sheet.
pub fn qualified_range(sheet_title: Option<&str>, a1: &str) -> String {
    match sheet_title {
        Some(title) => format!("{}!{}", quote_sheet_title(title), a1),
        None => a1.to_string(),
    }
}

/// Splits `'Ballot'!B2` into the unquoted title and the A1 part. A range
/// made of a quoted title alone covers the whole sheet.
pub fn split_range(range: &str) -> (Option<String>, Option<&str>) {
    let unquote = |t: &str| {
        t.strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .unwrap_or(t)
            .replace("''", "'")
    };
    match range.rfind('!') {
        Some(pos) => (Some(unquote(&range[..pos])), Some(&range[pos + 1..])),
        None if range.starts_with('\'') => (Some(unquote(range)), None),
        None => (None, Some(range)),
    }
}
