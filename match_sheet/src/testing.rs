// In-memory stand-ins for the remote services, recording every call.

use std::cell::{Cell, RefCell};
use std::ops::Range;

use crate::table::{
    a1_to_rowcol, split_range, Grid, InputMode, SheetProps, TableClient, ValueRender,
};
use crate::{
    ColumnLayout, CreatedMeeting, DocumentStore, HostUser, LayoutVersion, Livestream, MatchRow,
    MeetingProvider, MeetingRequest, RemoteError,
};

fn not_found(what: &str) -> RemoteError {
    RemoteError::NotFound {
        what: what.to_string(),
    }
}

/// Routes `log` output through the test harness. Safe to call repeatedly.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A row of 2 judge seats and no staff, 09:00 to 09:47.
pub fn match_row(name: &str, affirmative: &str, negative: &str) -> MatchRow {
    let layout = ColumnLayout::new(2, 0, LayoutVersion::Full);
    let mut cells = vec![String::new(); layout.width()];
    cells[0] = name.to_string();
    cells[1] = "09:00".to_string();
    cells[2] = "09:47".to_string();
    cells[3] = affirmative.to_string();
    cells[4] = negative.to_string();
    MatchRow::parse(&layout, 0, &cells, &[])
}

pub struct RowCells(Vec<String>);

impl RowCells {
    pub fn set(&mut self, column: usize, value: &str) {
        if self.0.len() <= column {
            self.0.resize(column + 1, String::new());
        }
        self.0[column] = value.to_string();
    }
}

/// Builds a matches sheet for a layout.
pub struct MatchesBuilder<'l> {
    layout: &'l ColumnLayout,
    date: String,
    rows: Vec<Vec<String>>,
}

impl<'l> MatchesBuilder<'l> {
    pub fn new(layout: &'l ColumnLayout) -> MatchesBuilder<'l> {
        MatchesBuilder {
            layout,
            date: "10/19".to_string(),
            rows: Vec::new(),
        }
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn row(
        mut self,
        name: &str,
        affirmative: &str,
        negative: &str,
        f: impl FnOnce(&mut RowCells),
    ) -> Self {
        let mut cells = RowCells(
            [name, "09:00", "09:47", affirmative, negative]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        f(&mut cells);
        self.rows.push(cells.0);
        self
    }

    /// Installs the sheet as the first tab of `book`.
    pub fn install(self, table: &FakeTable, book: &str) {
        let mut grid: Grid = vec![vec![self.date.clone()]];
        if self.layout.header_rows() == 2 {
            grid.push(
                ["Match", "Start", "End", "Affirmative", "Negative"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            );
        }
        grid.extend(self.rows);
        table.add_sheet(book, "Matches", grid);
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Recorded {
    pub spreadsheet: String,
    pub range: String,
    pub values: Grid,
    pub mode: InputMode,
}

struct FakeSheet {
    props: SheetProps,
    grid: Grid,
}

/// Spreadsheets keyed by id. Writing to an unknown spreadsheet or tab creates
/// it, like a freshly copied template would have it.
#[derive(Default)]
pub struct FakeTable {
    books: RefCell<Vec<(String, Vec<FakeSheet>)>>,
    next_sheet_id: Cell<i64>,
    writes: RefCell<Vec<Recorded>>,
    appends: RefCell<Vec<Recorded>>,
    deletes: RefCell<Vec<Vec<Range<u32>>>>,
    validations: RefCell<Vec<(String, String, Vec<String>)>>,
    reads: RefCell<Vec<(String, String, ValueRender)>>,
}

fn top_left(a1: &str) -> (usize, usize) {
    let first = a1.split(':').next().unwrap_or(a1);
    let (row, col) = a1_to_rowcol(first).unwrap();
    (row as usize - 1, col as usize - 1)
}

fn put(grid: &mut Grid, row: usize, col: usize, value: &str) {
    if grid.len() <= row {
        grid.resize(row + 1, Vec::new());
    }
    if grid[row].len() <= col {
        grid[row].resize(col + 1, String::new());
    }
    grid[row][col] = value.to_string();
}

impl FakeTable {
    pub fn add_sheet(&self, book: &str, title: &str, grid: Grid) {
        let id = self.next_sheet_id.get();
        self.next_sheet_id.set(id + 1);
        let mut books = self.books.borrow_mut();
        let sheet = FakeSheet {
            props: SheetProps {
                sheet_id: id,
                title: title.to_string(),
            },
            grid,
        };
        match books.iter_mut().find(|(b, _)| b == book) {
            Some((_, sheets)) => sheets.push(sheet),
            None => books.push((book.to_string(), vec![sheet])),
        }
    }

    fn with_sheet<T>(
        &self,
        book: &str,
        title: Option<&str>,
        f: impl FnOnce(&mut FakeSheet) -> T,
    ) -> T {
        let exists = self.books.borrow().iter().any(|(b, sheets)| {
            b == book
                && match title {
                    Some(t) => sheets.iter().any(|s| s.props.title == t),
                    None => !sheets.is_empty(),
                }
        });
        if !exists {
            self.add_sheet(book, title.unwrap_or("Sheet1"), Vec::new());
        }
        let mut books = self.books.borrow_mut();
        let (_, sheets) = books.iter_mut().find(|(b, _)| b == book).unwrap();
        let sheet = match title {
            Some(t) => sheets.iter_mut().find(|s| s.props.title == t).unwrap(),
            None => &mut sheets[0],
        };
        f(sheet)
    }

    /// The stored content of one cell, empty when never written.
    pub fn cell(&self, book: &str, title: &str, a1: &str) -> String {
        let (row, col) = top_left(a1);
        self.books
            .borrow()
            .iter()
            .filter(|(b, _)| b == book)
            .flat_map(|(_, sheets)| sheets.iter())
            .find(|s| s.props.title == title)
            .and_then(|s| s.grid.get(row).and_then(|r| r.get(col)).cloned())
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<Recorded> {
        self.writes.borrow().clone()
    }

    pub fn appends(&self) -> Vec<Recorded> {
        self.appends.borrow().clone()
    }

    pub fn deletes(&self) -> Vec<Vec<Range<u32>>> {
        self.deletes.borrow().clone()
    }

    pub fn validations(&self) -> Vec<(String, String, Vec<String>)> {
        self.validations.borrow().clone()
    }

    pub fn reads(&self) -> Vec<(String, String, ValueRender)> {
        self.reads.borrow().clone()
    }
}

impl TableClient for FakeTable {
    fn sheet_props(&self, spreadsheet_id: &str, index: usize) -> Result<SheetProps, RemoteError> {
        self.books
            .borrow()
            .iter()
            .find(|(b, _)| b == spreadsheet_id)
            .and_then(|(_, sheets)| sheets.get(index))
            .map(|s| s.props.clone())
            .ok_or_else(|| not_found(spreadsheet_id))
    }

    fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Grid, RemoteError> {
        self.reads
            .borrow_mut()
            .push((spreadsheet_id.to_string(), range.to_string(), render));
        let (title, a1) = split_range(range);
        let books = self.books.borrow();
        let sheets = books
            .iter()
            .find(|(b, _)| b == spreadsheet_id)
            .map(|(_, sheets)| sheets)
            .ok_or_else(|| not_found(spreadsheet_id))?;
        let sheet = match &title {
            Some(t) => sheets.iter().find(|s| &s.props.title == t),
            None => sheets.first(),
        }
        .ok_or_else(|| not_found(range))?;
        match a1 {
            None => Ok(sheet.grid.clone()),
            Some(a1) => {
                let (row, col) = top_left(a1);
                let value = sheet
                    .grid
                    .get(row)
                    .and_then(|r| r.get(col))
                    .cloned()
                    .unwrap_or_default();
                Ok(vec![vec![value]])
            }
        }
    }

    fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError> {
        self.writes.borrow_mut().push(Recorded {
            spreadsheet: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: values.to_vec(),
            mode,
        });
        let (title, a1) = split_range(range);
        let (row, col) = top_left(a1.unwrap_or("A1"));
        self.with_sheet(spreadsheet_id, title.as_deref(), |sheet| {
            for (i, r) in values.iter().enumerate() {
                for (j, v) in r.iter().enumerate() {
                    put(&mut sheet.grid, row + i, col + j, v);
                }
            }
        });
        Ok(())
    }

    fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError> {
        self.appends.borrow_mut().push(Recorded {
            spreadsheet: spreadsheet_id.to_string(),
            range: range.to_string(),
            values: rows.to_vec(),
            mode,
        });
        let (title, _) = split_range(range);
        self.with_sheet(spreadsheet_id, title.as_deref(), |sheet| {
            let end = sheet
                .grid
                .iter()
                .rposition(|r| r.iter().any(|c| !c.is_empty()))
                .map(|p| p + 1)
                .unwrap_or(0);
            sheet.grid.truncate(end);
            sheet.grid.extend(rows.iter().cloned());
        });
        Ok(())
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        rows: &[Range<u32>],
    ) -> Result<(), RemoteError> {
        self.deletes.borrow_mut().push(rows.to_vec());
        let mut books = self.books.borrow_mut();
        let sheet = books
            .iter_mut()
            .filter(|(b, _)| b == spreadsheet_id)
            .flat_map(|(_, sheets)| sheets.iter_mut())
            .find(|s| s.props.sheet_id == sheet_id)
            .ok_or_else(|| not_found(spreadsheet_id))?;
        for r in rows {
            let end = (r.end as usize).min(sheet.grid.len());
            let start = (r.start as usize).min(end);
            sheet.grid.drain(start..end);
        }
        Ok(())
    }

    fn set_choice_validation(
        &self,
        spreadsheet_id: &str,
        cell: &str,
        options: &[String],
    ) -> Result<(), RemoteError> {
        self.validations.borrow_mut().push((
            spreadsheet_id.to_string(),
            cell.to_string(),
            options.to_vec(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDocs {
    calls: RefCell<Vec<String>>,
    renames: RefCell<Vec<(String, String)>>,
    next: Cell<u32>,
    fail_copy: Cell<bool>,
}

impl FakeDocs {
    pub fn fail_copies(&self) {
        self.fail_copy.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn copies(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("copy "))
            .count()
    }

    /// `(file id, new name)` in call order.
    pub fn renames(&self) -> Vec<(String, String)> {
        self.renames.borrow().clone()
    }
}

impl DocumentStore for FakeDocs {
    fn copy_file(&self, file_id: &str) -> Result<String, RemoteError> {
        self.calls.borrow_mut().push(format!("copy {}", file_id));
        if self.fail_copy.get() {
            return Err(RemoteError::Rejected {
                status: 500,
                body: "copy failed".to_string(),
            });
        }
        let n = self.next.get() + 1;
        self.next.set(n);
        Ok(format!("copy-{}", n))
    }

    fn rename_file(&self, file_id: &str, name: &str) -> Result<(), RemoteError> {
        self.calls
            .borrow_mut()
            .push(format!("rename {} {}", file_id, name));
        self.renames
            .borrow_mut()
            .push((file_id.to_string(), name.to_string()));
        Ok(())
    }

    fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), RemoteError> {
        self.calls
            .borrow_mut()
            .push(format!("move {} {}", file_id, folder_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMeetings {
    users: Vec<HostUser>,
    meetings: RefCell<Vec<String>>,
    created: RefCell<Vec<(Option<String>, MeetingRequest)>>,
    livestreams: RefCell<Vec<(String, Livestream)>>,
    calls: RefCell<Vec<String>>,
    reject: Cell<bool>,
    broken: Cell<bool>,
    next: Cell<u64>,
}

impl FakeMeetings {
    pub fn with_users(users: &[(&str, &str)]) -> FakeMeetings {
        FakeMeetings {
            users: users
                .iter()
                .map(|(id, email)| HostUser {
                    id: id.to_string(),
                    email: email.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn add_meeting(&self, id: &str) {
        self.meetings.borrow_mut().push(id.to_string());
    }

    /// Creation requests are refused.
    pub fn reject_creation(&self) {
        self.reject.set(true);
    }

    /// Every call other than creation fails with a server error.
    pub fn fail_everything(&self) {
        self.broken.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn created(&self) -> Vec<(Option<String>, MeetingRequest)> {
        self.created.borrow().clone()
    }

    pub fn livestreams(&self) -> Vec<(String, Livestream)> {
        self.livestreams.borrow().clone()
    }

    fn check(&self, call: String, id: &str) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(call);
        if self.broken.get() {
            return Err(RemoteError::Rejected {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        if !self.meetings.borrow().iter().any(|m| m == id) {
            return Err(not_found(id));
        }
        Ok(())
    }
}

impl MeetingProvider for FakeMeetings {
    fn active_users(&self) -> Result<Vec<HostUser>, RemoteError> {
        self.calls.borrow_mut().push("users".to_string());
        Ok(self.users.clone())
    }

    fn create_meeting(
        &self,
        host: Option<&str>,
        request: &MeetingRequest,
    ) -> Result<CreatedMeeting, RemoteError> {
        self.calls
            .borrow_mut()
            .push(format!("create {}", request.topic));
        self.created
            .borrow_mut()
            .push((host.map(|h| h.to_string()), request.clone()));
        if self.reject.get() {
            return Err(RemoteError::Rejected {
                status: 400,
                body: "invalid host".to_string(),
            });
        }
        let id = self.next.get() + 1000;
        self.next.set(self.next.get() + 1);
        self.add_meeting(&id.to_string());
        Ok(CreatedMeeting {
            join_url: format!("https://zoom.example/j/{}", id),
            id: id.to_string(),
            password: request.password.clone(),
        })
    }

    fn meeting(&self, meeting_id: &str) -> Result<CreatedMeeting, RemoteError> {
        self.check(format!("get {}", meeting_id), meeting_id)?;
        Ok(CreatedMeeting {
            join_url: format!("https://zoom.example/j/{}", meeting_id),
            id: meeting_id.to_string(),
            password: String::new(),
        })
    }

    fn delete_meeting(&self, meeting_id: &str) -> Result<(), RemoteError> {
        self.check(format!("delete {}", meeting_id), meeting_id)?;
        self.meetings.borrow_mut().retain(|m| m != meeting_id);
        Ok(())
    }

    fn update_livestream(&self, meeting_id: &str, stream: &Livestream) -> Result<(), RemoteError> {
        self.check(format!("livestream {}", meeting_id), meeting_id)?;
        self.livestreams
            .borrow_mut()
            .push((meeting_id.to_string(), stream.clone()));
        Ok(())
    }
}
