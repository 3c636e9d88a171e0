use std::ops::Range;

use crate::layout::ColumnLayout;

/// Sides of a debate, in column order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Side {
    Affirmative,
    Negative,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Affirmative, Side::Negative];

    pub fn index(self) -> usize {
        match self {
            Side::Affirmative => 0,
            Side::Negative => 1,
        }
    }
}

/// Join url, meeting id and password of a match.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MeetingTriple {
    pub url: String,
    pub id: String,
    pub password: String,
}

impl MeetingTriple {
    /// A triple is satisfied when all three parts are filled in.
    pub fn is_satisfied(&self) -> bool {
        !self.url.is_empty() && !self.id.is_empty() && !self.password.is_empty()
    }

    pub fn into_cells(self) -> Vec<String> {
        vec![self.url, self.id, self.password]
    }
}

/// One row of the matches sheet.
///
/// Built from the row read twice: once rendered, for the literal fields, and
/// once as formulas, for the document links (which are HYPERLINK formulas).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatchRow {
    /// 0-based index in the data body.
    pub index: usize,
    pub match_name: String,
    pub start_time: String,
    pub end_time: String,
    pub affirmative_name: String,
    pub negative_name: String,
    pub judge_emails: Vec<String>,
    pub staff_emails: Vec<String>,
    pub host_email: String,
    pub meeting: MeetingTriple,
    pub ballot_links: Vec<String>,
    pub member_list_links: [String; 2],
    pub aggregate_link: String,
    pub advice_links: [String; 2],
    pub stream_url: String,
    pub stream_key: String,
    pub page_url: String,
    /// The rendered cells, kept for the literal links of generated documents.
    pub cells: Vec<String>,
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn cells(row: &[String], range: Range<usize>) -> Vec<String> {
    range.map(|idx| cell(row, idx)).collect()
}

impl MatchRow {
    pub fn parse(
        layout: &ColumnLayout,
        index: usize,
        values: &[String],
        formulas: &[String],
    ) -> MatchRow {
        let meeting = cells(values, layout.meeting());
        let member_lists = cells(formulas, layout.member_lists());
        let advice = cells(formulas, layout.advice());
        let stream = cells(values, layout.stream());
        MatchRow {
            index,
            match_name: cell(values, ColumnLayout::MATCH_NAME),
            start_time: cell(values, ColumnLayout::START_TIME),
            end_time: cell(values, ColumnLayout::END_TIME),
            affirmative_name: cell(values, ColumnLayout::AFFIRMATIVE),
            negative_name: cell(values, ColumnLayout::NEGATIVE),
            judge_emails: cells(values, layout.judges()),
            staff_emails: cells(values, layout.staff()),
            host_email: cell(values, layout.host_email()),
            meeting: MeetingTriple {
                url: meeting[0].clone(),
                id: meeting[1].clone(),
                password: meeting[2].clone(),
            },
            ballot_links: cells(formulas, layout.ballots()),
            member_list_links: [member_lists[0].clone(), member_lists[1].clone()],
            aggregate_link: cell(formulas, layout.aggregate()),
            advice_links: [advice[0].clone(), advice[1].clone()],
            stream_url: stream[0].clone(),
            stream_key: stream[1].clone(),
            page_url: stream[2].clone(),
            cells: values.to_vec(),
        }
    }

    /// Placeholder rows have no teams and get no documents.
    pub fn is_bye(&self) -> bool {
        self.affirmative_name.is_empty() && self.negative_name.is_empty()
    }

    pub fn side_name(&self, side: Side) -> &str {
        match side {
            Side::Affirmative => &self.affirmative_name,
            Side::Negative => &self.negative_name,
        }
    }

    /// The rendered value of a 0-based column, empty when out of the row.
    pub fn cell(&self, column: usize) -> String {
        cell(&self.cells, column)
    }
}

/// Parses the data body of the matches sheet. The body ends at the first row
/// without a match name.
pub fn parse_rows(
    layout: &ColumnLayout,
    values: &[Vec<String>],
    formulas: &[Vec<String>],
) -> Vec<MatchRow> {
    let empty: Vec<String> = Vec::new();
    let header = layout.header_rows();
    values
        .iter()
        .skip(header)
        .enumerate()
        .map(|(idx, row)| {
            let f = formulas.get(idx + header).unwrap_or(&empty);
            MatchRow::parse(layout, idx, row, f)
        })
        .take_while(|r| !r.match_name.is_empty())
        .collect()
}

/// The rows of one run, for resuming after a partial failure.
///
/// `offset` rows are skipped from the top of the data body; `limit` is an
/// exclusive bound on the row index.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Window {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Window {
    pub fn new(offset: usize, limit: Option<usize>) -> Window {
        Window { offset, limit }
    }

    /// The body indexes in the window for a body of `len` rows.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let end = self.limit.unwrap_or(len).min(len);
        let start = self.offset.min(end);
        start..end
    }

    /// 1-based sheet row where the output of this window starts.
    pub fn first_sheet_row(&self, layout: &ColumnLayout) -> u32 {
        layout.first_data_row() + self.offset as u32
    }

    /// The inclusive 1-based sheet rows covered by `processed` output rows.
    pub fn sheet_rows(&self, layout: &ColumnLayout, processed: usize) -> Option<(u32, u32)> {
        if processed == 0 {
            return None;
        }
        let first = self.first_sheet_row(layout);
        Some((first, first + processed as u32 - 1))
    }
}
