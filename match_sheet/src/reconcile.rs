// ********* Row reconciliation **********
//
// Each operation reads the matches sheet, walks the rows of the window and
// collects one output row per processed row, then writes the whole block back
// at once. Rows whose output already exists are passed through untouched, so
// re-running an operation over the same window is safe.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::formula::{parse_hyperlink_id, sum_of_imports, tally_of_imports};
use crate::row::{parse_rows, MatchRow, Side, Window};
use crate::schedule::parse_date_header;
use crate::table::{InputMode, ValueRender, Worksheet};
use crate::vote::{check_vote_imports, vote_row, vote_row_ballot_id, VOTE_ROW_WIDTH};
use crate::{
    associate_livestream, delete_room, AggregateSpec, ArtifactSpec, BallotSpec, ColumnLayout,
    DateHeaderSnafu, DocumentForge, MeetingProvider, MeetingProvisioner, SyncResult,
};

/// The matches sheet as read at the start of an operation.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MatchTable {
    pub date_header: String,
    pub rows: Vec<MatchRow>,
    /// Ballot ids linked from any row under the header, including rows after
    /// the end of the body.
    pub linked_ballots: HashSet<String>,
}

/// Documents generated once per side of a match.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SideDocument {
    MemberList,
    Advice,
}

impl SideDocument {
    fn title(self, prefix: &str, row: &MatchRow, side: Side) -> String {
        match self {
            SideDocument::MemberList => {
                format!("{}{} {}", prefix, row.match_name, row.side_name(side))
            }
            SideDocument::Advice => {
                format!("{}{} Advice {}", prefix, row.match_name, row.side_name(side))
            }
        }
    }

    fn existing(self, row: &MatchRow, side: Side) -> &str {
        match self {
            SideDocument::MemberList => &row.member_list_links[side.index()],
            SideDocument::Advice => &row.advice_links[side.index()],
        }
    }

    fn columns(self, layout: &ColumnLayout) -> Range<usize> {
        match self {
            SideDocument::MemberList => layout.member_lists(),
            SideDocument::Advice => layout.advice(),
        }
    }
}

pub fn ballot_title(prefix: &str, row: &MatchRow, seat: usize) -> String {
    format!("{}{} {}", prefix, row.match_name, ballot_label(seat))
}

pub fn ballot_label(seat: usize) -> String {
    format!("Ballot #{}", seat)
}

pub const AGGREGATE_LABEL: &str = "Aggregate";

/// The ballot ids of a row, `None` when there is none or when a non-empty
/// link cell cannot be read back.
pub fn ballot_ids(row: &MatchRow) -> Option<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();
    for link in row.ballot_links.iter().filter(|l| !l.is_empty()) {
        ids.push(parse_hyperlink_id(link)?);
    }
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

fn linked_ballots(layout: &ColumnLayout, formulas: &[Vec<String>]) -> HashSet<String> {
    formulas
        .iter()
        .skip(layout.header_rows())
        .flat_map(|row| layout.ballots().filter_map(move |c| row.get(c)))
        .filter_map(|l| parse_hyperlink_id(l))
        .collect()
}

/// Runs of consecutive indexes, in ascending order.
fn ascending_runs(indexes: &[usize]) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for &idx in indexes {
        match runs.last_mut() {
            Some(r) if r.end == idx => r.end = idx + 1,
            _ => runs.push(idx..idx + 1),
        }
    }
    runs
}

/// Bottom-up, end-exclusive ranges covering the given row indexes.
fn descending_ranges(mut indexes: Vec<u32>) -> Vec<Range<u32>> {
    indexes.sort_unstable();
    indexes.dedup();
    let mut ranges: Vec<Range<u32>> = Vec::new();
    for idx in indexes {
        match ranges.last_mut() {
            Some(r) if r.end == idx => r.end = idx + 1,
            _ => ranges.push(idx..idx + 1),
        }
    }
    ranges.reverse();
    ranges
}

/// Runs the operations of the matches sheet over one window of rows.
pub struct Reconciler<'c> {
    matches: Worksheet<'c>,
    layout: ColumnLayout,
    prefix: String,
    window: Window,
    default_year: i32,
}

impl<'c> Reconciler<'c> {
    /// `default_year` completes a date header that has no year.
    pub fn new(
        matches: Worksheet<'c>,
        layout: ColumnLayout,
        prefix: &str,
        window: Window,
        default_year: i32,
    ) -> Reconciler<'c> {
        Reconciler {
            matches,
            layout,
            prefix: prefix.to_string(),
            window,
            default_year,
        }
    }

    pub fn load(&self) -> SyncResult<MatchTable> {
        let values = self.matches.read_all(ValueRender::Formatted)?;
        let formulas = self.matches.read_all(ValueRender::Formula)?;
        let date_header = values
            .first()
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or_default();
        let rows = parse_rows(&self.layout, &values, &formulas);
        debug!("load: {} match rows in {}", rows.len(), self.matches.title());
        Ok(MatchTable {
            date_header,
            rows,
            linked_ballots: linked_ballots(&self.layout, &formulas),
        })
    }

    pub fn date(&self, table: &MatchTable) -> SyncResult<NaiveDate> {
        parse_date_header(&table.date_header, self.default_year).context(DateHeaderSnafu {
            content: table.date_header.clone(),
        })
    }

    fn window_rows<'t>(&self, table: &'t MatchTable) -> &'t [MatchRow] {
        let bounds = self.window.bounds(table.rows.len());
        info!(
            "processing rows {}..{} of {}",
            bounds.start,
            bounds.end,
            table.rows.len()
        );
        &table.rows[bounds]
    }

    /// Writes one output row per processed row, starting at the window offset.
    fn write_back(
        &self,
        first_column: usize,
        out: &[Vec<String>],
        mode: InputMode,
    ) -> SyncResult<()> {
        match self.window.sheet_rows(&self.layout, out.len()) {
            Some((first, last)) => {
                info!(
                    "write_back: rows {}..={} from column {}",
                    first,
                    last,
                    ColumnLayout::sheet_col(first_column)
                );
                self.matches
                    .write_block(first, ColumnLayout::sheet_col(first_column), out, mode)
            }
            None => {
                info!("write_back: no row in the window");
                Ok(())
            }
        }
    }

    pub fn generate_rooms(
        &self,
        provider: &dyn MeetingProvider,
        settings: JSValue,
    ) -> SyncResult<usize> {
        let table = self.load()?;
        let date = self.date(&table)?;
        let mut provisioner = MeetingProvisioner::new(provider, &self.prefix, settings, date);
        let mut out: Vec<Vec<String>> = Vec::new();
        for row in self.window_rows(&table) {
            out.push(provisioner.ensure_room(row)?.into_cells());
        }
        self.write_back(self.layout.meeting().start, &out, InputMode::Raw)?;
        Ok(out.len())
    }

    /// Deletes the meetings of the window and empties their cells. Nothing is
    /// written if a deletion fails. The date header is not read.
    pub fn clear_rooms(&self, provider: &dyn MeetingProvider) -> SyncResult<usize> {
        let table = self.load()?;
        let mut out: Vec<Vec<String>> = Vec::new();
        for row in self.window_rows(&table) {
            if !row.meeting.id.is_empty() {
                delete_room(provider, &row.meeting.id)?;
            }
            out.push(vec![String::new(); 3]);
        }
        self.write_back(self.layout.meeting().start, &out, InputMode::Raw)?;
        Ok(out.len())
    }

    /// Connects every meeting of the window with a complete stream
    /// destination. The first failure ends the run.
    pub fn update_live(&self, provider: &dyn MeetingProvider) -> SyncResult<usize> {
        let table = self.load()?;
        let rows = self.window_rows(&table);
        let mut associated = 0;
        for row in rows {
            if row.meeting.id.is_empty()
                || row.stream_url.is_empty()
                || row.stream_key.is_empty()
                || row.page_url.is_empty()
            {
                debug!("update_live: {}: no meeting or incomplete stream", row.match_name);
                continue;
            }
            associate_livestream(
                provider,
                &row.meeting.id,
                &row.stream_url,
                &row.stream_key,
                &row.page_url,
            )?;
            associated += 1;
        }
        info!("update_live: {} streams associated", associated);
        Ok(rows.len())
    }

    /// One ballot per assigned judge of every match, plus its vote row.
    pub fn generate_ballots(
        &self,
        forge: &DocumentForge,
        spec: &BallotSpec,
        votes: &Worksheet,
    ) -> SyncResult<usize> {
        check_vote_imports(spec)?;
        spec.artifact.check()?;
        let table = self.load()?;
        let artifact = &spec.artifact;
        let mut out: Vec<Vec<String>> = Vec::new();
        let mut new_votes: Vec<Vec<String>> = Vec::new();
        for row in self.window_rows(&table) {
            if row.is_bye() {
                debug!("generate_ballots: {} is a bye", row.match_name);
                out.push(row.ballot_links.clone());
                continue;
            }
            let mut links: Vec<String> = Vec::new();
            for (seat, existing) in row.ballot_links.iter().enumerate() {
                if !existing.is_empty() {
                    links.push(existing.clone());
                    continue;
                }
                if row.judge_emails[seat].is_empty() {
                    links.push(String::new());
                    continue;
                }
                let doc = forge.create_from_template(
                    &artifact.template_id,
                    &ballot_title(&self.prefix, row, seat),
                    &artifact.folder_id,
                )?;
                forge.apply_links(
                    &doc.id,
                    artifact.sheet_title.as_deref(),
                    row,
                    &self.matches,
                    &artifact.links,
                    seat,
                )?;
                new_votes.push(vote_row(row, seat, &doc.id, spec));
                links.push(doc.link(&ballot_label(seat)));
            }
            out.push(links);
        }
        info!("generate_ballots: {} new ballots", new_votes.len());
        votes.append(&new_votes, InputMode::UserEntered)?;
        self.write_back(self.layout.ballots().start, &out, InputMode::UserEntered)?;
        Ok(out.len())
    }

    pub fn generate_member_lists(
        &self,
        forge: &DocumentForge,
        spec: &ArtifactSpec,
    ) -> SyncResult<usize> {
        self.generate_side_documents(forge, spec, SideDocument::MemberList)
    }

    pub fn generate_advice(&self, forge: &DocumentForge, spec: &ArtifactSpec) -> SyncResult<usize> {
        self.generate_side_documents(forge, spec, SideDocument::Advice)
    }

    fn generate_side_documents(
        &self,
        forge: &DocumentForge,
        spec: &ArtifactSpec,
        kind: SideDocument,
    ) -> SyncResult<usize> {
        spec.check()?;
        let table = self.load()?;
        let mut out: Vec<Vec<String>> = Vec::new();
        for row in self.window_rows(&table) {
            if row.is_bye() {
                debug!("{:?}: {} is a bye", kind, row.match_name);
                out.push(
                    Side::BOTH
                        .iter()
                        .map(|&side| kind.existing(row, side).to_string())
                        .collect(),
                );
                continue;
            }
            let mut links: Vec<String> = Vec::new();
            for side in Side::BOTH {
                let existing = kind.existing(row, side);
                if !existing.is_empty() {
                    links.push(existing.to_string());
                    continue;
                }
                if row.side_name(side).is_empty() {
                    links.push(String::new());
                    continue;
                }
                let doc = forge.create_from_template(
                    &spec.template_id,
                    &kind.title(&self.prefix, row, side),
                    &spec.folder_id,
                )?;
                forge.apply_links(
                    &doc.id,
                    spec.sheet_title.as_deref(),
                    row,
                    &self.matches,
                    &spec.links,
                    side.index(),
                )?;
                links.push(doc.link(row.side_name(side)));
            }
            out.push(links);
        }
        self.write_back(kind.columns(&self.layout).start, &out, InputMode::UserEntered)?;
        Ok(out.len())
    }

    /// One aggregate per match, summing the points and counting the votes of
    /// the match's ballots.
    pub fn generate_aggregates(
        &self,
        forge: &DocumentForge,
        spec: &AggregateSpec,
    ) -> SyncResult<usize> {
        spec.check()?;
        let table = self.load()?;
        let artifact = &spec.artifact;
        let sheet = artifact.sheet_title.as_deref();
        let mut out: Vec<Vec<String>> = Vec::new();
        for row in self.window_rows(&table) {
            if !row.aggregate_link.is_empty() {
                out.push(vec![row.aggregate_link.clone()]);
                continue;
            }
            if row.is_bye() {
                debug!("generate_aggregates: {} is a bye", row.match_name);
                out.push(vec![String::new()]);
                continue;
            }
            let doc = forge.create_from_template(
                &artifact.template_id,
                &format!("{}{} {}", self.prefix, row.match_name, AGGREGATE_LABEL),
                &artifact.folder_id,
            )?;
            forge.apply_links(&doc.id, sheet, row, &self.matches, &artifact.links, 0)?;
            match ballot_ids(row) {
                Some(ids) => {
                    for point in &spec.points {
                        let sum = sum_of_imports(&ids, &point.source);
                        forge.write_formula(&doc.id, sheet, &point.dest, sum)?;
                    }
                    if let Some(tally) = &spec.tally {
                        let aff = tally_of_imports(&ids, &tally.source, &row.affirmative_name);
                        let neg = tally_of_imports(&ids, &tally.source, &row.negative_name);
                        forge.write_formula(&doc.id, sheet, &tally.affirmative_dest, aff)?;
                        forge.write_formula(&doc.id, sheet, &tally.negative_dest, neg)?;
                    }
                }
                None => warn!(
                    "generate_aggregates: {}: ballot links missing or unreadable, not linked",
                    row.match_name
                ),
            }
            out.push(vec![doc.link(AGGREGATE_LABEL)]);
        }
        self.write_back(self.layout.aggregate(), &out, InputMode::UserEntered)?;
        Ok(out.len())
    }

    /// Brings existing ballots in line with the edited matches: titles and
    /// links are rewritten, vote rows rebuilt, and vote rows of ballots no
    /// longer linked from any match are deleted.
    pub fn update_ballots(
        &self,
        forge: &DocumentForge,
        spec: &BallotSpec,
        votes: &Worksheet,
    ) -> SyncResult<usize> {
        check_vote_imports(spec)?;
        spec.artifact.check()?;
        let table = self.load()?;
        let artifact = &spec.artifact;

        let rows = self.window_rows(&table);
        let mut fresh: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows.iter().filter(|r| !r.is_bye()) {
            for (seat, link) in row.ballot_links.iter().enumerate() {
                let Some(id) = parse_hyperlink_id(link) else {
                    if !link.is_empty() {
                        warn!(
                            "update_ballots: {} seat {}: unreadable link {:?}",
                            row.match_name, seat, link
                        );
                    }
                    continue;
                };
                forge.retitle(&id, &ballot_title(&self.prefix, row, seat))?;
                forge.apply_links(
                    &id,
                    artifact.sheet_title.as_deref(),
                    row,
                    &self.matches,
                    &artifact.links,
                    seat,
                )?;
                fresh.insert(id.clone(), vote_row(row, seat, &id, spec));
            }
        }
        info!("update_ballots: {} ballots re-synchronized", fresh.len());

        let existing = votes.read_all(ValueRender::Formula)?;
        let mut rewritten: Vec<Vec<String>> = existing.clone();
        // Only changed rows are written: the others were read as formulas and
        // would be re-parsed on the way back.
        let mut changed: Vec<usize> = Vec::new();
        let mut stale: Vec<u32> = Vec::new();
        for (idx, cells) in existing.iter().enumerate() {
            let Some(id) = vote_row_ballot_id(cells) else {
                continue;
            };
            if let Some(new_row) = fresh.get(&id) {
                let mut current = cells.clone();
                current.resize(VOTE_ROW_WIDTH, String::new());
                if &current != new_row {
                    rewritten[idx] = new_row.clone();
                    changed.push(idx);
                }
            } else if !table.linked_ballots.contains(&id) {
                stale.push(idx as u32);
            }
        }

        if !changed.is_empty() {
            info!("update_ballots: rewriting {} vote rows", changed.len());
        }
        for run in ascending_runs(&changed) {
            votes.write_block(
                run.start as u32 + 1,
                1,
                &rewritten[run],
                InputMode::UserEntered,
            )?;
        }
        if !stale.is_empty() {
            info!("update_ballots: deleting {} stale vote rows", stale.len());
            votes.delete_rows(&descending_ranges(stale))?;
        }
        Ok(rows.len())
    }
}
