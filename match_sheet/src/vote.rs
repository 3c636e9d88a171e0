use snafu::prelude::*;

use crate::formula::{equals_one, import_range, parse_import_id};
use crate::row::MatchRow;
use crate::{BallotSpec, InvalidConfigSnafu, SyncResult};

/// Cells in a row of the votes sheet.
pub const VOTE_ROW_WIDTH: usize = 11;
const FIXED_VOTE_CELLS: usize = 5;
pub const MAX_VOTE_IMPORTS: usize = VOTE_ROW_WIDTH - FIXED_VOTE_CELLS;

/// Column holding the affirmative vote formula, whose import names the ballot.
const VOTE_FORMULA_COLUMN: usize = 3;

pub fn check_vote_imports(spec: &BallotSpec) -> SyncResult<()> {
    ensure!(
        spec.vote_imports.len() <= MAX_VOTE_IMPORTS,
        InvalidConfigSnafu {
            message: format!(
                "at most {} vote_imports fit in a vote row, got {}",
                MAX_VOTE_IMPORTS,
                spec.vote_imports.len()
            )
        }
    );
    Ok(())
}

/// The row of the votes sheet for one judge of one match.
///
/// Layout: match name, judge seat, judge email, affirmative vote, negative
/// vote, then the configured imports from the ballot, padded to
/// [`VOTE_ROW_WIDTH`]. A vote counts when the winner cell of the ballot
/// holds exactly the name of the side.
pub fn vote_row(row: &MatchRow, seat: usize, ballot_id: &str, spec: &BallotSpec) -> Vec<String> {
    let winner = import_range(ballot_id, &spec.winner_cell);
    let mut cells = vec![
        row.match_name.clone(),
        seat.to_string(),
        row.judge_emails.get(seat).cloned().unwrap_or_default(),
        format!("={}", equals_one(&winner, &row.affirmative_name)),
        format!("={}", equals_one(&winner, &row.negative_name)),
    ];
    cells.extend(
        spec.vote_imports
            .iter()
            .take(MAX_VOTE_IMPORTS)
            .map(|range| format!("={}", import_range(ballot_id, range))),
    );
    cells.resize(VOTE_ROW_WIDTH, String::new());
    cells
}

/// The ballot a vote row was built for, read back from its formulas.
pub fn vote_row_ballot_id(cells: &[String]) -> Option<String> {
    cells.get(VOTE_FORMULA_COLUMN).and_then(|f| parse_import_id(f))
}
