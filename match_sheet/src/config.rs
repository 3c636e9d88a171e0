// ********* Configuration data structures ***********
//
// These are deserialized straight out of the main YAML configuration by the
// binary. Their meaning is defined here, next to the code that uses them.

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::table::{a1_to_rowcol, split_range};
use crate::{InvalidAddressSnafu, SyncResult};

/// Destinations must name a single cell, optionally on a quoted tab.
pub fn check_cell(address: &str) -> SyncResult<()> {
    let (_, a1) = split_range(address);
    ensure!(
        a1.and_then(a1_to_rowcol).is_some(),
        InvalidAddressSnafu { address }
    );
    Ok(())
}

/// Where a value written into a generated document comes from.
///
/// ```yaml
/// links:
///   - { kind: literal, column: 0, dest: B2 }
///   - { kind: literal, column: 5, dest: B3, per_judge: true }
///   - { kind: rendered, cell: A1, dest: B1 }
///   - { kind: choice, columns: [3, 4], dest: B10 }
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkSpec {
    /// The cell `column` of the match row. With `per_judge`, the slot index
    /// (judge seat, or side) is added to the column.
    Literal {
        column: usize,
        dest: String,
        #[serde(default)]
        per_judge: bool,
    },
    /// The displayed value of a fixed cell of the matches sheet.
    Rendered { cell: String, dest: String },
    /// A dropdown on `dest` offering the values of these row columns.
    Choice { columns: Vec<usize>, dest: String },
}

impl LinkSpec {
    pub fn dest(&self) -> &str {
        match self {
            LinkSpec::Literal { dest, .. } => dest,
            LinkSpec::Rendered { dest, .. } => dest,
            LinkSpec::Choice { dest, .. } => dest,
        }
    }
}

/// A kind of document copied from a template for every match.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub template_id: String,
    pub folder_id: String,
    /// The tab of the generated document that link destinations refer to.
    /// When absent, the first tab.
    pub sheet_title: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl ArtifactSpec {
    pub fn check(&self) -> SyncResult<()> {
        for link in &self.links {
            check_cell(link.dest())?;
            if let LinkSpec::Rendered { cell, .. } = link {
                check_cell(cell)?;
            }
        }
        Ok(())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotSpec {
    #[serde(flatten)]
    pub artifact: ArtifactSpec,
    /// The ballot cell where the judge selects the winning team.
    pub winner_cell: String,
    /// Ballot cells imported into the vote row after the two vote columns.
    #[serde(default)]
    pub vote_imports: Vec<String>,
}

/// A ballot cell summed over all judges of a match.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PointLink {
    pub source: String,
    pub dest: String,
}

/// Counts of judges voting for each side.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyLink {
    pub source: String,
    pub affirmative_dest: String,
    pub negative_dest: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSpec {
    #[serde(flatten)]
    pub artifact: ArtifactSpec,
    #[serde(default)]
    pub points: Vec<PointLink>,
    pub tally: Option<TallyLink>,
}

impl AggregateSpec {
    /// Sources are ranges of the ballots and are not checked here.
    pub fn check(&self) -> SyncResult<()> {
        self.artifact.check()?;
        for point in &self.points {
            check_cell(&point.dest)?;
        }
        if let Some(tally) = &self.tally {
            check_cell(&tally.affirmative_dest)?;
            check_cell(&tally.negative_dest)?;
        }
        Ok(())
    }
}
