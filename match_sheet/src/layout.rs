use std::ops::Range;

use serde::{Deserialize, Serialize};

/// The two generations of the matches sheet.
///
/// They disagree on where everything after the judge columns lives, so a
/// deployment chooses one and keeps it. There is no detection.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutVersion {
    /// Date row plus column label row; staff columns follow the judges.
    #[default]
    Full,
    /// Date row only; no staff columns in the offset base.
    RoomOnly,
}

/// Column offsets of every field of a match row.
///
/// All offsets are 0-based indexes into a row of the data body, i.e. after
/// the header rows have been dropped. Sheet coordinates are 1-based and are
/// obtained with [`ColumnLayout::sheet_col`] and [`ColumnLayout::first_data_row`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnLayout {
    pub version: LayoutVersion,
    pub judge_num: usize,
    pub staff_num: usize,
    base: usize,
}

impl ColumnLayout {
    pub const MATCH_NAME: usize = 0;
    pub const START_TIME: usize = 1;
    pub const END_TIME: usize = 2;
    pub const AFFIRMATIVE: usize = 3;
    pub const NEGATIVE: usize = 4;
    const FIRST_JUDGE: usize = 5;

    pub fn new(judge_num: usize, staff_num: usize, version: LayoutVersion) -> ColumnLayout {
        let base = match version {
            LayoutVersion::Full => Self::FIRST_JUDGE + judge_num + staff_num,
            LayoutVersion::RoomOnly => Self::FIRST_JUDGE + judge_num,
        };
        ColumnLayout {
            version,
            judge_num,
            staff_num,
            base,
        }
    }

    /// Number of rows above the data body.
    pub fn header_rows(&self) -> usize {
        match self.version {
            LayoutVersion::Full => 2,
            LayoutVersion::RoomOnly => 1,
        }
    }

    /// 1-based sheet row of the first data row.
    pub fn first_data_row(&self) -> u32 {
        self.header_rows() as u32 + 1
    }

    /// 1-based sheet column of a 0-based row offset.
    pub fn sheet_col(offset: usize) -> u32 {
        offset as u32 + 1
    }

    pub fn judges(&self) -> Range<usize> {
        Self::FIRST_JUDGE..Self::FIRST_JUDGE + self.judge_num
    }

    /// Empty in the room-only layout.
    pub fn staff(&self) -> Range<usize> {
        match self.version {
            LayoutVersion::Full => {
                let start = Self::FIRST_JUDGE + self.judge_num;
                start..start + self.staff_num
            }
            LayoutVersion::RoomOnly => 0..0,
        }
    }

    pub fn host_email(&self) -> usize {
        self.base
    }

    /// Meeting url, id and password, in that order.
    pub fn meeting(&self) -> Range<usize> {
        self.base + 1..self.base + 4
    }

    pub fn ballots(&self) -> Range<usize> {
        let start = self.base + 4;
        start..start + self.judge_num
    }

    /// Affirmative then negative.
    pub fn member_lists(&self) -> Range<usize> {
        let start = self.ballots().end;
        start..start + 2
    }

    pub fn aggregate(&self) -> usize {
        self.member_lists().end
    }

    /// Affirmative then negative.
    pub fn advice(&self) -> Range<usize> {
        let start = self.aggregate() + 1;
        start..start + 2
    }

    /// Stream url, stream key and page url.
    pub fn stream(&self) -> Range<usize> {
        let start = self.advice().end;
        start..start + 3
    }

    /// One past the last column used by the layout.
    pub fn width(&self) -> usize {
        self.stream().end
    }
}
