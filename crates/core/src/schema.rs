//! Fixed address space of a Day Document.
//!
//! Every day document is a single sheet whose zones live at fixed cell
//! addresses. Rows and columns are 1-based (row 1 is the first row, column 1
//! is column `A`), matching A1 notation. Nothing in the system discovers the
//! layout at runtime: all reads and writes target the constants below.
//!
//! | Zone            | Header           | Data                      |
//! |-----------------|------------------|---------------------------|
//! | Header          | -                | `A1:E2`                   |
//! | Task Assignment | `G1:J1`          | `G2:J20`                  |
//! | Office Activity | `A4:E4`          | `A5:E12` (8 slots)        |
//! | Mentor Activity | `A14:E14`        | `A15:E21` (7 slots)       |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::naming::{header_date, weekday_name};

/// Name of the only sheet inside a day document.
pub const SHEET_NAME: &str = "Sheet1";

// ---------------------------------------------------------------------------
// Cell addressing
// ---------------------------------------------------------------------------

/// Inclusive rectangular range of cells, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    pub const fn new(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        Self {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    /// A single-cell range.
    pub const fn cell(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    /// A range spanning `start_col..=end_col` of a single row.
    pub const fn row(row: u32, start_col: u32, end_col: u32) -> Self {
        Self::new(row, start_col, row, end_col)
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_col..=self.end_col).contains(&col)
    }

    pub fn intersects(&self, other: &CellRange) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }

    /// Reject zero-based or inverted ranges.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start_row == 0 || self.start_col == 0 {
            return Err(CoreError::Validation(format!(
                "Cell ranges are 1-based, got {self:?}"
            )));
        }
        if self.end_row < self.start_row || self.end_col < self.start_col {
            return Err(CoreError::Validation(format!("Inverted cell range {self:?}")));
        }
        Ok(())
    }

    /// A1 notation including the sheet name, e.g. `Sheet1!B5:E5`.
    pub fn to_a1(&self) -> String {
        format!(
            "{SHEET_NAME}!{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row,
            column_letters(self.end_col),
            self.end_row
        )
    }

    /// Parse `B5:E5`, `Sheet1!B5:E5` or a single cell such as `D2`.
    pub fn parse_a1(notation: &str) -> Result<Self, CoreError> {
        let bare = notation
            .rsplit_once('!')
            .map_or(notation, |(_, cells)| cells);
        let (start, end) = bare.split_once(':').unwrap_or((bare, bare));
        let (start_row, start_col) = parse_cell(start)
            .ok_or_else(|| CoreError::Validation(format!("Invalid A1 notation '{notation}'")))?;
        let (end_row, end_col) = parse_cell(end)
            .ok_or_else(|| CoreError::Validation(format!("Invalid A1 notation '{notation}'")))?;
        let range = Self::new(start_row, start_col, end_row, end_col);
        range.validate()?;
        Ok(range)
    }
}

/// Column number to letters: 1 -> `A`, 26 -> `Z`, 27 -> `AA`.
pub fn column_letters(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Letters to column number: `A` -> 1, `AA` -> 27.
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

fn parse_cell(cell: &str) -> Option<(u32, u32)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let col = column_number(letters)?;
    let row: u32 = digits.parse().ok()?;
    Some((row, col))
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

pub const COL_A: u32 = 1;
pub const COL_B: u32 = 2;
pub const COL_C: u32 = 3;
pub const COL_D: u32 = 4;
pub const COL_E: u32 = 5;
pub const COL_G: u32 = 7;
pub const COL_J: u32 = 10;

// ---------------------------------------------------------------------------
// Header zone
// ---------------------------------------------------------------------------

/// Whole header zone, `A1:E2`.
pub const HEADER_ZONE: CellRange = CellRange::new(1, COL_A, 2, COL_E);

/// Date value cell.
pub const DATE_CELL: CellRange = CellRange::cell(1, COL_B);

/// Day-name value cell.
pub const DAY_CELL: CellRange = CellRange::cell(1, COL_D);

/// In-time value cell.
pub const IN_TIME_CELL: CellRange = CellRange::cell(2, COL_B);

/// Out-time value cell.
pub const OUT_TIME_CELL: CellRange = CellRange::cell(2, COL_D);

pub const LABEL_DATE: &str = "DATE";
pub const LABEL_DAY: &str = "DAY";
pub const LABEL_IN_TIME: &str = "IN TIME";
pub const LABEL_OUT_TIME: &str = "OUT TIME";
pub const LABEL_TOTAL_HOURS: &str = "TOTAL HOURS";

// ---------------------------------------------------------------------------
// Task assignment zone
// ---------------------------------------------------------------------------

pub const TASK_HEADER: CellRange = CellRange::row(1, COL_G, COL_J);

/// First data row of the task zone.
pub const TASK_FIRST_ROW: u32 = 2;

/// Last addressable row of the task zone.
pub const TASK_LAST_ROW: u32 = 20;

/// Whole task data zone, `G2:J20`.
pub const TASK_ZONE: CellRange = CellRange::new(TASK_FIRST_ROW, COL_G, TASK_LAST_ROW, COL_J);

/// Number of task rows the zone can hold.
pub const TASK_CAPACITY: usize = (TASK_LAST_ROW - TASK_FIRST_ROW + 1) as usize;

/// Cells per task row: priority, task, deadline, expected time.
pub const TASK_WIDTH: usize = 4;

pub const TASK_HEADERS: [&str; TASK_WIDTH] = ["PRIORITY", "TASK", "DEADLINE", "EXPECTED TIME"];

/// Range covering task rows `offset..offset + count` (offset 0 is row 2).
pub fn task_rows(offset: usize, count: usize) -> Result<CellRange, CoreError> {
    if count == 0 || offset + count > TASK_CAPACITY {
        return Err(CoreError::InvalidSlot {
            zone: "task_assignment",
            index: offset + count,
        });
    }
    let start = TASK_FIRST_ROW + offset as u32;
    Ok(CellRange::new(start, COL_G, start + count as u32 - 1, COL_J))
}

// ---------------------------------------------------------------------------
// Activity zones
// ---------------------------------------------------------------------------

pub const OFFICE_HEADER_ROW: u32 = 4;
pub const OFFICE_FIRST_ROW: u32 = 5;

pub const OFFICE_HEADERS: [&str; 5] = ["TIME SLOT", "TASK", "DESCRIPTION", "STATUS", "REMARKS"];

pub const OFFICE_SLOTS: [&str; 8] = [
    "09:30 - 10:30",
    "10:30 - 11:30",
    "11:30 - 12:30",
    "12:30 - 01:30 (LUNCH)",
    "01:30 - 02:30",
    "02:30 - 03:30",
    "03:30 - 04:00 (TEA)",
    "04:00 - 05:30",
];

/// Office slots that hold break placeholders and never accept entries.
pub const OFFICE_BREAK_SLOTS: [usize; 2] = [3, 6];

pub const MENTOR_HEADER_ROW: u32 = 14;
pub const MENTOR_FIRST_ROW: u32 = 15;

pub const MENTOR_HEADERS: [&str; 5] = ["TIME SLOT (MENTOR)", "GRADE", "TOPICS", "ACTIVITY", "REMARKS"];

pub const MENTOR_SLOTS: [&str; 7] = [
    "08:00 - 09:00",
    "09:00 - 10:00",
    "10:00 - 11:00",
    "11:00 - 12:00",
    "12:00 - 01:00",
    "01:00 - 02:00",
    "02:00 - 03:00",
];

/// One of the two slot-addressed activity zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityZone {
    Office,
    Mentor,
}

impl ActivityZone {
    pub fn name(self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Mentor => "mentor",
        }
    }

    pub fn slot_labels(self) -> &'static [&'static str] {
        match self {
            Self::Office => &OFFICE_SLOTS,
            Self::Mentor => &MENTOR_SLOTS,
        }
    }

    pub fn slot_count(self) -> usize {
        self.slot_labels().len()
    }

    pub fn header_row(self) -> u32 {
        match self {
            Self::Office => OFFICE_HEADER_ROW,
            Self::Mentor => MENTOR_HEADER_ROW,
        }
    }

    pub fn first_row(self) -> u32 {
        match self {
            Self::Office => OFFICE_FIRST_ROW,
            Self::Mentor => MENTOR_FIRST_ROW,
        }
    }

    pub fn headers(self) -> &'static [&'static str; 5] {
        match self {
            Self::Office => &OFFICE_HEADERS,
            Self::Mentor => &MENTOR_HEADERS,
        }
    }

    /// All slot rows of the zone, columns `A..E`.
    pub fn zone_range(self) -> CellRange {
        let first = self.first_row();
        CellRange::new(first, COL_A, first + self.slot_count() as u32 - 1, COL_E)
    }

    /// Cells written for one slot.
    ///
    /// Office rows keep their fixed time label in column A and accept
    /// `B..E`; mentor rows carry their own time label and accept `A..E`.
    pub fn slot_range(self, slot: usize) -> Result<CellRange, CoreError> {
        if slot >= self.slot_count() {
            return Err(CoreError::InvalidSlot {
                zone: self.name(),
                index: slot,
            });
        }
        let row = self.first_row() + slot as u32;
        Ok(match self {
            Self::Office => CellRange::row(row, COL_B, COL_E),
            Self::Mentor => CellRange::row(row, COL_A, COL_E),
        })
    }

    /// Number of cells a slot write carries.
    pub fn slot_width(self) -> usize {
        match self {
            Self::Office => 4,
            Self::Mentor => 5,
        }
    }

    pub fn is_break_slot(self, slot: usize) -> bool {
        self == Self::Office && OFFICE_BREAK_SLOTS.contains(&slot)
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// One block of literal cell values written when a document is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBlock {
    pub range: CellRange,
    pub values: Vec<Vec<String>>,
}

/// The labels every new day document starts with.
///
/// The date and weekday cells are filled from `date`; every other value cell
/// starts blank.
pub fn template_blocks(date: NaiveDate) -> Vec<TemplateBlock> {
    let owned = |cells: &[&str]| cells.iter().map(|c| c.to_string()).collect::<Vec<_>>();
    let column = |labels: &[&str]| labels.iter().map(|l| vec![l.to_string()]).collect::<Vec<_>>();

    let office_first = ActivityZone::Office.first_row();
    let mentor_first = ActivityZone::Mentor.first_row();

    vec![
        TemplateBlock {
            range: HEADER_ZONE,
            values: vec![
                vec![
                    LABEL_DATE.to_string(),
                    header_date(date),
                    LABEL_DAY.to_string(),
                    weekday_name(date),
                    String::new(),
                ],
                owned(&[LABEL_IN_TIME, "", LABEL_OUT_TIME, "", LABEL_TOTAL_HOURS]),
            ],
        },
        TemplateBlock {
            range: TASK_HEADER,
            values: vec![owned(&TASK_HEADERS)],
        },
        TemplateBlock {
            range: CellRange::row(OFFICE_HEADER_ROW, COL_A, COL_E),
            values: vec![owned(&OFFICE_HEADERS)],
        },
        TemplateBlock {
            range: CellRange::new(
                office_first,
                COL_A,
                office_first + OFFICE_SLOTS.len() as u32 - 1,
                COL_A,
            ),
            values: column(&OFFICE_SLOTS),
        },
        TemplateBlock {
            range: CellRange::row(MENTOR_HEADER_ROW, COL_A, COL_E),
            values: vec![owned(&MENTOR_HEADERS)],
        },
        TemplateBlock {
            range: CellRange::new(
                mentor_first,
                COL_A,
                mentor_first + MENTOR_SLOTS.len() as u32 - 1,
                COL_A,
            ),
            values: column(&MENTOR_SLOTS),
        },
    ]
}
