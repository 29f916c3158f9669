// ********* Shared data structures ***********

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three states an attendee can be in within a report.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    /// On the official roster and matched to an observed participant.
    Present,
    /// On the official roster, not observed in the session.
    Absent,
    /// Observed in the session, not on the official roster.
    Unexpected,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Unexpected,
    ];

    /// The label used in exported reports.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Unexpected => "Unexpected",
        }
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "unexpected" => Ok(AttendanceStatus::Unexpected),
            x => Err(format!("unknown attendance status: {:?}", x)),
        }
    }
}

/// How aggressively observed names are matched to official names.
///
/// The value is chosen once per analysis run. It only changes the matching
/// step: the column locator ignores it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sensitivity {
    /// Only near-identical names match.
    Strict,
    /// Spelling variations, cross-lingual spellings and honorific titles are tolerated.
    #[default]
    Balanced,
    /// Partial names and typos are matched aggressively.
    Flexible,
}

impl Sensitivity {
    /// The matching instruction handed to the matching capability.
    pub fn instruction(&self) -> &'static str {
        match self {
            Sensitivity::Strict => "Be very strict. Only match names that are clearly the same person with very minor differences.",
            Sensitivity::Balanced => "Allow common spelling variations, cross-lingual matches, and ignore titles like 'Dr.', 'Pharmacist'.",
            Sensitivity::Flexible => "Be very aggressive. Ignore all titles. Match even if only parts of the name match or typos exist.",
        }
    }
}

impl Display for Sensitivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sensitivity::Strict => "STRICT",
            Sensitivity::Balanced => "BALANCED",
            Sensitivity::Flexible => "FLEXIBLE",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Sensitivity::Strict),
            "balanced" => Ok(Sensitivity::Balanced),
            "flexible" => Ok(Sensitivity::Flexible),
            x => Err(format!("unknown sensitivity: {:?}", x)),
        }
    }
}

/// Which kind of list an image is expected to show.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ListKind {
    /// A printed or photographed registration list.
    OfficialRoster,
    /// The participant panel of a video call.
    SessionParticipants,
}

impl ListKind {
    /// The extraction instruction handed to the extraction capability.
    pub fn instruction(&self) -> &'static str {
        match self {
            ListKind::OfficialRoster => "This is an official registration list. Extract ALL full names of people. Ignore headers, numbers, or dates. Return ONLY names, one per line, with no extra commentary. Support Arabic and English.",
            ListKind::SessionParticipants => "This is a video call participant list. Identify and extract ALL participant names. Ignore technical details like \"(Host)\", \"(Me)\", icons, or presence status. Return ONLY names, one per line, with no extra commentary.",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            x => Err(format!("unknown sort order: {:?}", x)),
        }
    }
}

/// One person in a report.
///
/// `original_name` records which observed name was matched to the official
/// `name`. It is only set by the matching step on PRESENT records.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    pub status: AttendanceStatus,
    #[serde(
        rename = "originalName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub original_name: Option<String>,
}

impl Attendee {
    pub fn present(name: &str, original_name: &str) -> Attendee {
        Attendee {
            name: name.to_string(),
            status: AttendanceStatus::Present,
            original_name: Some(original_name.to_string()),
        }
    }

    pub fn absent(name: &str) -> Attendee {
        Attendee {
            name: name.to_string(),
            status: AttendanceStatus::Absent,
            original_name: None,
        }
    }

    pub fn unexpected(name: &str) -> Attendee {
        Attendee {
            name: name.to_string(),
            status: AttendanceStatus::Unexpected,
            original_name: None,
        }
    }
}

// ********* Configuration **********

/// Tunables of the column locator.
///
/// The defaults were tuned on pharmacist training rosters, which mix a
/// registration table with a pivot table on the same sheet.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LocatorConfig {
    /// Strong header signals, checked first.
    pub primary_keywords: Vec<String>,
    /// Generic header signals, checked when no primary keyword was found.
    pub secondary_keywords: Vec<String>,
    /// Header cells containing one of these are never taken as the name column.
    pub ignore_keywords: Vec<String>,
    /// Number of rows searched for a header.
    pub header_scan_rows: usize,
    /// Number of rows sampled when scoring columns.
    pub sample_rows: usize,
    /// First column index that may belong to a pivot table region.
    pub pivot_guard_column: usize,
    pub pivot_label: String,
    /// Names must be strictly longer than this (in characters).
    pub min_name_len: usize,
}

fn to_strings(l: &[&str]) -> Vec<String> {
    l.iter().map(|s| s.to_string()).collect()
}

impl Default for LocatorConfig {
    fn default() -> LocatorConfig {
        LocatorConfig {
            primary_keywords: to_strings(&["pharmacist name", "display name", "اسم الصيدلي"]),
            secondary_keywords: to_strings(&["اسم", "الاسم", "name", "full name"]),
            ignore_keywords: to_strings(&[
                "row labels",
                "supervisor",
                "count of",
                "date",
                "city",
                "username",
                "email",
                "status",
            ]),
            header_scan_rows: 10,
            sample_rows: 20,
            pivot_guard_column: 6,
            pivot_label: "row labels".to_string(),
            min_name_len: 3,
        }
    }
}
