/*!
Attendance reconciliation: compares an official roster with the names seen
in a video call and produces a reviewed attendance report.

The flow is:
- read the official names from a spreadsheet grid ([`locate_name_column`]) or
  from an image,
- read the participant names from one or more images with a [`NameExtractor`],
- match both lists with a [`NameMatcher`] ([`FuzzyMatcher`] is built in),
- review the draft in a [`ReviewSession`], finalize it, and bulk edit it.

The long-form documentation is in the [`manual`] module.
*/

mod column_locator;
mod config;
mod engine;
mod extraction;
pub mod manual;
mod matching;
mod normalize;
mod report;
mod review;

pub use crate::column_locator::*;
pub use crate::config::*;
pub use crate::engine::{
    build_report, official_names, process_attendance, run_analysis, AnalysisSettings,
    AttendanceError, OfficialSource,
};
pub use crate::extraction::{
    extract_names, split_names, ExtractionFailure, ExtractionRequest, ImagePayload,
    NameExtractor, PlainTextExtractor,
};
pub use crate::matching::{
    parse_match_response, response_schema, FuzzyMatcher, MatchFailure, MatchRequest,
    MatchResponse, MatchedPair, NameMatcher,
};
pub use crate::normalize::{compare_names, normalize_name, DEFAULT_TITLES};
pub use crate::report::{
    AttendanceReport, ExportRow, ReportBuckets, EXPORT_HEADER, UNKNOWN_PARTICIPANT,
};
pub use crate::review::{BulkChange, BulkOutcome, ReviewSession, ReviewStage};
