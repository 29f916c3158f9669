use std::collections::HashSet;

use log::{debug, info, warn};
use snafu::{prelude::*, Snafu};

use crate::column_locator::{extract_names_from_grid, Grid};
use crate::config::{Attendee, ListKind, LocatorConfig, Sensitivity};
use crate::extraction::{extract_names, ImagePayload, NameExtractor};
use crate::matching::{parse_match_response, MatchFailure, MatchRequest, MatchResponse, NameMatcher};
use crate::report::AttendanceReport;

/// Failures that abort an analysis run. No partial report is ever produced.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AttendanceError {
    #[snafu(display("No names were found in the official roster"))]
    NoNamesFound,
    #[snafu(display(
        "No participant names were found in the {images} session image(s). Please check that the images are readable."
    ))]
    EmptyObservedSet { images: usize },
    #[snafu(display("Could not understand the matching result: {source}"))]
    MatchParse { source: serde_json::Error },
    #[snafu(display("The matching service is unavailable: {source}"))]
    MatchUnavailable { source: MatchFailure },
    #[snafu(display("The report is already finalized, reset the session to start a new one"))]
    ReportFinalized,
}

impl AttendanceError {
    /// Whether running the same analysis again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttendanceError::MatchParse { .. } | AttendanceError::MatchUnavailable { .. }
        )
    }
}

/// Where the official names come from.
#[derive(Debug, Clone)]
pub enum OfficialSource {
    /// A list that was already read.
    Names(Vec<String>),
    /// The first sheet of a spreadsheet.
    Grid(Grid),
    /// A photo of a printed list.
    Image(ImagePayload),
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisSettings {
    pub sensitivity: Sensitivity,
    pub locator: LocatorConfig,
}

// Trimmed, non-empty, first occurrence kept.
fn dedup_names<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res = Vec::new();
    for n in names {
        let n = n.trim().to_string();
        if !n.is_empty() && seen.insert(n.clone()) {
            res.push(n);
        }
    }
    res
}

/// Reads the official names out of their source.
pub fn official_names(
    source: &OfficialSource,
    locator: &LocatorConfig,
    extractor: &dyn NameExtractor,
    progress: &mut dyn FnMut(&str),
) -> Result<Vec<String>, AttendanceError> {
    let names = match source {
        OfficialSource::Names(l) => dedup_names(l.iter().cloned()),
        OfficialSource::Grid(grid) => extract_names_from_grid(grid, locator),
        OfficialSource::Image(image) => {
            progress("Extracting names from the official roster image...");
            let l = dedup_names(extract_names(extractor, image, ListKind::OfficialRoster));
            progress(&format!("Extracted {} names from the image.", l.len()));
            l
        }
    };
    ensure!(!names.is_empty(), NoNamesFoundSnafu {});
    info!("official_names: {} names", names.len());
    Ok(names)
}

fn add_checked(report: &mut AttendanceReport, a: Attendee) {
    if a.name.is_empty() {
        warn!("build_report: empty {} name dropped", a.status);
    } else if !report.insert(a.clone()) {
        warn!(
            "build_report: {:?} listed more than once, keeping the first occurrence",
            a.name
        );
    }
}

/// Turns the answer of the matcher into a report.
///
/// The answer is not trusted and is checked against the lists that were
/// sent:
/// - names are trimmed and empty names are dropped;
/// - a name listed twice keeps its first occurrence (present, then absent,
///   then unexpected);
/// - present and absent names must be official names;
/// - a match must use an observed name that no other match used, otherwise
///   the official name becomes ABSENT;
/// - unexpected names must be observed names that no match used.
///
/// Official names the answer forgot become ABSENT and observed names it
/// forgot become UNEXPECTED.
pub fn build_report(
    official: &[String],
    observed: &[String],
    response: MatchResponse,
) -> AttendanceReport {
    let official_set: HashSet<&str> = official.iter().map(|n| n.trim()).collect();
    let observed_set: HashSet<&str> = observed.iter().map(|n| n.trim()).collect();
    let mut used: HashSet<String> = HashSet::new();
    let mut report = AttendanceReport::new();
    for p in response.present.iter() {
        let name = p.name.trim();
        let original = p.original_name.trim();
        if !official_set.contains(name) {
            warn!("build_report: {:?} is not an official name, dropped", name);
            continue;
        }
        if report.contains(name) {
            add_checked(&mut report, Attendee::absent(name));
        } else if !observed_set.contains(original) {
            warn!(
                "build_report: {:?} matched to unknown participant {:?}, marked absent",
                name, original
            );
            add_checked(&mut report, Attendee::absent(name));
        } else if used.contains(original) {
            warn!(
                "build_report: {:?} matched to {:?} which is already matched, marked absent",
                name, original
            );
            add_checked(&mut report, Attendee::absent(name));
        } else {
            used.insert(original.to_string());
            add_checked(&mut report, Attendee::present(name, original));
        }
    }
    for n in response.absent.iter() {
        let n = n.trim();
        if !n.is_empty() && !official_set.contains(n) {
            warn!("build_report: absent {:?} is not an official name, dropped", n);
            continue;
        }
        add_checked(&mut report, Attendee::absent(n));
    }
    for n in response.unexpected.iter() {
        let n = n.trim();
        if !n.is_empty() && (!observed_set.contains(n) || used.contains(n)) {
            warn!(
                "build_report: unexpected {:?} was not observed or is already matched, dropped",
                n
            );
            continue;
        }
        add_checked(&mut report, Attendee::unexpected(n));
    }
    for n in official.iter() {
        if !report.contains(n) {
            warn!("build_report: {:?} missing from the matching result, marked absent", n);
            report.insert(Attendee::absent(n));
        }
    }
    for n in observed.iter() {
        if !used.contains(n.as_str()) && !report.contains(n) {
            warn!("build_report: {:?} missing from the matching result, marked unexpected", n);
            report.insert(Attendee::unexpected(n));
        }
    }
    report
}

/// Reconciles the official names against the participant images.
///
/// Images are read one after the other, and their names are merged before a
/// single matching call. Progress messages follow the steps in order.
pub fn process_attendance(
    official: &[String],
    images: &[ImagePayload],
    sensitivity: Sensitivity,
    extractor: &dyn NameExtractor,
    matcher: &dyn NameMatcher,
    progress: &mut dyn FnMut(&str),
) -> Result<AttendanceReport, AttendanceError> {
    let mut observed_lists: Vec<String> = Vec::new();
    for (idx, image) in images.iter().enumerate() {
        progress(&format!(
            "Extracting attendees from participant screenshot {}...",
            idx + 1
        ));
        let names = extract_names(extractor, image, ListKind::SessionParticipants);
        debug!("process_attendance: image {}: {:?}", idx + 1, names);
        observed_lists.extend(names);
    }
    let observed = dedup_names(observed_lists);
    ensure!(
        !observed.is_empty(),
        EmptyObservedSetSnafu {
            images: images.len()
        }
    );

    progress(&format!(
        "Analyzing and matching names (sensitivity: {})...",
        sensitivity
    ));
    let request = MatchRequest::new(official, &observed, sensitivity);
    let answer = matcher
        .match_names(&request)
        .context(MatchUnavailableSnafu {})?;
    let response = parse_match_response(&answer).context(MatchParseSnafu {})?;
    let report = build_report(official, &observed, response);
    info!(
        "process_attendance: {} official, {} observed, {} records",
        official.len(),
        observed.len(),
        report.len()
    );
    Ok(report)
}

/// The full analysis: official names, then reconciliation.
pub fn run_analysis(
    source: &OfficialSource,
    images: &[ImagePayload],
    settings: &AnalysisSettings,
    extractor: &dyn NameExtractor,
    matcher: &dyn NameMatcher,
    progress: &mut dyn FnMut(&str),
) -> Result<AttendanceReport, AttendanceError> {
    let official = official_names(source, &settings.locator, extractor, progress)?;
    process_attendance(
        &official,
        images,
        settings.sensitivity,
        extractor,
        matcher,
        progress,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttendanceStatus;
    use crate::extraction::{ExtractionFailure, ExtractionRequest, FailedSnafu};
    use crate::matching::{FuzzyMatcher, MatchedPair};
    use std::cell::Cell;

    fn names(l: &[&str]) -> Vec<String> {
        l.iter().map(|s| s.to_string()).collect()
    }

    // Answers with the text of the payload, or fails on "broken".
    struct Echo;

    impl NameExtractor for Echo {
        fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure> {
            let bytes = request.image.decode().context(crate::extraction::DecodeSnafu)?;
            let text = String::from_utf8_lossy(&bytes).to_string();
            if text == "broken" {
                return FailedSnafu { message: "timeout" }.fail();
            }
            Ok(text)
        }
    }

    struct Canned(&'static str, Cell<usize>);

    impl NameMatcher for Canned {
        fn match_names(&self, _request: &MatchRequest) -> Result<String, MatchFailure> {
            self.1.set(self.1.get() + 1);
            Ok(self.0.to_string())
        }
    }

    struct Down;

    impl NameMatcher for Down {
        fn match_names(&self, _request: &MatchRequest) -> Result<String, MatchFailure> {
            Err(MatchFailure {
                message: "quota exceeded".to_string(),
            })
        }
    }

    fn img(s: &str) -> ImagePayload {
        ImagePayload::from_bytes("image/png", s.as_bytes())
    }

    #[test]
    fn progress_follows_steps() {
        let mut log: Vec<String> = Vec::new();
        let report = process_attendance(
            &names(&["Sara Ali", "Omar Khan"]),
            &[img("Sara A."), img("broken"), img("Random Guest\nSara A.")],
            Sensitivity::Balanced,
            &Echo,
            &FuzzyMatcher::default(),
            &mut |m| log.push(m.to_string()),
        )
        .unwrap();
        assert_eq!(
            log,
            vec![
                "Extracting attendees from participant screenshot 1...",
                "Extracting attendees from participant screenshot 2...",
                "Extracting attendees from participant screenshot 3...",
                "Analyzing and matching names (sensitivity: BALANCED)...",
            ]
        );
        assert_eq!(report.len(), 3);
        assert_eq!(report.count(AttendanceStatus::Present), 1);
    }

    #[test]
    fn empty_observed_set_skips_matching() {
        let matcher = Canned("{}", Cell::new(0));
        let err = process_attendance(
            &names(&["A", "B"]),
            &[img("broken"), img("x")],
            Sensitivity::Strict,
            &Echo,
            &matcher,
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::EmptyObservedSet { images: 2 }));
        assert_eq!(matcher.1.get(), 0);
    }

    #[test]
    fn malformed_answer_is_retryable() {
        let matcher = Canned("Sorry, I can't help with that.", Cell::new(0));
        let err = process_attendance(
            &names(&["Sara Ali"]),
            &[img("Sara A.")],
            Sensitivity::Balanced,
            &Echo,
            &matcher,
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::MatchParse { .. }));
        assert!(err.is_retryable());

        let err = process_attendance(
            &names(&["Sara Ali"]),
            &[img("Sara A.")],
            Sensitivity::Balanced,
            &Echo,
            &Down,
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::MatchUnavailable { .. }));
        assert!(err.is_retryable());
        assert!(!AttendanceError::NoNamesFound.is_retryable());
    }

    #[test]
    fn answer_is_cleaned_up() {
        let response = MatchResponse {
            present: vec![
                MatchedPair {
                    name: " Sara Ali ".to_string(),
                    original_name: "Sara A.".to_string(),
                },
                MatchedPair {
                    name: "".to_string(),
                    original_name: "Ghost".to_string(),
                },
            ],
            absent: names(&["Sara Ali", "  "]),
            unexpected: names(&["Random Guest", "Random Guest"]),
        };
        let report = build_report(
            &names(&["Sara Ali", "Omar Khan"]),
            &names(&["Sara A.", "Random Guest"]),
            response,
        );
        let b = report.to_buckets();
        assert_eq!(b.present, vec![Attendee::present("Sara Ali", "Sara A.")]);
        assert_eq!(b.absent, vec![Attendee::absent("Omar Khan")]);
        assert_eq!(b.unexpected, vec![Attendee::unexpected("Random Guest")]);
    }

    fn pair(name: &str, original: &str) -> MatchedPair {
        MatchedPair {
            name: name.to_string(),
            original_name: original.to_string(),
        }
    }

    #[test]
    fn matches_are_checked_against_both_lists() {
        let response = MatchResponse {
            present: vec![
                pair("Ghost Person", "Never Seen"),
                pair("Sara Ali", "Random Guest"),
                pair("Omar Khan", "Random Guest"),
            ],
            absent: vec![],
            unexpected: names(&["Random Guest"]),
        };
        let report = build_report(
            &names(&["Sara Ali", "Omar Khan"]),
            &names(&["Random Guest"]),
            response,
        );
        let b = report.to_buckets();
        assert_eq!(b.present, vec![Attendee::present("Sara Ali", "Random Guest")]);
        assert_eq!(b.absent, vec![Attendee::absent("Omar Khan")]);
        assert!(b.unexpected.is_empty());
        assert!(!report.contains("Ghost Person"));
    }

    #[test]
    fn unknown_participant_leaves_official_name_absent() {
        let response = MatchResponse {
            present: vec![pair("Sara Ali", "Sara A."), pair("Omar Khan", "")],
            absent: names(&["Someone Else"]),
            unexpected: names(&["Invented Guest"]),
        };
        let report = build_report(
            &names(&["Sara Ali", "Omar Khan"]),
            &names(&["Mona Adel"]),
            response,
        );
        let b = report.to_buckets();
        assert!(b.present.is_empty());
        assert_eq!(
            b.absent,
            vec![Attendee::absent("Sara Ali"), Attendee::absent("Omar Khan")]
        );
        // Forgotten by the answer, still accounted for.
        assert_eq!(b.unexpected, vec![Attendee::unexpected("Mona Adel")]);
    }

    #[test]
    fn official_names_from_each_source() {
        let settings = AnalysisSettings::default();
        let grid = Grid::from_text_rows(&[
            vec!["#", "Pharmacist Name"],
            vec!["1", "Sara Ali"],
            vec!["2", "Omar Khan"],
        ]);
        let from_grid = official_names(
            &OfficialSource::Grid(grid),
            &settings.locator,
            &Echo,
            &mut |_| {},
        )
        .unwrap();
        assert_eq!(from_grid, names(&["Sara Ali", "Omar Khan"]));

        let mut log: Vec<String> = Vec::new();
        let from_image = official_names(
            &OfficialSource::Image(img("Sara Ali\n Omar Khan \nSara Ali")),
            &settings.locator,
            &Echo,
            &mut |m| log.push(m.to_string()),
        )
        .unwrap();
        assert_eq!(from_image, names(&["Sara Ali", "Omar Khan"]));
        assert_eq!(
            log,
            vec![
                "Extracting names from the official roster image...",
                "Extracted 2 names from the image.",
            ]
        );

        let err = official_names(
            &OfficialSource::Names(names(&["", "  "])),
            &settings.locator,
            &Echo,
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NoNamesFound));
    }

    #[test]
    fn run_analysis_fails_on_empty_roster_image() {
        let matcher = Canned("{}", Cell::new(0));
        let err = run_analysis(
            &OfficialSource::Image(img("broken")),
            &[img("Sara A.")],
            &AnalysisSettings::default(),
            &Echo,
            &matcher,
            &mut |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, AttendanceError::NoNamesFound));
        assert_eq!(matcher.1.get(), 0);
    }
}
