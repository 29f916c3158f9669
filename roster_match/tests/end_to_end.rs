use std::cell::RefCell;

use roster_match::*;

// Replays names as if they had been read from the image.
struct ScriptedExtractor;

impl NameExtractor for ScriptedExtractor {
    fn extract(&self, request: &ExtractionRequest) -> Result<String, ExtractionFailure> {
        let bytes = request.image.decode().map_err(|e| ExtractionFailure::Failed {
            message: e.to_string(),
        })?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

// Records what it receives and delegates to the fuzzy matcher.
struct RecordingMatcher {
    calls: RefCell<Vec<(Vec<String>, Vec<String>, Sensitivity)>>,
}

impl NameMatcher for RecordingMatcher {
    fn match_names(&self, request: &MatchRequest) -> Result<String, MatchFailure> {
        self.calls.borrow_mut().push((
            request.official.to_vec(),
            request.observed.to_vec(),
            request.sensitivity,
        ));
        FuzzyMatcher::default().match_names(request)
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn screenshot(names: &str) -> ImagePayload {
    ImagePayload::from_bytes("image/png", names.as_bytes())
}

fn strings(l: &[&str]) -> Vec<String> {
    l.iter().map(|s| s.to_string()).collect()
}

#[test]
fn balanced_reconciliation_and_review() {
    init();
    let matcher = RecordingMatcher {
        calls: RefCell::new(vec![]),
    };
    let settings = AnalysisSettings {
        sensitivity: Sensitivity::Balanced,
        ..Default::default()
    };
    let draft = run_analysis(
        &OfficialSource::Names(strings(&["Sara Ali", "Omar Khan"])),
        &[screenshot("Sara A.\nRandom Guest")],
        &settings,
        &ScriptedExtractor,
        &matcher,
        &mut |_| {},
    )
    .unwrap();

    let b = draft.to_buckets();
    assert_eq!(b.present, vec![Attendee::present("Sara Ali", "Sara A.")]);
    assert_eq!(b.absent, vec![Attendee::absent("Omar Khan")]);
    assert_eq!(b.unexpected, vec![Attendee::unexpected("Random Guest")]);

    let calls = matcher.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, strings(&["Sara A.", "Random Guest"]));
    assert_eq!(calls[0].2, Sensitivity::Balanced);

    let mut session = ReviewSession::new();
    session.open_draft(draft).unwrap();
    assert!(session.reject("Sara Ali"));
    assert!(session.finalize());
    let report = session.report().unwrap();
    assert_eq!(report.count(AttendanceStatus::Present), 0);
    assert_eq!(report.count(AttendanceStatus::Absent), 2);
    assert_eq!(report.count(AttendanceStatus::Unexpected), 2);

    assert!(session.toggle_selection("Sara A."));
    assert!(session.toggle_selection("Random Guest"));
    let outcome = session.reclassify_selected(AttendanceStatus::Present, |_| true);
    assert_eq!(outcome, BulkOutcome::Applied { moved: 2 });
    let rows = session.report().unwrap().export_rows(SortOrder::Ascending);
    let cells: Vec<[&str; 3]> = rows.iter().map(|r| r.cells()).collect();
    assert_eq!(
        cells,
        vec![
            ["Random Guest", "Present", ""],
            ["Sara A.", "Present", ""],
            ["Omar Khan", "Absent", ""],
            ["Sara Ali", "Absent", ""],
        ]
    );
}

#[test]
fn empty_screenshots_fail_before_matching() {
    init();
    let matcher = RecordingMatcher {
        calls: RefCell::new(vec![]),
    };
    let err = process_attendance(
        &strings(&["A", "B"]),
        &[screenshot(""), screenshot("\n \n")],
        Sensitivity::Flexible,
        &ScriptedExtractor,
        &matcher,
        &mut |_| {},
    )
    .unwrap_err();
    assert!(matches!(err, AttendanceError::EmptyObservedSet { .. }));
    assert!(matcher.calls.borrow().is_empty());
}

#[test]
fn header_priority_on_a_pivot_sheet() {
    init();
    let grid = Grid::from_text_rows(&[
        vec!["", "", "", "", "", "", "Row Labels", "Count of Name"],
        vec!["Date", "Pharmacist Name", "City", "", "", "", "Cairo", "2"],
        vec!["2024-05-01", "Sara Ali", "Cairo", "", "", "", "Giza", "1"],
        vec!["2024-05-01", "Omar Khan", "Cairo", "", "", "", "", ""],
        vec!["2024-05-02", "Mona Adel", "Giza", "", "", "", "", ""],
    ]);
    let loc = locate_name_column(&grid, &LocatorConfig::default());
    assert_eq!(loc.column, 1);
    assert_eq!(loc.detection, Detection::PrimaryKeyword);
    assert_eq!(
        extract_names_from_grid(&grid, &LocatorConfig::default()),
        strings(&["Sara Ali", "Omar Khan", "Mona Adel"])
    );
}
