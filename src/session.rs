pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

use log::{debug, info, warn};

use roster_match::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::session::config_reader::*;
use crate::session::io_common::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("Error opening the spreadsheet {path}: {source}"))]
    SourceRead {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Error reading the CSV file {path}: {source}"))]
    SourceReadCsv { source: csv::Error, path: String },
    #[snafu(display("The spreadsheet {path} has no sheet"))]
    EmptySpreadsheet { path: String },
    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid setting: {message}"))]
    InvalidSetting { message: String },
    #[snafu(display("Error reading the image {path}: {source}"))]
    ReadingImage {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing the Excel report {path}: {source}"))]
    WritingXlsx {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error writing the CSV report {path}: {source}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing {path}: {source}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing the report: {source}"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("The report differs from the reference {path}"))]
    ReferenceMismatch { path: String },
    #[snafu(display("{source}"))]
    Attendance { source: AttendanceError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Where the official names are read from.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RosterInput {
    Spreadsheet(String),
    Csv(String),
    Image(String),
}

/// Everything a run needs, after merging the configuration file and the
/// command line.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub roster: RosterInput,
    pub participants: Vec<String>,
    pub settings: AnalysisSettings,
    pub rejects: Vec<String>,
    pub marks: Vec<(AttendanceStatus, Vec<String>)>,
    pub auto_confirm: bool,
    pub out: Option<String>,
    pub sort: SortOrder,
    pub reference: Option<String>,
}

fn parse_setting<T: std::str::FromStr<Err = String>>(s: &str) -> SessionResult<T> {
    s.parse::<T>()
        .map_err(|message| SessionError::InvalidSetting { message })
}

fn roster_from_extension(path: &str) -> RosterInput {
    if file_extension(path) == "csv" {
        RosterInput::Csv(path.to_string())
    } else {
        RosterInput::Spreadsheet(path.to_string())
    }
}

fn roster_from_config(src: &OfficialSourceConfig, root: Option<&Path>) -> SessionResult<RosterInput> {
    let path = resolve_path(root, &src.file_path);
    match src.provider.as_str() {
        "spreadsheet" | "excel" => Ok(RosterInput::Spreadsheet(path)),
        "csv" => Ok(RosterInput::Csv(path)),
        "image" => Ok(RosterInput::Image(path)),
        x => InvalidSettingSnafu {
            message: format!("unknown official source provider {:?}", x),
        }
        .fail(),
    }
}

// CLI values replace the file values when present.
fn pick<T: Clone>(cli: &[T], file: &[T]) -> Vec<T> {
    if cli.is_empty() {
        file.to_vec()
    } else {
        cli.to_vec()
    }
}

/// Merges the configuration file (if any) with the command line.
pub fn build_plan(args: &Args) -> SessionResult<SessionPlan> {
    let (config, root) = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            let root = Path::new(path).parent().map(|p| p.to_path_buf());
            (config, root)
        }
        None => (SessionConfig::default(), None),
    };
    debug!("build_plan: config: {:?}", config);
    let root = root.as_deref();

    let roster = match (&args.roster, &args.roster_image) {
        (Some(_), Some(_)) => {
            whatever!("The official roster is either a spreadsheet (--roster) or an image (--roster-image), not both")
        }
        (Some(p), None) => roster_from_extension(p),
        (None, Some(p)) => RosterInput::Image(p.clone()),
        (None, None) => match &config.official_source {
            Some(src) => roster_from_config(src, root)?,
            None => whatever!("No official roster given. Use --roster, --roster-image or a configuration file."),
        },
    };

    let participants = if args.participants.is_empty() {
        config
            .participant_sources
            .iter()
            .map(|p| resolve_path(root, &p.file_path))
            .collect()
    } else {
        args.participants.clone()
    };

    let sensitivity = match args.sensitivity.as_ref().or(config.sensitivity.as_ref()) {
        Some(s) => parse_setting::<Sensitivity>(s)?,
        None => Sensitivity::default(),
    };
    let locator = match &config.locator {
        Some(overrides) => overrides.apply(LocatorConfig::default()),
        None => LocatorConfig::default(),
    };

    let review = config.review.clone().unwrap_or_default();
    let marks = vec![
        (
            AttendanceStatus::Present,
            pick(&args.mark_present, &review.mark_present),
        ),
        (
            AttendanceStatus::Absent,
            pick(&args.mark_absent, &review.mark_absent),
        ),
        (
            AttendanceStatus::Unexpected,
            pick(&args.mark_unexpected, &review.mark_unexpected),
        ),
    ];

    let output = config.output_settings.clone().unwrap_or_default();
    let out = match &args.out {
        Some(o) => Some(o.clone()),
        None => output.output_path.map(|p| resolve_output_path(root, &p)),
    };
    let sort = match args.sort.as_ref().or(output.sort_order.as_ref()) {
        Some(s) => parse_setting::<SortOrder>(s)?,
        None => SortOrder::default(),
    };

    Ok(SessionPlan {
        roster,
        participants,
        settings: AnalysisSettings {
            sensitivity,
            locator,
        },
        rejects: pick(&args.reject, &review.reject),
        marks,
        auto_confirm: args.yes,
        out,
        sort,
        reference: args.reference.clone(),
    })
}

fn resolve_output_path(root: Option<&Path>, path: &str) -> String {
    if path == STDOUT {
        path.to_string()
    } else {
        resolve_path(root, path)
    }
}

fn read_official_source(roster: &RosterInput) -> SessionResult<OfficialSource> {
    info!("Attempting to read the official roster {:?}", roster);
    let source = match roster {
        RosterInput::Spreadsheet(path) => OfficialSource::Grid(io_xlsx::read_roster_sheet(path)?),
        RosterInput::Csv(path) => OfficialSource::Grid(io_csv::read_roster_csv(path)?),
        RosterInput::Image(path) => OfficialSource::Image(read_payload(path)?),
    };
    Ok(source)
}

/// Asks the user on the terminal. Anything but "y" or "yes" declines.
fn confirm_on_terminal(change: &BulkChange) -> bool {
    eprint!("{} [y/N] ", change);
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            warn!("confirm_on_terminal: could not read the answer: {}", e);
            false
        }
    }
}

/// Selects the names of each group and moves them to the group status.
pub fn apply_marks<F>(
    review: &mut ReviewSession,
    marks: &[(AttendanceStatus, Vec<String>)],
    mut confirm: F,
) -> Vec<BulkOutcome>
where
    F: FnMut(&BulkChange) -> bool,
{
    let mut outcomes = Vec::new();
    for (status, names) in marks.iter() {
        if names.is_empty() {
            continue;
        }
        review.clear_selection();
        for name in names.iter() {
            if review.selection().contains(name) {
                continue;
            }
            if !review.toggle_selection(name) {
                warn!("apply_marks: {:?} is not in the report, ignoring it", name);
            }
        }
        let outcome = review.reclassify_selected(*status, &mut confirm);
        info!("apply_marks: {}: {:?}", status, outcome);
        outcomes.push(outcome);
    }
    review.clear_selection();
    outcomes
}

/// The report as JSON, grouped by status.
pub fn report_json(report: &AttendanceReport, order: SortOrder) -> SessionResult<JSValue> {
    serde_json::to_value(report.sorted_buckets(order)).context(SerializingJsonSnafu {})
}

fn summary_text(report: &AttendanceReport, order: SortOrder) -> String {
    let mut lines: Vec<String> = Vec::new();
    for status in AttendanceStatus::ALL.iter() {
        let group = report.sorted(*status, order);
        lines.push(format!("{} ({})", status, group.len()));
        for a in group {
            match (&a.status, &a.original_name) {
                (AttendanceStatus::Present, Some(o)) if o != &a.name => {
                    lines.push(format!("  {} <- {}", a.name, o))
                }
                _ => lines.push(format!("  {}", a.name)),
            }
        }
    }
    lines.join("\n")
}

fn check_reference(report_js: &JSValue, reference_path: &str) -> SessionResult<()> {
    let reference = read_summary(reference_path)?;
    let pretty_ref = serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    let pretty_report = serde_json::to_string_pretty(report_js).context(SerializingJsonSnafu {})?;
    if pretty_ref != pretty_report {
        warn!("Found differences with the reference report");
        print_diff(pretty_ref.as_str(), pretty_report.as_str(), "\n");
        return ReferenceMismatchSnafu {
            path: reference_path.to_string(),
        }
        .fail();
    }
    info!("The report matches the reference {}", reference_path);
    Ok(())
}

/// Runs a complete session: analysis, review, export.
pub fn run_plan<F>(plan: &SessionPlan, confirm: F) -> SessionResult<AttendanceReport>
where
    F: FnMut(&BulkChange) -> bool,
{
    let official = read_official_source(&plan.roster)?;
    let mut images: Vec<ImagePayload> = Vec::new();
    for path in plan.participants.iter() {
        images.push(read_payload(path)?);
    }

    let extractor = PlainTextExtractor;
    let matcher = FuzzyMatcher::default();
    let mut progress = |m: &str| {
        debug!("progress: {}", m);
        eprintln!("{}", m);
    };
    let draft = run_analysis(
        &official,
        &images,
        &plan.settings,
        &extractor,
        &matcher,
        &mut progress,
    )
    .context(AttendanceSnafu {})?;

    let mut review = ReviewSession::new();
    review.open_draft(draft).context(AttendanceSnafu {})?;
    for name in plan.rejects.iter() {
        if !review.reject(name) {
            warn!("{:?} is not a present name of the draft, cannot reject it", name);
        }
    }
    review.finalize();
    apply_marks(&mut review, &plan.marks, confirm);

    let report = match review.report() {
        Some(r) => r.clone(),
        None => whatever!("The report was not finalized"),
    };

    let report_js = report_json(&report, plan.sort)?;
    if plan.out.as_deref() != Some(STDOUT) {
        println!("{}", summary_text(&report, plan.sort));
    }
    if let Some(out) = &plan.out {
        write_report(&report, plan.sort, &report_js, out)?;
    }
    if let Some(reference) = &plan.reference {
        check_reference(&report_js, reference)?;
    }
    Ok(report)
}

fn write_report(
    report: &AttendanceReport,
    order: SortOrder,
    report_js: &JSValue,
    out: &str,
) -> SessionResult<()> {
    let pretty = serde_json::to_string_pretty(report_js).context(SerializingJsonSnafu {})?;
    if out == STDOUT {
        println!("{}", pretty);
        return Ok(());
    }
    info!("Writing the report to {:?}", out);
    match file_extension(out).as_str() {
        "xlsx" => io_xlsx::write_report_xlsx(report, order, out),
        "csv" => io_csv::write_report_csv(report, order, out),
        "json" => fs::write(out, pretty).context(WritingFileSnafu { path: out }),
        x => InvalidSettingSnafu {
            message: format!(
                "cannot write the report to {:?}: unknown format {:?} (use .xlsx, .csv or .json)",
                out, x
            ),
        }
        .fail(),
    }
}

pub fn run_session(args: &Args) -> SessionResult<()> {
    let plan = build_plan(args)?;
    info!("plan: {:?}", plan);
    if plan.auto_confirm {
        run_plan(&plan, |_| true)?;
    } else {
        run_plan(&plan, confirm_on_terminal)?;
    }
    Ok(())
}
