use clap::Parser;

/// Reconciles an official roster with the participants of a video call session.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the session: roster, participant screenshots,
    /// sensitivity, review actions and output. The other options override its content.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The official roster as a spreadsheet (xlsx, xlsm, xls, ods) or a CSV file.
    /// Only the first sheet is read.
    #[clap(long, value_parser)]
    pub roster: Option<String>,

    /// (file path) The official roster as a photo or a text export of a printed list.
    /// Cannot be combined with --roster.
    #[clap(long, value_parser)]
    pub roster_image: Option<String>,

    /// (file paths) Screenshots (or text exports) of the participant list of the session.
    /// May be repeated.
    #[clap(short, long, value_parser, multiple_occurrences = true)]
    pub participants: Vec<String>,

    /// (strict, balanced or flexible, default balanced) How aggressively names are matched.
    #[clap(short, long, value_parser)]
    pub sensitivity: Option<String>,

    /// (official name) Rejects the match of this official name before the report is finalized.
    /// May be repeated.
    #[clap(long, value_parser, multiple_occurrences = true)]
    pub reject: Vec<String>,

    /// (name) Marks this name as present in the final report. May be repeated.
    #[clap(long, value_parser, multiple_occurrences = true)]
    pub mark_present: Vec<String>,

    /// (name) Marks this name as absent in the final report. May be repeated.
    #[clap(long, value_parser, multiple_occurrences = true)]
    pub mark_absent: Vec<String>,

    /// (name) Marks this name as unexpected in the final report. May be repeated.
    #[clap(long, value_parser, multiple_occurrences = true)]
    pub mark_unexpected: Vec<String>,

    /// If passed as an argument, bulk status changes are applied without asking for a confirmation.
    #[clap(short, long, takes_value = false)]
    pub yes: bool,

    /// (file path, 'stdout' or empty) Where the report is written. The format follows the
    /// extension: .xlsx, .csv or .json. 'stdout' prints the report in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (asc or desc, default asc) The order of the names within each status.
    #[clap(long, value_parser)]
    pub sort: Option<String>,

    /// (file path) A reference report in JSON format. If provided, rollcall checks that the
    /// report matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
