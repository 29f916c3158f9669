/*!

This is the long-form manual for `roster_match` and `rollcall`.

## Inputs

**The official roster** is the list of people expected to attend. It can be:
* the first sheet of a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods` or `.csv`),
* a photo of a printed list, read by a [`NameExtractor`](crate::NameExtractor),
* a list of names that was already read.

Roster sheets are rarely clean: they carry titles, row numbers, dates and
sometimes a pivot table next to the registration table. The name column is
found in this order:
1. a header cell among the first 10 rows containing a primary keyword
   (`pharmacist name`, `display name`, `اسم الصيدلي`),
2. a header cell containing a secondary keyword (`name`, `full name`, `اسم`,
   `الاسم`), unless it also contains an ignored keyword (`row labels`,
   `supervisor`, `count of`, `date`, `city`, `username`, `email`, `status`),
3. otherwise, the column whose first 20 rows look most like names. Each
   non-numeric value scores 2 points when it is longer than 8 characters,
   has at least two words and no `@`, and 1 point when it is longer than
   5 characters. Ties go to the leftmost column,
4. otherwise, the first column.

Names are trimmed, and values of 3 characters or less, numbers and
duplicates are dropped. A column at index 6 or more whose header contains
`row labels` belongs to a pivot table: it is skipped entirely and gives no
names.

**The session participants** are read from screenshots of the participant
panel of the video call. Every image goes through the extractor. An image
that cannot be read adds no names but does not stop the analysis. The
names of all the images are merged.

## Sensitivity

* `STRICT`: only near-identical names match.
* `BALANCED` (default): spelling variations, Arabic and Latin spellings of
  the same name, initials and titles (`Dr.`, `Pharmacist`, `د.`) are tolerated.
* `FLEXIBLE`: partial names and typos are matched too.

## Review

The analysis produces a draft. In the draft, a wrong match can be rejected:
the official name becomes absent and the participant name becomes
unexpected. Finalizing the draft produces the report. Names of the final
report can then be selected and moved to another status in bulk, after a
confirmation.

## Export

The report is exported with the columns `Name`, `Status` and
`Matched participant name`, present names first, then absent, then
unexpected. Supported formats: Excel (`.xlsx`), CSV (with a byte order
mark, so that spreadsheet programs read Arabic names correctly) and JSON.

## Example

```
use roster_match::*;

let roster = Grid::from_text_rows(&[
    vec!["Training day", ""],
    vec!["#", "Pharmacist Name"],
    vec!["1", "Sara Ali"],
    vec!["2", "Omar Khan"],
]);
let screenshot = ImagePayload::from_bytes("text/plain", "Sara A. (Host)\nRandom Guest".as_bytes());

let mut progress = |m: &str| println!("{}", m);
let draft = run_analysis(
    &OfficialSource::Grid(roster),
    &[screenshot],
    &AnalysisSettings::default(),
    &PlainTextExtractor,
    &FuzzyMatcher::default(),
    &mut progress,
)?;

let mut session = ReviewSession::new();
session.open_draft(draft)?;
session.finalize();
let report = session.report().unwrap();
assert_eq!(report.present()[0].original_name.as_deref(), Some("Sara A."));
assert_eq!(report.absent()[0].name, "Omar Khan");
assert_eq!(report.unexpected()[0].name, "Random Guest");
# Ok::<(), AttendanceError>(())
```

*/
