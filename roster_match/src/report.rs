use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{AttendanceStatus, Attendee, SortOrder};
use crate::normalize::compare_names;

/// Name given to the UNEXPECTED record of a rejected match that had no
/// observed name.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown participant";

pub const EXPORT_HEADER: [&str; 3] = ["Name", "Status", "Matched participant name"];

/// The attendance report.
///
/// A flat collection where each record carries its own status: a name can
/// never sit in two buckets at once. Names are unique across the report.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AttendanceReport {
    attendees: Vec<Attendee>,
}

/// The report grouped by status, as exported in JSON.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReportBuckets {
    pub present: Vec<Attendee>,
    pub absent: Vec<Attendee>,
    pub unexpected: Vec<Attendee>,
}

impl ReportBuckets {
    pub fn len(&self) -> usize {
        self.present.len() + self.absent.len() + self.unexpected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExportRow {
    pub name: String,
    pub status: AttendanceStatus,
    /// Only filled for PRESENT records.
    pub matched_name: String,
}

impl ExportRow {
    pub fn cells(&self) -> [&str; 3] {
        [
            self.name.as_str(),
            self.status.label(),
            self.matched_name.as_str(),
        ]
    }
}

impl AttendanceReport {
    pub fn new() -> AttendanceReport {
        AttendanceReport::default()
    }

    /// Adds a record. Returns false (and leaves the report unchanged) if the
    /// name is already present.
    pub fn insert(&mut self, attendee: Attendee) -> bool {
        if self.contains(&attendee.name) {
            return false;
        }
        self.attendees.push(attendee);
        true
    }

    /// Rebuilds a report from grouped records. Later duplicates are dropped.
    pub fn from_buckets(buckets: ReportBuckets) -> AttendanceReport {
        let mut res = AttendanceReport::new();
        let all = buckets
            .present
            .into_iter()
            .chain(buckets.absent)
            .chain(buckets.unexpected);
        for a in all {
            let name = a.name.clone();
            if !res.insert(a) {
                warn!("from_buckets: duplicate name {:?} dropped", name);
            }
        }
        res
    }

    /// All the records, in insertion order.
    pub fn attendees(&self) -> &[Attendee] {
        &self.attendees
    }

    pub fn get(&self, name: &str) -> Option<&Attendee> {
        self.attendees.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attendees.is_empty()
    }

    pub fn bucket(&self, status: AttendanceStatus) -> Vec<&Attendee> {
        self.attendees
            .iter()
            .filter(|a| a.status == status)
            .collect()
    }

    pub fn present(&self) -> Vec<&Attendee> {
        self.bucket(AttendanceStatus::Present)
    }

    pub fn absent(&self) -> Vec<&Attendee> {
        self.bucket(AttendanceStatus::Absent)
    }

    pub fn unexpected(&self) -> Vec<&Attendee> {
        self.bucket(AttendanceStatus::Unexpected)
    }

    pub fn count(&self, status: AttendanceStatus) -> usize {
        self.attendees.iter().filter(|a| a.status == status).count()
    }

    /// One bucket in display order.
    pub fn sorted(&self, status: AttendanceStatus, order: SortOrder) -> Vec<&Attendee> {
        let mut res = self.bucket(status);
        res.sort_by(|a, b| {
            let o = compare_names(&a.name, &b.name);
            match order {
                SortOrder::Ascending => o,
                SortOrder::Descending => o.reverse(),
            }
        });
        res
    }

    /// Records whose name or matched name contains the term, ignoring case.
    /// An empty term matches everything.
    pub fn filter(&self, term: &str) -> Vec<&Attendee> {
        let term = term.trim().to_lowercase();
        self.attendees
            .iter()
            .filter(|a| {
                term.is_empty()
                    || a.name.to_lowercase().contains(&term)
                    || a
                        .original_name
                        .as_ref()
                        .map(|o| o.to_lowercase().contains(&term))
                        .unwrap_or(false)
            })
            .collect()
    }

    pub fn to_buckets(&self) -> ReportBuckets {
        let take = |status| -> Vec<Attendee> { self.bucket(status).into_iter().cloned().collect() };
        ReportBuckets {
            present: take(AttendanceStatus::Present),
            absent: take(AttendanceStatus::Absent),
            unexpected: take(AttendanceStatus::Unexpected),
        }
    }

    pub fn sorted_buckets(&self, order: SortOrder) -> ReportBuckets {
        let take = |status| -> Vec<Attendee> {
            self.sorted(status, order).into_iter().cloned().collect()
        };
        ReportBuckets {
            present: take(AttendanceStatus::Present),
            absent: take(AttendanceStatus::Absent),
            unexpected: take(AttendanceStatus::Unexpected),
        }
    }

    /// The rows of an exported report: present, then absent, then
    /// unexpected, each group in display order.
    pub fn export_rows(&self, order: SortOrder) -> Vec<ExportRow> {
        AttendanceStatus::ALL
            .iter()
            .flat_map(|status| self.sorted(*status, order))
            .map(|a| ExportRow {
                name: a.name.clone(),
                status: a.status,
                matched_name: match a.status {
                    AttendanceStatus::Present => a.original_name.clone().unwrap_or_default(),
                    _ => "".to_string(),
                },
            })
            .collect()
    }

    /// Undoes the match of a PRESENT record: the official name becomes
    /// ABSENT, the observed name it was matched with becomes UNEXPECTED.
    ///
    /// Returns false if the name is not a PRESENT record.
    pub(crate) fn reject_match(&mut self, name: &str) -> bool {
        let idx = match self
            .attendees
            .iter()
            .position(|a| a.name == name && a.status == AttendanceStatus::Present)
        {
            Some(idx) => idx,
            None => return false,
        };
        let rejected = self.attendees.remove(idx);
        let observed = rejected
            .original_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_PARTICIPANT.to_string());
        debug!("reject_match: {:?} (matched {:?})", rejected.name, observed);
        self.attendees.push(Attendee::absent(&rejected.name));
        if !self.insert(Attendee::unexpected(&observed)) {
            // The official name and the observed one are identical, or the
            // observed name is already listed: the ABSENT record wins.
            warn!(
                "reject_match: {:?} is already in the report, no unexpected record added",
                observed
            );
        }
        true
    }

    /// Moves the selected records to the target status and to the end of
    /// the report. Returns the number of records moved.
    pub(crate) fn reclassify(&mut self, selected: &HashSet<String>, target: AttendanceStatus) -> usize {
        let (mut moved, remaining): (Vec<Attendee>, Vec<Attendee>) = self
            .attendees
            .drain(..)
            .partition(|a| selected.contains(&a.name));
        for a in moved.iter_mut() {
            a.status = target;
        }
        let count = moved.len();
        self.attendees = remaining;
        self.attendees.extend(moved);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AttendanceReport {
        AttendanceReport::from_buckets(ReportBuckets {
            present: vec![Attendee::present("Sara Ali", "Sara A.")],
            absent: vec![Attendee::absent("Omar Khan"), Attendee::absent("ahmed Nabil")],
            unexpected: vec![Attendee::unexpected("Random Guest")],
        })
    }

    #[test]
    fn buckets_and_counts() {
        let r = sample();
        assert_eq!(r.len(), 4);
        assert_eq!(r.count(AttendanceStatus::Absent), 2);
        assert_eq!(r.present()[0].original_name.as_deref(), Some("Sara A."));
        assert_eq!(r.to_buckets().len(), 4);
    }

    #[test]
    fn names_are_unique() {
        let mut r = sample();
        assert!(!r.insert(Attendee::unexpected("Omar Khan")));
        assert_eq!(r.get("Omar Khan").unwrap().status, AttendanceStatus::Absent);
        let dup = AttendanceReport::from_buckets(ReportBuckets {
            present: vec![Attendee::present("Sara Ali", "Sara A.")],
            absent: vec![Attendee::absent("Sara Ali")],
            unexpected: vec![],
        });
        assert_eq!(dup.len(), 1);
        assert_eq!(dup.get("Sara Ali").unwrap().status, AttendanceStatus::Present);
    }

    #[test]
    fn sorting_is_case_insensitive() {
        let r = sample();
        let asc: Vec<&str> = r
            .sorted(AttendanceStatus::Absent, SortOrder::Ascending)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(asc, vec!["ahmed Nabil", "Omar Khan"]);
        let desc: Vec<&str> = r
            .sorted(AttendanceStatus::Absent, SortOrder::Descending)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(desc, vec!["Omar Khan", "ahmed Nabil"]);
    }

    #[test]
    fn filter_looks_at_both_names() {
        let r = sample();
        assert_eq!(r.filter("sara a.").len(), 1);
        assert_eq!(r.filter("KHAN")[0].name, "Omar Khan");
        assert_eq!(r.filter("  ").len(), 4);
        assert!(r.filter("nobody").is_empty());
    }

    #[test]
    fn reject_moves_both_names() {
        let mut r = sample();
        assert!(r.reject_match("Sara Ali"));
        assert_eq!(r.get("Sara Ali").unwrap().status, AttendanceStatus::Absent);
        assert_eq!(r.get("Sara A.").unwrap().status, AttendanceStatus::Unexpected);
        assert_eq!(r.len(), 5);
        assert!(!r.reject_match("Sara Ali"));
        assert!(!r.reject_match("Omar Khan"));
    }

    #[test]
    fn reject_without_observed_name() {
        let mut r = AttendanceReport::new();
        r.insert(Attendee {
            name: "Mona Adel".to_string(),
            status: AttendanceStatus::Present,
            original_name: None,
        });
        assert!(r.reject_match("Mona Adel"));
        assert_eq!(
            r.get(UNKNOWN_PARTICIPANT).unwrap().status,
            AttendanceStatus::Unexpected
        );
    }

    #[test]
    fn reject_of_identical_names_keeps_absent() {
        let mut r = AttendanceReport::new();
        r.insert(Attendee::present("Mona Adel", "Mona Adel"));
        assert!(r.reject_match("Mona Adel"));
        assert_eq!(r.len(), 1);
        assert_eq!(r.get("Mona Adel").unwrap().status, AttendanceStatus::Absent);
    }

    #[test]
    fn reclassify_keeps_original_name() {
        let mut r = sample();
        let sel: HashSet<String> = ["Sara Ali", "Random Guest", "Not there"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(r.reclassify(&sel, AttendanceStatus::Absent), 2);
        assert_eq!(r.count(AttendanceStatus::Absent), 4);
        assert_eq!(r.count(AttendanceStatus::Present), 0);
        assert_eq!(
            r.get("Sara Ali").unwrap().original_name.as_deref(),
            Some("Sara A.")
        );
        assert_eq!(r.attendees().last().unwrap().name, "Random Guest");
    }

    #[test]
    fn export_rows_follow_group_order() {
        let r = sample();
        let rows = r.export_rows(SortOrder::Ascending);
        let cells: Vec<[&str; 3]> = rows.iter().map(|r| r.cells()).collect();
        assert_eq!(
            cells,
            vec![
                ["Sara Ali", "Present", "Sara A."],
                ["ahmed Nabil", "Absent", ""],
                ["Omar Khan", "Absent", ""],
                ["Random Guest", "Unexpected", ""],
            ]
        );
    }

    #[test]
    fn buckets_json() {
        let js = serde_json::to_value(sample().sorted_buckets(SortOrder::Ascending)).unwrap();
        assert_eq!(js["present"][0]["originalName"], "Sara A.");
        assert_eq!(js["absent"][0]["name"], "ahmed Nabil");
        assert_eq!(js["unexpected"][0]["status"], "UNEXPECTED");
    }
}
