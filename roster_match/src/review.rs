// The review workflow: a draft is corrected, finalized, then bulk-edited.

use std::collections::HashSet;
use std::fmt::Display;

use log::{debug, info};

use crate::config::AttendanceStatus;
use crate::engine::{AttendanceError, ReportFinalizedSnafu};
use crate::report::AttendanceReport;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ReviewStage {
    NoReport,
    Draft,
    Final,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum ReviewState {
    NoReport,
    Draft(AttendanceReport),
    Final(AttendanceReport),
}

/// A pending bulk reclassification, shown to the confirmation gate.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BulkChange {
    pub selected: usize,
    pub target: AttendanceStatus,
}

impl Display for BulkChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The status of {} names will be changed to \"{}\". Are you sure?",
            self.selected, self.target
        )
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BulkOutcome {
    /// Bulk edits only apply to a finalized report.
    NotFinal,
    /// The selection was empty; the gate was not consulted.
    NothingSelected,
    /// The gate refused; nothing changed.
    Declined,
    Applied { moved: usize },
}

/// The state of one review session.
///
/// `NoReport -> Draft -> Final`. A finalized report only goes back to
/// `NoReport` through [`ReviewSession::reset`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ReviewSession {
    state: ReviewState,
    selection: HashSet<String>,
}

impl Default for ReviewSession {
    fn default() -> ReviewSession {
        ReviewSession {
            state: ReviewState::NoReport,
            selection: HashSet::new(),
        }
    }
}

impl ReviewSession {
    pub fn new() -> ReviewSession {
        ReviewSession::default()
    }

    pub fn stage(&self) -> ReviewStage {
        match self.state {
            ReviewState::NoReport => ReviewStage::NoReport,
            ReviewState::Draft(_) => ReviewStage::Draft,
            ReviewState::Final(_) => ReviewStage::Final,
        }
    }

    /// Starts the review of a fresh analysis result. A previous draft is
    /// replaced.
    pub fn open_draft(&mut self, report: AttendanceReport) -> Result<(), AttendanceError> {
        if let ReviewState::Final(_) = self.state {
            return ReportFinalizedSnafu {}.fail();
        }
        debug!("open_draft: {} attendees", report.len());
        self.state = ReviewState::Draft(report);
        Ok(())
    }

    /// Drops the draft without finalizing it.
    pub fn discard_draft(&mut self) -> bool {
        if let ReviewState::Draft(_) = self.state {
            self.state = ReviewState::NoReport;
            true
        } else {
            false
        }
    }

    pub fn draft(&self) -> Option<&AttendanceReport> {
        match &self.state {
            ReviewState::Draft(r) => Some(r),
            _ => None,
        }
    }

    /// The finalized report.
    pub fn report(&self) -> Option<&AttendanceReport> {
        match &self.state {
            ReviewState::Final(r) => Some(r),
            _ => None,
        }
    }

    /// Rejects the match of a PRESENT record of the draft.
    ///
    /// Returns false when there is no draft or no such PRESENT record.
    pub fn reject(&mut self, name: &str) -> bool {
        match &mut self.state {
            ReviewState::Draft(r) => r.reject_match(name),
            _ => false,
        }
    }

    /// Turns the draft into the final report. Without a draft, nothing happens.
    pub fn finalize(&mut self) -> bool {
        match std::mem::replace(&mut self.state, ReviewState::NoReport) {
            ReviewState::Draft(r) => {
                info!(
                    "finalize: {} present, {} absent, {} unexpected",
                    r.count(AttendanceStatus::Present),
                    r.count(AttendanceStatus::Absent),
                    r.count(AttendanceStatus::Unexpected)
                );
                self.state = ReviewState::Final(r);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Adds or removes a name from the selection. Returns whether the name
    /// is selected afterwards. Only names of the final report can be selected.
    pub fn toggle_selection(&mut self, name: &str) -> bool {
        let known = self.report().map(|r| r.contains(name)).unwrap_or(false);
        if !known {
            return false;
        }
        if self.selection.remove(name) {
            false
        } else {
            self.selection.insert(name.to_string());
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &HashSet<String> {
        &self.selection
    }

    /// Moves every selected record to the target status, once the gate has
    /// agreed to the change. The selection is cleared when the change is applied.
    pub fn reclassify_selected<F>(&mut self, target: AttendanceStatus, confirm: F) -> BulkOutcome
    where
        F: FnOnce(&BulkChange) -> bool,
    {
        let report = match &mut self.state {
            ReviewState::Final(r) => r,
            _ => return BulkOutcome::NotFinal,
        };
        if self.selection.is_empty() {
            return BulkOutcome::NothingSelected;
        }
        let change = BulkChange {
            selected: self.selection.len(),
            target,
        };
        if !confirm(&change) {
            debug!("reclassify_selected: declined: {}", change);
            return BulkOutcome::Declined;
        }
        let moved = report.reclassify(&self.selection, target);
        info!("reclassify_selected: {} names moved to {}", moved, target);
        self.selection.clear();
        BulkOutcome::Applied { moved }
    }

    /// Back to an empty session.
    pub fn reset(&mut self) {
        self.state = ReviewState::NoReport;
        self.selection.clear();
    }
}
