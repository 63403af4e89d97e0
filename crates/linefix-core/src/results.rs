//! Results-surface state: per-row fix state and the aggregate counters.
//!
//! Rows move `Unfixed -> Applying -> Fixed`. `Fixed` is terminal. A failed
//! application sends an `Applying` row back to `Unfixed`. Each row is
//! counted at most once, so `remaining + fixed == total` after every
//! transition regardless of duplicate acknowledgements.

use crate::finding::{EdgeCase, Finding, FindingSet};
use crate::protocol::{HostMessage, SurfaceMessage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowState {
    Unfixed,
    Applying,
    Fixed,
}

impl RowState {
    /// Label for the row's action control.
    pub fn action_label(&self) -> &'static str {
        match self {
            RowState::Unfixed => "Fix",
            RowState::Applying => "Applying...",
            RowState::Fixed => "Fixed",
        }
    }
}

/// One actionable finding as shown on the results surface.
#[derive(Debug, Clone)]
pub struct Row {
    finding: Finding,
    state: RowState,
    counted: bool,
    last_error: Option<String>,
}

impl Row {
    pub fn finding(&self) -> &Finding {
        &self.finding
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    /// Reason the most recent application failed, cleared on the next try.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The action control is only live while the row is unfixed.
    pub fn can_apply(&self) -> bool {
        self.state == RowState::Unfixed
    }
}

/// Snapshot of the progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total: usize,
    pub fixed: usize,
    pub remaining: usize,
}

/// ApplicationState plus counters for one open results surface.
#[derive(Debug, Clone)]
pub struct ResultsSession {
    rows: Vec<Row>,
    edge_cases: Vec<EdgeCase>,
    fixed: usize,
    opened_at: DateTime<Utc>,
}

impl ResultsSession {
    /// Rows are the actionable findings of the set, in set order.
    pub fn new(findings: &FindingSet) -> Self {
        let rows = findings
            .actionable()
            .cloned()
            .map(|finding| Row {
                finding,
                state: RowState::Unfixed,
                counted: false,
                last_error: None,
            })
            .collect();
        Self {
            rows,
            edge_cases: Vec::new(),
            fixed: 0,
            opened_at: Utc::now(),
        }
    }

    pub fn with_edge_cases(mut self, edge_cases: Vec<EdgeCase>) -> Self {
        self.edge_cases = edge_cases;
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn edge_cases(&self) -> &[EdgeCase] {
        &self.edge_cases
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn fixed(&self) -> usize {
        self.fixed
    }

    pub fn remaining(&self) -> usize {
        self.total() - self.fixed
    }

    pub fn counters(&self) -> Counters {
        Counters {
            total: self.total(),
            fixed: self.fixed,
            remaining: self.remaining(),
        }
    }

    /// Fraction of the progress ring to fill: `fixed / total`, or `1.0` when
    /// there is nothing to fix.
    pub fn progress(&self) -> f64 {
        if self.total() == 0 {
            1.0
        } else {
            (self.fixed as f64 / self.total() as f64).min(1.0)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// User pressed the row's action. Disables the control immediately and
    /// returns the message to dispatch, or `None` if the row is not unfixed.
    pub fn request_apply(&mut self, index: usize) -> Option<SurfaceMessage> {
        let row = self.rows.get_mut(index)?;
        if row.state != RowState::Unfixed {
            return None;
        }
        row.state = RowState::Applying;
        row.last_error = None;
        Some(SurfaceMessage::ApplyFix {
            relative_line: row.finding.relative_line(),
            fix_text: row.finding.proposed_fix().to_string(),
        })
    }

    /// Apply a host reply. Returns the index of the row it resolved to.
    ///
    /// Replies are matched to the first row on that relative line that is
    /// currently `Applying`. A reply with no such row (a duplicate or stale
    /// acknowledgement) changes nothing.
    pub fn handle(&mut self, message: &HostMessage) -> Option<usize> {
        let line = message.relative_line();
        let index = self.rows.iter().position(|row| {
            row.state == RowState::Applying && row.finding.relative_line() == line
        });
        let Some(index) = index else {
            debug!(line, "ignoring host reply with no applying row");
            return None;
        };

        match message {
            HostMessage::FixSucceeded { .. } => self.mark_fixed(index),
            HostMessage::FixFailed { reason, .. } => {
                let row = &mut self.rows[index];
                row.state = RowState::Unfixed;
                row.last_error = Some(reason.clone());
            }
        }
        Some(index)
    }

    fn mark_fixed(&mut self, index: usize) {
        let row = &mut self.rows[index];
        row.state = RowState::Fixed;
        row.last_error = None;
        if !row.counted {
            row.counted = true;
            self.fixed += 1;
        }
    }
}
