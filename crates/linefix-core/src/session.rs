//! Open results surfaces, one per analyzed region.
//!
//! Re-analyzing the same region replaces the previous session and reports it
//! as refocused, so two surfaces never track the same lines.

use crate::results::ResultsSession;
use crate::selection::Selection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub document: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
}

impl SessionKey {
    pub fn new(document: impl Into<PathBuf>, start_line: usize, end_line: usize) -> Self {
        Self {
            document: document.into(),
            start_line,
            end_line,
        }
    }

    pub fn for_selection(document: &Path, selection: &Selection) -> Self {
        Self::new(document, selection.start_line(), selection.end_line())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOpen {
    Opened,
    Refocused,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionKey, ResultsSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_or_replace(&mut self, key: SessionKey, session: ResultsSession) -> SessionOpen {
        let outcome = match self.sessions.insert(key.clone(), session) {
            Some(_) => SessionOpen::Refocused,
            None => SessionOpen::Opened,
        };
        debug!(document = %key.document.display(), start = key.start_line, end = key.end_line, ?outcome, "results session");
        outcome
    }

    pub fn get(&self, key: &SessionKey) -> Option<&ResultsSession> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut ResultsSession> {
        self.sessions.get_mut(key)
    }

    pub fn is_open(&self, key: &SessionKey) -> bool {
        self.sessions.contains_key(key)
    }

    /// Dispose of a session. Later host replies for it have nowhere to land.
    pub fn close(&mut self, key: &SessionKey) -> Option<ResultsSession> {
        self.sessions.remove(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
