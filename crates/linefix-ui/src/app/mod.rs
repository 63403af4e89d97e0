//! Results surface runtime: terminal loop, fix host thread, background
//! re-analysis and the message channel between them.

pub mod background;
pub mod host;
pub mod input;
pub mod messages;
pub mod runtime;

pub use runtime::{run_tui, TuiOutcome, TuiParams};

use host::FixHostHandle;
use linefix_core::ModelClient;
use messages::BackgroundMessage;
use std::path::Path;
use std::sync::{mpsc, Arc};

/// What the event loop needs to start background work.
pub struct RuntimeContext<'a> {
    /// File being analyzed
    pub path: &'a Path,
    /// 1-based inclusive line range, or the whole file
    pub range: Option<(usize, usize)>,
    pub client: &'a Arc<dyn ModelClient>,
    /// Channel for sending messages to the main thread
    pub tx: &'a mpsc::Sender<BackgroundMessage>,
    pub host: &'a FixHostHandle,
}
