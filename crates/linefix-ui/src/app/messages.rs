use linefix_core::HostMessage;
use linefix_engine::AnalysisReport;

/// Messages from the fix host and background tasks to the main UI thread.
pub enum BackgroundMessage {
    /// Reply to an apply request
    Host(HostMessage),
    /// A re-analysis finished (successfully or not)
    AnalysisReady(Box<AnalysisReport>),
    /// Background task failure
    Error(String),
}
