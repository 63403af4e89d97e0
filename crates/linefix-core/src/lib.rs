//! Core domain model and contracts for linefix.
//!
//! Everything here is pure: the model call and the host document are reached
//! only through the [`ModelClient`] and [`fix::DocumentEditor`] traits.

pub mod error;
pub mod finding;
pub mod fix;
pub mod prompt;
pub mod protocol;
pub mod response;
pub mod results;
pub mod selection;
pub mod session;

pub use error::{AnalysisError, FixError, SchemaViolation};
pub use finding::{EdgeCase, Finding, FindingSet, RejectedElement, Severity};
pub use fix::{apply_fix, AppliedFix, DocumentEditor, MemoryDocument};
pub use prompt::{AnalysisMode, AnalysisRequest, PostFilter};
pub use protocol::{FixHost, HostMessage, ModelClient, SurfaceMessage};
pub use results::{ResultsSession, RowState};
pub use selection::{LineSpan, Selection};
pub use session::{SessionKey, SessionOpen, SessionRegistry};
