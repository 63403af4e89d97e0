//! Host-side adapters for linefix (config/auth, file documents, logging).

pub mod config;
pub mod document;
pub mod keyring;
pub mod logging;

pub use config::Config;
pub use document::FileDocument;
