//! Terminal layer for linefix: the console spinner and the results surface.

pub mod app;
pub mod spinner;
pub mod ui;

pub use app::{run_tui, TuiOutcome, TuiParams};
