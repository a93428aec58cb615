//! State management types for the annotator.
//!
//! This module contains the per-page session context shared by the
//! annotate and teach pages.

mod session;

pub use session::*;
