//! Chart annotation for a trading journal.
//!
//! Users draw POI boxes, BOS lines and circles over a trade's chart image.
//! Shapes live in canvas space while drawing and are persisted in the chart
//! image's native pixel space regardless of zoom or pan.

pub mod client;
pub mod config;
pub mod drawing;
pub mod error;
pub mod inference;
pub mod memory;
pub mod overlay;
pub mod persistence;
pub mod render;
pub mod shapes;
pub mod state;
pub mod transform;

pub use error::{AnnotatorError, AnnotatorResult};
