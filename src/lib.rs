//! Clustered expression heatmap: ingestion, layout, color mapping, viewport
//! and scene building, plus the fetch boundary and viewer configuration.

pub mod config;
pub mod error;
pub mod fetch;
pub mod heatmap;
