//! Clustered heatmap engine: geometry, color, viewport and scene building.
//!
//! Nothing in here knows about egui; the app paints the scene description.

pub mod color;
pub mod geom;
pub mod layout;
pub mod legend;
pub mod matrix;
pub mod scene;
pub mod svg;
pub mod tooltip;
pub mod viewport;

pub use color::{ColorDomain, ColorScale, Rgb};
pub use geom::{Point, Rect, Size};
pub use layout::{CellGeometry, LayoutOptions, Margins};
pub use legend::LegendOptions;
pub use matrix::ClusteredMatrix;
pub use scene::{LabelPrimitive, RenderOptions, Renderer, Scene, SceneDescription, TextAnchor};
pub use tooltip::{CellInfo, TooltipController};
pub use viewport::{GestureEvent, InteractionState, ScaleLimits, ViewTransform, ViewportTransform};
