//! Hover resolution: screen point → cell → tooltip content.

use super::geom::Point;
use super::layout::CellGeometry;
use super::matrix::ClusteredMatrix;
use super::viewport::ViewTransform;

/// Offset of the tooltip overlay from the pointer, in screen pixels.
pub const TOOLTIP_OFFSET: (f32, f32) = (15.0, -15.0);

#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub row: usize,
    pub col: usize,
    pub gene: String,
    pub sample: String,
    pub value: Option<f32>,
}

impl CellInfo {
    /// Two decimals, or "no data" for an absent value.
    pub fn value_text(&self) -> String {
        match self.value {
            Some(v) => format!("{v:.2}"),
            None => "no data".to_string(),
        }
    }
}

/// Resolve a screen point to the cell under it, if any.
pub fn resolve_cell(
    screen: Point,
    matrix: &ClusteredMatrix,
    geometry: &CellGeometry,
    transform: &ViewTransform,
) -> Option<CellInfo> {
    let scene = transform.invert(screen);
    let (row, col) = geometry.cell_at(scene)?;
    Some(CellInfo {
        row,
        col,
        gene: matrix.genes().get(row)?.clone(),
        sample: matrix.samples().get(col)?.clone(),
        value: matrix.value(row, col),
    })
}

/// Tracks the hovered cell and where its overlay should sit.
#[derive(Debug, Default)]
pub struct TooltipController {
    current: Option<CellInfo>,
    anchor: Option<Point>,
}

impl TooltipController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from a pointer position. Outside the grid the overlay is hidden.
    pub fn on_hover(
        &mut self,
        screen: Point,
        matrix: &ClusteredMatrix,
        geometry: &CellGeometry,
        transform: &ViewTransform,
    ) -> Option<&CellInfo> {
        match resolve_cell(screen, matrix, geometry, transform) {
            Some(info) => {
                if self.current.as_ref().map(|c| (c.row, c.col)) != Some((info.row, info.col)) {
                    tracing::trace!(row = info.row, col = info.col, "tooltip target changed");
                }
                self.current = Some(info);
                self.anchor = Some(screen.offset(TOOLTIP_OFFSET.0, TOOLTIP_OFFSET.1));
            }
            None => self.on_leave(),
        }
        self.current.as_ref()
    }

    /// Pointer left the heatmap: drop the overlay immediately.
    pub fn on_leave(&mut self) {
        self.current = None;
        self.anchor = None;
    }

    pub fn current(&self) -> Option<&CellInfo> {
        self.current.as_ref()
    }

    /// Top-left corner of the overlay in screen space.
    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }
}
