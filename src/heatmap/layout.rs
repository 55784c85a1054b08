//! Cell geometry and margins of the heatmap scene.
//!
//! Scene coordinates put the scene's top-left corner at the origin; the grid
//! starts at `(margins.left, margins.top)`.

use serde::{Deserialize, Serialize};

use super::geom::{Point, Rect, Size};
use super::matrix::MatrixDims;

/// Smallest cell edge that still leaves room for a legible label.
pub const DEFAULT_MIN_CELL_SIZE: f32 = 12.0;

/// Space reserved around the grid for labels and the legend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const ZERO: Margins = Margins {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

impl Default for Margins {
    /// Sized for rotated sample labels above and long gene names on the left.
    fn default() -> Self {
        Self {
            top: 200.0,
            right: 100.0,
            bottom: 80.0,
            left: 250.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub min_cell_size: f32,
    pub margins: Margins,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            min_cell_size: DEFAULT_MIN_CELL_SIZE,
            margins: Margins::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub dims: MatrixDims,
    pub cell_width: f32,
    pub cell_height: f32,
    pub margins: Margins,
    pub grid_width: f32,
    pub grid_height: f32,
    pub scene_width: f32,
    pub scene_height: f32,
}

/// Grid budget left inside a container once the margins are reserved.
pub fn grid_budget(container: Size, margins: &Margins) -> Size {
    Size::new(
        (container.width - margins.horizontal()).max(0.0),
        (container.height - margins.vertical()).max(0.0),
    )
}

/// Size cells to fill `budget`, never going below the minimum cell size.
/// Large matrices therefore produce a scene larger than the budget.
pub fn compute_geometry(dims: MatrixDims, budget: Size, options: &LayoutOptions) -> CellGeometry {
    let floor = options.min_cell_size.max(f32::MIN_POSITIVE);

    if dims.is_empty() {
        return CellGeometry {
            dims,
            cell_width: floor,
            cell_height: floor,
            margins: Margins::ZERO,
            grid_width: 0.0,
            grid_height: 0.0,
            scene_width: 0.0,
            scene_height: 0.0,
        };
    }

    let cell_width = (budget.width / dims.cols as f32).max(floor);
    let cell_height = (budget.height / dims.rows as f32).max(floor);
    let grid_width = cell_width * dims.cols as f32;
    let grid_height = cell_height * dims.rows as f32;
    let margins = options.margins;

    CellGeometry {
        dims,
        cell_width,
        cell_height,
        margins,
        grid_width,
        grid_height,
        scene_width: margins.horizontal() + grid_width,
        scene_height: margins.vertical() + grid_height,
    }
}

impl CellGeometry {
    pub fn scene_size(&self) -> Size {
        Size::new(self.scene_width, self.scene_height)
    }

    pub fn grid_origin(&self) -> Point {
        Point::new(self.margins.left, self.margins.top)
    }

    pub fn grid_rect(&self) -> Rect {
        Rect::new(
            self.margins.left,
            self.margins.top,
            self.grid_width,
            self.grid_height,
        )
    }

    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        Rect::new(
            self.margins.left + col as f32 * self.cell_width,
            self.margins.top + row as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// (row, col) of the cell containing a scene point, if any.
    pub fn cell_at(&self, p: Point) -> Option<(usize, usize)> {
        if self.dims.is_empty() || !self.grid_rect().contains(p) {
            return None;
        }
        let col = ((p.x - self.margins.left) / self.cell_width).floor() as usize;
        let row = ((p.y - self.margins.top) / self.cell_height).floor() as usize;
        // Guard against rounding right at the far edge.
        (row < self.dims.rows && col < self.dims.cols).then_some((row, col))
    }

    /// Font size for gene labels.
    pub fn gene_label_size(&self) -> f32 {
        (self.cell_height * 0.9).min(14.0)
    }

    /// Font size for sample labels.
    pub fn sample_label_size(&self) -> f32 {
        (self.cell_width * 0.9).min(14.0)
    }
}
