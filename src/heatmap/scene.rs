//! Declarative scene description and the renderer that caches it.
//!
//! The scene is built in scene coordinates and depends only on the matrix and
//! the container size. Zooming and panning reuse the cached scene and only
//! swap the transform attached to the returned [`SceneDescription`].

use std::sync::Arc;

use super::color::{ColorScale, Rgb};
use super::geom::{Point, Rect, Size};
use super::layout::{CellGeometry, LayoutOptions, compute_geometry, grid_budget};
use super::legend::{Legend, LegendOptions, build_legend};
use super::matrix::ClusteredMatrix;
use super::viewport::ViewTransform;

pub const CELL_STROKE_WIDTH: f32 = 0.5;
pub const CELL_STROKE_COLOR: Rgb = Rgb::new(255, 255, 255);
/// Gap between the grid edge and its labels.
pub const LABEL_GAP: f32 = 10.0;
pub const SAMPLE_LABEL_ROTATION_DEG: f32 = -45.0;
pub const LEGEND_SIZE: Size = Size::new(300.0, 30.0);
/// Distance between the legend's right edge and the grid's right edge.
const LEGEND_RIGHT_INSET: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Text starts at the position.
    Start,
    /// Text ends at the position.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPrimitive {
    pub row: usize,
    pub col: usize,
    pub rect: Rect,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelPrimitive {
    pub text: String,
    pub position: Point,
    pub font_size: f32,
    /// Clockwise-negative rotation about `position`, in degrees.
    pub rotation_deg: f32,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendPrimitive {
    /// Gradient bar; ticks hang below it and the title sits above it.
    pub rect: Rect,
    pub legend: Legend,
}

impl LegendPrimitive {
    /// Scene x coordinate of a legend fraction in [0, 1].
    pub fn x_at(&self, fraction: f32) -> f32 {
        self.rect.min.x + fraction * self.rect.size.width
    }
}

/// Everything needed to draw one matrix at one container size.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub geometry: CellGeometry,
    pub cells: Vec<CellPrimitive>,
    pub gene_labels: Vec<LabelPrimitive>,
    pub sample_labels: Vec<LabelPrimitive>,
    pub legend: Option<LegendPrimitive>,
}

impl Scene {
    pub fn size(&self) -> Size {
        self.geometry.scene_size()
    }

    pub fn primitive_count(&self) -> usize {
        self.cells.len()
            + self.gene_labels.len()
            + self.sample_labels.len()
            + usize::from(self.legend.is_some())
    }
}

/// A cached scene together with the transform to draw it through.
#[derive(Debug, Clone, Copy)]
pub struct SceneDescription<'a> {
    pub scene: &'a Scene,
    pub transform: ViewTransform,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderOptions {
    pub layout: LayoutOptions,
    pub scale: ColorScale,
    pub legend: LegendOptions,
}

/// Build the scene for `matrix` laid out with `geometry`.
pub fn build_scene(
    matrix: &ClusteredMatrix,
    geometry: CellGeometry,
    options: &RenderOptions,
) -> Scene {
    let dims = matrix.dims();
    if dims.is_empty() {
        return Scene {
            geometry,
            cells: Vec::new(),
            gene_labels: Vec::new(),
            sample_labels: Vec::new(),
            legend: None,
        };
    }

    let mut cells = Vec::with_capacity(dims.rows * dims.cols);
    for row in 0..dims.rows {
        for col in 0..dims.cols {
            cells.push(CellPrimitive {
                row,
                col,
                rect: geometry.cell_rect(row, col),
                color: options.scale.color_for(matrix.value(row, col)),
            });
        }
    }

    let origin = geometry.grid_origin();

    let gene_size = geometry.gene_label_size();
    let gene_labels = matrix
        .genes()
        .iter()
        .enumerate()
        .map(|(row, gene)| LabelPrimitive {
            text: gene.clone(),
            position: Point::new(
                origin.x - LABEL_GAP,
                origin.y + (row as f32 + 0.5) * geometry.cell_height,
            ),
            font_size: gene_size,
            rotation_deg: 0.0,
            anchor: TextAnchor::End,
        })
        .collect();

    let sample_size = geometry.sample_label_size();
    let sample_labels = matrix
        .samples()
        .iter()
        .enumerate()
        .map(|(col, sample)| LabelPrimitive {
            text: sample.clone(),
            position: Point::new(
                origin.x + (col as f32 + 0.5) * geometry.cell_width,
                origin.y - LABEL_GAP,
            ),
            font_size: sample_size,
            rotation_deg: SAMPLE_LABEL_ROTATION_DEG,
            anchor: TextAnchor::Start,
        })
        .collect();

    let legend_x =
        (origin.x + geometry.grid_width - LEGEND_SIZE.width - LEGEND_RIGHT_INSET).max(0.0);
    let legend = LegendPrimitive {
        rect: Rect {
            min: Point::new(legend_x, geometry.margins.top / 2.0),
            size: LEGEND_SIZE,
        },
        legend: build_legend(options.scale.domain(), &options.scale, &options.legend),
    };

    Scene {
        geometry,
        cells,
        gene_labels,
        sample_labels,
        legend: Some(legend),
    }
}

struct CachedScene {
    matrix: Arc<ClusteredMatrix>,
    container: Size,
    scene: Scene,
}

/// Produces scene descriptions, rebuilding geometry only when the matrix or
/// the container size changes.
pub struct Renderer {
    options: RenderOptions,
    cache: Option<CachedScene>,
    rebuilds: usize,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            cache: None,
            rebuilds: 0,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// How many times the scene has been (re)built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    pub fn geometry(&self) -> Option<&CellGeometry> {
        self.cache.as_ref().map(|c| &c.scene.geometry)
    }

    /// Forget the cached scene, e.g. when the matrix is discarded.
    pub fn clear(&mut self) {
        self.cache = None;
    }

    pub fn render(
        &mut self,
        matrix: &Arc<ClusteredMatrix>,
        container: Size,
        transform: ViewTransform,
    ) -> SceneDescription<'_> {
        let stale = match &self.cache {
            Some(c) => !Arc::ptr_eq(&c.matrix, matrix) || c.container != container,
            None => true,
        };
        if stale {
            self.cache = None;
        }

        let options = &self.options;
        let rebuilds = &mut self.rebuilds;
        let cached = self.cache.get_or_insert_with(|| {
            let budget = grid_budget(container, &options.layout.margins);
            let geometry = compute_geometry(matrix.dims(), budget, &options.layout);
            tracing::debug!(
                rows = geometry.dims.rows,
                cols = geometry.dims.cols,
                cell_width = geometry.cell_width,
                cell_height = geometry.cell_height,
                "recomputed heatmap geometry"
            );
            *rebuilds += 1;
            CachedScene {
                matrix: Arc::clone(matrix),
                container,
                scene: build_scene(matrix, geometry, options),
            }
        });

        let scene = &cached.scene;
        SceneDescription { scene, transform }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::color::{MIDPOINT_COLOR, NO_DATA_COLOR};
    use crate::heatmap::tooltip::resolve_cell;

    fn matrix(json: &str) -> Arc<ClusteredMatrix> {
        Arc::new(ClusteredMatrix::from_json(json).unwrap())
    }

    fn scenario() -> Arc<ClusteredMatrix> {
        matrix(
            r#"{
                "genes": ["G1", "G2"],
                "samples": ["S1", "S2"],
                "expression_data": [[2.0, -2.0], [0.0, null]]
            }"#,
        )
    }

    fn cell(scene: &Scene, row: usize, col: usize) -> &CellPrimitive {
        scene
            .cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .unwrap()
    }

    #[test]
    fn test_scenario_colors() {
        let m = scenario();
        let mut renderer = Renderer::new(RenderOptions::default());
        let desc = renderer.render(&m, Size::new(1200.0, 900.0), ViewTransform::default());
        let scene = desc.scene;

        assert_eq!(scene.cells.len(), 4);
        assert_eq!(cell(scene, 0, 0).color, Rgb::from_hex(0x67001f));
        assert_eq!(cell(scene, 0, 1).color, Rgb::from_hex(0x053061));
        assert_eq!(cell(scene, 1, 0).color, MIDPOINT_COLOR);
        assert_eq!(cell(scene, 1, 1).color, NO_DATA_COLOR);

        let transform = desc.transform;
        let hover = cell(scene, 1, 1).rect.center();
        let info = resolve_cell(transform.apply(hover), &m, &scene.geometry, &transform).unwrap();
        assert_eq!(info.value, None);
    }

    #[test]
    fn test_empty_matrix_renders_nothing() {
        let mut renderer = Renderer::new(RenderOptions::default());
        for json in [
            r#"{"genes": [], "samples": [], "expression_data": []}"#,
            r#"{"genes": [], "samples": ["S1", "S2"], "expression_data": []}"#,
            r#"{"genes": ["G1"], "samples": [], "expression_data": [[]]}"#,
        ] {
            let m = matrix(json);
            let scene = renderer.render(&m, Size::new(800.0, 600.0), ViewTransform::default()).scene;
            assert!(scene.cells.is_empty());
            assert!(scene.legend.is_none());
            assert_eq!(scene.size(), Size::ZERO);
        }
    }

    #[test]
    fn test_single_cell_renders_one_of_each() {
        let m = matrix(r#"{"genes": ["TP53"], "samples": ["ctrl_1"], "expression_data": [[0.7]]}"#);
        let mut renderer = Renderer::new(RenderOptions::default());
        let scene = renderer.render(&m, Size::new(800.0, 600.0), ViewTransform::default()).scene;
        assert_eq!(scene.cells.len(), 1);
        assert_eq!(scene.gene_labels.len(), 1);
        assert_eq!(scene.sample_labels.len(), 1);
        assert_eq!(scene.gene_labels[0].text, "TP53");
        assert_eq!(scene.sample_labels[0].text, "ctrl_1");
        assert_eq!(scene.primitive_count(), 4);
    }

    #[test]
    fn test_primitive_count_is_linear_in_cells_and_labels() {
        let genes: Vec<String> = (0..7).map(|i| format!("G{i}")).collect();
        let samples: Vec<String> = (0..3).map(|i| format!("S{i}")).collect();
        let rows = vec![vec![Some(0.1); 3]; 7];
        let m = Arc::new(ClusteredMatrix::new(genes, samples, rows).unwrap());
        let mut renderer = Renderer::new(RenderOptions::default());
        let scene = renderer.render(&m, Size::new(800.0, 600.0), ViewTransform::default()).scene;
        assert_eq!(scene.primitive_count(), 7 * 3 + 7 + 3 + 1);
    }

    #[test]
    fn test_labels_rotation_and_alignment() {
        let m = scenario();
        let mut renderer = Renderer::new(RenderOptions::default());
        let scene = renderer.render(&m, Size::new(1200.0, 900.0), ViewTransform::default()).scene;
        let origin = scene.geometry.grid_origin();

        for label in &scene.sample_labels {
            assert_eq!(label.rotation_deg, -45.0);
            assert_eq!(label.anchor, TextAnchor::Start);
            assert_eq!(label.position.y, origin.y - LABEL_GAP);
        }
        for (row, label) in scene.gene_labels.iter().enumerate() {
            assert_eq!(label.rotation_deg, 0.0);
            assert_eq!(label.anchor, TextAnchor::End);
            assert_eq!(label.position.x, origin.x - LABEL_GAP);
            assert_eq!(label.position.y, scene.geometry.cell_rect(row, 0).center().y);
        }
    }

    #[test]
    fn test_transform_changes_reuse_geometry() {
        let m = scenario();
        let mut renderer = Renderer::new(RenderOptions::default());
        let container = Size::new(1000.0, 700.0);

        renderer.render(&m, container, ViewTransform::default());
        for i in 0..10 {
            let t = ViewTransform {
                scale: 1.0 + i as f32,
                translate_x: i as f32 * 3.0,
                translate_y: 0.0,
            };
            let desc = renderer.render(&m, container, t);
            assert_eq!(desc.transform, t);
        }
        assert_eq!(renderer.rebuilds(), 1);

        renderer.render(&m, Size::new(1400.0, 700.0), ViewTransform::default());
        assert_eq!(renderer.rebuilds(), 2);

        let other = scenario();
        renderer.render(&other, Size::new(1400.0, 700.0), ViewTransform::default());
        assert_eq!(renderer.rebuilds(), 3);
    }

    #[test]
    fn test_legend_sits_above_grid() {
        let m = scenario();
        let mut renderer = Renderer::new(RenderOptions::default());
        let scene = renderer.render(&m, Size::new(1200.0, 900.0), ViewTransform::default()).scene;
        let legend = scene.legend.as_ref().unwrap();
        assert_eq!(legend.rect.size, LEGEND_SIZE);
        assert_eq!(legend.rect.min.y, 100.0);
        assert!(legend.rect.min.x >= 0.0);
        assert_eq!(legend.x_at(1.0), legend.rect.max().x);
        assert_eq!(legend.legend.axis_ticks.len(), 5);
    }
}
