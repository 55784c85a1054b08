//! Main application state and UI

use eframe::egui;
use std::sync::Arc;

use clustermap_viewer::config::ViewerConfig;
use clustermap_viewer::fetch::{DataSource, FetchHandle};
use clustermap_viewer::heatmap::scene::{CELL_STROKE_COLOR, CELL_STROKE_WIDTH, LegendPrimitive};
use clustermap_viewer::heatmap::svg::to_svg;
use clustermap_viewer::heatmap::{
    CellInfo, ClusteredMatrix, GestureEvent, LabelPrimitive, Point, Rect, Renderer, Rgb, Scene,
    SceneDescription, Size, TextAnchor, TooltipController, ViewTransform, ViewportTransform,
};

/// Scroll points → zoom exponent.
const ZOOM_SENSITIVITY: f32 = 0.002;
/// Labels smaller than this on screen are skipped.
const MIN_LABEL_PX: f32 = 4.0;
const LABEL_COLOR: egui::Color32 = egui::Color32::from_rgb(30, 30, 30);

/// Matrix currently on screen, plus its interaction state.
struct LoadedMatrix {
    matrix: Arc<ClusteredMatrix>,
    missing_cells: usize,
    /// Created on the first frame, once the panel size is known.
    viewport: Option<ViewportTransform>,
    /// Panel size the viewport's home transform was centered for.
    home_container: Size,
}

impl LoadedMatrix {
    fn new(matrix: ClusteredMatrix) -> Self {
        let dims = matrix.dims();
        let missing_cells = dims.rows * dims.cols - matrix.defined_count();
        Self {
            matrix: Arc::new(matrix),
            missing_cells,
            viewport: None,
            home_container: Size::ZERO,
        }
    }
}

enum ViewState {
    Loading,
    Failed(String),
    Loaded(LoadedMatrix),
}

/// Application state
pub struct HeatmapApp {
    config: ViewerConfig,
    source: DataSource,
    fetch: Option<FetchHandle>,
    view: ViewState,
    renderer: Renderer,
    tooltip: TooltipController,

    // Find gene
    find_query: String,
    find_error: Option<String>,
    highlighted_row: Option<usize>,

    // Export
    pending_export: bool,
    export_error: Option<String>,
    last_container: Size,
}

impl HeatmapApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: ViewerConfig, source: DataSource) -> Self {
        let renderer = Renderer::new(config.render_options());
        let mut app = Self {
            config,
            source: source.clone(),
            fetch: None,
            view: ViewState::Loading,
            renderer,
            tooltip: TooltipController::new(),
            find_query: String::new(),
            find_error: None,
            highlighted_row: None,
            pending_export: false,
            export_error: None,
            last_container: Size::ZERO,
        };
        app.start_fetch(source);
        app
    }

    fn start_fetch(&mut self, source: DataSource) {
        self.source = source.clone();
        self.fetch = Some(FetchHandle::spawn(source));
        self.view = ViewState::Loading;
        self.renderer.clear();
        self.tooltip.on_leave();
        self.highlighted_row = None;
        self.find_error = None;
    }

    fn check_fetch(&mut self, ctx: &egui::Context) {
        let Some(handle) = &self.fetch else {
            return;
        };
        match handle.poll() {
            Some(Ok(matrix)) => {
                self.fetch = None;
                self.view = ViewState::Loaded(LoadedMatrix::new(matrix));
            }
            Some(Err(e)) => {
                self.fetch = None;
                self.view = ViewState::Failed(e.to_string());
            }
            None => ctx.request_repaint(),
        }
    }

    fn open_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.start_fetch(DataSource::File(path));
        }
    }

    fn export_svg(&mut self) {
        let ViewState::Loaded(loaded) = &self.view else {
            self.export_error = Some("No heatmap to export".to_string());
            return;
        };

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("SVG", &["svg"])
            .set_file_name("clustered_heatmap.svg")
            .save_file()
        {
            // The SVG is written in scene coordinates; the view transform does not apply.
            let desc = self
                .renderer
                .render(&loaded.matrix, self.last_container, ViewTransform::default());
            let svg = to_svg(desc.scene);
            match std::fs::write(&path, svg) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "exported heatmap SVG");
                    self.export_error = None;
                }
                Err(e) => {
                    self.export_error = Some(format!("Failed to write file: {}", e));
                }
            }
        }
    }

    fn reset_view(&mut self) {
        if let ViewState::Loaded(LoadedMatrix {
            viewport: Some(viewport),
            ..
        }) = &mut self.view
        {
            viewport.handle(GestureEvent::Reset);
        }
    }
}

impl eframe::App for HeatmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_fetch(ctx);

        if self.pending_export {
            self.pending_export = false;
            self.export_svg();
        }

        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open JSON...").clicked() {
                        self.open_file();
                        ui.close_menu();
                    }
                    if ui.button("Reload").clicked() {
                        self.start_fetch(self.source.clone());
                        ui.close_menu();
                    }
                    ui.separator();
                    let can_export = matches!(self.view, ViewState::Loaded(_));
                    if ui
                        .add_enabled(can_export, egui::Button::new("Export SVG..."))
                        .clicked()
                    {
                        self.pending_export = true;
                        ui.close_menu();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Reset view").clicked() {
                        self.reset_view();
                        ui.close_menu();
                    }
                });
            });
        });

        // Status bar
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| match &self.view {
                ViewState::Loading => {
                    ui.spinner();
                    ui.label(format!("Loading from {}", self.source.describe()));
                }
                ViewState::Failed(_) => {
                    ui.label(format!("Failed to load from {}", self.source.describe()));
                }
                ViewState::Loaded(loaded) => {
                    let dims = loaded.matrix.dims();
                    let mut parts = vec![format!("{} genes x {} samples", dims.rows, dims.cols)];
                    if loaded.missing_cells > 0 {
                        parts.push(format!("{} cells without data", loaded.missing_cells));
                    }
                    if let Some(total) = loaded.matrix.metadata().and_then(|m| m.total_genes) {
                        parts.push(format!("{} genes before filtering", total));
                    }
                    if let Some(vp) = &loaded.viewport {
                        parts.push(format!("Zoom: {:.0}%", vp.transform().scale * 100.0));
                    }
                    parts.push(self.source.describe());
                    ui.label(parts.join(" | "));
                }
            });
        });

        // Main content
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Heatmap with Clustering");
            ui.separator();

            match &self.view {
                ViewState::Loading => {
                    ui.centered_and_justified(|ui| {
                        ui.label("Loading heatmap data...");
                    });
                }
                ViewState::Failed(error) => {
                    ui.colored_label(egui::Color32::RED, format!("Error: {}", error));
                    if ui.button("Retry").clicked() {
                        self.start_fetch(self.source.clone());
                    }
                }
                ViewState::Loaded(_) => self.show_heatmap(ui),
            }

            if let Some(ref error) = self.export_error {
                ui.colored_label(egui::Color32::RED, error);
            }
        });
    }
}

impl HeatmapApp {
    fn show_heatmap(&mut self, ui: &mut egui::Ui) {
        let mut find_requested = false;
        let mut reset_requested = false;

        ui.horizontal(|ui| {
            ui.label("Find gene:");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.find_query).desired_width(160.0),
            );
            if edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                find_requested = true;
            }
            if ui.button("Go").clicked() {
                find_requested = true;
            }
            if let Some(ref error) = self.find_error {
                ui.colored_label(egui::Color32::RED, error);
            }
            ui.separator();
            if ui.button("Reset view").clicked() {
                reset_requested = true;
            }
            ui.label("Drag to pan, scroll to zoom.");
        });

        let ViewState::Loaded(loaded) = &mut self.view else {
            return;
        };
        let matrix = Arc::clone(&loaded.matrix);

        if matrix.dims().is_empty() {
            ui.label("The clustering result contains no genes or samples.");
            return;
        }

        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let container = Size::new(rect.width(), rect.height());
        self.last_container = container;

        let zoom_limits = self.config.zoom;
        let renderer = &mut self.renderer;
        let geometry = renderer
            .render(&matrix, container, ViewTransform::default())
            .scene
            .geometry;
        let home = ViewTransform::centered(geometry.scene_size(), from_rect(rect), zoom_limits);
        let viewport = loaded
            .viewport
            .get_or_insert_with(|| ViewportTransform::new(home, zoom_limits));
        if loaded.home_container != container {
            loaded.home_container = container;
            viewport.set_home(home);
        }

        // Gestures
        if response.drag_started() {
            viewport.handle(GestureEvent::DragStart);
        }
        if response.dragged() {
            let delta = response.drag_delta();
            viewport.handle(GestureEvent::DragMove {
                dx: delta.x,
                dy: delta.y,
            });
        }
        if response.drag_stopped() {
            viewport.handle(GestureEvent::DragEnd);
        }
        if let Some(hover) = response.hover_pos() {
            let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
            let factor = pinch * (scroll * ZOOM_SENSITIVITY).exp();
            if (factor - 1.0).abs() > f32::EPSILON {
                viewport.handle(GestureEvent::Zoom {
                    factor,
                    anchor: to_point(hover),
                });
            }
        }
        if reset_requested {
            viewport.handle(GestureEvent::Reset);
        }

        if find_requested {
            let query = self.find_query.trim();
            match lookup_gene(&matrix, query) {
                GeneLookup::Empty => self.find_error = None,
                GeneLookup::Found(row) => {
                    self.find_error = None;
                    self.highlighted_row = Some(row);
                    let target = Point::new(
                        geometry.grid_rect().center().x,
                        geometry.cell_rect(row, 0).center().y,
                    );
                    viewport.handle(GestureEvent::FocusOn {
                        scene: target,
                        screen: to_point(rect.center()),
                    });
                }
                GeneLookup::Missing => {
                    self.find_error = Some(format!("Gene '{}' not found", query));
                }
            }
        }

        let desc = renderer.render(&matrix, container, viewport.transform());
        let painter = painter.with_clip_rect(rect);
        painter.rect_filled(rect, 0.0, egui::Color32::WHITE);
        paint_scene(&painter, desc);

        if let Some(row) = self.highlighted_row {
            let g = &desc.scene.geometry;
            let row_rect = Rect::new(
                g.margins.left,
                g.margins.top + row as f32 * g.cell_height,
                g.grid_width,
                g.cell_height,
            );
            painter.rect_stroke(
                to_screen_rect(row_rect, &desc.transform),
                0.0,
                egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 180, 0)),
                egui::StrokeKind::Outside,
            );
        }

        // Tooltip follows the pointer and vanishes as soon as it leaves.
        match response.hover_pos() {
            Some(pos) => {
                self.tooltip
                    .on_hover(to_point(pos), &matrix, &desc.scene.geometry, &desc.transform);
            }
            None => self.tooltip.on_leave(),
        }

        if let (Some(info), Some(anchor)) = (self.tooltip.current(), self.tooltip.anchor()) {
            let cols = desc.scene.geometry.dims.cols;
            let fill = desc
                .scene
                .cells
                .get(info.row * cols + info.col)
                .map(|c| c.color)
                .unwrap_or(CELL_STROKE_COLOR);
            let outline = if fill.luminance() > 140.0 {
                egui::Color32::BLACK
            } else {
                egui::Color32::WHITE
            };
            painter.rect_stroke(
                to_screen_rect(desc.scene.geometry.cell_rect(info.row, info.col), &desc.transform),
                0.0,
                egui::Stroke::new(1.5, outline),
                egui::StrokeKind::Outside,
            );
            show_tooltip(ui.ctx(), info, anchor);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum GeneLookup {
    /// Nothing typed; no search is made.
    Empty,
    Found(usize),
    Missing,
}

fn lookup_gene(matrix: &ClusteredMatrix, query: &str) -> GeneLookup {
    if query.is_empty() {
        return GeneLookup::Empty;
    }
    match matrix.gene_index(query) {
        Some(row) => GeneLookup::Found(row),
        None => GeneLookup::Missing,
    }
}

fn show_tooltip(ctx: &egui::Context, info: &CellInfo, anchor: Point) {
    egui::Area::new(egui::Id::new("heatmap_tooltip"))
        .order(egui::Order::Tooltip)
        .fixed_pos(to_pos(anchor))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.strong(format!("Gene: {}", info.gene));
                ui.label(format!("Sample: {}", info.sample));
                ui.label(format!("Value: {}", info.value_text()));
            });
        });
}

/// Draw the cached scene through its transform, culling what lies outside the clip rect.
fn paint_scene(painter: &egui::Painter, desc: SceneDescription<'_>) {
    let clip = painter.clip_rect();
    let t = &desc.transform;
    let scene: &Scene = desc.scene;

    let stroke = egui::Stroke::new(CELL_STROKE_WIDTH * t.scale, to_color(CELL_STROKE_COLOR));
    for cell in &scene.cells {
        let r = to_screen_rect(cell.rect, t);
        if !clip.intersects(r) {
            continue;
        }
        painter.rect(r, 0.0, to_color(cell.color), stroke, egui::StrokeKind::Inside);
    }

    for label in scene.gene_labels.iter().chain(&scene.sample_labels) {
        paint_label(painter, label, t);
    }

    if let Some(legend) = &scene.legend {
        paint_legend(painter, legend, t);
    }
}

fn paint_label(painter: &egui::Painter, label: &LabelPrimitive, t: &ViewTransform) {
    let size = label.font_size * t.scale;
    if size < MIN_LABEL_PX {
        return;
    }
    let pos = to_pos(t.apply(label.position));
    let font = egui::FontId::proportional(size);

    if label.rotation_deg == 0.0 {
        let align = match label.anchor {
            TextAnchor::Start => egui::Align2::LEFT_CENTER,
            TextAnchor::End => egui::Align2::RIGHT_CENTER,
        };
        if pos.y < painter.clip_rect().top() - size || pos.y > painter.clip_rect().bottom() + size {
            return;
        }
        painter.text(pos, align, &label.text, font, LABEL_COLOR);
        return;
    }

    // Rotated text pivots around the galley's top-left corner; shift it so the
    // baseline passes through the label position.
    let galley = painter.layout_no_wrap(label.text.clone(), font, LABEL_COLOR);
    let angle = label.rotation_deg.to_radians();
    let ascent = galley.size().y * 0.75;
    let top_left = pos + egui::vec2(ascent * angle.sin(), -ascent * angle.cos());
    painter.add(egui::epaint::TextShape::new(top_left, galley, LABEL_COLOR).with_angle(angle));
}

fn paint_legend(painter: &egui::Painter, legend: &LegendPrimitive, t: &ViewTransform) {
    let top = legend.rect.min.y;
    let bottom = legend.rect.max().y;

    let mut mesh = egui::Mesh::default();
    for pair in legend.legend.gradient_stops.windows(2) {
        let (x0, x1) = (legend.x_at(pair[0].offset), legend.x_at(pair[1].offset));
        let (c0, c1) = (to_color(pair[0].color), to_color(pair[1].color));
        let base = mesh.vertices.len() as u32;
        mesh.colored_vertex(to_pos(t.apply(Point::new(x0, top))), c0);
        mesh.colored_vertex(to_pos(t.apply(Point::new(x1, top))), c1);
        mesh.colored_vertex(to_pos(t.apply(Point::new(x1, bottom))), c1);
        mesh.colored_vertex(to_pos(t.apply(Point::new(x0, bottom))), c0);
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base, base + 2, base + 3);
    }
    painter.add(egui::Shape::mesh(mesh));
    painter.rect_stroke(
        to_screen_rect(legend.rect, t),
        0.0,
        egui::Stroke::new(1.0, egui::Color32::from_gray(204)),
        egui::StrokeKind::Outside,
    );

    let tick_font = egui::FontId::proportional((12.0 * t.scale).max(MIN_LABEL_PX));
    for tick in &legend.legend.axis_ticks {
        let x = legend.x_at(tick.position);
        let a = to_pos(t.apply(Point::new(x, bottom)));
        let b = to_pos(t.apply(Point::new(x, bottom + 6.0)));
        painter.line_segment([a, b], egui::Stroke::new(1.0, LABEL_COLOR));
        painter.text(
            b + egui::vec2(0.0, 2.0),
            egui::Align2::CENTER_TOP,
            &tick.label,
            tick_font.clone(),
            LABEL_COLOR,
        );
    }

    painter.text(
        to_pos(t.apply(Point::new(legend.rect.center().x, top - 10.0))),
        egui::Align2::CENTER_BOTTOM,
        legend.legend.title,
        egui::FontId::proportional((14.0 * t.scale).max(MIN_LABEL_PX)),
        LABEL_COLOR,
    );
}

fn to_pos(p: Point) -> egui::Pos2 {
    egui::pos2(p.x, p.y)
}

fn to_point(p: egui::Pos2) -> Point {
    Point::new(p.x, p.y)
}

fn from_rect(r: egui::Rect) -> Rect {
    Rect::new(r.min.x, r.min.y, r.width(), r.height())
}

fn to_screen_rect(r: Rect, t: &ViewTransform) -> egui::Rect {
    egui::Rect::from_min_max(to_pos(t.apply(r.min)), to_pos(t.apply(r.max())))
}

fn to_color(c: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(c.r, c.g, c.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ClusteredMatrix {
        ClusteredMatrix::from_json(
            r#"{"genes": ["TP53", "BRCA1"], "samples": ["S1"], "expression_data": [[0.1], [0.2]]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_query_is_not_searched() {
        assert_eq!(lookup_gene(&matrix(), ""), GeneLookup::Empty);
    }

    #[test]
    fn test_gene_lookup() {
        let m = matrix();
        assert_eq!(lookup_gene(&m, "BRCA1"), GeneLookup::Found(1));
        assert_eq!(lookup_gene(&m, "EGFR"), GeneLookup::Missing);
    }
}
