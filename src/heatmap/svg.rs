//! Standalone SVG serialization of a scene.

use std::fmt::Write as _;

use super::scene::{
    CELL_STROKE_COLOR, CELL_STROKE_WIDTH, LabelPrimitive, LegendPrimitive, Scene, TextAnchor,
};

const GRADIENT_ID: &str = "legend-gradient";
const FONT_FAMILY: &str = "Arial, sans-serif";
const TICK_LENGTH: f32 = 6.0;

/// Render `scene` as an SVG document in scene coordinates.
pub fn to_svg(scene: &Scene) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_scene(&mut out, scene);
    out
}

fn write_scene(out: &mut String, scene: &Scene) -> std::fmt::Result {
    let size = scene.size();
    let (w, h) = (num(size.width), num(size.height));
    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#
    )?;

    if let Some(legend) = &scene.legend {
        write_gradient(out, legend)?;
    }
    writeln!(out, r##"<rect width="{w}" height="{h}" fill="#ffffff"/>"##)?;

    writeln!(
        out,
        r#"<g class="cells" stroke="{}" stroke-width="{}">"#,
        CELL_STROKE_COLOR.to_hex(),
        num(CELL_STROKE_WIDTH)
    )?;
    for cell in &scene.cells {
        writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            num(cell.rect.min.x),
            num(cell.rect.min.y),
            num(cell.rect.size.width),
            num(cell.rect.size.height),
            cell.color.to_hex()
        )?;
    }
    writeln!(out, "</g>")?;

    writeln!(out, r#"<g class="gene-labels" font-family="{FONT_FAMILY}" font-weight="500">"#)?;
    for label in &scene.gene_labels {
        write_label(out, label)?;
    }
    writeln!(out, "</g>")?;

    writeln!(out, r#"<g class="sample-labels" font-family="{FONT_FAMILY}" font-weight="500">"#)?;
    for label in &scene.sample_labels {
        write_label(out, label)?;
    }
    writeln!(out, "</g>")?;

    if let Some(legend) = &scene.legend {
        write_legend(out, legend)?;
    }

    writeln!(out, "</svg>")
}

fn write_gradient(out: &mut String, legend: &LegendPrimitive) -> std::fmt::Result {
    writeln!(out, "<defs>")?;
    writeln!(
        out,
        r#"<linearGradient id="{GRADIENT_ID}" x1="0%" x2="100%" y1="0%" y2="0%">"#
    )?;
    for stop in &legend.legend.gradient_stops {
        writeln!(
            out,
            r#"<stop offset="{}%" stop-color="{}"/>"#,
            num(stop.offset * 100.0),
            stop.color.to_hex()
        )?;
    }
    writeln!(out, "</linearGradient>")?;
    writeln!(out, "</defs>")
}

fn write_label(out: &mut String, label: &LabelPrimitive) -> std::fmt::Result {
    let anchor = match label.anchor {
        TextAnchor::Start => "start",
        TextAnchor::End => "end",
    };
    let (x, y) = (num(label.position.x), num(label.position.y));
    if label.rotation_deg == 0.0 {
        writeln!(
            out,
            r#"<text x="{x}" y="{y}" text-anchor="{anchor}" dominant-baseline="middle" font-size="{}">{}</text>"#,
            num(label.font_size),
            escape(&label.text)
        )
    } else {
        writeln!(
            out,
            r#"<text transform="translate({x}, {y}) rotate({})" text-anchor="{anchor}" font-size="{}">{}</text>"#,
            num(label.rotation_deg),
            num(label.font_size),
            escape(&label.text)
        )
    }
}

fn write_legend(out: &mut String, legend: &LegendPrimitive) -> std::fmt::Result {
    let r = legend.rect;
    let bottom = r.max().y;
    writeln!(out, r#"<g class="legend" font-family="{FONT_FAMILY}">"#)?;
    writeln!(
        out,
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="url(#{GRADIENT_ID})" stroke="#cccccc" stroke-width="1"/>"##,
        num(r.min.x),
        num(r.min.y),
        num(r.size.width),
        num(r.size.height)
    )?;
    for tick in &legend.legend.axis_ticks {
        let x = num(legend.x_at(tick.position));
        writeln!(
            out,
            r##"<line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="#333333"/>"##,
            num(bottom),
            num(bottom + TICK_LENGTH)
        )?;
        writeln!(
            out,
            r#"<text x="{x}" y="{}" text-anchor="middle" dominant-baseline="hanging" font-size="12">{}</text>"#,
            num(bottom + TICK_LENGTH + 2.0),
            escape(&tick.label)
        )?;
    }
    writeln!(
        out,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="14" font-weight="500">{}</text>"#,
        num(r.center().x),
        num(r.min.y - 10.0),
        escape(legend.legend.title)
    )?;
    writeln!(out, "</g>")
}

/// Up to two decimals, without trailing zeros.
fn num(v: f32) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::geom::Size;
    use crate::heatmap::matrix::ClusteredMatrix;
    use crate::heatmap::scene::{RenderOptions, Renderer};
    use crate::heatmap::viewport::ViewTransform;
    use std::sync::Arc;

    fn render(json: &str) -> String {
        let m = Arc::new(ClusteredMatrix::from_json(json).unwrap());
        let mut renderer = Renderer::new(RenderOptions::default());
        let desc = renderer.render(&m, Size::new(1000.0, 800.0), ViewTransform::default());
        to_svg(desc.scene)
    }

    #[test]
    fn test_svg_contains_every_primitive() {
        let svg = render(
            r#"{"genes": ["G1", "G2"], "samples": ["S1", "S2"], "expression_data": [[2.0, -2.0], [0.0, null]]}"#,
        );
        assert!(svg.starts_with("<svg "));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r##"fill="#67001f""##));
        assert!(svg.contains(r##"fill="#053061""##));
        assert!(svg.contains(r##"fill="#f7f7f7""##));
        assert!(svg.contains(r##"fill="#282828""##));
        assert_eq!(svg.matches("<stop ").count(), 41);
        assert_eq!(svg.matches("rotate(-45)").count(), 2);
        assert!(svg.contains(">Expression Z-score</text>"));
        assert!(svg.contains(">-2.0</text>"));
    }

    #[test]
    fn test_labels_are_escaped() {
        let svg = render(
            r#"{"genes": ["A<B&C"], "samples": ["\"s\""], "expression_data": [[1.0]]}"#,
        );
        assert!(svg.contains(">A&lt;B&amp;C</text>"));
        assert!(svg.contains(">&quot;s&quot;</text>"));
    }

    #[test]
    fn test_empty_scene_is_valid_document() {
        let svg = render(r#"{"genes": [], "samples": [], "expression_data": []}"#);
        assert!(svg.contains(r#"viewBox="0 0 0 0""#));
        assert!(!svg.contains("<defs>"));
    }

    #[test]
    fn test_num_trims_zeros() {
        assert_eq!(num(12.0), "12");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(-45.0), "-45");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(100.25), "100.25");
    }
}
