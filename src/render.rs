use std::fmt::Write as FmtWrite;

use crate::engine::Frame;
use crate::error::Result;
use crate::graph::Relationship;

/// Render one frame as a standalone SVG document. Coordinates are logical;
/// the host decides how the document maps to device pixels.
pub fn render_svg(frame: &Frame, background: &str) -> Result<String> {
    let mut svg = String::new();
    write!(
        svg,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="Inter, system-ui, sans-serif">
  <defs>
"#,
        frame.width, frame.height, frame.width, frame.height
    )?;

    for relationship in [
        Relationship::Friendly,
        Relationship::Neutral,
        Relationship::Awkward,
    ] {
        write!(
            svg,
            "    <marker id=\"{}\" markerWidth=\"8\" markerHeight=\"8\" refX=\"6\" refY=\"4\" orient=\"auto\" markerUnits=\"strokeWidth\">\n      <path d=\"M1,1 L6,4 L1,7 z\" fill=\"{}\" />\n    </marker>\n",
            relationship.marker_id(),
            relationship.stroke_color()
        )?;
    }

    write!(
        svg,
        "  </defs>\n  <rect width=\"100%\" height=\"100%\" fill=\"{}\" />\n",
        escape_xml(background)
    )?;

    let t = frame.transform;
    write!(
        svg,
        "  <g transform=\"translate({:.2} {:.2}) scale({:.4})\">\n",
        t.tx, t.ty, t.scale
    )?;

    for edge in &frame.edges {
        let path = &edge.path;
        write!(
            svg,
            "    <path d=\"M {:.1} {:.1} Q {:.1} {:.1} {:.1} {:.1}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\" opacity=\"{:.2}\" marker-end=\"url(#{})\" />\n",
            path.start.x,
            path.start.y,
            path.control.x,
            path.control.y,
            path.end.x,
            path.end.y,
            path.stroke_color(),
            edge.opacity,
            path.marker_id()
        )?;
    }

    for node in &frame.nodes {
        write!(
            svg,
            "    <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\" opacity=\"{:.2}\" />\n",
            node.at.x, node.at.y, node.radius, node.style.fill, node.style.stroke, node.style.opacity
        )?;
        write!(
            svg,
            "    <text x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-size=\"12\" text-anchor=\"middle\" opacity=\"{:.2}\">{}</text>\n",
            node.at.x,
            node.at.y + node.radius + 14.0,
            node.style.label_color,
            node.style.opacity,
            escape_xml(&node.label)
        )?;
    }

    svg.push_str("  </g>\n</svg>\n");
    Ok(svg)
}

pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
