//! GeoGebra `geogebra.xml` 序列化。输出格式逐字节固定。

use std::fmt::Write as _;

use dxf2ggb_core::{
    geometry::Point2,
    style::{Style, StyleSheet, Translation},
};
use tracing::{debug, warn};

use crate::batch::ImportBatch;
use crate::errors::MarkupError;
use crate::view::{ViewFitter, ViewLayout, ViewTransform};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";
const FOOTER: &str = "</construction>\n</geogebra>\n";

/// 渲染整个文档：视图头、点、文字、线段，各自按登记顺序。
/// 未包含（`included = false`）的分类不输出任何元素。
pub fn render_markup(
    batch: &ImportBatch,
    styles: &StyleSheet,
    translation: Translation,
    layout: ViewLayout,
) -> Result<String, MarkupError> {
    let transform = ViewFitter::new(layout).fit(batch.bounds())?;
    let mut out = String::new();
    write_header(&mut out, &transform);

    let mut emitted = 0usize;
    for point in batch.points().iter() {
        let Some(style) = included_style(styles, &point.entry_type, &point.id)? else {
            continue;
        };
        let caption = format!("{} ({})", point.subtype_name, point.layer);
        write_point(&mut out, &point.id, point.position, translation, style, false, &caption);
        emitted += 1;
    }

    for text in batch.texts() {
        let Some(style) = included_style(styles, &text.entry_type, &text.id)? else {
            continue;
        };
        write_point(&mut out, &text.id, text.position, translation, style, true, &text.text);
        emitted += 1;
    }

    let mut hidden_endpoints = 0usize;
    for segment in batch.segments() {
        for endpoint in [&segment.start, &segment.end] {
            let point = batch
                .points()
                .get(endpoint)
                .ok_or_else(|| MarkupError::DanglingSegment {
                    segment: segment.id.clone(),
                    point: endpoint.clone(),
                })?;
            if styles.get(&point.entry_type).is_some_and(|s| !s.included) {
                hidden_endpoints += 1;
            }
        }
        let Some(style) = included_style(styles, &segment.entry_type, &segment.id)? else {
            continue;
        };
        write_segment(&mut out, &segment.id, &segment.start, &segment.end, style);
        emitted += 1;
    }
    if hidden_endpoints > 0 {
        warn!(hidden_endpoints, "部分线段端点所在的分类未被导出");
    }

    out.push_str(FOOTER);
    debug!(elements = emitted, scale = transform.scale, "标记已生成");
    Ok(out)
}

fn included_style<'a>(
    styles: &'a StyleSheet,
    key: &str,
    element: &str,
) -> Result<Option<&'a Style>, MarkupError> {
    let style = styles.get(key).ok_or_else(|| MarkupError::MissingStyle {
        key: key.to_string(),
        element: element.to_string(),
    })?;
    Ok(style.included.then_some(style))
}

fn write_header(out: &mut String, transform: &ViewTransform) {
    let scale = number(transform.scale);
    out.push_str(XML_DECLARATION);
    out.push_str("<geogebra format=\"5.0\" >\n");
    out.push_str("<euclidianView>\n");
    let _ = writeln!(
        out,
        "  <size  width=\"{}\" height=\"{}\"/>",
        transform.panel_width, transform.panel_height
    );
    let _ = writeln!(
        out,
        "  <coordSystem xZero=\"{}\" yZero=\"{}\" scale=\"{scale}\" yscale=\"{scale}\"/>",
        transform.x_zero, transform.y_zero
    );
    out.push_str("</euclidianView>\n");
    out.push_str("<construction title=\"\" author=\"\" date=\"\">\n");
}

fn write_point(
    out: &mut String,
    id: &str,
    position: Point2,
    translation: Translation,
    style: &Style,
    labelled: bool,
    caption: &str,
) {
    let color = style.color;
    let (show_label, label_mode) = if labelled { ("true", 3) } else { ("false", 0) };
    let _ = writeln!(out, "<element type=\"point\" label=\"{id}\">");
    let _ = writeln!(out, "  <show object=\"true\" label=\"{show_label}\"/>");
    let _ = writeln!(
        out,
        "  <objColor r=\"{}\" g=\"{}\" b=\"{}\" alpha=\"0.0\"/>",
        color.r, color.g, color.b
    );
    out.push_str("  <layer val=\"0\"/>\n");
    let _ = writeln!(out, "  <labelMode val=\"{label_mode}\"/>");
    out.push_str("  <fixed val=\"true\"/>\n");
    out.push_str("  <auxiliary val=\"true\"/>\n");
    let _ = writeln!(
        out,
        "  <coords x=\"{}\" y=\"{}\" z=\"1.0\"/>",
        number(position.x() - translation.x),
        number(position.y() - translation.y)
    );
    let _ = writeln!(out, "  <pointSize val=\"{}\"/>", style.size);
    let _ = writeln!(out, "  <pointStyle val=\"{}\"/>", style.symbol);
    let _ = writeln!(out, "  <caption val=\"{}\"/>", escape_attribute(caption));
    out.push_str("</element>\n");
}

fn write_segment(out: &mut String, id: &str, start: &str, end: &str, style: &Style) {
    let color = style.color;
    out.push_str("<command name=\"Segment\">\n");
    let _ = writeln!(out, "  <input a0=\"{start}\" a1=\"{end}\"/>");
    let _ = writeln!(out, "  <output a0=\"{id}\"/>");
    out.push_str("</command>\n");
    let _ = writeln!(out, "<element type=\"segment\" label=\"{id}\">");
    out.push_str("  <show object=\"true\" label=\"false\"/>\n");
    let _ = writeln!(
        out,
        "  <objColor r=\"{}\" g=\"{}\" b=\"{}\" alpha=\"0.0\"/>",
        color.r, color.g, color.b
    );
    out.push_str("  <layer val=\"0\"/>\n");
    out.push_str("  <labelMode val=\"0\"/>\n");
    out.push_str("  <fixed val=\"true\"/>\n");
    out.push_str("  <auxiliary val=\"true\"/>\n");
    out.push_str("  <coords x=\"0.0\" y=\"1.0\" z=\"-1.0\"/>\n");
    let _ = writeln!(
        out,
        "  <lineStyle thickness=\"{}\" type=\"{}\" typeHidden=\"1\"/>",
        style.size, style.symbol
    );
    out.push_str("  <outlyingIntersections val=\"false\"/>\n");
    out.push_str("  <keepTypeOnTransform val=\"true\"/>\n");
    out.push_str("</element>\n");
}

/// 与 JavaScript `Number#toString` 相同：最短往返表示，整数不带小数点，
/// 绝对值小于 1e-6 或不小于 1e21 时用指数形式（`9.5e-8`、`1e+21`）；`-0` 记为 `0`。
fn number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    value.to_string()
}

fn escape_attribute(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            other => escaped.push(other),
        }
    }
    escaped
}
