use dxf2ggb_core::{
    drawing::Drawing,
    geometry::Bounds2D,
    model::{Segment, Text},
    style::{StyleSheet, Translation},
};
use tracing::{info, warn};

use crate::errors::IngestError;
use crate::layers::LayerStyleRegistry;
use crate::reconcile::{self, FileSummary};
use crate::registry::PointRegistry;

pub const OUTPUT_EXTENSION: &str = "ggb";

/// 一次导入批次的全部状态。选择新的一组文件时整体重建，不做增量清理。
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub(crate) points: PointRegistry,
    pub(crate) layers: LayerStyleRegistry,
    pub(crate) texts: Vec<Text>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) bounds: Bounds2D,
    pub(crate) polyline_count: usize,
    sources: Vec<String>,
}

impl ImportBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 调和一个已解析的文件。输入缺陷时批次保持原样，可继续处理下一个文件；
    /// 注册表缺陷不可恢复。
    pub fn ingest(&mut self, source: &str, drawing: &Drawing) -> Result<FileSummary, IngestError> {
        let plan = reconcile::plan_file(source, drawing, &self.layers).map_err(|err| {
            warn!(source, error = %err, "文件存在输入缺陷，已跳过");
            IngestError::Input {
                source_name: source.to_string(),
                source: err,
            }
        })?;
        let summary = reconcile::apply_plan(self, plan)?;
        self.sources.push(source.to_string());
        info!(
            source,
            points = summary.points,
            duplicates = summary.duplicate_inserts,
            texts = summary.texts,
            polylines = summary.polylines,
            segments = summary.segments,
            synthesized = summary.synthesized,
            ignored = summary.ignored,
            "文件已导入"
        );
        Ok(summary)
    }

    #[inline]
    pub fn points(&self) -> &PointRegistry {
        &self.points
    }

    #[inline]
    pub fn layers(&self) -> &LayerStyleRegistry {
        &self.layers
    }

    #[inline]
    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds2D {
        &self.bounds
    }

    #[inline]
    pub fn polyline_count(&self) -> usize {
        self.polyline_count
    }

    /// 成功导入的文件名（不含扩展名），按导入顺序。
    #[inline]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn output_file_name(&self) -> Option<String> {
        if self.sources.is_empty() {
            return None;
        }
        Some(format!("{}.{OUTPUT_EXTENSION}", self.sources.concat()))
    }

    /// 默认平移量为左下角向下取整。
    pub fn suggested_translation(&self) -> Option<Translation> {
        if self.bounds.is_empty() {
            return None;
        }
        let corner = self.bounds.min().floor();
        Some(Translation::new(corner.x(), corner.y()))
    }

    /// 每个分类一行默认样式，平移量取建议值。
    pub fn default_styles(&self) -> StyleSheet {
        let mut sheet = StyleSheet::defaults_for(self.layers.entry_types());
        sheet.translation = self.suggested_translation();
        sheet
    }
}

#[cfg(test)]
mod tests {
    use dxf2ggb_core::drawing::{
        BlockRecord, DxfEntity, EntityBody, LayerRecord, PolylineSource,
    };
    use dxf2ggb_core::geometry::Point2;

    use super::*;
    use crate::errors::ImportError;
    use crate::key::GeometricKey;

    fn drawing_with_layers(layers: &[(&str, u32)]) -> Drawing {
        let mut drawing = Drawing::new();
        drawing.set_extents(Point2::new(0.0, 0.0), Point2::new(100.0, 50.0));
        for (name, color) in layers {
            drawing.add_layer(LayerRecord {
                name: (*name).to_string(),
                color: Some(*color),
            });
        }
        drawing
    }

    fn line(layer: &str, vertices: &[(f64, f64)]) -> DxfEntity {
        DxfEntity::new(
            layer,
            EntityBody::Polyline {
                source: PolylineSource::Line,
                vertices: vertices.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            },
        )
    }

    fn lwpolyline(layer: &str, vertices: &[(f64, f64)]) -> DxfEntity {
        DxfEntity::new(
            layer,
            EntityBody::Polyline {
                source: PolylineSource::LwPolyline,
                vertices: vertices.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            },
        )
    }

    fn insert(layer: &str, block: &str, x: f64, y: f64) -> DxfEntity {
        DxfEntity::new(
            layer,
            EntityBody::Insert {
                block: block.to_string(),
                position: Point2::new(x, y),
            },
        )
    }

    #[test]
    fn lines_sharing_an_endpoint_share_one_point() {
        let mut drawing = drawing_with_layers(&[("grenze", 0x0000ff)]);
        drawing.push_entity(line("grenze", &[(0.0, 0.0), (5.0, 5.0)]));
        drawing.push_entity(line("grenze", &[(5.0, 5.0), (10.0, 0.0)]));

        let mut batch = ImportBatch::new();
        let summary = batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(summary.polylines, 2);
        assert_eq!(summary.segments, 2);
        assert_eq!(summary.synthesized, 3);
        assert_eq!(batch.points().len(), 3);

        let shared = batch
            .points()
            .lookup(&GeometricKey::new(5.0, 5.0))
            .expect("shared point");
        assert_eq!(shared, "PL0L1G");
        let segments = batch.segments();
        assert_eq!(segments[0].id, "L0L1");
        assert_eq!(segments[0].end, shared);
        assert_eq!(segments[1].id, "L1L1");
        assert_eq!(segments[1].start, shared);
    }

    #[test]
    fn polyline_vertices_resolve_to_inserts_and_never_close() {
        let mut drawing = drawing_with_layers(&[("L1", 0xff0000), ("flur", 0x00ff00)]);
        drawing.add_block(BlockRecord {
            name: "ABM_1000".to_string(),
            name2: Some("GP 17".to_string()),
            layer: "L1".to_string(),
        });
        drawing.push_entity(lwpolyline(
            "flur",
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
        ));
        drawing.push_entity(insert("L1", "ABM_1000", 10.0, 0.0));

        let mut batch = ImportBatch::new();
        batch.ingest("a", &drawing).expect("ingest");

        let ids: Vec<_> = batch
            .segments()
            .iter()
            .map(|s| (s.id.as_str(), s.start.as_str(), s.end.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("L0L1", "PL0L1S", "P0"),
                ("L0L2", "P0", "PL0L2G"),
                ("L0L3", "PL0L2G", "PL0L3G"),
            ]
        );
        for segment in batch.segments() {
            assert!(batch.points().contains(&segment.start));
            assert!(batch.points().contains(&segment.end));
        }
        let point = batch.points().get("P0").expect("insert point");
        assert_eq!(point.comment.as_deref(), Some("GP 17"));
        assert_eq!(point.subtype_name, "allgemeineMarke");
    }

    #[test]
    fn explicitly_repeated_first_vertex_closes_the_ring() {
        let mut drawing = drawing_with_layers(&[("flur", 0x00ff00)]);
        drawing.push_entity(lwpolyline(
            "flur",
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)],
        ));
        let mut batch = ImportBatch::new();
        batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(batch.segments().len(), 3);
        assert_eq!(batch.points().len(), 3);
        assert_eq!(batch.segments()[2].end, batch.segments()[0].start);
    }

    #[test]
    fn block_comment_requires_matching_layer() {
        let mut drawing = drawing_with_layers(&[("L1", 0xff0000), ("L2", 0x00ff00)]);
        drawing.add_block(BlockRecord {
            name: "ABM_1110".to_string(),
            name2: Some("Stein".to_string()),
            layer: "L1".to_string(),
        });
        drawing.push_entity(insert("L2", "ABM_1110", 1.0, 1.0));
        let mut batch = ImportBatch::new();
        batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(batch.points().get("P0").and_then(|p| p.comment.clone()), None);
    }

    #[test]
    fn near_identical_coordinates_stay_distinct() {
        let mut drawing = drawing_with_layers(&[("grenze", 0x0000ff)]);
        drawing.push_entity(line("grenze", &[(0.0, 0.0), (1.000000001, 2.0)]));
        drawing.push_entity(line("grenze", &[(1.000000002, 2.0), (3.0, 3.0)]));
        let mut batch = ImportBatch::new();
        batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(batch.points().len(), 4);
    }

    #[test]
    fn duplicate_insert_reuses_the_existing_point() {
        let mut drawing = drawing_with_layers(&[("L1", 0xff0000)]);
        drawing.add_block(BlockRecord {
            name: "ABM_1000".to_string(),
            name2: None,
            layer: "L1".to_string(),
        });
        drawing.push_entity(insert("L1", "ABM_1000", 3.0, 4.0));
        drawing.push_entity(insert("L1", "ABM_1000", 3.0, 4.0));
        let mut batch = ImportBatch::new();
        let summary = batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(summary.points, 1);
        assert_eq!(summary.duplicate_inserts, 1);
        assert_eq!(batch.points().len(), 1);
        assert_eq!(
            batch.layers().get("INSERT L1 ABM_1000").map(|e| e.occurrences),
            Some(2)
        );
    }

    #[test]
    fn missing_block_leaves_batch_untouched() {
        let mut good = drawing_with_layers(&[("grenze", 0x0000ff)]);
        good.push_entity(line("grenze", &[(0.0, 0.0), (1.0, 1.0)]));

        let mut bad = drawing_with_layers(&[("L1", 0xff0000), ("grenze", 0x0000ff)]);
        bad.set_extents(Point2::new(-50.0, -50.0), Point2::new(500.0, 500.0));
        bad.push_entity(line("grenze", &[(7.0, 7.0), (8.0, 8.0)]));
        bad.push_entity(insert("L1", "ABM_9999", 1.0, 1.0));

        let mut batch = ImportBatch::new();
        batch.ingest("good", &good).expect("good file");
        let err = batch.ingest("bad", &bad).expect_err("missing block");
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            IngestError::Input {
                source: ImportError::MissingBlock { .. },
                ..
            }
        ));

        assert_eq!(batch.points().len(), 2);
        assert_eq!(batch.segments().len(), 1);
        assert_eq!(batch.polyline_count(), 1);
        assert_eq!(batch.layers().len(), 2);
        assert_eq!(batch.bounds().min(), Point2::new(0.0, 0.0));
        assert_eq!(batch.sources(), ["good".to_string()]);
        assert_eq!(batch.output_file_name().as_deref(), Some("good.ggb"));
    }

    #[test]
    fn missing_layer_and_extents_are_input_defects() {
        let mut drawing = drawing_with_layers(&[]);
        drawing.push_entity(line("ghost", &[(0.0, 0.0), (1.0, 1.0)]));
        let mut batch = ImportBatch::new();
        let err = batch.ingest("a", &drawing).expect_err("missing layer");
        assert!(matches!(
            err,
            IngestError::Input {
                source: ImportError::MissingLayer { .. },
                ..
            }
        ));

        let no_extents = Drawing::new();
        let err = batch.ingest("b", &no_extents).expect_err("missing extents");
        assert!(matches!(
            err,
            IngestError::Input {
                source: ImportError::MissingExtents,
                ..
            }
        ));
        assert!(batch.output_file_name().is_none());
        assert!(batch.suggested_translation().is_none());
    }

    #[test]
    fn points_deduplicate_across_files_and_ids_continue() {
        let mut first = drawing_with_layers(&[("grenze", 0x0000ff)]);
        first.push_entity(line("grenze", &[(0.0, 0.0), (5.0, 5.0)]));
        let mut second = drawing_with_layers(&[("grenze", 0x0000ff)]);
        second.set_extents(Point2::new(-3.5, 2.25), Point2::new(20.0, 80.0));
        second.push_entity(line("grenze", &[(5.0, 5.0), (9.0, 9.0)]));

        let mut batch = ImportBatch::new();
        batch.ingest("nord", &first).expect("first");
        batch.ingest("sued", &second).expect("second");

        assert_eq!(batch.points().len(), 3);
        assert_eq!(batch.segments()[1].id, "L1L1");
        assert_eq!(batch.segments()[1].start, "PL0L1G");
        assert_eq!(batch.output_file_name().as_deref(), Some("nordsued.ggb"));
        assert_eq!(batch.bounds().min(), Point2::new(-3.5, 0.0));
        assert_eq!(batch.bounds().max(), Point2::new(100.0, 80.0));
        assert_eq!(
            batch.suggested_translation(),
            Some(Translation::new(-4.0, 0.0))
        );
    }

    #[test]
    fn insert_in_later_file_replaces_placeholder_vertex() {
        let mut first = drawing_with_layers(&[("grenze", 0x0000ff)]);
        first.push_entity(line("grenze", &[(0.0, 0.0), (5.0, 5.0)]));
        let mut second = drawing_with_layers(&[("L1", 0xff0000)]);
        second.add_block(BlockRecord {
            name: "ABM_1110".to_string(),
            name2: Some("GP 17".to_string()),
            layer: "L1".to_string(),
        });
        second.push_entity(insert("L1", "ABM_1110", 5.0, 5.0));

        let mut batch = ImportBatch::new();
        batch.ingest("a", &first).expect("first");
        let summary = batch.ingest("b", &second).expect("second");
        assert_eq!(summary.points, 1);
        assert_eq!(summary.duplicate_inserts, 0);
        assert_eq!(batch.points().len(), 2);

        let point = batch.points().get("PL0L1G").expect("kept id");
        assert_eq!(point.entry_type, "INSERT L1 ABM_1110");
        assert_eq!(point.layer, "L1");
        assert_eq!(point.subtype_name, "Grenzstein");
        assert_eq!(point.comment.as_deref(), Some("GP 17"));
        assert_eq!(batch.segments()[0].end, "PL0L1G");

        assert_eq!(
            batch.layers().get("INSERT L1 ABM_1110").map(|e| e.occurrences),
            Some(1)
        );
        assert_eq!(
            batch
                .layers()
                .get("INSERT linienpunkt_sonstiger UNBEKANNT")
                .map(|e| e.occurrences),
            Some(1)
        );

        let markup = crate::render_markup(
            &batch,
            &batch.default_styles(),
            Translation::new(0.0, 0.0),
            crate::ViewLayout::default(),
        )
        .expect("render");
        assert!(markup.contains("<caption val=\"Grenzstein (L1)\"/>"), "{markup}");
    }

    #[test]
    fn default_styles_cover_every_classification() {
        let mut drawing = drawing_with_layers(&[("grenze", 0x0000ff), ("text", 0xffffff)]);
        drawing.push_entity(line("grenze", &[(0.0, 0.0), (5.0, 5.0)]));
        drawing.push_entity(DxfEntity::new(
            "text",
            EntityBody::Text {
                start: Point2::new(1.0, 1.0),
                text: "Flur 3".to_string(),
            },
        ));
        drawing.push_entity(DxfEntity::new(
            "grenze",
            EntityBody::Other {
                kind: "CIRCLE".to_string(),
            },
        ));
        let mut batch = ImportBatch::new();
        let summary = batch.ingest("a", &drawing).expect("ingest");
        assert_eq!(summary.ignored, 1);
        assert_eq!(batch.texts()[0].id, "T0");

        let sheet = batch.default_styles();
        let keys: Vec<_> = sheet.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "CIRCLE grenze",
                "INSERT linienpunkt_sonstiger UNBEKANNT",
                "LINE grenze",
                "TEXT text",
            ]
        );
        let line_style = sheet.get("LINE grenze").expect("line style");
        assert_eq!(line_style.size, 2);
        assert_eq!(line_style.color.to_string(), "#0000ff");
        let synthesized = sheet
            .get("INSERT linienpunkt_sonstiger UNBEKANNT")
            .expect("synthesized style");
        assert_eq!(synthesized.size, 3);
        assert_eq!(sheet.translation, Some(Translation::new(0.0, 0.0)));
    }
}
