//! 几何调和：先对单个文件做只读规划，解决全部可能失败的查找，
//! 再一次性写入批次；随后逐条折线生成线段并补齐缺失的端点。

use std::collections::HashSet;

use dxf2ggb_core::{
    drawing::{Drawing, EntityBody, Extents},
    geometry::Point2,
    model::{EntryType, Segment, Text},
};
use tracing::{debug, warn};

use crate::batch::ImportBatch;
use crate::classify::{self, synthesized_entry_type, synthesized_key};
use crate::errors::{ImportError, RegistryError};
use crate::key::GeometricKey;
use crate::layers::LayerStyleRegistry;
use crate::registry::NewPoint;

/// 单个文件的处理统计。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub source: String,
    pub points: usize,
    pub duplicate_inserts: usize,
    pub texts: usize,
    pub polylines: usize,
    pub segments: usize,
    pub synthesized: usize,
    pub ignored: usize,
}

#[derive(Debug)]
enum Planned {
    Point {
        position: Point2,
        layer: String,
        subtype_id: String,
        subtype_name: String,
        comment: Option<String>,
    },
    Text {
        position: Point2,
        text: String,
        layer: String,
    },
    Polyline {
        layer: String,
        vertices: Vec<Point2>,
    },
    Ignored,
}

/// 已通过全部查找的文件内容，`apply` 只会因注册表缺陷失败。
#[derive(Debug)]
pub struct FilePlan {
    source: String,
    extents: Extents,
    new_types: Vec<EntryType>,
    entities: Vec<(String, Planned)>,
}

impl FilePlan {
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// 只读地检查文件：图层颜色、块信息与范围缺失都在这里报告，批次保持不变。
pub fn plan_file(
    source: &str,
    drawing: &Drawing,
    layers: &LayerStyleRegistry,
) -> Result<FilePlan, ImportError> {
    let extents = drawing.extents().ok_or(ImportError::MissingExtents)?;
    let mut new_types = Vec::new();
    let mut planned_keys: HashSet<String> = HashSet::new();
    let mut entities = Vec::with_capacity(drawing.entity_count());

    for entity in drawing.entities() {
        let classification = classify::classify(entity);
        let key = classification.key();
        // 颜色只在分类首次出现时读取。
        if !layers.contains(&key) && !planned_keys.contains(&key) {
            let color = classify::layer_color(drawing, &classification.layer)?;
            planned_keys.insert(key.clone());
            new_types.push(classification.clone().with_color(color));
        }

        let planned = match &entity.body {
            EntityBody::Insert { block, position } => {
                let record = drawing
                    .block(block)
                    .ok_or_else(|| ImportError::MissingBlock {
                        block: block.clone(),
                    })?;
                let comment = if record.layer == entity.layer {
                    record.name2.clone()
                } else {
                    None
                };
                Planned::Point {
                    position: *position,
                    layer: entity.layer.clone(),
                    subtype_id: block.clone(),
                    subtype_name: classification.subtype_name.clone().unwrap_or_default(),
                    comment,
                }
            }
            EntityBody::Text { start, text } => Planned::Text {
                position: *start,
                text: text.clone(),
                layer: entity.layer.clone(),
            },
            EntityBody::Polyline { vertices, .. } => Planned::Polyline {
                layer: entity.layer.clone(),
                vertices: vertices.clone(),
            },
            EntityBody::Other { .. } => Planned::Ignored,
        };
        entities.push((key, planned));
    }

    Ok(FilePlan {
        source: source.to_string(),
        extents,
        new_types,
        entities,
    })
}

struct BufferedPolyline {
    id: String,
    entry_type: String,
    layer: String,
    vertices: Vec<Point2>,
}

/// 将规划写入批次。按文件顺序登记点和文字，折线先缓存，最后统一分段。
pub fn apply_plan(batch: &mut ImportBatch, plan: FilePlan) -> Result<FileSummary, RegistryError> {
    let FilePlan {
        source,
        extents,
        new_types,
        entities,
    } = plan;
    let mut summary = FileSummary {
        source,
        ..FileSummary::default()
    };

    batch.bounds.include_extents(extents.min, extents.max);
    for entry_type in new_types {
        batch.layers.register(entry_type);
    }

    let mut polylines = Vec::new();
    for (key, planned) in entities {
        batch.layers.record(&key);
        match planned {
            Planned::Point {
                position,
                layer,
                subtype_id,
                subtype_name,
                comment,
            } => {
                let geometric = GeometricKey::from(position);
                let point = NewPoint {
                    position,
                    entry_type: key,
                    layer,
                    subtype_id,
                    subtype_name,
                    comment,
                };
                if let Some(existing) = batch.points.lookup(&geometric).map(str::to_string) {
                    if batch.points.is_synthesized(&existing) {
                        // 早先文件的折线顶点在此补过占位点，改为真实的点。
                        batch.points.promote(&existing, point)?;
                        batch.layers.release(&synthesized_key());
                        debug!(
                            source = %summary.source,
                            position = %geometric,
                            id = %existing,
                            "占位点由 INSERT 取代"
                        );
                        summary.points += 1;
                        continue;
                    }
                    warn!(
                        source = %summary.source,
                        position = %geometric,
                        existing = %existing,
                        "重复的 INSERT 坐标，沿用已有点"
                    );
                    summary.duplicate_inserts += 1;
                    continue;
                }
                batch.points.insert(point)?;
                summary.points += 1;
            }
            Planned::Text {
                position,
                text,
                layer,
            } => {
                let id = format!("T{}", batch.texts.len());
                batch.texts.push(Text {
                    id,
                    position,
                    text,
                    entry_type: key,
                    layer,
                });
                summary.texts += 1;
            }
            Planned::Polyline { layer, vertices } => {
                let id = format!("L{}", batch.polyline_count);
                batch.polyline_count += 1;
                polylines.push(BufferedPolyline {
                    id,
                    entry_type: key,
                    layer,
                    vertices,
                });
                summary.polylines += 1;
            }
            Planned::Ignored => summary.ignored += 1,
        }
    }

    for polyline in polylines {
        segment_polyline(batch, polyline, &mut summary)?;
    }

    debug!(
        source = %summary.source,
        points = summary.points,
        texts = summary.texts,
        segments = summary.segments,
        synthesized = summary.synthesized,
        "文件调和完成"
    );
    Ok(summary)
}

/// n 个顶点产生 n-1 条线段，不会自动闭合。
fn segment_polyline(
    batch: &mut ImportBatch,
    polyline: BufferedPolyline,
    summary: &mut FileSummary,
) -> Result<(), RegistryError> {
    for (index, pair) in polyline.vertices.windows(2).enumerate() {
        let segment_id = format!("{}L{}", polyline.id, index + 1);
        let start = resolve_endpoint(batch, pair[0], &format!("{segment_id}S"), summary)?;
        let end = resolve_endpoint(batch, pair[1], &format!("{segment_id}G"), summary)?;
        batch.segments.push(Segment {
            id: segment_id,
            start,
            end,
            entry_type: polyline.entry_type.clone(),
            layer: polyline.layer.clone(),
        });
        summary.segments += 1;
    }
    Ok(())
}

fn resolve_endpoint(
    batch: &mut ImportBatch,
    position: Point2,
    handle: &str,
    summary: &mut FileSummary,
) -> Result<String, RegistryError> {
    if let Some(existing) = batch.points.lookup(&GeometricKey::from(position)) {
        return Ok(existing.to_string());
    }
    let id = batch.points.synthesize(position, handle)?;
    batch.layers.register(synthesized_entry_type());
    batch.layers.record(&synthesized_key());
    summary.synthesized += 1;
    Ok(id)
}
