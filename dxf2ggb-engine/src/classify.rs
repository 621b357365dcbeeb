//! 实体分类：把 DXF 实体映射为 `(kind, layer, subtype)` 三元组。

use dxf2ggb_core::{
    drawing::{Drawing, DxfEntity, EntityBody},
    model::{EntityKind, EntryType, entry_type_key},
    style::Rgb,
};

use crate::errors::ImportError;

/// 块名中的点位标记前缀，查表前去掉。
pub const SUBTYPE_PREFIX: &str = "ABM_";

const SUBTYPE_NAMES: [(&str, &str); 12] = [
    ("1000", "allgemeineMarke"),
    ("1200", "Rohr"),
    ("1120", "unbehauenerFeldstein"),
    ("1110", "Grenzstein"),
    ("1650", "Klebemarke"),
    ("1500", "Pfahl"),
    ("1655", "Schlagmarke"),
    ("1400", "Meisselzeichen"),
    ("1300", "Nagel"),
    ("9500", "ohneMarke"),
    ("9998", "NachQuellangabenNichtZuSpezifizieren"),
    ("9600", "AbmarkungZeitweiligAusgesetzt"),
];

pub const SYNTHESIZED_LAYER: &str = "linienpunkt_sonstiger";
pub const SYNTHESIZED_SUBTYPE_ID: &str = "UNBEKANNT";
pub const SYNTHESIZED_SUBTYPE_NAME: &str = "Unbekannt";
pub const SYNTHESIZED_COLOR: Rgb = Rgb::new(0xdb, 0xdb, 0xdb);

/// 查不到的代码原样返回（包括前缀）。
pub fn subtype_name(code: &str) -> String {
    let stripped = code.strip_prefix(SUBTYPE_PREFIX).unwrap_or(code);
    SUBTYPE_NAMES
        .iter()
        .find(|(id, _)| *id == stripped)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// 分类结果，尚未附带显示颜色。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: EntityKind,
    pub layer: String,
    pub subtype_id: Option<String>,
    pub subtype_name: Option<String>,
}

impl Classification {
    pub fn key(&self) -> String {
        entry_type_key(&self.kind, &self.layer, self.subtype_id.as_deref())
    }

    pub fn with_color(self, display_color: Rgb) -> EntryType {
        EntryType {
            kind: self.kind,
            layer: self.layer,
            subtype_id: self.subtype_id,
            subtype_name: self.subtype_name,
            display_color,
        }
    }
}

pub fn classify(entity: &DxfEntity) -> Classification {
    let kind = EntityKind::from(&entity.body);
    let (subtype_id, subtype_name) = match &entity.body {
        EntityBody::Insert { block, .. } => (Some(block.clone()), Some(subtype_name(block))),
        _ => (None, None),
    };
    Classification {
        kind,
        layer: entity.layer.clone(),
        subtype_id,
        subtype_name,
    }
}

/// 由折线顶点补出的点共用的固定分类。
pub fn synthesized_entry_type() -> EntryType {
    EntryType {
        kind: EntityKind::Insert,
        layer: SYNTHESIZED_LAYER.to_string(),
        subtype_id: Some(SYNTHESIZED_SUBTYPE_ID.to_string()),
        subtype_name: Some(SYNTHESIZED_SUBTYPE_NAME.to_string()),
        display_color: SYNTHESIZED_COLOR,
    }
}

pub fn synthesized_key() -> String {
    entry_type_key(
        &EntityKind::Insert,
        SYNTHESIZED_LAYER,
        Some(SYNTHESIZED_SUBTYPE_ID),
    )
}

/// 从图层表读取显示颜色。
pub fn layer_color(drawing: &Drawing, layer: &str) -> Result<Rgb, ImportError> {
    let record = drawing
        .layer(layer)
        .ok_or_else(|| ImportError::MissingLayer {
            layer: layer.to_string(),
        })?;
    record
        .color
        .map(Rgb::from_u24)
        .ok_or_else(|| ImportError::MissingLayerColor {
            layer: layer.to_string(),
        })
}
