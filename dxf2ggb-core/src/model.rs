use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drawing::{EntityBody, PolylineSource};
use crate::geometry::Point2;
use crate::style::{Rgb, StyleFamily};

/// DXF 实体类型。只有前四种参与转换，其余保留原始名称以便分类展示。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Insert,
    Line,
    LwPolyline,
    Text,
    Other(String),
}

impl EntityKind {
    pub fn from_dxf_name(name: &str) -> Self {
        match name {
            "INSERT" => EntityKind::Insert,
            "LINE" => EntityKind::Line,
            "LWPOLYLINE" => EntityKind::LwPolyline,
            "TEXT" => EntityKind::Text,
            other => EntityKind::Other(other.to_string()),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Insert => "INSERT",
            EntityKind::Line => "LINE",
            EntityKind::LwPolyline => "LWPOLYLINE",
            EntityKind::Text => "TEXT",
            EntityKind::Other(name) => name,
        }
    }

    /// INSERT 与 TEXT 以点样式呈现，其余一律按线样式。
    #[inline]
    pub fn family(&self) -> StyleFamily {
        match self {
            EntityKind::Insert | EntityKind::Text => StyleFamily::Point,
            _ => StyleFamily::Line,
        }
    }
}

impl From<&EntityBody> for EntityKind {
    fn from(body: &EntityBody) -> Self {
        match body {
            EntityBody::Insert { .. } => EntityKind::Insert,
            EntityBody::Polyline {
                source: PolylineSource::Line,
                ..
            } => EntityKind::Line,
            EntityBody::Polyline {
                source: PolylineSource::LwPolyline,
                ..
            } => EntityKind::LwPolyline,
            EntityBody::Text { .. } => EntityKind::Text,
            EntityBody::Other { kind } => EntityKind::from_dxf_name(kind),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 图层分类：同一来源图层、实体类型与子类型的几何共享一套样式。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryType {
    pub kind: EntityKind,
    pub layer: String,
    pub subtype_id: Option<String>,
    pub subtype_name: Option<String>,
    pub display_color: Rgb,
}

impl EntryType {
    /// 分类键 `"<kind> <layer>[ <subtypeId>]"`。
    pub fn key(&self) -> String {
        entry_type_key(&self.kind, &self.layer, self.subtype_id.as_deref())
    }

    /// 面向用户的名称 `"<kind> <layer>[ <subtypeName>]"`。
    pub fn label(&self) -> String {
        match &self.subtype_name {
            Some(name) => format!("{} {} {}", self.kind, self.layer, name),
            None => format!("{} {}", self.kind, self.layer),
        }
    }
}

pub fn entry_type_key(kind: &EntityKind, layer: &str, subtype_id: Option<&str>) -> String {
    match subtype_id {
        Some(id) => format!("{kind} {layer} {id}"),
        None => format!("{kind} {layer}"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub position: Point2,
    pub entry_type: String,
    pub layer: String,
    pub subtype_id: String,
    pub subtype_name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub id: String,
    pub position: Point2,
    pub text: String,
    pub entry_type: String,
    pub layer: String,
}

/// (多段)线上相邻两个顶点之间的一条边，端点以点 id 引用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub start: String,
    pub end: String,
    pub entry_type: String,
    pub layer: String,
}
