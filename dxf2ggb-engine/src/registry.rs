use std::collections::HashMap;

use dxf2ggb_core::{geometry::Point2, model::Point};
use indexmap::IndexMap;

use crate::classify::{
    SYNTHESIZED_LAYER, SYNTHESIZED_SUBTYPE_ID, SYNTHESIZED_SUBTYPE_NAME, synthesized_key,
};
use crate::errors::RegistryError;
use crate::key::GeometricKey;

/// 待登记的 INSERT 点，id 由注册表分配。
#[derive(Debug, Clone, PartialEq)]
pub struct NewPoint {
    pub position: Point2,
    pub entry_type: String,
    pub layer: String,
    pub subtype_id: String,
    pub subtype_name: String,
    pub comment: Option<String>,
}

/// 批次内全部输出点。点的身份是位置：同一坐标只会登记一次。
#[derive(Debug, Default)]
pub struct PointRegistry {
    points: IndexMap<String, Point>,
    by_position: HashMap<GeometricKey, String>,
}

impl PointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lookup(&self, key: &GeometricKey) -> Option<&str> {
        self.by_position.get(key).map(String::as_str)
    }

    /// 分配 `P<n>`（n 为当前点数）。调用方须先 `lookup`，坐标已存在时返回错误。
    pub fn insert(&mut self, point: NewPoint) -> Result<String, RegistryError> {
        let id = format!("P{}", self.points.len());
        self.store(Point {
            id,
            position: point.position,
            entry_type: point.entry_type,
            layer: point.layer,
            subtype_id: point.subtype_id,
            subtype_name: point.subtype_name,
            comment: point.comment,
        })
    }

    /// 为没有对应 INSERT 的折线顶点补一个点，id 为 `P<handle>`。
    pub fn synthesize(&mut self, position: Point2, handle: &str) -> Result<String, RegistryError> {
        self.store(Point {
            id: format!("P{handle}"),
            position,
            entry_type: synthesized_key(),
            layer: SYNTHESIZED_LAYER.to_string(),
            subtype_id: SYNTHESIZED_SUBTYPE_ID.to_string(),
            subtype_name: SYNTHESIZED_SUBTYPE_NAME.to_string(),
            comment: None,
        })
    }

    /// `id` 是否为折线顶点补出的占位点。
    pub fn is_synthesized(&self, id: &str) -> bool {
        self.points
            .get(id)
            .is_some_and(|point| point.entry_type == synthesized_key())
    }

    /// 用 INSERT 的分类替换补出的占位点；id 与登记顺序不变，已有线段仍能解析。
    /// 目标不存在、不是占位点或坐标不一致时返回错误。
    pub fn promote(&mut self, id: &str, point: NewPoint) -> Result<(), RegistryError> {
        let key = GeometricKey::from(point.position);
        let placeholder = self.lookup(&key) == Some(id) && self.is_synthesized(id);
        match self.points.get_mut(id) {
            Some(existing) if placeholder => {
                existing.entry_type = point.entry_type;
                existing.layer = point.layer;
                existing.subtype_id = point.subtype_id;
                existing.subtype_name = point.subtype_name;
                existing.comment = point.comment;
                Ok(())
            }
            _ => Err(RegistryError::DuplicateKey {
                key: key.to_string(),
                existing: id.to_string(),
            }),
        }
    }

    fn store(&mut self, point: Point) -> Result<String, RegistryError> {
        let key = GeometricKey::from(point.position);
        if let Some(existing) = self.by_position.get(&key) {
            return Err(RegistryError::DuplicateKey {
                key: key.to_string(),
                existing: existing.clone(),
            });
        }
        if self.points.contains_key(&point.id) {
            return Err(RegistryError::DuplicateId(point.id));
        }
        let id = point.id.clone();
        self.by_position.insert(key, id.clone());
        self.points.insert(id.clone(), point);
        Ok(id)
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Point> {
        self.points.get(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.points.contains_key(id)
    }

    /// 按登记顺序遍历。
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_at(x: f64, y: f64) -> NewPoint {
        NewPoint {
            position: Point2::new(x, y),
            entry_type: "INSERT L1 ABM_1000".to_string(),
            layer: "L1".to_string(),
            subtype_id: "ABM_1000".to_string(),
            subtype_name: "allgemeineMarke".to_string(),
            comment: None,
        }
    }

    #[test]
    fn ids_follow_registry_size() {
        let mut registry = PointRegistry::new();
        assert_eq!(registry.insert(insert_at(0.0, 0.0)), Ok("P0".to_string()));
        let synthesized = registry
            .synthesize(Point2::new(1.0, 1.0), "L0L1G")
            .expect("synthesize");
        assert_eq!(synthesized, "PL0L1G");
        assert_eq!(registry.insert(insert_at(2.0, 2.0)), Ok("P2".to_string()));

        let order: Vec<_> = registry.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["P0", "PL0L1G", "P2"]);
        assert_eq!(
            registry.lookup(&GeometricKey::new(1.0, 1.0)),
            Some("PL0L1G")
        );
        assert_eq!(
            registry.get("PL0L1G").map(|p| p.entry_type.as_str()),
            Some("INSERT linienpunkt_sonstiger UNBEKANNT")
        );
    }

    #[test]
    fn reinserting_a_position_is_a_defect() {
        let mut registry = PointRegistry::new();
        registry.insert(insert_at(5.0, 5.0)).expect("first insert");
        let err = registry
            .synthesize(Point2::new(5.0, 5.0), "L0L1S")
            .expect_err("duplicate position");
        assert_eq!(
            err,
            RegistryError::DuplicateKey {
                key: "5,5".to_string(),
                existing: "P0".to_string(),
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn placeholder_can_be_promoted_once() {
        let mut registry = PointRegistry::new();
        registry.insert(insert_at(0.0, 0.0)).expect("insert");
        registry
            .synthesize(Point2::new(5.0, 5.0), "L0L1G")
            .expect("synthesize");
        assert!(registry.is_synthesized("PL0L1G"));
        assert!(!registry.is_synthesized("P0"));

        let mut mark = insert_at(5.0, 5.0);
        mark.comment = Some("GP 17".to_string());
        registry.promote("PL0L1G", mark).expect("promote");

        let point = registry.get("PL0L1G").expect("same id");
        assert_eq!(point.entry_type, "INSERT L1 ABM_1000");
        assert_eq!(point.subtype_name, "allgemeineMarke");
        assert_eq!(point.comment.as_deref(), Some("GP 17"));
        assert_eq!(registry.lookup(&GeometricKey::new(5.0, 5.0)), Some("PL0L1G"));
        assert_eq!(registry.len(), 2);

        assert!(registry.promote("PL0L1G", insert_at(5.0, 5.0)).is_err());
        assert!(registry.promote("P0", insert_at(0.0, 0.0)).is_err());
        assert!(registry.promote("PL0L1G", insert_at(6.0, 6.0)).is_err());
    }

    #[test]
    fn reusing_a_handle_is_a_defect() {
        let mut registry = PointRegistry::new();
        registry
            .synthesize(Point2::new(0.0, 0.0), "L0L1S")
            .expect("first");
        let err = registry
            .synthesize(Point2::new(9.0, 9.0), "L0L1S")
            .expect_err("same handle");
        assert_eq!(err, RegistryError::DuplicateId("PL0L1S".to_string()));
    }
}
