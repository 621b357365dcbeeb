pub mod model;
pub mod style;

pub mod layout {
    use serde::{Deserialize, Serialize};

    /// GeoGebra 输出画布尺寸与四周留白（像素）。配置文件 `[view]` 直接映射到此结构。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct ViewLayout {
        pub panel_width: u32,
        pub panel_height: u32,
        pub inset_left: u32,
        pub inset_right: u32,
        pub inset_top: u32,
        pub inset_bottom: u32,
    }

    impl Default for ViewLayout {
        fn default() -> Self {
            Self {
                panel_width: 570,
                panel_height: 440,
                inset_left: 50,
                inset_right: 10,
                inset_top: 10,
                inset_bottom: 40,
            }
        }
    }

    impl ViewLayout {
        #[inline]
        pub fn x_zero(&self) -> u32 {
            self.inset_left
        }

        #[inline]
        pub fn y_zero(&self) -> u32 {
            self.panel_height.saturating_sub(self.inset_bottom)
        }

        /// 去掉左右留白后的可用宽度，可能为负。
        pub fn usable_width(&self) -> f64 {
            f64::from(self.panel_width) - f64::from(self.inset_left) - f64::from(self.inset_right)
        }

        pub fn usable_height(&self) -> f64 {
            f64::from(self.panel_height) - f64::from(self.inset_bottom) - f64::from(self.inset_top)
        }
    }
}

pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，保持 DXF 原始双精度坐标。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        /// 各分量向下取整，用于生成默认平移量。
        #[inline]
        pub fn floor(self) -> Self {
            Self(self.0.floor())
        }
    }

    /// 轴对齐边界框。导入批次中只增不减，由各文件头部的范围累积而来。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        /// 尚未纳入任何范围。注意：倒置的范围（min > max）并不算空。
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() == f64::INFINITY
                && self.min.y() == f64::INFINITY
                && self.max.x() == f64::NEG_INFINITY
                && self.max.y() == f64::NEG_INFINITY
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            self.max.x() - self.min.x()
        }

        #[inline]
        pub fn height(&self) -> f64 {
            self.max.y() - self.min.y()
        }

        /// 左下角只与 `min` 比较，右上角只与 `max` 比较，
        /// 与 DXF 头部 `$EXTMIN`/`$EXTMAX` 的语义一致。
        pub fn include_extents(&mut self, min: Point2, max: Point2) {
            self.min = Point2::from_vec(self.min.as_vec2().min(min.as_vec2()));
            self.max = Point2::from_vec(self.max.as_vec2().max(max.as_vec2()));
        }
    }

    impl Default for Bounds2D {
        fn default() -> Self {
            Self::empty()
        }
    }

}

pub mod drawing {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::Point2;

    /// 头部 `$EXTMIN`/`$EXTMAX` 给出的图形范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Extents {
        pub min: Point2,
        pub max: Point2,
    }

    /// 图层表中的一条记录，`color` 为 24 位 RGB（0xRRGGBB）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct LayerRecord {
        pub name: String,
        pub color: Option<u32>,
    }

    /// 块表中的一条记录。`name2` 对应组码 3，测量数据在此存放点的备注。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct BlockRecord {
        pub name: String,
        pub name2: Option<String>,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum PolylineSource {
        Line,
        LwPolyline,
    }

    /// 实体的具体内容。只区分转换关心的几类，其余实体仅保留类型名。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum EntityBody {
        Insert {
            block: String,
            position: Point2,
        },
        Polyline {
            source: PolylineSource,
            vertices: Vec<Point2>,
        },
        Text {
            start: Point2,
            text: String,
        },
        Other {
            kind: String,
        },
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct DxfEntity {
        pub layer: String,
        pub body: EntityBody,
    }

    impl DxfEntity {
        #[inline]
        pub fn new(layer: impl Into<String>, body: EntityBody) -> Self {
            Self {
                layer: layer.into(),
                body,
            }
        }
    }

    /// DXF 解析器交付的类型化实体树。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Drawing {
        extent_min: Option<Point2>,
        extent_max: Option<Point2>,
        layers: HashMap<String, LayerRecord>,
        blocks: HashMap<String, BlockRecord>,
        entities: Vec<DxfEntity>,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        /// 两个角点都存在时才返回范围。
        #[inline]
        pub fn extents(&self) -> Option<Extents> {
            match (self.extent_min, self.extent_max) {
                (Some(min), Some(max)) => Some(Extents { min, max }),
                _ => None,
            }
        }

        pub fn set_extent_min(&mut self, min: Point2) {
            self.extent_min = Some(min);
        }

        pub fn set_extent_max(&mut self, max: Point2) {
            self.extent_max = Some(max);
        }

        pub fn set_extents(&mut self, min: Point2, max: Point2) {
            self.extent_min = Some(min);
            self.extent_max = Some(max);
        }

        pub fn add_layer(&mut self, layer: LayerRecord) {
            self.layers.insert(layer.name.clone(), layer);
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&LayerRecord> {
            self.layers.get(name)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &LayerRecord> {
            self.layers.values()
        }

        pub fn add_block(&mut self, block: BlockRecord) {
            self.blocks.insert(block.name.clone(), block);
        }

        #[inline]
        pub fn block(&self, name: &str) -> Option<&BlockRecord> {
            self.blocks.get(name)
        }

        #[inline]
        pub fn blocks(&self) -> impl Iterator<Item = &BlockRecord> {
            self.blocks.values()
        }

        pub fn push_entity(&mut self, entity: DxfEntity) {
            self.entities.push(entity);
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &DxfEntity> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }
    }

}
