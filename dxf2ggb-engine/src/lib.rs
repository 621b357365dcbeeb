pub mod batch;
pub mod classify;
pub mod layers;
pub mod markup;
pub mod reconcile;
pub mod registry;
pub mod view;

pub use batch::ImportBatch;
pub use markup::render_markup;
pub use reconcile::FileSummary;
pub use view::{ViewFitter, ViewLayout, ViewTransform};

pub mod errors {
    use thiserror::Error;

    /// 输入缺陷：只影响当前文件，批次中的其他文件继续处理。
    #[derive(Debug, Error, Clone, PartialEq)]
    pub enum ImportError {
        #[error("layer {layer:?} is not defined in the layer table")]
        MissingLayer { layer: String },
        #[error("layer {layer:?} has no color")]
        MissingLayerColor { layer: String },
        #[error("INSERT references unknown block {block:?}")]
        MissingBlock { block: String },
        #[error("header does not define $EXTMIN/$EXTMAX")]
        MissingExtents,
    }

    /// 注册表缺陷：说明调和逻辑本身有误，必须中止整个批次。
    #[derive(Debug, Error, Clone, PartialEq)]
    pub enum RegistryError {
        #[error("coordinate {key} is already registered as point {existing}")]
        DuplicateKey { key: String, existing: String },
        #[error("point id {0} is already taken")]
        DuplicateId(String),
        #[error("segment {segment} references unknown point {point}")]
        UnresolvedPoint { segment: String, point: String },
    }

    #[derive(Debug, Error)]
    pub enum IngestError {
        #[error("{source_name}: {source}")]
        Input {
            source_name: String,
            #[source]
            source: ImportError,
        },
        #[error(transparent)]
        Registry(#[from] RegistryError),
    }

    impl IngestError {
        /// 输入缺陷可跳过该文件继续，注册表缺陷不可。
        #[inline]
        pub fn is_recoverable(&self) -> bool {
            matches!(self, IngestError::Input { .. })
        }
    }

    #[derive(Debug, Error, Clone, PartialEq)]
    pub enum ViewFitError {
        #[error("no input file contributed drawing extents")]
        EmptyExtent,
        #[error("drawing width {width} is not positive")]
        DegenerateWidth { width: f64 },
        #[error("drawing height {height} is not positive")]
        DegenerateHeight { height: f64 },
        #[error("panel {width}x{height} leaves no room inside its insets")]
        PanelTooSmall { width: u32, height: u32 },
    }

    #[derive(Debug, Error, Clone, PartialEq)]
    pub enum MarkupError {
        #[error("no style configured for {key:?} (needed by {element})")]
        MissingStyle { key: String, element: String },
        #[error("segment {segment} references unknown point {point}")]
        DanglingSegment { segment: String, point: String },
        #[error(transparent)]
        View(#[from] ViewFitError),
    }
}

pub mod key {
    use std::fmt;

    use dxf2ggb_core::geometry::Point2;

    /// 坐标的规范化比较键：按位相等即为同一点，不做容差比较。
    /// `-0.0` 归一为 `0.0`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GeometricKey {
        x: u64,
        y: u64,
    }

    impl GeometricKey {
        pub fn new(x: f64, y: f64) -> Self {
            Self {
                x: canonical_bits(x),
                y: canonical_bits(y),
            }
        }

        #[inline]
        pub fn x(&self) -> f64 {
            f64::from_bits(self.x)
        }

        #[inline]
        pub fn y(&self) -> f64 {
            f64::from_bits(self.y)
        }
    }

    impl From<Point2> for GeometricKey {
        fn from(point: Point2) -> Self {
            Self::new(point.x(), point.y())
        }
    }

    impl fmt::Display for GeometricKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{},{}", self.x(), self.y())
        }
    }

    fn canonical_bits(value: f64) -> u64 {
        if value == 0.0 {
            0.0f64.to_bits()
        } else if value.is_nan() {
            f64::NAN.to_bits()
        } else {
            value.to_bits()
        }
    }

}
