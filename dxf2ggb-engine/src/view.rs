use dxf2ggb_core::geometry::Bounds2D;
pub use dxf2ggb_core::layout::ViewLayout;

use crate::errors::ViewFitError;

/// 画布原点与统一缩放比例。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub panel_width: u32,
    pub panel_height: u32,
    pub x_zero: u32,
    pub y_zero: u32,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewFitter {
    layout: ViewLayout,
}

impl ViewFitter {
    pub fn new(layout: ViewLayout) -> Self {
        Self { layout }
    }

    #[inline]
    pub fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    /// 取横纵两个方向缩放的较小值，保持纵横比且任一方向都不溢出。
    pub fn fit(&self, bounds: &Bounds2D) -> Result<ViewTransform, ViewFitError> {
        if bounds.is_empty() {
            return Err(ViewFitError::EmptyExtent);
        }
        let layout = &self.layout;
        let usable_width = layout.usable_width();
        let usable_height = layout.usable_height();
        if usable_width <= 0.0 || usable_height <= 0.0 {
            return Err(ViewFitError::PanelTooSmall {
                width: layout.panel_width,
                height: layout.panel_height,
            });
        }

        let width = bounds.width();
        if !(width > 0.0 && width.is_finite()) {
            return Err(ViewFitError::DegenerateWidth { width });
        }
        let height = bounds.height();
        if !(height > 0.0 && height.is_finite()) {
            return Err(ViewFitError::DegenerateHeight { height });
        }

        let scale = (usable_width / width).min(usable_height / height);
        Ok(ViewTransform {
            panel_width: layout.panel_width,
            panel_height: layout.panel_height,
            x_zero: layout.x_zero(),
            y_zero: layout.y_zero(),
            scale,
        })
    }
}
