use dxf2ggb_config::ConfigError;
use dxf2ggb_core::style::StyleError;
use dxf2ggb_engine::errors::{MarkupError, RegistryError};
use dxf2ggb_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("没有指定输入文件")]
    NoInput,
    #[error("全部 {failed} 个输入文件都未能导入")]
    NothingImported { failed: usize },
    #[error("内部错误: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error("生成 GGB 标记失败: {0}")]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Io(#[from] IoError),
}
