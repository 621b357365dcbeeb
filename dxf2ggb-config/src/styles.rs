//! 样式表文件：TOML 格式，键为分类键。

use std::fs;
use std::path::Path;

use dxf2ggb_core::style::{StyleSheet, StyleSheetPatch};

use crate::ConfigError;

/// 读取并校验样式表。条目可以只写部分字段，给出的符号代码和尺寸按实体类型检查。
pub fn load_style_sheet(path: impl AsRef<Path>) -> Result<StyleSheetPatch, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sheet: StyleSheetPatch = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    sheet.validate().map_err(|source| ConfigError::Style {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sheet)
}

pub fn save_style_sheet(sheet: &StyleSheet, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let content = toml::to_string_pretty(sheet).map_err(|source| ConfigError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
