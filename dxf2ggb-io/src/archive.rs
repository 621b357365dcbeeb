//! GGB 打包：GeoGebra 文件是仅含 `geogebra.xml` 的 zip 归档。

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::IoError;

pub const GEOGEBRA_ENTRY: &str = "geogebra.xml";

/// 接收序列化好的标记文本与目标文件名。
pub trait MarkupSink {
    fn accept(&self, markup: &str, file_name: &str) -> Result<(), IoError>;
}

#[derive(Debug, Clone)]
pub struct GgbArchiveWriter {
    directory: PathBuf,
}

impl GgbArchiveWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }
}

impl MarkupSink for GgbArchiveWriter {
    fn accept(&self, markup: &str, file_name: &str) -> Result<(), IoError> {
        let path = self.path_for(file_name);
        let write_error = |source| IoError::WriteError {
            path: path.clone(),
            source,
        };
        let archive_error = |source| IoError::Archive {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.directory).map_err(write_error)?;
        let file = File::create(&path).map_err(write_error)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(GEOGEBRA_ENTRY, options)
            .map_err(archive_error)?;
        zip.write_all(markup.as_bytes()).map_err(write_error)?;
        zip.finish().map_err(archive_error)?;

        info!(path = %path.display(), bytes = markup.len(), "GGB 文件已写出");
        Ok(())
    }
}
