use std::path::{Path, PathBuf};

use dxf2ggb_core::drawing::Drawing;
use dxf2ggb_engine::{FileSummary, ImportBatch, errors::IngestError};
use dxf2ggb_io::{DocumentLoader, DxfFacade, IoError};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 一个输入文件的读取结果。
#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub source: String,
    pub drawing: Result<Drawing, IoError>,
}

/// 未能计入批次的文件及原因。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// 批次构建结果：成功文件的统计与失败文件列表。
#[derive(Debug)]
pub struct LoadedBatch {
    pub batch: ImportBatch,
    pub summaries: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
}

/// 文件名去掉扩展名，拼接后作为输出文件名。
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 并发读取并解析全部文件，结果保持输入顺序。
pub fn load_files(paths: &[PathBuf]) -> Vec<LoadedFile> {
    let loader = DxfFacade::new();
    paths
        .par_iter()
        .map(|path| LoadedFile {
            path: path.clone(),
            source: source_name(path),
            drawing: loader.load(path),
        })
        .collect()
}

/// 等全部读取结束后，按用户给出的顺序逐个导入。
/// 输入缺陷只跳过对应文件；注册表缺陷中止整个批次。
pub fn build_batch(files: Vec<LoadedFile>) -> Result<LoadedBatch, FrontendError> {
    build_batch_with(files, ImportBatch::ingest)
}

/// 同 [`build_batch`]，导入步骤由调用方给出。
pub fn build_batch_with<F>(
    files: Vec<LoadedFile>,
    mut ingest: F,
) -> Result<LoadedBatch, FrontendError>
where
    F: FnMut(&mut ImportBatch, &str, &Drawing) -> Result<FileSummary, IngestError>,
{
    let mut batch = ImportBatch::new();
    let mut summaries = Vec::new();
    let mut failures = Vec::new();

    for file in files {
        let drawing = match file.drawing {
            Ok(drawing) => drawing,
            Err(err) => {
                warn!(path = %file.path.display(), error = %err, "读取 DXF 失败，跳过该文件");
                failures.push(FileFailure {
                    path: file.path,
                    message: err.to_string(),
                });
                continue;
            }
        };
        match ingest(&mut batch, &file.source, &drawing) {
            Ok(summary) => summaries.push(summary),
            Err(IngestError::Registry(err)) => return Err(FrontendError::Registry(err)),
            Err(err) => failures.push(FileFailure {
                path: file.path,
                message: err.to_string(),
            }),
        }
    }

    info!(
        imported = summaries.len(),
        failed = failures.len(),
        points = batch.points().len(),
        segments = batch.segments().len(),
        "批次导入完成"
    );
    Ok(LoadedBatch {
        batch,
        summaries,
        failures,
    })
}
