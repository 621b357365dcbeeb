use std::path::{Path, PathBuf};

use dxf2ggb_config::{AppConfig, load_style_sheet, save_style_sheet};
use dxf2ggb_core::style::{StyleFamily, StyleRules, StyleSheet, Translation};
use dxf2ggb_engine::{FileSummary, ImportBatch, render_markup};
use dxf2ggb_io::{GgbArchiveWriter, MarkupSink};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{FileFailure, build_batch, load_files};

/// 命令行选项在前端层面的表示。
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    pub inputs: Vec<PathBuf>,
    pub styles: Option<PathBuf>,
    pub write_styles: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub list_layers: bool,
}

/// 图层分类列表中的一行。
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub key: String,
    pub label: String,
    pub color: String,
    pub family: StyleFamily,
    pub included: bool,
    pub occurrences: usize,
}

#[derive(Debug, Default)]
pub struct ConversionReport {
    pub summaries: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
    pub layers: Vec<LayerRow>,
    pub translation: Option<Translation>,
    pub styles_written: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// 完整的转换流程：读取、调和、合并样式，然后按选项列出分类、写出样式表或导出 GGB。
pub fn run_conversion(
    options: &ConversionOptions,
    config: &AppConfig,
) -> Result<ConversionReport, FrontendError> {
    if options.inputs.is_empty() {
        return Err(FrontendError::NoInput);
    }

    let files = load_files(&options.inputs);
    let loaded = build_batch(files)?;
    if loaded.batch.sources().is_empty() {
        return Err(FrontendError::NothingImported {
            failed: loaded.failures.len(),
        });
    }
    let batch = loaded.batch;

    let styles = resolve_styles(&batch, options)?;
    let translation = styles.translation.unwrap_or(Translation::new(0.0, 0.0));

    let mut report = ConversionReport {
        summaries: loaded.summaries,
        failures: loaded.failures,
        layers: layer_rows(&batch, &styles),
        translation: Some(translation),
        ..ConversionReport::default()
    };

    if options.list_layers {
        return Ok(report);
    }

    if let Some(path) = &options.write_styles {
        save_style_sheet(&styles, path)?;
        info!(path = %path.display(), rows = styles.len(), "样式表已写出");
        report.styles_written = Some(path.clone());
        return Ok(report);
    }

    let markup = render_markup(&batch, &styles, translation, config.view)?;
    let directory = output_directory(options, config);
    let file_name = batch
        .output_file_name()
        .ok_or(FrontendError::NothingImported { failed: 0 })?;
    let writer = GgbArchiveWriter::new(directory);
    writer.accept(&markup, &file_name)?;
    report.output = Some(writer.path_for(&file_name));
    Ok(report)
}

/// 默认样式叠加用户样式表，再应用命令行给出的平移量。
fn resolve_styles(
    batch: &ImportBatch,
    options: &ConversionOptions,
) -> Result<StyleSheet, FrontendError> {
    let mut styles = batch.default_styles();
    if let Some(path) = &options.styles {
        let overrides = load_style_sheet(path)?;
        for key in styles.merge(overrides) {
            warn!(path = %path.display(), key = %key, "样式表中的分类未出现在本批次中");
        }
    }

    let mut translation = styles.translation.unwrap_or(Translation::new(0.0, 0.0));
    if let Some(x) = options.offset_x {
        translation.x = x;
    }
    if let Some(y) = options.offset_y {
        translation.y = y;
    }
    styles.translation = Some(translation);
    styles.validate()?;
    Ok(styles)
}

fn layer_rows(batch: &ImportBatch, styles: &StyleSheet) -> Vec<LayerRow> {
    batch
        .layers()
        .sorted()
        .into_iter()
        .map(|(key, entry)| LayerRow {
            key: key.to_string(),
            label: entry.entry_type.label(),
            color: entry.entry_type.display_color.to_string(),
            family: StyleRules::for_kind(&entry.entry_type.kind).family,
            included: styles.get(key).is_none_or(|style| style.included),
            occurrences: entry.occurrences,
        })
        .collect()
}

fn output_directory(options: &ConversionOptions, config: &AppConfig) -> PathBuf {
    options
        .output_dir
        .clone()
        .or_else(|| config.output.directory.clone())
        .or_else(|| {
            options
                .inputs
                .first()
                .and_then(|path| path.parent())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 控制台报告。
pub fn print_report(report: &ConversionReport) {
    for summary in &report.summaries {
        println!(
            "{}: {} 点 ({} 重复), {} 文字, {} 折线 -> {} 线段, 补点 {}, 忽略 {}",
            summary.source,
            summary.points,
            summary.duplicate_inserts,
            summary.texts,
            summary.polylines,
            summary.segments,
            summary.synthesized,
            summary.ignored
        );
    }
    for failure in &report.failures {
        println!("ERROR {}: {}", failure.path.display(), failure.message);
    }
    if let Some(translation) = report.translation {
        println!("平移量: x={} y={}", translation.x, translation.y);
    }
    if let Some(path) = &report.styles_written {
        println!("样式表已写出: {}", path.display());
    }
    if let Some(path) = &report.output {
        println!("已生成: {}", path.display());
    }
}

pub fn print_layers(rows: &[LayerRow]) {
    for row in rows {
        println!(
            "{:<48} {:<48} {} {:<5} {:>6}{}",
            row.key,
            row.label,
            row.color,
            row.family,
            row.occurrences,
            if row.included { "" } else { "  (excluded)" }
        );
    }
}
