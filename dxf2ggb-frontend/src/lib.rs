pub mod cli;
pub mod errors;
pub mod loader;

use dxf2ggb_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use cli::{ConversionOptions, ConversionReport, LayerRow};

/// 执行一次转换并在控制台打印结果。
pub fn run(options: &ConversionOptions, config: &AppConfig) -> Result<ConversionReport, FrontendError> {
    info!(files = options.inputs.len(), "开始转换");
    let report = cli::run_conversion(options, config)?;
    if options.list_layers {
        cli::print_layers(&report.layers);
    }
    cli::print_report(&report);
    Ok(report)
}
