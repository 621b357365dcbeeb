use std::path::PathBuf;

use clap::Parser;
use dxf2ggb_config::{AppConfig, ConfigError};
use dxf2ggb_frontend::ConversionOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 将一个或多个 DXF 图纸合并转换为 GeoGebra (.ggb) 文件。
#[derive(Debug, Parser)]
#[command(name = "dxf2ggb", version)]
struct Cli {
    /// 输入的 DXF 文件，按给出的顺序导入
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// 应用配置文件
    #[arg(long)]
    config: Option<PathBuf>,
    /// 样式表（TOML），覆盖默认样式
    #[arg(long)]
    styles: Option<PathBuf>,
    /// 写出合并后的样式表，不生成 GGB
    #[arg(long, value_name = "PATH")]
    write_styles: Option<PathBuf>,
    /// 输出目录
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// 导出坐标的 x 平移量，默认取图形范围左下角向下取整
    #[arg(long, allow_negative_numbers = true)]
    offset_x: Option<f64>,
    /// 导出坐标的 y 平移量
    #[arg(long, allow_negative_numbers = true)]
    offset_y: Option<f64>,
    /// 只列出分类
    #[arg(long)]
    list_layers: bool,
}

impl Cli {
    fn into_options(self) -> (Option<PathBuf>, ConversionOptions) {
        let options = ConversionOptions {
            inputs: self.files,
            styles: self.styles,
            write_styles: self.write_styles,
            output_dir: self.output,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            list_layers: self.list_layers,
        };
        (self.config, options)
    }
}

fn main() {
    let (config_override, options) = Cli::parse().into_options();

    let config = load_configuration(config_override);
    init_logging(&config);
    info!("启动 dxf2ggb");

    if let Err(err) = dxf2ggb_frontend::run(&options, &config) {
        error!(error = %err, "转换失败");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. }
                    | ConfigError::Parse { path, .. }
                    | ConfigError::Serialize { path, .. }
                    | ConfigError::Style { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_writer(std::io::stderr).with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
