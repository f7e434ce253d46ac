use std::path::{Path, PathBuf};

use strata_config::{AppConfig, ConfigError};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod session;

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut script_override: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--script" => {
                let Some(path) = args.next() else {
                    eprintln!("`--script` 需要提供脚本路径");
                    std::process::exit(1);
                };
                script_override = Some(PathBuf::from(path));
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let (config, load_error) = load_configuration(config_override.as_deref());
    init_logging(&config);
    if let Some(err) = load_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }
    info!("启动 Strata 属性编辑会话");

    let script = script_override.or_else(|| config.session.script.clone());
    if let Err(err) = session::run(&config, script.as_deref()) {
        error!(error = %err, "编辑会话执行失败");
        std::process::exit(1);
    }
}

/// 读取配置。失败时回退到默认配置，并把错误交给调用方在日志就绪后报告。
fn load_configuration(override_path: Option<&Path>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn init_logging(config: &AppConfig) {
    let level = config.logging.level.as_str();
    let (filter, rejected) = match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    };
    let installed = fmt().with_env_filter(filter).try_init().is_ok();
    if let Some(err) = rejected {
        warn!(level, error = %err, "日志级别无效，改用 info");
    }
    if !installed {
        debug!("日志订阅器已存在，沿用现有设置");
    }
}
