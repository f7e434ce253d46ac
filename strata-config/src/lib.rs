use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "STRATA_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `STRATA_CONFIG`，否则在 `base` 下寻找
    /// `config/default.toml`。若文件缺失，则返回默认配置。
    pub fn discover_in(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = base.as_ref().join("config").join("default.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 以当前工作目录为基准的 [`AppConfig::discover_in`]。
    pub fn discover() -> Result<Self, ConfigError> {
        let dir = env::current_dir().map_err(|source| ConfigError::Context {
            message: "获取当前工作目录失败".to_string(),
            source,
        })?;
        Self::discover_in(dir)
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 撤销历史配置。`undo_limit` 为 0 表示不限制条目数量。
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub undo_limit: usize,
    #[serde(default = "HistoryConfig::default_merge_edits")]
    pub merge_edits: bool,
}

impl HistoryConfig {
    fn default_merge_edits() -> bool {
        true
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            undo_limit: 0,
            merge_edits: Self::default_merge_edits(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// 启动时执行的动作脚本，每行一个请求。
    #[serde(default)]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        if env::var_os(CONFIG_ENV).is_some() {
            return;
        }
        let cfg = AppConfig::discover_in(dir.path()).expect("discover should succeed");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.history.undo_limit, 0);
        assert!(cfg.history.merge_edits);
        assert!(cfg.session.script.is_none());
    }

    #[test]
    fn discovers_default_toml_under_base() {
        if env::var_os(CONFIG_ENV).is_some() {
            return;
        }
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir(dir.path().join("config")).expect("create config dir");
        fs::write(
            dir.path().join("config").join("default.toml"),
            "[history]\nundo_limit = 25\n",
        )
        .expect("write config");

        let cfg = AppConfig::discover_in(dir.path()).expect("discover");
        assert_eq!(cfg.history.undo_limit, 25);
        assert!(cfg.history.merge_edits);
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [history]
            undo_limit = 100
            merge_edits = false

            [session]
            script = "scripts/demo.txt"
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.history.undo_limit, 100);
        assert!(!cfg.history.merge_edits);
        assert_eq!(
            cfg.session
                .script
                .as_deref()
                .map(|p| p.to_string_lossy().to_string()),
            Some("scripts/demo.txt".to_string())
        );
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[history]\nundo_limit = \"many\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
