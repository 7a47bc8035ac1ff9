use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::core::TapGestureConfig;
use crate::error::{Result, SwitcherError};
use crate::models::{CredentialField, EnvironmentConfig, StorageMode};

/// 环境目录文件路径的环境变量
pub const CATALOG_PATH_VAR: &str = "ENV_SWITCHER_CATALOG";
const DEFAULT_CATALOG_PATH: &str = "environments.json";
const DEFAULT_STORE_PATH: &str = "env-switcher.json";

/// 手势配置（文件形式，毫秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GestureSettings {
    pub required_taps: u32,
    pub tap_window_ms: u64,
    pub enabled: bool,
}

impl Default for GestureSettings {
    fn default() -> Self {
        let d = TapGestureConfig::default();
        Self {
            required_taps: d.required_taps,
            tap_window_ms: d.tap_window.as_millis() as u64,
            enabled: d.enabled,
        }
    }
}

impl GestureSettings {
    pub fn to_config(&self) -> TapGestureConfig {
        TapGestureConfig {
            required_taps: self.required_taps,
            tap_window: Duration::from_millis(self.tap_window_ms),
            enabled: self.enabled,
        }
    }
}

/// 环境目录：可选环境 + 默认环境 + 手势与存储设置
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub default_environment: Option<String>,
    #[serde(default)]
    pub gesture: GestureSettings,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    pub environments: Vec<EnvironmentConfig>,
}

impl Catalog {
    /// 解析 JSON 并校验：环境非空、名称唯一、默认环境存在、手势参数为正
    pub fn from_json(content: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_str(content)?;

        for env in catalog.environments.iter_mut() {
            expand_environment(env, &process_env);
        }

        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 从 `ENV_SWITCHER_CATALOG`（默认 `environments.json`）加载，文件不存在时使用内置目录
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CATALOG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH));
        if path.exists() {
            tracing::info!("loading environment catalog from {:?}", path);
            Self::load(&path)
        } else {
            tracing::info!("no catalog at {:?}, using built-in environments", path);
            Ok(Self::builtin())
        }
    }

    /// 内置 dev / staging / production 目录
    pub fn builtin() -> Self {
        Self {
            default_environment: Some("dev".to_string()),
            gesture: GestureSettings::default(),
            storage_path: None,
            environments: vec![
                EnvironmentConfig::new("dev", "Development", "http://localhost:8080")
                    .with_extra("timeout", json!(30))
                    .with_extra("debug", json!(true)),
                EnvironmentConfig::new("staging", "Staging", "https://staging.example.com")
                    .with_extra("timeout", json!(15))
                    .with_credential_fields(vec![
                        CredentialField::new("username", "Username").required(),
                        CredentialField::new("password", "Password")
                            .password()
                            .required(),
                    ]),
                EnvironmentConfig::new("production", "Production", "https://api.example.com")
                    .with_extra("timeout", json!(10)),
                EnvironmentConfig::new("sandbox", "Sandbox (session only)", "http://127.0.0.1:9000")
                    .with_storage_mode(StorageMode::Temporary),
            ],
        }
    }

    pub fn default_env(&self) -> Option<&EnvironmentConfig> {
        let name = self.default_environment.as_deref()?;
        self.environments.iter().find(|e| e.key() == name)
    }

    pub fn store_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    fn validate(&self) -> Result<()> {
        if self.environments.is_empty() {
            return Err(SwitcherError::Configuration(
                "catalog has no environments".to_string(),
            ));
        }
        for (i, env) in self.environments.iter().enumerate() {
            if self.environments[..i].iter().any(|e| e.key() == env.key()) {
                return Err(SwitcherError::Configuration(format!(
                    "duplicate environment: {}",
                    env.key()
                )));
            }
        }
        if let Some(name) = &self.default_environment {
            if self.default_env().is_none() {
                return Err(SwitcherError::Configuration(format!(
                    "default environment not found: {}",
                    name
                )));
            }
        }
        if self.gesture.required_taps == 0 || self.gesture.tap_window_ms == 0 {
            return Err(SwitcherError::Configuration(
                "gesture required_taps and tap_window_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// 环境里的字符串值中 `${VAR}` 占位符展开，`lookup` 找不到的保持原样
fn expand_environment(env: &mut EnvironmentConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    env.base_url = expand_placeholders(&env.base_url, lookup);
    for value in env.extras.values_mut() {
        expand_value(value, lookup);
    }
}

fn expand_value(value: &mut serde_json::Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        serde_json::Value::String(s) => *s = expand_placeholders(s, lookup),
        serde_json::Value::Array(items) => {
            items.iter_mut().for_each(|v| expand_value(v, lookup));
        }
        serde_json::Value::Object(map) => {
            map.values_mut().for_each(|v| expand_value(v, lookup));
        }
        _ => {}
    }
}

fn expand_placeholders(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            // 没有闭合，剩余部分原样输出
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[open..open + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
