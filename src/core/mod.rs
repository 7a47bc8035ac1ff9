pub mod credentials;
pub mod gesture;
pub mod observer;

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::{Result, SwitcherError};
use crate::models::EnvironmentConfig;
use crate::storage::KeyValueStore;

pub use credentials::CredentialForm;
pub use gesture::{TapGestureConfig, TapOutcome, TapRecognizer, TapState};
pub use observer::{ObserverId, Observers};

/// 当前环境名在存储中的键
pub const CURRENT_ENVIRONMENT_KEY: &str = "env_switcher.current_environment";

const CREDENTIALS_KEY_PREFIX: &str = "env_switcher.credentials.";

/// 环境注册表：可选环境列表 + 当前选择 + 变更通知。
///
/// 所有修改都经过 `initialize` / `switch_environment`，保证每次变更恰好通知一次。
pub struct EnvironmentRegistry {
    store: Box<dyn KeyValueStore>,
    available: Vec<EnvironmentConfig>,
    current: Option<EnvironmentConfig>,
    initialized: bool,
    observers: Observers,
    session_credentials: HashMap<String, HashMap<String, String>>,
}

impl EnvironmentRegistry {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            available: Vec::new(),
            current: None,
            initialized: false,
            observers: Observers::new(),
            session_credentials: HashMap::new(),
        }
    }

    /// 首次调用生效，之后的调用直接返回。
    /// 读取已保存的环境名并在列表中解析，找不到则用 `default`（需在列表中）或第一个。
    pub fn initialize(
        &mut self,
        environments: Vec<EnvironmentConfig>,
        default: Option<&EnvironmentConfig>,
    ) -> Result<()> {
        if environments.is_empty() {
            return Err(SwitcherError::Configuration(
                "environment list must not be empty".to_string(),
            ));
        }
        if self.initialized {
            tracing::debug!("registry already initialized, ignoring");
            return Ok(());
        }

        // 读取失败按“没有保存”处理
        let stored = match self.store.get(CURRENT_ENVIRONMENT_KEY) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("failed to read saved environment, using default: {}", e);
                None
            }
        };

        let selected = resolve_initial(&environments, stored.as_deref(), default)
            .cloned()
            .ok_or_else(|| {
                SwitcherError::Configuration("environment list must not be empty".to_string())
            })?;
        let restored = stored.as_deref() == Some(selected.key());
        tracing::info!(
            environment = selected.key(),
            restored,
            "environment registry initialized"
        );

        self.available = environments;
        self.current = Some(selected);
        self.initialized = true;
        self.observers.notify();
        Ok(())
    }

    /// 切换当前环境。目标必须在可选列表中（按名称判断）。
    /// 持久化失败不回滚内存状态，只记录警告。
    pub fn switch_environment(&mut self, target: &EnvironmentConfig) -> Result<()> {
        let selected = self
            .find(target.key())
            .cloned()
            .ok_or_else(|| SwitcherError::Configuration(format!("environment not found: {}", target.key())))?;

        self.current = Some(selected.clone());

        if selected.is_permanent() {
            if let Err(e) = self.store.set(CURRENT_ENVIRONMENT_KEY, selected.key()) {
                tracing::warn!(environment = selected.key(), "failed to persist environment: {}", e);
            }
        }

        tracing::info!(environment = selected.key(), "switched environment");
        self.observers.notify();
        Ok(())
    }

    /// 等同于 `switch_environment(default)`
    pub fn reset(&mut self, default: &EnvironmentConfig) -> Result<()> {
        self.switch_environment(default)
    }

    /// 删除已保存的环境名，不影响当前内存中的选择
    pub fn clear_saved(&mut self) -> Result<()> {
        self.store.remove(CURRENT_ENVIRONMENT_KEY)?;
        tracing::info!("cleared saved environment");
        Ok(())
    }

    /// 读取当前环境 extras 中的值并转换为 `T`；缺失或类型不符返回 `None`
    pub fn get_extra<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.current.as_ref()?.extras.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, "extra has unexpected shape: {}", e);
                None
            }
        }
    }

    pub fn current(&self) -> Option<&EnvironmentConfig> {
        self.current.as_ref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.current.as_ref().map(|e| e.base_url.as_str())
    }

    pub fn available(&self) -> &[EnvironmentConfig] {
        &self.available
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_current(&self, env: &EnvironmentConfig) -> bool {
        self.current.as_ref().is_some_and(|c| c.key() == env.key())
    }

    pub fn find(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.available.iter().find(|e| e.key() == name)
    }

    pub fn subscribe(&mut self, callback: impl FnMut() + 'static) -> ObserverId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// 保存某环境提交的凭据。永久环境写入存储（明文 JSON），临时环境只留在内存。
    pub fn save_credentials(
        &mut self,
        env: &EnvironmentConfig,
        values: &HashMap<String, String>,
    ) -> Result<()> {
        let env = self
            .find(env.key())
            .cloned()
            .ok_or_else(|| SwitcherError::Configuration(format!("environment not found: {}", env.key())))?;

        if env.is_permanent() {
            let json = serde_json::to_string(values)?;
            self.store.set(&credentials_key(env.key()), &json)?;
        } else {
            self.session_credentials
                .insert(env.key().to_string(), values.clone());
        }
        Ok(())
    }

    /// 读取之前保存的凭据；存储中的数据损坏时视为没有
    pub fn load_credentials(&self, env: &EnvironmentConfig) -> Option<HashMap<String, String>> {
        if let Some(values) = self.session_credentials.get(env.key()) {
            return Some(values.clone());
        }
        let raw = match self.store.get(&credentials_key(env.key())) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(environment = env.key(), "failed to read credentials: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(values) => Some(values),
            Err(e) => {
                tracing::warn!(environment = env.key(), "stored credentials are corrupt: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for EnvironmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentRegistry")
            .field("available", &self.available.len())
            .field("current", &self.current.as_ref().map(|e| e.key()))
            .field("initialized", &self.initialized)
            .field("observers", &self.observers)
            .finish()
    }
}

/// 初始选择：已保存的名称 > 列表中的默认环境 > 第一个；列表为空时返回 `None`
pub fn resolve_initial<'a>(
    environments: &'a [EnvironmentConfig],
    stored: Option<&str>,
    default: Option<&EnvironmentConfig>,
) -> Option<&'a EnvironmentConfig> {
    stored
        .and_then(|name| environments.iter().find(|e| e.key() == name))
        .or_else(|| default.and_then(|d| environments.iter().find(|e| e.key() == d.key())))
        .or_else(|| environments.first())
}

fn credentials_key(name: &str) -> String {
    format!("{}{}", CREDENTIALS_KEY_PREFIX, name)
}
