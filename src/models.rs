use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 环境附加数据：对注册表不透明的键值对
pub type Extras = HashMap<String, serde_json::Value>;

/// 选择结果的持久化方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// 跨重启保存选择
    #[default]
    Permanent,
    /// 仅当前会话有效
    Temporary,
}

/// 单个凭据字段的校验策略。返回错误信息，`None` 表示通过。
pub trait FieldValidator {
    fn validate(&self, value: &str) -> Option<String>;
}

impl<F> FieldValidator for F
where
    F: Fn(&str) -> Option<String>,
{
    fn validate(&self, value: &str) -> Option<String> {
        self(value)
    }
}

/// 环境级凭据校验策略，拿到表单的全部取值
pub trait CredentialValidator {
    fn validate(&self, values: &HashMap<String, String>) -> Option<String>;
}

impl<F> CredentialValidator for F
where
    F: Fn(&HashMap<String, String>) -> Option<String>,
{
    fn validate(&self, values: &HashMap<String, String>) -> Option<String> {
        self(values)
    }
}

/// 凭据字段描述
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialField {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub is_password: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(skip)]
    pub validator: Option<Arc<dyn FieldValidator>>,
}

impl CredentialField {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            hint: None,
            is_password: false,
            is_required: false,
            default_value: None,
            validator: None,
        }
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn password(mut self) -> Self {
        self.is_password = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }
}

impl fmt::Debug for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialField")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("hint", &self.hint)
            .field("is_password", &self.is_password)
            .field("is_required", &self.is_required)
            .field("default_value", &self.default_value)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// 一个可部署的后端环境。
///
/// 身份只由 `name` 决定：相等、哈希、成员判断都走 [`EnvironmentConfig::key`]，
/// 其余字段不同的两个同名配置视为同一个环境。
#[derive(Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    #[serde(default)]
    pub extras: Extras,
    #[serde(default)]
    pub requires_credentials: bool,
    #[serde(default)]
    pub credential_fields: Vec<CredentialField>,
    #[serde(default)]
    pub storage_mode: StorageMode,
    #[serde(skip)]
    pub credential_validator: Option<Arc<dyn CredentialValidator>>,
}

impl EnvironmentConfig {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            base_url: base_url.into(),
            extras: Extras::new(),
            requires_credentials: false,
            credential_fields: Vec::new(),
            storage_mode: StorageMode::Permanent,
            credential_validator: None,
        }
    }

    /// 身份键
    pub fn key(&self) -> &str {
        &self.name
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn with_storage_mode(mut self, mode: StorageMode) -> Self {
        self.storage_mode = mode;
        self
    }

    /// 设置凭据字段，同时打开 `requires_credentials`
    pub fn with_credential_fields(mut self, fields: Vec<CredentialField>) -> Self {
        self.requires_credentials = true;
        self.credential_fields = fields;
        self
    }

    pub fn with_credential_validator(
        mut self,
        validator: impl CredentialValidator + 'static,
    ) -> Self {
        self.credential_validator = Some(Arc::new(validator));
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.storage_mode == StorageMode::Permanent
    }
}

impl PartialEq for EnvironmentConfig {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for EnvironmentConfig {}

impl Hash for EnvironmentConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for EnvironmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentConfig")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("base_url", &self.base_url)
            .field("extras", &self.extras)
            .field("requires_credentials", &self.requires_credentials)
            .field("credential_fields", &self.credential_fields)
            .field("storage_mode", &self.storage_mode)
            .field("has_credential_validator", &self.credential_validator.is_some())
            .finish()
    }
}
