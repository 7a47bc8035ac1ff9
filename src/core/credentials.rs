use std::collections::HashMap;

use crate::error::{Result, SwitcherError};
use crate::models::{CredentialField, EnvironmentConfig};

const MASK_CHAR: char = '•';

/// 凭据表单：为需要凭据的环境收集字段值
#[derive(Debug, Clone)]
pub struct CredentialForm {
    environment: EnvironmentConfig,
    values: Vec<String>,
}

impl CredentialForm {
    /// 以字段默认值初始化
    pub fn new(environment: &EnvironmentConfig) -> Self {
        let values = environment
            .credential_fields
            .iter()
            .map(|f| f.default_value.clone().unwrap_or_default())
            .collect();
        Self {
            environment: environment.clone(),
            values,
        }
    }

    /// 用之前保存的值覆盖默认值
    pub fn with_saved(mut self, saved: &HashMap<String, String>) -> Self {
        for (field, value) in self.environment.credential_fields.iter().zip(self.values.iter_mut()) {
            if let Some(v) = saved.get(&field.key) {
                *value = v.clone();
            }
        }
        self
    }

    pub fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    pub fn fields(&self) -> &[CredentialField] {
        &self.environment.credential_fields
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.values[i].as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn value_at_mut(&mut self, index: usize) -> Option<&mut String> {
        self.values.get_mut(index)
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let idx = self
            .position(key)
            .ok_or_else(|| SwitcherError::Configuration(format!("unknown credential field: {}", key)))?;
        self.values[idx] = value.into();
        Ok(())
    }

    /// 显示用的值，密码字段打码
    pub fn display_value(&self, index: usize) -> Option<String> {
        let field = self.fields().get(index)?;
        let value = self.values.get(index)?;
        if field.is_password {
            Some(MASK_CHAR.to_string().repeat(value.chars().count()))
        } else {
            Some(value.clone())
        }
    }

    /// 逐字段校验，再跑环境级校验；全部通过才返回收集到的值
    pub fn validate(&self) -> Result<HashMap<String, String>> {
        for (field, value) in self.fields().iter().zip(self.values.iter()) {
            let trimmed = value.trim();
            if field.is_required && trimmed.is_empty() {
                return Err(SwitcherError::Validation(format!("{} is required", field.label)));
            }
            if let Some(validator) = &field.validator {
                if let Some(message) = validator.validate(value) {
                    return Err(SwitcherError::Validation(message));
                }
            }
        }

        let values: HashMap<String, String> = self
            .fields()
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.key.clone(), v.clone()))
            .collect();

        if let Some(validator) = &self.environment.credential_validator {
            if let Some(message) = validator.validate(&values) {
                return Err(SwitcherError::Validation(message));
            }
        }

        Ok(values)
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.key == key)
    }
}
