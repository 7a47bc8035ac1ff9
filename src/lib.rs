//! 隐藏的环境切换器：多次点击手势打开环境列表，选择结果持久化到键值存储。

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;
pub mod tui;

pub use crate::config::Catalog;
pub use crate::core::{
    CredentialForm, EnvironmentRegistry, ObserverId, TapGestureConfig, TapOutcome, TapRecognizer,
    TapState, CURRENT_ENVIRONMENT_KEY,
};
pub use crate::error::{Result, SwitcherError};
pub use crate::models::{CredentialField, EnvironmentConfig, StorageMode};
pub use crate::storage::{JsonFileStore, KeyValueStore, MemoryStore};
