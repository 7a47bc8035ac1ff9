use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::{Result, SwitcherError};

/// 文件存储：内存状态 + JSON 文件持久化
pub struct JsonFileStore {
    entries: BTreeMap<String, String>,
    file_path: PathBuf,
}

impl JsonFileStore {
    /// 从 JSON 文件加载。文件不存在则为空，文件损坏则记录警告并为空。
    pub fn open(file_path: &Path) -> Result<Self> {
        let entries = if file_path.exists() {
            match std::fs::read_to_string(file_path) {
                Ok(content) if content.trim().is_empty() => BTreeMap::new(),
                Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!("store file {:?} is corrupt, starting empty: {}", file_path, e);
                        BTreeMap::new()
                    }
                },
                Err(e) => {
                    tracing::warn!("cannot read store file {:?}, starting empty: {}", file_path, e);
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            file_path: file_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// 将全部条目写回文件
    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| SwitcherError::Storage(e.to_string()))?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.file_path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    /// 写时持久化：先改内存，保存失败则回滚
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.save() {
            self.entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_empty_file_starts_empty() {
        let tmp = NamedTempFile::new().unwrap();
        let store = JsonFileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
    }

    #[test]
    fn test_persistence_after_set() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("env", "staging").unwrap();
        }

        // 重新打开，验证持久化
        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("env").unwrap().as_deref(), Some("staging"));
    }

    #[test]
    fn test_persistence_after_remove() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.set("env", "prod").unwrap();
            store.set("other", "kept").unwrap();
            store.remove("env").unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("env").unwrap(), None);
        assert_eq!(store.get("other").unwrap().as_deref(), Some("kept"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{{not json").unwrap();

        let store = JsonFileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("env").unwrap(), None);
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/store.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.set("env", "dev").unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = TempDir::new().unwrap();
        // 目标路径是一个目录，写文件必然失败
        let path = dir.path().join("store.json");
        std::fs::create_dir_all(&path).unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.set("env", "prod").is_err());
        assert_eq!(store.get("env").unwrap(), None);
    }
}
