//! Key-value persistence.
//!
//! The engagement layer persists small string values under well-known keys,
//! mirroring the browser-storage model it grew up with. Stores are
//! synchronous; callers degrade to neutral defaults when a store fails
//! rather than surfacing errors to the user.

pub mod atomic_json;

pub use atomic_json::AtomicJsonFile;

use grove_core::error::Result;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Synchronous string key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: one file per key, written atomically.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Opens a store rooted at `dir`, creating it if needed.
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Opens the per-user default location (`{data_dir}/grove`), falling
    /// back to the working directory when the platform has none.
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::open(base.join("grove"))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        use std::io::Write as IoWrite;

        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn dir_store_persists_per_key_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirStore::open(temp_dir.path().to_path_buf()).unwrap();

        store.set("grove-lens", "engineer").unwrap();
        assert_eq!(
            store.get("grove-lens").unwrap().as_deref(),
            Some("engineer")
        );

        // Overwrite is atomic and leaves no temp file.
        store.set("grove-lens", "academic").unwrap();
        assert_eq!(
            store.get("grove-lens").unwrap().as_deref(),
            Some("academic")
        );
        assert!(!temp_dir.path().join(".grove-lens.tmp").exists());

        store.remove("grove-lens").unwrap();
        assert_eq!(store.get("grove-lens").unwrap(), None);
        // Removing a missing key is fine.
        store.remove("grove-lens").unwrap();
    }
}
