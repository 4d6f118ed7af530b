//! # Content Cache
//!
//! Raw forecast pages are cached by location string. An entry is either
//! present or absent; there is no expiry and no eviction. Callers that want a
//! fresh page remove the entry first.
//!
//! [`FileCache`] keeps one file per key in a directory. [`MemoryCache`] is the
//! in-process equivalent used by tests.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Key → raw content store.
pub trait ContentCache {
    /// Cached content, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    fn put(&mut self, key: &str, content: &str) -> io::Result<()>;

    /// Drop an entry. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// Cache files under a directory, named after a sanitised form of the key.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File backing `key`: `cache-<key>.html` with anything other than ASCII
    /// alphanumerics replaced by `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("cache-{}.html", safe))
    }
}

impl ContentCache for FileCache {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn put(&mut self, key: &str, content: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), content)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, content: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), content.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_cache_put_get_remove() {
        let dir = tempdir().unwrap();
        let mut cache = FileCache::new(dir.path());

        assert_eq!(cache.get("London, GB"), None);
        cache.put("London, GB", "<html></html>").unwrap();
        assert_eq!(cache.get("London, GB").as_deref(), Some("<html></html>"));

        cache.remove("London, GB").unwrap();
        assert_eq!(cache.get("London, GB"), None);
        // Second remove is a no-op
        cache.remove("London, GB").unwrap();
    }

    #[test]
    fn test_file_cache_keys_are_sanitised() {
        let cache = FileCache::new("/tmp/weather");
        assert_eq!(
            cache.path_for("Saint-Malo, FR"),
            PathBuf::from("/tmp/weather/cache-Saint_Malo__FR.html")
        );
    }

    #[test]
    fn test_file_cache_creates_directory() {
        let dir = tempdir().unwrap();
        let mut cache = FileCache::new(dir.path().join("nested"));
        cache.put("Oban, GB", "page").unwrap();
        assert_eq!(cache.get("Oban, GB").as_deref(), Some("page"));
    }

    #[test]
    fn test_memory_cache() {
        let mut cache = MemoryCache::new();
        cache.put("a", "1").unwrap();
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        cache.remove("a").unwrap();
        assert!(cache.get("a").is_none());
    }
}
