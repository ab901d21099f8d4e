use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;

/// Keys of every announcement already delivered, persisted as a flat JSON
/// object `{ "<key>": true, ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet(BTreeMap<String, bool>);

impl SeenSet {
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: String) -> bool {
        self.0.insert(key, true).is_none()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<K> for SeenSet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(|k| (k.into(), true)).collect())
    }
}

/// Seen set plus the file it lives in. Owned by the poll cycle; there is a
/// single writer, so no locking.
#[derive(Debug, Clone)]
pub struct SeenStore {
    set: SeenSet,
    path: Option<PathBuf>,
}

impl SeenStore {
    pub fn in_memory() -> Self {
        Self {
            set: SeenSet::default(),
            path: None,
        }
    }

    /// Loads the persisted set. A missing file yields an empty set; a corrupt
    /// one falls back to the `.tmp` sibling of an interrupted save, then to
    /// empty. Never fails.
    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let set = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<SeenSet>(&bytes) {
                Ok(set) => set,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "seen store is corrupt, trying tmp fallback");
                    match tokio::fs::read(tmp_path(&path)).await {
                        Ok(tmp_bytes) => serde_json::from_slice(&tmp_bytes).unwrap_or_default(),
                        Err(_) => SeenSet::default(),
                    }
                }
            },
            Err(e) => {
                debug!(error = %e, path = %path.display(), "no seen store yet, starting empty");
                SeenSet::default()
            }
        };
        Self {
            set,
            path: Some(path),
        }
    }

    pub fn with_set(mut self, set: SeenSet) -> Self {
        self.set = set;
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.set.contains(key)
    }

    /// Returns `true` if the key was not present before.
    pub fn mark_seen(&mut self, key: String) -> bool {
        self.set.insert(key)
    }

    pub fn set(&self) -> &SeenSet {
        &self.set
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the set to `<file>.tmp` and renames it over the real file, so a
    /// crash mid-write leaves either the old or the new document in place.
    pub async fn save(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            debug!("seen store is in-memory only; skipping persist");
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(&self.set)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| io_error(parent, source))?;
        }
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| io_error(&tmp, source))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| io_error(path, source))?;
        debug!(entries = self.set.len(), path = %path.display(), "seen store persisted");
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_set_serializes_as_flat_object() {
        let set: SeenSet = ["ABC-Board Decision-2024-01-01 10:00"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"ABC-Board Decision-2024-01-01 10:00":true}"#);
    }

    #[test]
    fn mark_seen_reports_first_insert_only() {
        let mut store = SeenStore::in_memory();
        assert!(store.mark_seen("k".into()));
        assert!(!store.mark_seen("k".into()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/x/seen_announcements.json")),
            PathBuf::from("/x/seen_announcements.json.tmp")
        );
    }
}
