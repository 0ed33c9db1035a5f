// Registration store: a JSON file mapping Discord user ids to linked player tags.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::metrics;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stats captured at the last `gains` call. Both fields are absent right after
/// registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trophies: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winrate: Option<f64>,
}

impl History {
    pub fn snapshot(trophies: i64, winrate: f64) -> Self {
        Self {
            trophies: Some(trophies),
            winrate: Some(winrate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Player tag exactly as the user typed it.
    pub tag: String,
    #[serde(default)]
    pub history: History,
}

impl Registration {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            history: History::default(),
        }
    }
}

pub type Records = BTreeMap<String, Registration>;

/// Read the whole store file, creating an empty one if it does not exist yet.
pub async fn load(path: &Path) -> Result<Records, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let records = Records::new();
            save(path, &records).await?;
            Ok(records)
        }
        Err(e) => Err(e.into()),
    }
}

/// Overwrite the store file with the full mapping.
///
/// Writes to a sibling temp file first and renames it into place, so readers
/// never observe a half-written document.
pub async fn save(path: &Path, records: &Records) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(records)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    metrics::STORE_WRITES_TOTAL.inc();
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Single-writer view of the store file.
///
/// The mapping is loaded once and mirrored in memory; every mutation runs under
/// the lock and is flushed to disk before the lock is released. A failed flush
/// leaves the mirror untouched.
pub struct Store {
    path: PathBuf,
    records: Mutex<Records>,
}

impl Store {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = load(&path).await?;
        tracing::info!(
            "Loaded {} registration(s) from {}",
            records.len(),
            path.display()
        );
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub async fn get(&self, user_id: &str) -> Option<Registration> {
        self.records.lock().await.get(user_id).cloned()
    }

    /// The user's linked tag. An empty stored tag counts as no link.
    pub async fn tag_for(&self, user_id: &str) -> Option<String> {
        self.records
            .lock()
            .await
            .get(user_id)
            .map(|r| r.tag.clone())
            .filter(|tag| !tag.is_empty())
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Link `tag` to the user, replacing any previous record and history.
    pub async fn register(&self, user_id: &str, tag: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let mut next = records.clone();
        next.insert(user_id.to_string(), Registration::new(tag));
        save(&self.path, &next).await?;
        *records = next;
        tracing::info!("Registered tag {tag} for user {user_id}");
        Ok(())
    }

    /// Remove the user's record. Returns false (and writes nothing) if there
    /// was none.
    pub async fn unlink(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        if !records.contains_key(user_id) {
            return Ok(false);
        }
        let mut next = records.clone();
        next.remove(user_id);
        save(&self.path, &next).await?;
        *records = next;
        tracing::info!("Unlinked user {user_id}");
        Ok(true)
    }

    /// Replace the user's history with `snapshot` and return the previous one.
    /// Returns `None` if the user is not registered.
    pub async fn swap_history(
        &self,
        user_id: &str,
        snapshot: History,
    ) -> Result<Option<History>, StoreError> {
        let mut records = self.records.lock().await;
        let Some(previous) = records.get(user_id).map(|r| r.history) else {
            return Ok(None);
        };
        let mut next = records.clone();
        if let Some(record) = next.get_mut(user_id) {
            record.history = snapshot;
        }
        save(&self.path, &next).await?;
        *records = next;
        Ok(Some(previous))
    }
}
