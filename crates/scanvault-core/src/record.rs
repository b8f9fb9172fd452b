//! Persistence-level metadata records.
//!
//! These wrap a stored scan document with the bookkeeping the archive
//! keeps about it (name, source file, folder, timestamps) and describe
//! the folder hierarchy scans are organized into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::document::ScanDocument;

/// Public identifier of a stored scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ScanId(pub Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScanId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a folder in the scan hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FolderId(pub Uuid);

impl FolderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FolderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Scan metadata as listed by the archive (no host data).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: ScanId,
    pub name: String,
    pub filename: Option<String>,
    pub folder_id: Option<FolderId>,
    pub scanner: String,
    pub args: String,
    pub start: String,
    pub startstr: String,
    pub version: String,
    pub scope_type: String,
    pub scope_display: String,
    pub total_hosts: u32,
    pub total_ports: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fully reconstructed scan: metadata plus the round-tripped document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredScan {
    pub id: ScanId,
    pub name: String,
    pub filename: Option<String>,
    pub folder_id: Option<FolderId>,
    #[serde(flatten)]
    pub document: ScanDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of scan metadata.
///
/// `folder_id` distinguishes "leave as is" (absent) from "move to root"
/// (explicit null), so it is doubly optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<FolderId>>,
}

impl ScanUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.folder_id.is_none()
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// A folder in the scan hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    pub parent_id: Option<FolderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A folder as returned by the listing endpoint, with its scan count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderListing {
    #[serde(flatten)]
    pub folder: Folder,
    pub scan_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_update_distinguishes_absent_from_null() {
        let absent: ScanUpdate = serde_json::from_str(r#"{"name":"renamed"}"#).unwrap();
        assert_eq!(absent.name.as_deref(), Some("renamed"));
        assert!(absent.folder_id.is_none());

        let cleared: ScanUpdate = serde_json::from_str(r#"{"folderId":null}"#).unwrap();
        assert_eq!(cleared.folder_id, Some(None));

        let id = FolderId::new();
        let moved: ScanUpdate =
            serde_json::from_str(&format!(r#"{{"folderId":"{id}"}}"#)).unwrap();
        assert_eq!(moved.folder_id, Some(Some(id)));
    }

    #[test]
    fn scan_id_round_trips_as_string() {
        let id = ScanId::new();
        let parsed: ScanId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
