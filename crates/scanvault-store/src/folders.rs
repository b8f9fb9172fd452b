//! Folder organization for stored scans.
//!
//! Folders form a hierarchy (child folders cascade on delete); scans are
//! never deleted with their folder, they are moved back to the root.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use scanvault_core::{Folder, FolderId, FolderListing, ScanRecord};

use crate::error::{Result, StoreError};
use crate::store::ScanStore;

/// Partial update of a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    pub name: Option<String>,
    /// `Some(None)` moves the folder to the top level.
    pub parent_id: Option<Option<FolderId>>,
}

impl FolderUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none()
    }
}

impl ScanStore {
    /// Create a folder. The name must be non-empty after trimming.
    pub fn create_folder(&self, name: &str, parent_id: Option<FolderId>) -> Result<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("folder name is required".into()));
        }

        let id = FolderId::new();
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO folders (id, name, parent_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                name,
                parent_id.map(|p| p.to_string()),
                now,
                now
            ],
        )?;

        tracing::info!(folder_id = %id, name, "Folder created");
        self.read_folder(&id)?
            .ok_or_else(|| StoreError::Validation(format!("folder {id} missing after insert")))
    }

    /// List all folders by name, each with its contained scan count.
    pub fn list_folders(&self) -> Result<Vec<FolderListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, parent_id, created_at, updated_at, \
             (SELECT COUNT(*) FROM scans WHERE folder_id = folders.id) AS scan_count \
             FROM folders ORDER BY name ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((read_raw_folder(row)?, row.get::<_, i64>(5)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw.into_iter()
            .map(|(folder, scan_count)| {
                Ok(FolderListing {
                    folder: folder.into_folder()?,
                    scan_count: scan_count as u32,
                })
            })
            .collect()
    }

    /// Fetch one folder together with the scans it contains.
    pub fn get_folder(&self, id: &FolderId) -> Result<Option<(Folder, Vec<ScanRecord>)>> {
        let Some(folder) = self.read_folder(id)? else {
            return Ok(None);
        };
        let scans = self.list_scans_in_folder(&id.to_string())?;
        Ok(Some((folder, scans)))
    }

    /// Rename a folder and/or move it under a new parent.
    pub fn update_folder(&mut self, id: &FolderId, update: &FolderUpdate) -> Result<Option<Folder>> {
        if update.is_empty() {
            return Err(StoreError::Validation("no fields to update".into()));
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(StoreError::Validation("folder name cannot be empty".into()));
            }
        }
        if update.parent_id == Some(Some(*id)) {
            return Err(StoreError::Validation(
                "folder cannot be its own parent".into(),
            ));
        }

        let tx = self.conn.transaction()?;
        if let Some(name) = &update.name {
            tx.execute(
                "UPDATE folders SET name = ?1 WHERE id = ?2",
                params![name.trim(), id.to_string()],
            )?;
        }
        if let Some(parent_id) = &update.parent_id {
            tx.execute(
                "UPDATE folders SET parent_id = ?1 WHERE id = ?2",
                params![parent_id.as_ref().map(|p| p.to_string()), id.to_string()],
            )?;
        }
        let changed = tx.execute(
            "UPDATE folders SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        tx.commit()?;

        if changed == 0 {
            return Ok(None);
        }
        self.read_folder(id)
    }

    /// Delete a folder. Its scans move to the root first; child folders
    /// are removed by the cascade. Returns false when it did not exist.
    pub fn delete_folder(&mut self, id: &FolderId) -> Result<bool> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE scans SET folder_id = NULL WHERE folder_id = ?1",
            [id.to_string()],
        )?;
        let changed = tx.execute("DELETE FROM folders WHERE id = ?1", [id.to_string()])?;
        tx.commit()?;

        if changed > 0 {
            tracing::info!(folder_id = %id, "Folder deleted");
        }
        Ok(changed > 0)
    }

    fn read_folder(&self, id: &FolderId) -> Result<Option<Folder>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, name, parent_id, created_at, updated_at FROM folders WHERE id = ?1",
                [id.to_string()],
                read_raw_folder,
            )
            .optional()?;
        raw.map(RawFolder::into_folder).transpose()
    }
}

struct RawFolder {
    id: String,
    name: String,
    parent_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_raw_folder(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawFolder> {
    Ok(RawFolder {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl RawFolder {
    fn into_folder(self) -> Result<Folder> {
        Ok(Folder {
            id: self
                .id
                .parse()
                .map_err(|_| StoreError::Validation(format!("bad folder id: {:?}", self.id)))?,
            name: self.name,
            parent_id: self
                .parent_id
                .map(|s| {
                    s.parse()
                        .map_err(|_| StoreError::Validation(format!("bad folder id: {s:?}")))
                })
                .transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Validation(format!("bad timestamp: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_SCAN: &str = r#"<nmaprun scanner="nmap">
  <host><address addr="10.0.0.1" addrtype="ipv4"/></host>
</nmaprun>"#;

    #[test]
    fn create_and_list_folders_with_scan_counts() {
        let mut store = ScanStore::open_in_memory().unwrap();
        let alpha = store.create_folder("alpha", None).unwrap();
        store.create_folder("beta", None).unwrap();

        let doc = scanvault_ingest::parse(SMALL_SCAN).unwrap();
        let record = store.save_scan(&doc, None).unwrap();
        store
            .update_scan(
                &record.id,
                &scanvault_core::ScanUpdate {
                    name: None,
                    folder_id: Some(Some(alpha.id)),
                },
            )
            .unwrap();

        let listings = store.list_folders().unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].folder.name, "alpha");
        assert_eq!(listings[0].scan_count, 1);
        assert_eq!(listings[1].folder.name, "beta");
        assert_eq!(listings[1].scan_count, 0);
    }

    #[test]
    fn folder_names_are_trimmed_and_required() {
        let store = ScanStore::open_in_memory().unwrap();
        let folder = store.create_folder("  padded  ", None).unwrap();
        assert_eq!(folder.name, "padded");

        let err = store.create_folder("   ", None).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn get_folder_returns_contained_scans() {
        let mut store = ScanStore::open_in_memory().unwrap();
        let folder = store.create_folder("engagements", None).unwrap();
        let doc = scanvault_ingest::parse(SMALL_SCAN).unwrap();
        let record = store.save_scan(&doc, Some("external.xml")).unwrap();
        store
            .update_scan(
                &record.id,
                &scanvault_core::ScanUpdate {
                    name: None,
                    folder_id: Some(Some(folder.id)),
                },
            )
            .unwrap();

        let (found, scans) = store.get_folder(&folder.id).unwrap().unwrap();
        assert_eq!(found.id, folder.id);
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].id, record.id);
    }

    #[test]
    fn update_folder_rejects_self_parenting() {
        let mut store = ScanStore::open_in_memory().unwrap();
        let folder = store.create_folder("loop", None).unwrap();
        let err = store
            .update_folder(
                &folder.id,
                &FolderUpdate {
                    name: None,
                    parent_id: Some(Some(folder.id)),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn deleting_a_folder_moves_its_scans_to_root() {
        let mut store = ScanStore::open_in_memory().unwrap();
        let folder = store.create_folder("doomed", None).unwrap();
        let doc = scanvault_ingest::parse(SMALL_SCAN).unwrap();
        let record = store.save_scan(&doc, None).unwrap();
        store
            .update_scan(
                &record.id,
                &scanvault_core::ScanUpdate {
                    name: None,
                    folder_id: Some(Some(folder.id)),
                },
            )
            .unwrap();

        assert!(store.delete_folder(&folder.id).unwrap());

        let scans = store.list_scans().unwrap();
        assert_eq!(scans.len(), 1);
        assert!(scans[0].folder_id.is_none());
    }

    #[test]
    fn child_folders_cascade_on_delete() {
        let mut store = ScanStore::open_in_memory().unwrap();
        let parent = store.create_folder("parent", None).unwrap();
        let child = store.create_folder("child", Some(parent.id)).unwrap();

        assert!(store.delete_folder(&parent.id).unwrap());
        assert!(store.get_folder(&child.id).unwrap().is_none());
    }
}
