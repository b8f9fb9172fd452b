//! The scan store: SQLite-backed persistence for scan documents.
//!
//! All rows for one scan are written inside a single transaction, so a
//! failed insert leaves nothing partial behind. Reads need no locking;
//! reconstruction only issues SELECTs.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use scanvault_core::{ScanDocument, ScanId, ScanRecord, ScanUpdate, StoredScan};

use crate::error::{Result, StoreError};
use crate::mapper::{
    self, AddressRow, FlatHost, FlatPort, HostRow, HostnameRow, PortRow, ScanRow, ScanRows,
    ScriptRow,
};
use crate::schema;

/// Columns backing a [`ScanRecord`], in `read_record` order.
const RECORD_COLUMNS: &str = "id, name, filename, folder_id, scanner, args, start_time, \
     start_time_str, version, scope_type, scope_display, total_hosts, total_ports, \
     created_at, updated_at";

/// Persistent scan archive backed by SQLite.
pub struct ScanStore {
    pub(crate) conn: Connection,
}

impl ScanStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        tracing::debug!(path = %path.display(), "Scan database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Persist a parsed scan document. Every row is written in one
    /// transaction; on any failure nothing is committed.
    pub fn save_scan(
        &mut self,
        doc: &ScanDocument,
        file_name: Option<&str>,
    ) -> Result<ScanRecord> {
        let id = ScanId::new();
        let name = file_name
            .map(String::from)
            .unwrap_or_else(|| format!("Scan {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
        let rows = mapper::flatten(doc, &id, &name, file_name)?;
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        insert_scan_rows(&tx, &rows, &now)?;
        tx.commit()?;

        tracing::info!(
            scan_id = %id,
            hosts = doc.total_hosts,
            ports = doc.total_ports,
            "Scan saved"
        );

        self.read_record(&id)?
            .ok_or_else(|| StoreError::Validation(format!("scan {id} missing after insert")))
    }

    /// Fetch a scan with its fully reconstructed document.
    pub fn get_scan(&self, id: &ScanId) -> Result<Option<StoredScan>> {
        let Some((scan_row, meta)) = self.read_scan_row(id)? else {
            return Ok(None);
        };

        let hosts = self.read_hosts(id)?;
        let document = mapper::reconstruct(&ScanRows {
            scan: scan_row,
            hosts,
        })?;

        Ok(Some(StoredScan {
            id: *id,
            name: meta.name,
            filename: meta.filename,
            folder_id: parse_folder_id(meta.folder_id)?,
            document,
            created_at: parse_timestamp(&meta.created_at)?,
            updated_at: parse_timestamp(&meta.updated_at)?,
        }))
    }

    /// List all scans, newest first, metadata only.
    pub fn list_scans(&self) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM scans ORDER BY created_at DESC"
        ))?;
        let raw = stmt
            .query_map([], read_raw_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawRecord::into_record).collect()
    }

    /// List the scans in one folder, newest first.
    pub(crate) fn list_scans_in_folder(&self, folder_id: &str) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM scans WHERE folder_id = ?1 ORDER BY created_at DESC"
        ))?;
        let raw = stmt
            .query_map([folder_id], read_raw_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawRecord::into_record).collect()
    }

    /// Rename a scan and/or move it between folders. A `folder_id` of
    /// explicit null moves the scan to the root.
    pub fn update_scan(&mut self, id: &ScanId, update: &ScanUpdate) -> Result<Option<ScanRecord>> {
        if update.is_empty() {
            return Err(StoreError::Validation("no fields to update".into()));
        }

        let tx = self.conn.transaction()?;
        if let Some(name) = &update.name {
            tx.execute(
                "UPDATE scans SET name = ?1 WHERE id = ?2",
                params![name, id.to_string()],
            )?;
        }
        if let Some(folder_id) = &update.folder_id {
            tx.execute(
                "UPDATE scans SET folder_id = ?1 WHERE id = ?2",
                params![folder_id.as_ref().map(|f| f.to_string()), id.to_string()],
            )?;
        }
        let changed = tx.execute(
            "UPDATE scans SET updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        tx.commit()?;

        if changed == 0 {
            return Ok(None);
        }
        self.read_record(id)
    }

    /// Delete a scan; cascades through hosts, addresses, hostnames,
    /// ports, and scripts. Returns false when the scan did not exist.
    pub fn delete_scan(&self, id: &ScanId) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM scans WHERE id = ?1", [id.to_string()])?;
        if changed > 0 {
            tracing::info!(scan_id = %id, "Scan deleted");
        }
        Ok(changed > 0)
    }

    fn read_record(&self, id: &ScanId) -> Result<Option<ScanRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM scans WHERE id = ?1"),
                [id.to_string()],
                read_raw_record,
            )
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    fn read_scan_row(&self, id: &ScanId) -> Result<Option<(ScanRow, ScanMeta)>> {
        self.conn
            .query_row(
                "SELECT id, name, filename, folder_id, scanner, args, start_time, \
                 start_time_str, version, xmloutputversion, scope_type, scope_display, \
                 scope_note, scope_file, scope_discovered_count, scope_targets, \
                 scope_full_targets, total_hosts, total_ports, created_at, updated_at \
                 FROM scans WHERE id = ?1",
                [id.to_string()],
                |row| {
                    let scan_row = ScanRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        filename: row.get(2)?,
                        scanner: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        args: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                        start_time: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                        start_time_str: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                        version: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                        xmloutputversion: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                        scope_type: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
                        scope_display: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                        scope_note: row.get(12)?,
                        scope_file: row.get(13)?,
                        scope_discovered_count: row.get(14)?,
                        scope_targets: row.get(15)?,
                        scope_full_targets: row.get(16)?,
                        total_hosts: row.get(17)?,
                        total_ports: row.get(18)?,
                    };
                    let meta = ScanMeta {
                        name: scan_row.name.clone(),
                        filename: scan_row.filename.clone(),
                        folder_id: row.get(3)?,
                        created_at: row.get(19)?,
                        updated_at: row.get(20)?,
                    };
                    Ok((scan_row, meta))
                },
            )
            .optional()
            .map_err(StoreError::from)
    }

    fn read_hosts(&self, scan_id: &ScanId) -> Result<Vec<FlatHost>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, status_state, status_reason, status_reason_ttl, os_name, os_accuracy, \
             uptime_seconds, uptime_lastboot, distance_value \
             FROM hosts WHERE scan_id = ?1 ORDER BY id",
        )?;
        let host_rows = stmt
            .query_map([scan_id.to_string()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    HostRow {
                        status_state: row.get(1)?,
                        status_reason: row.get(2)?,
                        status_reason_ttl: row.get(3)?,
                        os_name: row.get(4)?,
                        os_accuracy: row.get(5)?,
                        uptime_seconds: row.get(6)?,
                        uptime_lastboot: row.get(7)?,
                        distance_value: row.get(8)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hosts = Vec::with_capacity(host_rows.len());
        for (host_id, row) in host_rows {
            hosts.push(FlatHost {
                row,
                addresses: self.read_addresses(host_id)?,
                hostnames: self.read_hostnames(host_id)?,
                ports: self.read_ports(host_id)?,
            });
        }
        Ok(hosts)
    }

    fn read_addresses(&self, host_id: i64) -> Result<Vec<AddressRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT addr, addrtype FROM addresses WHERE host_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([host_id], |row| {
                Ok(AddressRow {
                    addr: row.get(0)?,
                    addrtype: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn read_hostnames(&self, host_id: i64) -> Result<Vec<HostnameRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM hostnames WHERE host_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([host_id], |row| {
                Ok(HostnameRow {
                    name: row.get(0)?,
                    name_type: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn read_ports(&self, host_id: i64) -> Result<Vec<FlatPort>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, protocol, portid, state_state, state_reason, state_reason_ttl, \
             service_name, service_product, service_version, service_extrainfo, \
             service_method, service_conf \
             FROM ports WHERE host_id = ?1 ORDER BY id",
        )?;
        let port_rows = stmt
            .query_map([host_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    PortRow {
                        protocol: row.get(1)?,
                        portid: row.get(2)?,
                        state_state: row.get(3)?,
                        state_reason: row.get(4)?,
                        state_reason_ttl: row.get(5)?,
                        service_name: row.get(6)?,
                        service_product: row.get(7)?,
                        service_version: row.get(8)?,
                        service_extrainfo: row.get(9)?,
                        service_method: row.get(10)?,
                        service_conf: row.get(11)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut ports = Vec::with_capacity(port_rows.len());
        for (port_id, row) in port_rows {
            ports.push(FlatPort {
                row,
                scripts: self.read_scripts(port_id)?,
            });
        }
        Ok(ports)
    }

    fn read_scripts(&self, port_id: i64) -> Result<Vec<ScriptRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT script_id, output, raw_output FROM scripts WHERE port_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([port_id], |row| {
                Ok(ScriptRow {
                    script_id: row.get(0)?,
                    output: row.get(1)?,
                    raw_output: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Scan-table columns that belong to the record, not the document.
struct ScanMeta {
    name: String,
    filename: Option<String>,
    folder_id: Option<String>,
    created_at: String,
    updated_at: String,
}

/// A record row as stored, before id/timestamp conversion.
struct RawRecord {
    id: String,
    name: String,
    filename: Option<String>,
    folder_id: Option<String>,
    scanner: Option<String>,
    args: Option<String>,
    start_time: Option<String>,
    start_time_str: Option<String>,
    version: Option<String>,
    scope_type: Option<String>,
    scope_display: Option<String>,
    total_hosts: i64,
    total_ports: i64,
    created_at: String,
    updated_at: String,
}

fn read_raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        filename: row.get(2)?,
        folder_id: row.get(3)?,
        scanner: row.get(4)?,
        args: row.get(5)?,
        start_time: row.get(6)?,
        start_time_str: row.get(7)?,
        version: row.get(8)?,
        scope_type: row.get(9)?,
        scope_display: row.get(10)?,
        total_hosts: row.get(11)?,
        total_ports: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<ScanRecord> {
        Ok(ScanRecord {
            id: self
                .id
                .parse()
                .map_err(|_| StoreError::Validation(format!("bad scan id: {:?}", self.id)))?,
            name: self.name,
            filename: self.filename,
            folder_id: parse_folder_id(self.folder_id)?,
            scanner: self.scanner.unwrap_or_default(),
            args: self.args.unwrap_or_default(),
            start: self.start_time.unwrap_or_default(),
            startstr: self.start_time_str.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            scope_type: self.scope_type.unwrap_or_default(),
            scope_display: self.scope_display.unwrap_or_default(),
            total_hosts: self.total_hosts as u32,
            total_ports: self.total_ports as u32,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn insert_scan_rows(tx: &rusqlite::Transaction<'_>, rows: &ScanRows, now: &str) -> Result<()> {
    let scan = &rows.scan;
    tx.execute(
        "INSERT INTO scans (
            id, name, filename, folder_id, scanner, args, start_time, start_time_str,
            version, xmloutputversion, scope_type, scope_display, scope_note, scope_file,
            scope_discovered_count, scope_targets, scope_full_targets, total_hosts,
            total_ports, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            scan.id,
            scan.name,
            scan.filename,
            Option::<String>::None,
            scan.scanner,
            scan.args,
            scan.start_time,
            scan.start_time_str,
            scan.version,
            scan.xmloutputversion,
            scan.scope_type,
            scan.scope_display,
            scan.scope_note,
            scan.scope_file,
            scan.scope_discovered_count,
            scan.scope_targets,
            scan.scope_full_targets,
            scan.total_hosts,
            scan.total_ports,
            now,
            now,
        ],
    )?;

    for host in &rows.hosts {
        tx.execute(
            "INSERT INTO hosts (
                scan_id, status_state, status_reason, status_reason_ttl,
                os_name, os_accuracy, uptime_seconds, uptime_lastboot, distance_value
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                scan.id,
                host.row.status_state,
                host.row.status_reason,
                host.row.status_reason_ttl,
                host.row.os_name,
                host.row.os_accuracy,
                host.row.uptime_seconds,
                host.row.uptime_lastboot,
                host.row.distance_value,
            ],
        )?;
        let host_id = tx.last_insert_rowid();

        for addr in &host.addresses {
            tx.execute(
                "INSERT INTO addresses (host_id, addr, addrtype) VALUES (?1, ?2, ?3)",
                params![host_id, addr.addr, addr.addrtype],
            )?;
        }

        for hostname in &host.hostnames {
            tx.execute(
                "INSERT INTO hostnames (host_id, name, type) VALUES (?1, ?2, ?3)",
                params![host_id, hostname.name, hostname.name_type],
            )?;
        }

        for port in &host.ports {
            tx.execute(
                "INSERT INTO ports (
                    host_id, protocol, portid, state_state, state_reason, state_reason_ttl,
                    service_name, service_product, service_version, service_extrainfo,
                    service_method, service_conf
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    host_id,
                    port.row.protocol,
                    port.row.portid,
                    port.row.state_state,
                    port.row.state_reason,
                    port.row.state_reason_ttl,
                    port.row.service_name,
                    port.row.service_product,
                    port.row.service_version,
                    port.row.service_extrainfo,
                    port.row.service_method,
                    port.row.service_conf,
                ],
            )?;
            let port_id = tx.last_insert_rowid();

            for script in &port.scripts {
                tx.execute(
                    "INSERT INTO scripts (port_id, script_id, output, raw_output) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![port_id, script.script_id, script.output, script.raw_output],
                )?;
            }
        }
    }

    Ok(())
}

fn parse_folder_id(raw: Option<String>) -> Result<Option<scanvault_core::FolderId>> {
    raw.map(|s| {
        s.parse()
            .map_err(|_| StoreError::Validation(format!("bad folder id: {s:?}")))
    })
    .transpose()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Validation(format!("bad timestamp: {raw:?}")))
}
