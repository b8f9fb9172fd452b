//! Database schema bootstrap and additive migrations.
//!
//! Deletion cascades from `scans` down through `scripts`; removing a
//! folder never removes scans (`ON DELETE SET NULL`). Schema evolution
//! is additive-column only, handled by `run_migrations`.

use rusqlite::Connection;

/// Create all tables and indexes, then apply additive migrations.
pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS folders (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            parent_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (parent_id) REFERENCES folders(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS scans (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            filename TEXT,
            folder_id TEXT,
            scanner TEXT,
            args TEXT,
            start_time TEXT,
            start_time_str TEXT,
            version TEXT,
            xmloutputversion TEXT,
            scope_type TEXT,
            scope_display TEXT,
            scope_note TEXT,
            scope_file TEXT,
            scope_discovered_count INTEGER,
            scope_targets TEXT,
            scope_full_targets TEXT,
            total_hosts INTEGER DEFAULT 0,
            total_ports INTEGER DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS hosts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_id TEXT NOT NULL,
            status_state TEXT,
            status_reason TEXT,
            status_reason_ttl TEXT,
            os_name TEXT,
            os_accuracy TEXT,
            uptime_seconds TEXT,
            uptime_lastboot TEXT,
            distance_value TEXT,
            FOREIGN KEY (scan_id) REFERENCES scans(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS addresses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_id INTEGER NOT NULL,
            addr TEXT NOT NULL,
            addrtype TEXT NOT NULL,
            FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS hostnames (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            type TEXT,
            FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS ports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host_id INTEGER NOT NULL,
            protocol TEXT NOT NULL,
            portid TEXT NOT NULL,
            state_state TEXT,
            state_reason TEXT,
            state_reason_ttl TEXT,
            service_name TEXT,
            service_product TEXT,
            service_version TEXT,
            service_extrainfo TEXT,
            service_method TEXT,
            service_conf TEXT,
            FOREIGN KEY (host_id) REFERENCES hosts(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS scripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            port_id INTEGER NOT NULL,
            script_id TEXT NOT NULL,
            output TEXT,
            raw_output TEXT,
            FOREIGN KEY (port_id) REFERENCES ports(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_scans_folder_id ON scans(folder_id);
        CREATE INDEX IF NOT EXISTS idx_folders_parent_id ON folders(parent_id);
        CREATE INDEX IF NOT EXISTS idx_hosts_scan_id ON hosts(scan_id);
        CREATE INDEX IF NOT EXISTS idx_addresses_host_id ON addresses(host_id);
        CREATE INDEX IF NOT EXISTS idx_hostnames_host_id ON hostnames(host_id);
        CREATE INDEX IF NOT EXISTS idx_ports_host_id ON ports(host_id);
        CREATE INDEX IF NOT EXISTS idx_scripts_port_id ON scripts(port_id);",
    )?;

    run_migrations(conn)?;

    Ok(())
}

/// Bring databases created by earlier schema versions up to date.
/// Columns are only ever added, never altered or dropped.
fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    for column in ["scope_targets", "scope_full_targets"] {
        if !column_exists(conn, "scans", column)? {
            tracing::info!(column, "Migrating: adding column to scans");
            conn.execute(&format!("ALTER TABLE scans ADD COLUMN {column} TEXT"), [])?;
        }
    }
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    // pragma_table_info does not take the table name as a parameter;
    // table names here are compile-time constants.
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"),
        [column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn migration_adds_missing_scope_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE scans (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .unwrap();

        assert!(!column_exists(&conn, "scans", "scope_targets").unwrap());
        run_migrations(&conn).unwrap();
        assert!(column_exists(&conn, "scans", "scope_targets").unwrap());
        assert!(column_exists(&conn, "scans", "scope_full_targets").unwrap());
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO hosts (scan_id) VALUES ('no-such-scan')",
            [],
        );
        assert!(result.is_err());
    }
}
