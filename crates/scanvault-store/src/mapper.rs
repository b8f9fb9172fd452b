//! Relational mapping: flatten a scan document into rows, reconstruct
//! the document from rows.
//!
//! `reconstruct` is the exact structural inverse of `flatten`. Optional
//! sub-structures are written as all-null column groups and come back as
//! `Some` only when their discriminating column is non-null:
//!
//! - Status      -> `status_state`
//! - PortState   -> `state_state`
//! - Service     -> `service_name` or `service_product`
//! - Os          -> `os_name`
//! - Uptime      -> `uptime_seconds`
//! - Distance    -> `distance_value`
//!
//! The scope variant is recorded in the `scope_type` column and trusted
//! as the tag on read; target lists are JSON-encoded text columns.

use scanvault_core::{
    Address, Distance, Host, Hostname, Os, Port, PortState, ScanDocument, ScanId, ScanInfo, Scope,
    Script, Service, Status, Uptime,
};

use crate::error::{Result, StoreError};

/// The `scans` row for one document.
#[derive(Debug, Clone)]
pub struct ScanRow {
    pub id: String,
    pub name: String,
    pub filename: Option<String>,
    pub scanner: String,
    pub args: String,
    pub start_time: String,
    pub start_time_str: String,
    pub version: String,
    pub xmloutputversion: String,
    pub scope_type: String,
    pub scope_display: String,
    pub scope_note: Option<String>,
    pub scope_file: Option<String>,
    pub scope_discovered_count: Option<i64>,
    pub scope_targets: Option<String>,
    pub scope_full_targets: Option<String>,
    pub total_hosts: i64,
    pub total_ports: i64,
}

/// One `hosts` row; child rows are carried alongside, linkage to the
/// parent is structural until surrogate keys are assigned at insert.
#[derive(Debug, Clone)]
pub struct HostRow {
    pub status_state: Option<String>,
    pub status_reason: Option<String>,
    pub status_reason_ttl: Option<String>,
    pub os_name: Option<String>,
    pub os_accuracy: Option<String>,
    pub uptime_seconds: Option<String>,
    pub uptime_lastboot: Option<String>,
    pub distance_value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AddressRow {
    pub addr: String,
    pub addrtype: String,
}

#[derive(Debug, Clone)]
pub struct HostnameRow {
    pub name: String,
    pub name_type: Option<String>,
}

/// One `ports` row. `protocol` and `portid` are optional here so that
/// reads can surface a NULL as a validation failure instead of a guess.
#[derive(Debug, Clone)]
pub struct PortRow {
    pub protocol: Option<String>,
    pub portid: Option<String>,
    pub state_state: Option<String>,
    pub state_reason: Option<String>,
    pub state_reason_ttl: Option<String>,
    pub service_name: Option<String>,
    pub service_product: Option<String>,
    pub service_version: Option<String>,
    pub service_extrainfo: Option<String>,
    pub service_method: Option<String>,
    pub service_conf: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScriptRow {
    pub script_id: String,
    pub output: Option<String>,
    pub raw_output: String,
}

#[derive(Debug, Clone)]
pub struct FlatPort {
    pub row: PortRow,
    pub scripts: Vec<ScriptRow>,
}

#[derive(Debug, Clone)]
pub struct FlatHost {
    pub row: HostRow,
    pub addresses: Vec<AddressRow>,
    pub hostnames: Vec<HostnameRow>,
    pub ports: Vec<FlatPort>,
}

/// Everything needed to persist one scan, in insertion order.
#[derive(Debug, Clone)]
pub struct ScanRows {
    pub scan: ScanRow,
    pub hosts: Vec<FlatHost>,
}

/// Flatten a document into relational rows.
pub fn flatten(
    doc: &ScanDocument,
    id: &ScanId,
    name: &str,
    filename: Option<&str>,
) -> Result<ScanRows> {
    let info = &doc.scan_info;
    let (scope_note, scope_file, scope_discovered_count, scope_targets, scope_full_targets) =
        flatten_scope(&info.scope)?;

    let scan = ScanRow {
        id: id.to_string(),
        name: name.to_string(),
        filename: filename.map(String::from),
        scanner: info.scanner.clone(),
        args: info.args.clone(),
        start_time: info.start.clone(),
        start_time_str: info.startstr.clone(),
        version: info.version.clone(),
        xmloutputversion: info.xmloutputversion.clone(),
        scope_type: info.scope.type_tag().to_string(),
        scope_display: info.scope.display().to_string(),
        scope_note,
        scope_file,
        scope_discovered_count,
        scope_targets,
        scope_full_targets,
        total_hosts: doc.total_hosts as i64,
        total_ports: doc.total_ports as i64,
    };

    let hosts = doc.hosts.iter().map(flatten_host).collect();

    Ok(ScanRows { scan, hosts })
}

type ScopeColumns = (
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
);

fn flatten_scope(scope: &Scope) -> Result<ScopeColumns> {
    Ok(match scope {
        Scope::Discovered { targets, .. } => {
            (None, None, None, Some(serde_json::to_string(targets)?), None)
        }
        Scope::File {
            file,
            note,
            discovered_count,
            ..
        } => (
            Some(note.clone()),
            Some(file.clone()),
            Some(*discovered_count as i64),
            None,
            None,
        ),
        Scope::Command {
            targets,
            full_targets,
            ..
        } => (
            None,
            None,
            None,
            Some(serde_json::to_string(targets)?),
            Some(serde_json::to_string(full_targets)?),
        ),
    })
}

fn flatten_host(host: &Host) -> FlatHost {
    let row = HostRow {
        status_state: host.status.as_ref().and_then(|s| s.state.clone()),
        status_reason: host.status.as_ref().and_then(|s| s.reason.clone()),
        status_reason_ttl: host.status.as_ref().and_then(|s| s.reason_ttl.clone()),
        os_name: host.os.as_ref().map(|o| o.name.clone()),
        os_accuracy: host.os.as_ref().and_then(|o| o.accuracy.clone()),
        uptime_seconds: host.uptime.as_ref().map(|u| u.seconds.clone()),
        uptime_lastboot: host.uptime.as_ref().and_then(|u| u.lastboot.clone()),
        distance_value: host.distance.as_ref().map(|d| d.value.clone()),
    };

    let addresses = host
        .addresses
        .iter()
        .map(|a| AddressRow {
            addr: a.addr.clone(),
            addrtype: a.addrtype.clone(),
        })
        .collect();

    let hostnames = host
        .hostnames
        .iter()
        .map(|h| HostnameRow {
            name: h.name.clone(),
            name_type: h.name_type.clone(),
        })
        .collect();

    let ports = host.ports.iter().map(flatten_port).collect();

    FlatHost {
        row,
        addresses,
        hostnames,
        ports,
    }
}

fn flatten_port(port: &Port) -> FlatPort {
    let row = PortRow {
        protocol: Some(port.protocol.clone()),
        portid: Some(port.portid.clone()),
        state_state: port.state.as_ref().and_then(|s| s.state.clone()),
        state_reason: port.state.as_ref().and_then(|s| s.reason.clone()),
        state_reason_ttl: port.state.as_ref().and_then(|s| s.reason_ttl.clone()),
        service_name: port.service.as_ref().and_then(|s| s.name.clone()),
        service_product: port.service.as_ref().and_then(|s| s.product.clone()),
        service_version: port.service.as_ref().and_then(|s| s.version.clone()),
        service_extrainfo: port.service.as_ref().and_then(|s| s.extrainfo.clone()),
        service_method: port.service.as_ref().and_then(|s| s.method.clone()),
        service_conf: port.service.as_ref().and_then(|s| s.conf.clone()),
    };

    let scripts = port
        .scripts
        .iter()
        .map(|s| ScriptRow {
            script_id: s.id.clone(),
            output: s.output.clone(),
            raw_output: s.raw_output.clone(),
        })
        .collect();

    FlatPort { row, scripts }
}

/// Rebuild the document from stored rows. Exact inverse of [`flatten`].
pub fn reconstruct(rows: &ScanRows) -> Result<ScanDocument> {
    let scan = &rows.scan;
    let scope = reconstruct_scope(scan)?;

    let hosts = rows
        .hosts
        .iter()
        .map(reconstruct_host)
        .collect::<Result<Vec<_>>>()?;

    Ok(ScanDocument {
        scan_info: ScanInfo {
            scanner: scan.scanner.clone(),
            args: scan.args.clone(),
            start: scan.start_time.clone(),
            startstr: scan.start_time_str.clone(),
            version: scan.version.clone(),
            xmloutputversion: scan.xmloutputversion.clone(),
            scope,
        },
        hosts,
        total_hosts: scan.total_hosts as u32,
        total_ports: scan.total_ports as u32,
    })
}

fn reconstruct_scope(scan: &ScanRow) -> Result<Scope> {
    let targets = decode_targets(scan.scope_targets.as_deref())?;
    match scan.scope_type.as_str() {
        "discovered" => Ok(Scope::Discovered {
            targets,
            display: scan.scope_display.clone(),
        }),
        "file" => Ok(Scope::File {
            file: scan
                .scope_file
                .clone()
                .ok_or_else(|| StoreError::Validation("file scope without a filename".into()))?,
            display: scan.scope_display.clone(),
            note: scan.scope_note.clone().unwrap_or_default(),
            discovered_count: scan.scope_discovered_count.unwrap_or(0) as u32,
        }),
        "command" => Ok(Scope::Command {
            targets,
            display: scan.scope_display.clone(),
            full_targets: decode_targets(scan.scope_full_targets.as_deref())?,
        }),
        other => Err(StoreError::Validation(format!(
            "unknown scope type: {other:?}"
        ))),
    }
}

fn decode_targets(json: Option<&str>) -> Result<Vec<String>> {
    match json {
        Some(text) => Ok(serde_json::from_str(text)?),
        None => Ok(Vec::new()),
    }
}

fn reconstruct_host(flat: &FlatHost) -> Result<Host> {
    let row = &flat.row;

    let status = row.status_state.as_ref().map(|_| Status {
        state: row.status_state.clone(),
        reason: row.status_reason.clone(),
        reason_ttl: row.status_reason_ttl.clone(),
    });

    let os = row.os_name.as_ref().map(|name| Os {
        name: name.clone(),
        accuracy: row.os_accuracy.clone(),
    });

    let uptime = row.uptime_seconds.as_ref().map(|seconds| Uptime {
        seconds: seconds.clone(),
        lastboot: row.uptime_lastboot.clone(),
    });

    let distance = row.distance_value.as_ref().map(|value| Distance {
        value: value.clone(),
    });

    let addresses = flat
        .addresses
        .iter()
        .map(|a| Address {
            addr: a.addr.clone(),
            addrtype: a.addrtype.clone(),
        })
        .collect();

    let hostnames = flat
        .hostnames
        .iter()
        .map(|h| Hostname {
            name: h.name.clone(),
            name_type: h.name_type.clone(),
        })
        .collect();

    let ports = flat
        .ports
        .iter()
        .map(reconstruct_port)
        .collect::<Result<Vec<_>>>()?;

    Ok(Host {
        addresses,
        status,
        hostnames,
        ports,
        os,
        uptime,
        distance,
    })
}

fn reconstruct_port(flat: &FlatPort) -> Result<Port> {
    let row = &flat.row;

    let protocol = row
        .protocol
        .clone()
        .ok_or_else(|| StoreError::Validation("port row with no protocol".into()))?;
    let portid = row
        .portid
        .clone()
        .ok_or_else(|| StoreError::Validation("port row with no portid".into()))?;

    let state = row.state_state.as_ref().map(|_| PortState {
        state: row.state_state.clone(),
        reason: row.state_reason.clone(),
        reason_ttl: row.state_reason_ttl.clone(),
    });

    let service = if row.service_name.is_some() || row.service_product.is_some() {
        Some(Service {
            name: row.service_name.clone(),
            product: row.service_product.clone(),
            version: row.service_version.clone(),
            extrainfo: row.service_extrainfo.clone(),
            method: row.service_method.clone(),
            conf: row.service_conf.clone(),
        })
    } else {
        None
    };

    let scripts = flat
        .scripts
        .iter()
        .map(|s| Script {
            id: s.script_id.clone(),
            output: s.output.clone(),
            raw_output: s.raw_output.clone(),
        })
        .collect();

    Ok(Port {
        protocol,
        portid,
        state,
        service,
        scripts,
    })
}
