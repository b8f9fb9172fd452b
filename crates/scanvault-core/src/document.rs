//! The scan document: the full nested representation of one network scan.
//!
//! A `ScanDocument` is created once per parse and is write-once. The
//! storage layer flattens it into relational rows and reconstructs a new,
//! semantically equal document on read, so every type here derives
//! `PartialEq` for field-wise comparison.
//!
//! JSON field names match the API contract exactly (`scanInfo`,
//! `totalHosts`, `rawOutput`, `fullTargets`, ...).

use serde::{Deserialize, Serialize};

/// Root of the scan round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanDocument {
    pub scan_info: ScanInfo,
    pub hosts: Vec<Host>,
    pub total_hosts: u32,
    pub total_ports: u32,
}

/// Metadata from the `<nmaprun>` root element plus the inferred scope.
///
/// Missing root attributes default to the empty string, never null,
/// except `scanner` which defaults to `"unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanInfo {
    pub scanner: String,
    pub args: String,
    pub start: String,
    pub startstr: String,
    pub version: String,
    pub xmloutputversion: String,
    pub scope: Scope,
}

/// What the scan targeted, inferred from the argument string.
///
/// Exactly one variant is active; `display` is precomputed at inference
/// time and never rebuilt from the target lists on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Scope {
    /// No usable arguments: scope is implied by the discovered hosts.
    Discovered {
        /// Unique ipv4/ipv6 addresses, first-occurrence order, at most 10.
        targets: Vec<String>,
        display: String,
    },
    /// Targets were loaded from a file (`-iL <file>`).
    #[serde(rename_all = "camelCase")]
    File {
        file: String,
        display: String,
        note: String,
        discovered_count: u32,
    },
    /// Explicit targets on the command line.
    #[serde(rename_all = "camelCase")]
    Command {
        targets: Vec<String>,
        /// Truncated to the first 3 targets plus a `(+N more)` suffix.
        display: String,
        full_targets: Vec<String>,
    },
}

impl Scope {
    /// The stored discriminator tag for this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Scope::Discovered { .. } => "discovered",
            Scope::File { .. } => "file",
            Scope::Command { .. } => "command",
        }
    }

    pub fn display(&self) -> &str {
        match self {
            Scope::Discovered { display, .. }
            | Scope::File { display, .. }
            | Scope::Command { display, .. } => display,
        }
    }
}

/// One scanned host. Owned exclusively by its parent document; child
/// sequences preserve document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Host {
    pub addresses: Vec<Address>,
    pub status: Option<Status>,
    pub hostnames: Vec<Hostname>,
    pub ports: Vec<Port>,
    pub os: Option<Os>,
    pub uptime: Option<Uptime>,
    pub distance: Option<Distance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub addr: String,
    /// `ipv4`, `ipv6`, `mac`, ...
    pub addrtype: String,
}

/// Host liveness. The struct itself is optional on a host; its fields are
/// all nullable to mirror the attribute-optional source element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    pub state: Option<String>,
    pub reason: Option<String>,
    pub reason_ttl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hostname {
    pub name: String,
    #[serde(rename = "type")]
    pub name_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub protocol: String,
    pub portid: String,
    pub state: Option<PortState>,
    pub service: Option<Service>,
    pub scripts: Vec<Script>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortState {
    pub state: Option<String>,
    pub reason: Option<String>,
    pub reason_ttl: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub name: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub extrainfo: Option<String>,
    pub method: Option<String>,
    pub conf: Option<String>,
}

/// Output of one NSE script run against a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Script {
    pub id: String,
    /// The element's own `output` attribute (rendered summary).
    pub output: Option<String>,
    /// Full inner text of the element, trimmed.
    #[serde(rename = "rawOutput")]
    pub raw_output: String,
}

/// Best OS match. Only the first `<osmatch>` is kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Os {
    pub name: String,
    pub accuracy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Uptime {
    pub seconds: String,
    pub lastboot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Distance {
    pub value: String,
}
