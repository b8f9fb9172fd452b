//! Scan XML parsing.
//!
//! Walks the raw XML as a DOM tree and builds a [`ScanDocument`]. The
//! DOM route (rather than serde deserialization) is deliberate: script
//! output needs the element's full inner text, and every attribute has
//! its own missing-value default.

use roxmltree::{Document, Node};

use scanvault_core::{
    Address, Distance, Host, Hostname, Os, Port, PortState, ScanDocument, ScanInfo, Script,
    Service, Status, Uptime,
};

use crate::error::{IngestError, Result};
use crate::scope;

/// Parse scan XML into a [`ScanDocument`].
///
/// Fails with [`IngestError::MalformedInput`] when the input is not
/// well-formed XML; no partial document is ever returned. Pure function,
/// bounded only by available memory.
pub fn parse(xml: &str) -> Result<ScanDocument> {
    let opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, opts)
        .map_err(|e| IngestError::MalformedInput(e.to_string()))?;

    let hosts: Vec<Host> = doc
        .descendants()
        .filter(|n| n.has_tag_name("host"))
        .map(parse_host)
        .collect();

    let root = doc.descendants().find(|n| n.has_tag_name("nmaprun"));
    let args = root_attr(root, "args", "");
    let scan_info = ScanInfo {
        scanner: root_attr(root, "scanner", "unknown"),
        scope: scope::infer(&args, &hosts),
        args,
        start: root_attr(root, "start", ""),
        startstr: root_attr(root, "startstr", ""),
        version: root_attr(root, "version", ""),
        xmloutputversion: root_attr(root, "xmloutputversion", ""),
    };

    let total_hosts = hosts.len() as u32;
    let total_ports = hosts.iter().map(|h| h.ports.len() as u32).sum();

    tracing::debug!(total_hosts, total_ports, scanner = %scan_info.scanner, "Scan XML parsed");

    Ok(ScanDocument {
        scan_info,
        hosts,
        total_hosts,
        total_ports,
    })
}

fn root_attr(root: Option<Node>, name: &str, default: &str) -> String {
    root.and_then(|n| n.attribute(name))
        .unwrap_or(default)
        .to_string()
}

fn attr(node: Node, name: &str) -> Option<String> {
    node.attribute(name).map(String::from)
}

fn attr_or_empty(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or("").to_string()
}

fn parse_host(host_el: Node) -> Host {
    let addresses = host_el
        .descendants()
        .filter(|n| n.has_tag_name("address"))
        .map(|n| Address {
            addr: attr_or_empty(n, "addr"),
            addrtype: attr_or_empty(n, "addrtype"),
        })
        .collect();

    let status = host_el
        .descendants()
        .find(|n| n.has_tag_name("status"))
        .map(|n| Status {
            state: attr(n, "state"),
            reason: attr(n, "reason"),
            reason_ttl: attr(n, "reason_ttl"),
        });

    let hostnames = host_el
        .descendants()
        .filter(|n| n.has_tag_name("hostname"))
        .map(|n| Hostname {
            name: attr_or_empty(n, "name"),
            name_type: attr(n, "type"),
        })
        .collect();

    let ports = host_el
        .descendants()
        .filter(|n| n.has_tag_name("port"))
        .map(parse_port)
        .collect();

    // Only the first osmatch is kept; additional matches are ignored.
    let os = host_el
        .descendants()
        .find(|n| n.has_tag_name("osmatch"))
        .map(|n| Os {
            name: attr_or_empty(n, "name"),
            accuracy: attr(n, "accuracy"),
        });

    let uptime = host_el
        .descendants()
        .find(|n| n.has_tag_name("uptime"))
        .map(|n| Uptime {
            seconds: attr_or_empty(n, "seconds"),
            lastboot: attr(n, "lastboot"),
        });

    let distance = host_el
        .descendants()
        .find(|n| n.has_tag_name("distance"))
        .map(|n| Distance {
            value: attr_or_empty(n, "value"),
        });

    Host {
        addresses,
        status,
        hostnames,
        ports,
        os,
        uptime,
        distance,
    }
}

fn parse_port(port_el: Node) -> Port {
    let state = port_el
        .children()
        .find(|n| n.has_tag_name("state"))
        .map(|n| PortState {
            state: attr(n, "state"),
            reason: attr(n, "reason"),
            reason_ttl: attr(n, "reason_ttl"),
        });

    let service = port_el
        .children()
        .find(|n| n.has_tag_name("service"))
        .map(|n| Service {
            name: attr(n, "name"),
            product: attr(n, "product"),
            version: attr(n, "version"),
            extrainfo: attr(n, "extrainfo"),
            method: attr(n, "method"),
            conf: attr(n, "conf"),
        });

    let scripts = port_el
        .children()
        .filter(|n| n.has_tag_name("script"))
        .map(|n| Script {
            id: attr_or_empty(n, "id"),
            output: attr(n, "output"),
            raw_output: inner_text(n),
        })
        .collect();

    Port {
        protocol: attr_or_empty(port_el, "protocol"),
        portid: attr_or_empty(port_el, "portid"),
        state,
        service,
        scripts,
    }
}

/// Concatenated text of the node and all its descendants, trimmed.
/// Equivalent to DOM `textContent` for elements with nested tables.
fn inner_text(node: Node) -> String {
    let mut text = String::new();
    for n in node.descendants() {
        if n.is_text() {
            text.push_str(n.text().unwrap_or(""));
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanvault_core::Scope;

    const FULL_SCAN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<nmaprun scanner="nmap" args="nmap -sV -p 22,80 10.0.1.5" start="1740400000"
         startstr="Mon Feb 24 10:00:00 2026" version="7.95" xmloutputversion="1.05">
  <host>
    <status state="up" reason="syn-ack" reason_ttl="64"/>
    <address addr="10.0.1.5" addrtype="ipv4"/>
    <address addr="AA:BB:CC:DD:EE:05" addrtype="mac"/>
    <hostnames>
      <hostname name="web.local" type="PTR"/>
    </hostnames>
    <ports>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack" reason_ttl="64"/>
        <service name="ssh" product="OpenSSH" version="9.6" extrainfo="Ubuntu" method="probed" conf="10"/>
      </port>
      <port protocol="tcp" portid="80">
        <state state="open" reason="syn-ack"/>
        <service name="http" product="nginx"/>
        <script id="http-title" output="Home">actual body text</script>
        <script id="http-server-header" output="nginx"><elem key="header">nginx/1.24</elem></script>
      </port>
    </ports>
    <os>
      <osmatch name="Linux 5.15" accuracy="95"/>
      <osmatch name="Linux 6.1" accuracy="90"/>
    </os>
    <uptime seconds="86400" lastboot="Sun Feb 23 10:00:00 2026"/>
    <distance value="3"/>
  </host>
  <host>
    <status state="down" reason="no-response"/>
    <address addr="10.0.1.6" addrtype="ipv4"/>
  </host>
</nmaprun>"#;

    #[test]
    fn parses_full_scan() {
        let doc = parse(FULL_SCAN_XML).unwrap();

        assert_eq!(doc.scan_info.scanner, "nmap");
        assert_eq!(doc.scan_info.args, "nmap -sV -p 22,80 10.0.1.5");
        assert_eq!(doc.scan_info.start, "1740400000");
        assert_eq!(doc.scan_info.version, "7.95");
        assert_eq!(doc.scan_info.xmloutputversion, "1.05");
        assert_eq!(doc.total_hosts, 2);
        assert_eq!(doc.total_ports, 2);

        let host = &doc.hosts[0];
        assert_eq!(host.addresses.len(), 2);
        assert_eq!(host.addresses[1].addrtype, "mac");
        assert_eq!(host.status.as_ref().unwrap().state.as_deref(), Some("up"));
        assert_eq!(host.hostnames[0].name, "web.local");
        assert_eq!(host.uptime.as_ref().unwrap().seconds, "86400");
        assert_eq!(host.distance.as_ref().unwrap().value, "3");

        let ssh = &host.ports[0];
        assert_eq!(ssh.portid, "22");
        let svc = ssh.service.as_ref().unwrap();
        assert_eq!(svc.name.as_deref(), Some("ssh"));
        assert_eq!(svc.conf.as_deref(), Some("10"));
    }

    #[test]
    fn scope_comes_from_the_argument_string() {
        let doc = parse(FULL_SCAN_XML).unwrap();
        match &doc.scan_info.scope {
            Scope::Command { full_targets, .. } => {
                assert_eq!(full_targets, &vec!["10.0.1.5".to_string()]);
            }
            other => panic!("expected Command scope, got {other:?}"),
        }
    }

    #[test]
    fn script_output_attribute_and_inner_text_are_distinct() {
        let doc = parse(FULL_SCAN_XML).unwrap();
        let scripts = &doc.hosts[0].ports[1].scripts;
        assert_eq!(scripts.len(), 2);

        assert_eq!(scripts[0].id, "http-title");
        assert_eq!(scripts[0].output.as_deref(), Some("Home"));
        assert_eq!(scripts[0].raw_output, "actual body text");

        // Inner text includes text nested inside child elements.
        assert_eq!(scripts[1].raw_output, "nginx/1.24");
    }

    #[test]
    fn only_the_first_osmatch_is_kept() {
        let doc = parse(FULL_SCAN_XML).unwrap();
        let os = doc.hosts[0].os.as_ref().unwrap();
        assert_eq!(os.name, "Linux 5.15");
        assert_eq!(os.accuracy.as_deref(), Some("95"));
    }

    #[test]
    fn malformed_xml_is_rejected_outright() {
        let err = parse("<nmaprun><host>").unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput(_)));
    }

    #[test]
    fn missing_root_attributes_default_to_empty() {
        let doc = parse("<nmaprun/>").unwrap();
        assert_eq!(doc.scan_info.scanner, "unknown");
        assert_eq!(doc.scan_info.args, "");
        assert_eq!(doc.scan_info.startstr, "");
        assert_eq!(doc.total_hosts, 0);
        assert_eq!(doc.total_ports, 0);
    }

    #[test]
    fn host_without_optional_elements_parses_clean() {
        let xml = r#"<nmaprun scanner="nmap"><host><address addr="10.0.0.1" addrtype="ipv4"/></host></nmaprun>"#;
        let doc = parse(xml).unwrap();
        let host = &doc.hosts[0];
        assert!(host.status.is_none());
        assert!(host.os.is_none());
        assert!(host.uptime.is_none());
        assert!(host.distance.is_none());
        assert!(host.ports.is_empty());
        assert!(host.hostnames.is_empty());
    }

    #[test]
    fn zero_port_hosts_contribute_zero_to_totals() {
        let xml = r#"<nmaprun scanner="nmap">
  <host><address addr="10.0.0.1" addrtype="ipv4"/></host>
  <host><address addr="10.0.0.2" addrtype="ipv4"/>
    <ports><port protocol="tcp" portid="443"><state state="open"/></port></ports>
  </host>
</nmaprun>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.total_hosts, 2);
        assert_eq!(doc.total_ports, 1);
    }

    #[test]
    fn addresses_are_not_deduplicated_on_a_host() {
        let xml = r#"<nmaprun scanner="nmap"><host>
  <address addr="10.0.0.1" addrtype="ipv4"/>
  <address addr="10.0.0.1" addrtype="ipv4"/>
</host></nmaprun>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.hosts[0].addresses.len(), 2);
    }

    #[test]
    fn port_without_service_has_no_service_struct() {
        let xml = r#"<nmaprun scanner="nmap"><host>
  <address addr="10.0.0.1" addrtype="ipv4"/>
  <ports><port protocol="tcp" portid="3306"><state state="filtered" reason="no-response"/></port></ports>
</host></nmaprun>"#;
        let doc = parse(xml).unwrap();
        let port = &doc.hosts[0].ports[0];
        assert!(port.service.is_none());
        assert_eq!(port.state.as_ref().unwrap().state.as_deref(), Some("filtered"));
    }
}
