//! Scan scope inference.
//!
//! Given the raw argument string recorded in the scan and the hosts that
//! were actually discovered, classify what the scan targeted. The rule
//! order is a documented contract, first match wins:
//!
//! 1. empty args -> [`Scope::Discovered`] built from the unique result IPs
//! 2. `-iL <file>` present -> [`Scope::File`]
//! 3. non-flag tokens remain -> [`Scope::Command`]
//! 4. nothing usable -> fall back to rule 1
//!
//! The function is total: it always returns a scope, never fails.

use scanvault_core::{Host, Scope};

/// Flags whose following token is a value, not a target.
const VALUE_FLAGS: [&str; 5] = ["-p", "-iL", "-iR", "-exclude", "-excludefile"];

/// How many targets the `Command` display string shows before truncating.
const DISPLAY_TARGETS: usize = 3;

/// How many discovered addresses the `Discovered` target list keeps.
const DISCOVERED_KEPT: usize = 10;

/// Infer the scan scope from the argument string and discovered hosts.
pub fn infer(args: &str, hosts: &[Host]) -> Scope {
    if args.is_empty() {
        return discovered_scope(hosts);
    }

    if let Some(file) = input_file_arg(args) {
        let count = unique_ips(hosts).len();
        let note = if count > 0 {
            format!(
                "{count} host{} discovered from file",
                if count == 1 { "" } else { "s" }
            )
        } else {
            "Target list loaded from file (no hosts discovered)".to_string()
        };
        return Scope::File {
            display: format!("Targets from file: {file}"),
            file,
            note,
            discovered_count: count as u32,
        };
    }

    let targets = command_targets(args);
    if !targets.is_empty() {
        let display = if targets.len() > DISPLAY_TARGETS {
            format!(
                "{}... (+{} more)",
                targets[..DISPLAY_TARGETS].join(", "),
                targets.len() - DISPLAY_TARGETS
            )
        } else {
            targets.join(", ")
        };
        return Scope::Command {
            targets: targets.clone(),
            display,
            full_targets: targets,
        };
    }

    // Args yielded nothing usable; fall back to the discovered hosts.
    infer("", hosts)
}

/// Unique ipv4/ipv6 addresses across all hosts, first-occurrence order.
fn unique_ips(hosts: &[Host]) -> Vec<String> {
    let mut seen = Vec::new();
    for host in hosts {
        for addr in &host.addresses {
            if (addr.addrtype == "ipv4" || addr.addrtype == "ipv6")
                && !seen.contains(&addr.addr)
            {
                seen.push(addr.addr.clone());
            }
        }
    }
    seen
}

fn discovered_scope(hosts: &[Host]) -> Scope {
    let ips = unique_ips(hosts);
    let n = ips.len();
    let display = if n > DISCOVERED_KEPT {
        format!("{n} discovered IPs (showing first {DISCOVERED_KEPT})")
    } else {
        format!("{n} discovered IP{}", if n == 1 { "" } else { "s" })
    };
    let mut targets = ips;
    targets.truncate(DISCOVERED_KEPT);
    Scope::Discovered { targets, display }
}

/// The filename following the first `-iL` flag, if any.
fn input_file_arg(args: &str) -> Option<String> {
    let mut tokens = args.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "-iL" {
            return tokens.next().map(String::from);
        }
    }
    None
}

/// Everything on the command line that is not a flag, a flag value, or
/// the scanner binary itself.
fn command_targets(args: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut skip_next = false;

    for token in args.split_whitespace() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if token.starts_with('-') {
            if VALUE_FLAGS.contains(&token) {
                skip_next = true;
            }
            continue;
        }
        if token.contains("nmap") {
            continue;
        }
        targets.push(token.to_string());
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanvault_core::Address;

    fn host_with_ips(ips: &[&str]) -> Host {
        Host {
            addresses: ips
                .iter()
                .map(|ip| Address {
                    addr: ip.to_string(),
                    addrtype: "ipv4".to_string(),
                })
                .collect(),
            ..Host::default()
        }
    }

    #[test]
    fn empty_args_dedupes_discovered_ips() {
        let hosts = vec![host_with_ips(&["10.0.0.1", "10.0.0.1"]), host_with_ips(&["10.0.0.2"])];
        match infer("", &hosts) {
            Scope::Discovered { targets, display } => {
                assert_eq!(targets, vec!["10.0.0.1", "10.0.0.2"]);
                assert_eq!(display, "2 discovered IPs");
            }
            other => panic!("expected Discovered, got {other:?}"),
        }
    }

    #[test]
    fn discovered_pluralization_boundary() {
        assert_eq!(infer("", &[]).display(), "0 discovered IPs");
        assert_eq!(
            infer("", &[host_with_ips(&["10.0.0.1"])]).display(),
            "1 discovered IP"
        );
    }

    #[test]
    fn discovered_caps_targets_at_ten() {
        let ips: Vec<String> = (1..=12).map(|i| format!("10.0.0.{i}")).collect();
        let refs: Vec<&str> = ips.iter().map(String::as_str).collect();
        match infer("", &[host_with_ips(&refs)]) {
            Scope::Discovered { targets, display } => {
                assert_eq!(targets.len(), 10);
                assert_eq!(display, "12 discovered IPs (showing first 10)");
            }
            other => panic!("expected Discovered, got {other:?}"),
        }
    }

    #[test]
    fn input_file_scope_counts_discovered_hosts() {
        let hosts = vec![
            host_with_ips(&["10.0.0.1"]),
            host_with_ips(&["10.0.0.2"]),
            host_with_ips(&["10.0.0.3"]),
        ];
        match infer("nmap -iL targets.txt -p 80", &hosts) {
            Scope::File {
                file,
                display,
                note,
                discovered_count,
            } => {
                assert_eq!(file, "targets.txt");
                assert_eq!(display, "Targets from file: targets.txt");
                assert_eq!(note, "3 hosts discovered from file");
                assert_eq!(discovered_count, 3);
            }
            other => panic!("expected File, got {other:?}"),
        }
    }

    #[test]
    fn input_file_scope_with_no_hosts() {
        match infer("nmap -iL empty.txt", &[]) {
            Scope::File { note, discovered_count, .. } => {
                assert_eq!(note, "Target list loaded from file (no hosts discovered)");
                assert_eq!(discovered_count, 0);
            }
            other => panic!("expected File, got {other:?}"),
        }
    }

    #[test]
    fn single_host_from_file_uses_singular_note() {
        match infer("nmap -iL one.txt", &[host_with_ips(&["10.0.0.1"])]) {
            Scope::File { note, .. } => assert_eq!(note, "1 host discovered from file"),
            other => panic!("expected File, got {other:?}"),
        }
    }

    #[test]
    fn command_scope_truncates_display_after_three() {
        let args = "nmap -p 1-1000 192.168.1.1 192.168.1.2 192.168.1.3 192.168.1.4";
        match infer(args, &[]) {
            Scope::Command {
                targets,
                display,
                full_targets,
            } => {
                assert_eq!(full_targets.len(), 4);
                assert_eq!(targets, full_targets);
                assert_eq!(
                    display,
                    "192.168.1.1, 192.168.1.2, 192.168.1.3... (+1 more)"
                );
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn command_scope_short_list_shows_everything() {
        match infer("nmap -sS 10.0.0.1 10.0.0.2", &[]) {
            Scope::Command { display, .. } => assert_eq!(display, "10.0.0.1, 10.0.0.2"),
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn value_flags_consume_the_next_token() {
        // "-p 80" must not leave "80" behind as a target.
        match infer("nmap -p 80 -exclude 10.0.0.9 scanme.example", &[]) {
            Scope::Command { full_targets, .. } => {
                assert_eq!(full_targets, vec!["scanme.example"]);
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn scanner_binary_tokens_are_skipped() {
        match infer("/usr/bin/nmap -sV 10.1.1.1", &[]) {
            Scope::Command { full_targets, .. } => assert_eq!(full_targets, vec!["10.1.1.1"]),
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn flags_only_falls_back_to_discovered() {
        let hosts = vec![host_with_ips(&["10.0.0.1"])];
        match infer("nmap -sS -T4", &hosts) {
            Scope::Discovered { targets, display } => {
                assert_eq!(targets, vec!["10.0.0.1"]);
                assert_eq!(display, "1 discovered IP");
            }
            other => panic!("expected Discovered, got {other:?}"),
        }
    }
}
