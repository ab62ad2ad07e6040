//! Host alias derivation from the companion ConfigMap.
//!
//! The DaemonSet runs with host networking, so cluster DNS is not used for
//! OpenStack hostnames. The companion ConfigMap ships an `/etc/hosts` style
//! document under the `hosts` key; its entries are injected as pod host aliases.

use k8s_openapi::api::core::v1::{ConfigMap, HostAlias};
use std::net::IpAddr;
use tracing::warn;

/// ConfigMap key holding the hosts document.
pub const HOSTS_KEY: &str = "hosts";

const MANAGED_BLOCK_BEGIN: &str = "BEGIN ANSIBLE MANAGED BLOCK";
const MANAGED_BLOCK_END: &str = "END ANSIBLE MANAGED BLOCK";

/// Derives the ordered host alias list from the companion ConfigMap.
///
/// A missing `hosts` key yields an empty list.
pub fn host_aliases(common_config: &ConfigMap) -> Vec<HostAlias> {
    common_config
        .data
        .as_ref()
        .and_then(|data| data.get(HOSTS_KEY))
        .map(|hosts| parse_hosts(hosts))
        .unwrap_or_default()
}

/// Parses an `/etc/hosts` document into host aliases.
///
/// When the document contains an Ansible managed block only the lines inside
/// it are considered. Hostnames of a repeated address are merged into the
/// entry of its first occurrence.
pub fn parse_hosts(document: &str) -> Vec<HostAlias> {
    let mut entries: Vec<(String, Vec<String>)> = Vec::new();

    for line in managed_block(document).lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Trailing comments are allowed
        let line = line.split('#').next().unwrap_or_default();

        let mut fields = line.split_whitespace();
        let Some(address) = fields.next() else {
            continue;
        };
        if address.parse::<IpAddr>().is_err() {
            warn!("Skipping hosts entry with invalid address: {}", line);
            continue;
        }
        let hostnames: Vec<String> = fields.map(str::to_string).collect();
        if hostnames.is_empty() {
            warn!("Skipping hosts entry without hostnames: {}", line);
            continue;
        }

        match entries.iter_mut().find(|(ip, _)| ip == address) {
            Some((_, existing)) => {
                for hostname in hostnames {
                    if !existing.contains(&hostname) {
                        existing.push(hostname);
                    }
                }
            }
            None => entries.push((address.to_string(), hostnames)),
        }
    }

    entries
        .into_iter()
        .map(|(ip, hostnames)| HostAlias {
            ip: ip.into(),
            hostnames: Some(hostnames),
        })
        .collect()
}

fn managed_block(document: &str) -> &str {
    let Some(begin) = document.find(MANAGED_BLOCK_BEGIN) else {
        return document;
    };
    let rest = &document[begin + MANAGED_BLOCK_BEGIN.len()..];
    // Skip the remainder of the marker line
    let rest = rest.find('\n').map_or("", |eol| &rest[eol + 1..]);
    match rest.find(MANAGED_BLOCK_END) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn alias(ip: &str, hostnames: &[&str]) -> HostAlias {
        HostAlias {
            ip: ip.to_string().into(),
            hostnames: Some(hostnames.iter().map(|h| h.to_string()).collect()),
        }
    }

    #[test]
    fn test_parse_single_entry() {
        let aliases = parse_hosts("10.0.0.5 controller-0.tenant\n");
        assert_eq!(aliases, vec![alias("10.0.0.5", &["controller-0.tenant"])]);
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let document = "\
# local entries
127.0.0.1 localhost

10.0.0.5 controller-0.tenant controller-0  # tenant network
";
        let aliases = parse_hosts(document);
        assert_eq!(
            aliases,
            vec![
                alias("127.0.0.1", &["localhost"]),
                alias("10.0.0.5", &["controller-0.tenant", "controller-0"]),
            ]
        );
    }

    #[test]
    fn test_parse_only_managed_block() {
        let document = "\
127.0.0.1 localhost
# BEGIN ANSIBLE MANAGED BLOCK
10.0.0.5 controller-0.tenant
172.17.0.10 controller-0.internalapi
# END ANSIBLE MANAGED BLOCK
192.168.0.1 outside
";
        let aliases = parse_hosts(document);
        assert_eq!(
            aliases,
            vec![
                alias("10.0.0.5", &["controller-0.tenant"]),
                alias("172.17.0.10", &["controller-0.internalapi"]),
            ]
        );
    }

    #[test]
    fn test_parse_merges_repeated_address() {
        let document = "\
10.0.0.5 controller-0.tenant
10.0.0.6 controller-1.tenant
10.0.0.5 controller-0 controller-0.tenant
";
        let aliases = parse_hosts(document);
        assert_eq!(
            aliases,
            vec![
                alias("10.0.0.5", &["controller-0.tenant", "controller-0"]),
                alias("10.0.0.6", &["controller-1.tenant"]),
            ]
        );
    }

    #[test]
    fn test_parse_skips_invalid_lines() {
        let document = "\
not-an-ip host
10.0.0.7
fd00::5 controller-0.storage
";
        let aliases = parse_hosts(document);
        assert_eq!(aliases, vec![alias("fd00::5", &["controller-0.storage"])]);
    }

    #[test]
    fn test_host_aliases_without_hosts_key() {
        let config_map = ConfigMap {
            data: Some(BTreeMap::from([("other".to_string(), "x".to_string())])),
            ..Default::default()
        };
        assert!(host_aliases(&config_map).is_empty());
        assert!(host_aliases(&ConfigMap::default()).is_empty());
    }

    #[test]
    fn test_host_aliases_from_config_map() {
        let config_map = ConfigMap {
            data: Some(BTreeMap::from([(
                HOSTS_KEY.to_string(),
                "10.0.0.5 controller-0.tenant\n".to_string(),
            )])),
            ..Default::default()
        };
        assert_eq!(
            host_aliases(&config_map),
            vec![alias("10.0.0.5", &["controller-0.tenant"])]
        );
    }
}
