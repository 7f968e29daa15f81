// ── Device-side entities ──
//
// Typed views over the flat attribute records a device returns. Parsing
// is lenient: a record missing an attribute yields `None` for that field
// rather than an error, because devices omit unset attributes.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use routerprov_api::Record;
use serde::Serialize;

/// One `/ip/address` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressEntry {
    pub id: Option<String>,
    /// `a.b.c.d/nn` as configured.
    pub address: String,
    pub network: Option<Ipv4Addr>,
    pub interface: Option<String>,
    pub disabled: bool,
}

impl AddressEntry {
    pub fn from_record(record: &Record) -> Option<Self> {
        let address = record.get("address")?.to_owned();
        let network = record
            .get("network")
            .and_then(|n| n.parse().ok())
            .or_else(|| network_of(&address));
        Some(Self {
            id: record.id().map(str::to_owned),
            address,
            network,
            interface: record.get("interface").map(str::to_owned),
            disabled: flag(record, "disabled"),
        })
    }
}

/// Every network base address configured on a device.
pub fn existing_networks(entries: &[AddressEntry]) -> BTreeSet<Ipv4Addr> {
    entries.iter().filter_map(|e| e.network).collect()
}

/// One `/ip/pool` entry. `ranges` is `start-end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolEntry {
    pub name: String,
    pub ranges: String,
    pub start: Option<Ipv4Addr>,
    pub end: Option<Ipv4Addr>,
    /// `start` masked to its `/24`.
    pub network: Option<Ipv4Addr>,
}

impl PoolEntry {
    pub fn from_record(record: &Record) -> Option<Self> {
        let name = record.name()?.to_owned();
        let ranges = record.get("ranges").unwrap_or_default().to_owned();
        let first_range = ranges.split(',').next().unwrap_or_default();
        let (start, end) = match first_range.split_once('-') {
            Some((start, end)) => (start.trim().parse().ok(), end.trim().parse().ok()),
            None => (first_range.trim().parse().ok(), None),
        };
        let network = start.map(|s: Ipv4Addr| {
            let [a, b, c, _] = s.octets();
            Ipv4Addr::new(a, b, c, 0)
        });
        Some(Self {
            name,
            ranges,
            start,
            end,
            network,
        })
    }
}

/// One `/certificate` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateEntry {
    pub id: Option<String>,
    pub name: String,
    pub common_name: Option<String>,
    pub trusted: bool,
    pub private_key: bool,
    /// A signed certificate carries a fingerprint.
    pub signed: bool,
}

impl CertificateEntry {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id().map(str::to_owned),
            name: record.name()?.to_owned(),
            common_name: record.get("common-name").map(str::to_owned),
            trusted: flag(record, "trusted"),
            private_key: flag(record, "private-key"),
            signed: record.get("fingerprint").is_some_and(|f| !f.is_empty()),
        })
    }
}

/// One `/ppp/profile` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PppProfile {
    pub id: Option<String>,
    pub name: String,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
}

impl PppProfile {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id().map(str::to_owned),
            name: record.name()?.to_owned(),
            local_address: record.get("local-address").map(str::to_owned),
            remote_address: record.get("remote-address").map(str::to_owned),
        })
    }
}

/// One `/ppp/secret` entry. The password is never surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PppSecret {
    pub id: Option<String>,
    pub name: String,
    pub profile: Option<String>,
    pub service: Option<String>,
}

impl PppSecret {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id: record.id().map(str::to_owned),
            name: record.name()?.to_owned(),
            profile: record.get("profile").map(str::to_owned),
            service: record.get("service").map(str::to_owned),
        })
    }
}

/// Ports named by a `port` / `dst-port` attribute: `8291`, `80,443`,
/// `1000-1010`. Unparsable fragments are ignored; ranges are inserted whole.
pub fn parse_port_list(raw: &str, into: &mut BTreeSet<u16>) {
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<u16>(), hi.trim().parse::<u16>()) {
                    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                    into.extend(lo..=hi);
                }
            }
            None => {
                if let Ok(port) = part.parse::<u16>() {
                    into.insert(port);
                }
            }
        }
    }
}

fn network_of(cidr: &str) -> Option<Ipv4Addr> {
    let (addr, prefix) = cidr.split_once('/').unwrap_or((cidr, "32"));
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u32 = prefix.parse().ok().filter(|p| *p <= 32)?;
    let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
    Some(Ipv4Addr::from(u32::from(addr) & mask))
}

fn flag(record: &Record, key: &str) -> bool {
    matches!(record.get(key), Some("true" | "yes"))
}
