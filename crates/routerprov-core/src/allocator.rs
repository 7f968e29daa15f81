// ── Resource allocator ──
//
// Picks networks, ports and tunnel identifiers that do not collide with
// what a device already has configured. Collision checks are exact base
// address equality, not CIDR containment. Random probing is bounded by
// `max_attempts`; a deterministic sweep of the remaining space follows,
// and only a truly saturated space yields `ResourceExhausted`.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::CoreError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Port range handed out to VPN listeners and VXLAN endpoints.
pub const PORT_RANGE: RangeInclusive<u16> = 500..=9000;

/// EoIP tunnel ids are 16 bits wide.
const TUNNEL_ID_SPACE: u64 = 65_536;

pub const VNI_RANGE: RangeInclusive<u32> = 1..=16_777_215;

/// Classful first-octet ranges used for generated networks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum AddressClass {
    #[default]
    A,
    B,
    C,
}

impl AddressClass {
    pub const ALL: [AddressClass; 3] = [Self::A, Self::B, Self::C];

    pub fn first_octets(self) -> RangeInclusive<u8> {
        match self {
            Self::A => 1..=126,
            Self::B => 128..=191,
            Self::C => 192..=223,
        }
    }

    /// The requested class first, then the others in A, B, C order.
    fn search_order(self) -> impl Iterator<Item = AddressClass> {
        std::iter::once(self).chain(Self::ALL.into_iter().filter(move |c| *c != self))
    }
}

/// Collision-avoiding allocator. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    max_attempts: u32,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl Allocator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    // ── Networks ─────────────────────────────────────────────────────

    /// Pick a `/24`-style base address (`a.b.c.0`) absent from `existing`.
    pub fn allocate_network<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        existing: &BTreeSet<Ipv4Addr>,
        class: Option<AddressClass>,
    ) -> Result<Ipv4Addr, CoreError> {
        self.allocate_network_where(rng, class, |candidate| existing.contains(&candidate))
    }

    /// Like [`allocate_network`](Self::allocate_network) with an arbitrary
    /// "already taken" predicate.
    pub fn allocate_network_where<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        class: Option<AddressClass>,
        is_taken: impl Fn(Ipv4Addr) -> bool,
    ) -> Result<Ipv4Addr, CoreError> {
        let requested = class.unwrap_or_default();
        let mut attempts = 0_u64;
        let mut check = |candidate: Ipv4Addr| {
            attempts += 1;
            !is_taken(candidate)
        };

        for class in requested.search_order() {
            let octets = class.first_octets();
            for _ in 0..self.max_attempts {
                let candidate = Ipv4Addr::new(
                    rng.gen_range(octets.clone()),
                    rng.gen_range(0..=255),
                    rng.gen_range(0..=255),
                    0,
                );
                if check(candidate) {
                    return Ok(candidate);
                }
            }

            let mut swept = octets.flat_map(|a| {
                (0..=255_u8).flat_map(move |b| (0..=255_u8).map(move |c| Ipv4Addr::new(a, b, c, 0)))
            });
            if let Some(candidate) = swept.find(|candidate| check(*candidate)) {
                return Ok(candidate);
            }

            tracing::warn!(%class, "address class saturated, trying the next one");
        }

        Err(CoreError::ResourceExhausted {
            resource: "network address".into(),
            attempts,
        })
    }

    // ── Ports ────────────────────────────────────────────────────────

    /// Pick a port in [`PORT_RANGE`] absent from `used`.
    pub fn allocate_port<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        used: &BTreeSet<u16>,
    ) -> Result<u16, CoreError> {
        for _ in 0..self.max_attempts {
            let port = rng.gen_range(PORT_RANGE);
            if !used.contains(&port) {
                return Ok(port);
            }
        }

        let swept = u64::from(PORT_RANGE.end() - PORT_RANGE.start()) + 1;
        PORT_RANGE
            .into_iter()
            .find(|port| !used.contains(port))
            .ok_or_else(|| CoreError::ResourceExhausted {
                resource: "port".into(),
                attempts: u64::from(self.max_attempts) + swept,
            })
    }

    // ── Identifiers ──────────────────────────────────────────────────

    /// EoIP tunnel id: a random base-36 token joined with a time-derived
    /// suffix, read back as one base-36 number and folded into 16 bits.
    pub fn allocate_tunnel_id<R: Rng + ?Sized>(rng: &mut R, now_millis: u64) -> u32 {
        let token = to_base36(rng.gen_range(0..36_u64.pow(6)), 6);
        let clock = to_base36(now_millis, 4);
        let suffix = &clock[clock.len().saturating_sub(4)..];
        let combined = format!("{token}{suffix}");
        let value = u64::from_str_radix(&combined, 36).unwrap_or_default();
        u32::try_from(value % TUNNEL_ID_SPACE).unwrap_or_default()
    }

    /// Uniform VXLAN network identifier in [`VNI_RANGE`].
    pub fn allocate_vni<R: Rng + ?Sized>(rng: &mut R) -> u32 {
        rng.gen_range(VNI_RANGE)
    }
}

/// First and last usable host of `network/prefix`.
///
/// The base is masked first, so `10.1.2.77/24` yields `10.1.2.1..10.1.2.254`.
pub fn allocate_subnet_pool(
    network: Ipv4Addr,
    prefix: u8,
) -> Result<(Ipv4Addr, Ipv4Addr), CoreError> {
    if prefix > 30 {
        return Err(CoreError::validation(format!(
            "a /{prefix} network has no usable host range"
        )));
    }

    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    let base = u32::from(network) & mask;
    let broadcast = base | !mask;
    Ok((Ipv4Addr::from(base + 1), Ipv4Addr::from(broadcast - 1)))
}

/// `10.20.30.0` + host 2 -> `10.20.30.2`.
pub fn host_in_network(network: Ipv4Addr, host: u8) -> Ipv4Addr {
    let [a, b, c, _] = network.octets();
    Ipv4Addr::new(a, b, c, host)
}

fn to_base36(mut value: u64, min_width: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        let digit = usize::try_from(value % 36).unwrap_or_default();
        out.push(char::from(DIGITS[digit]));
        value /= 36;
        if value == 0 {
            break;
        }
    }
    while out.len() < min_width {
        out.push('0');
    }
    out.iter().rev().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn network_is_class_a_base_address_by_default() {
        let net = Allocator::default()
            .allocate_network(&mut rng(), &BTreeSet::new(), None)
            .unwrap();
        assert!(AddressClass::A.first_octets().contains(&net.octets()[0]));
        assert_eq!(net.octets()[3], 0);
    }

    #[test]
    fn network_avoids_existing_entries() {
        let allocator = Allocator::default();
        let mut existing = BTreeSet::new();
        let mut rng = rng();
        for _ in 0..500 {
            let net = allocator
                .allocate_network(&mut rng, &existing, Some(AddressClass::C))
                .unwrap();
            assert!(!existing.contains(&net));
            assert!(AddressClass::C.first_octets().contains(&net.octets()[0]));
            existing.insert(net);
        }
    }

    #[test]
    fn saturated_class_falls_through_to_another() {
        let allocator = Allocator::new(50);
        let net = allocator
            .allocate_network_where(&mut rng(), Some(AddressClass::A), |candidate| {
                AddressClass::A.first_octets().contains(&candidate.octets()[0])
            })
            .unwrap();
        assert!(AddressClass::B.first_octets().contains(&net.octets()[0]));
    }

    #[test]
    fn fully_saturated_space_is_an_error() {
        let err = Allocator::new(5)
            .allocate_network_where(&mut rng(), None, |_| true)
            .unwrap_err();
        let swept: u64 = AddressClass::ALL
            .iter()
            .map(|class| class.first_octets().count() as u64 * 65_536)
            .sum();
        assert!(matches!(
            err,
            CoreError::ResourceExhausted { attempts, .. } if attempts == 3 * 5 + swept
        ));
    }

    #[test]
    fn subnet_pool_brackets_usable_hosts() {
        for net in ["10.0.0.0", "172.16.5.0", "203.0.113.0", "126.255.255.0"] {
            let network: Ipv4Addr = net.parse().unwrap();
            let (start, end) = allocate_subnet_pool(network, 24).unwrap();
            assert_eq!(u32::from(start), u32::from(network) + 1);
            assert_eq!(u32::from(end), u32::from(network) + 254);
        }
    }

    #[test]
    fn subnet_pool_masks_host_bits() {
        let (start, end) = allocate_subnet_pool("10.1.2.77".parse().unwrap(), 24).unwrap();
        assert_eq!(start, Ipv4Addr::new(10, 1, 2, 1));
        assert_eq!(end, Ipv4Addr::new(10, 1, 2, 254));

        let (start, end) = allocate_subnet_pool("10.1.0.0".parse().unwrap(), 16).unwrap();
        assert_eq!(start, Ipv4Addr::new(10, 1, 0, 1));
        assert_eq!(end, Ipv4Addr::new(10, 1, 255, 254));
    }

    #[test]
    fn subnet_pool_rejects_tiny_prefixes() {
        assert!(allocate_subnet_pool("10.0.0.0".parse().unwrap(), 31).is_err());
        assert!(allocate_subnet_pool("10.0.0.0".parse().unwrap(), 30).is_ok());
    }

    #[test]
    fn port_finds_the_single_free_value() {
        let used: BTreeSet<u16> = PORT_RANGE.filter(|p| *p != 4321).collect();
        let port = Allocator::new(100).allocate_port(&mut rng(), &used).unwrap();
        assert_eq!(port, 4321);
    }

    #[test]
    fn port_space_exhaustion_is_reported() {
        let used: BTreeSet<u16> = PORT_RANGE.collect();
        let err = Allocator::new(10).allocate_port(&mut rng(), &used).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ResourceExhausted { ref resource, attempts }
                if resource == "port" && attempts == 10 + 8501
        ));
    }

    #[test]
    fn identifiers_stay_in_range() {
        let mut rng = rng();
        for i in 0..200 {
            assert!(Allocator::allocate_tunnel_id(&mut rng, 1_700_000_000_000 + i) < 65_536);
            assert!(VNI_RANGE.contains(&Allocator::allocate_vni(&mut rng)));
        }
    }

    #[test]
    fn base36_pads_to_width() {
        assert_eq!(to_base36(0, 4), "0000");
        assert_eq!(to_base36(35, 1), "z");
        assert_eq!(to_base36(36, 1), "10");
    }

    #[test]
    fn host_replaces_last_octet() {
        let net = Ipv4Addr::new(10, 20, 30, 0);
        assert_eq!(host_in_network(net, 1), Ipv4Addr::new(10, 20, 30, 1));
        assert_eq!(host_in_network(net, 2), Ipv4Addr::new(10, 20, 30, 2));
    }
}
