// Deterministic device-side names derived from device identities.

use crate::model::TunnelType;

/// `"Branch Office-2"` -> `"branchOffice2"`, `"MikroTik"` -> `"mikroTik"`.
///
/// Words split on any non-alphanumeric character and on lower-to-upper
/// case boundaries. The first word is lowercased, later words capitalized.
pub fn camel_case(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;

    for ch in input.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower_or_digit && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = ch.is_lowercase() || ch.is_numeric();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::with_capacity(input.len());
    for (index, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if index == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// `<type>_tunnel_to_<camel(peer)>_api`.
pub fn tunnel_interface(tunnel_type: TunnelType, peer_identity: &str) -> String {
    format!("{tunnel_type}_tunnel_to_{}_api", camel_case(peer_identity))
}

pub fn vpn_pool(identity: &str) -> String {
    format!("{}_openVpn_pool_api", camel_case(identity))
}

pub fn vpn_profile(identity: &str) -> String {
    format!("{}_openVpn_profile_api", camel_case(identity))
}
