// OpenVPN client configuration bundle.
//
// Cipher and auth are fixed to what the server side is configured with.

use std::fmt::Write as _;

use secrecy::SecretString;

/// PEM material embedded into the bundle.
#[derive(Debug, Clone)]
pub struct ClientMaterial {
    pub ca_certificate: String,
    pub client_certificate: String,
    pub client_key: String,
    /// Set when the key was exported encrypted from the device store.
    pub key_passphrase: Option<SecretString>,
}

const HEADER: &[&str] = &["client", "dev tun", "proto tcp"];

const OPTIONS: &[&str] = &[
    "redirect-gateway def1",
    "resolv-retry infinite",
    "nobind",
    "persist-key",
    "persist-tun",
    "cipher AES-128-CBC",
    "verb 3",
    "mute 20",
    "auth SHA1",
    "tls-client",
];

const TRAILER: &[&str] = &["key-direction 1", "remote-cert-tls server", "auth-user-pass"];

/// Render the client `.ovpn` text for a server at `address:port`.
pub fn render_client_config(address: &str, port: u16, material: &ClientMaterial) -> String {
    let mut out = String::new();
    for line in HEADER {
        out.push_str(line);
        out.push('\n');
    }
    let _ = writeln!(out, "remote {address} {port}");
    for line in OPTIONS {
        out.push_str(line);
        out.push('\n');
    }

    for (tag, body) in [
        ("ca", &material.ca_certificate),
        ("cert", &material.client_certificate),
        ("key", &material.client_key),
    ] {
        let _ = write!(out, "\n<{tag}>\n{}\n</{tag}>\n", body.trim());
    }

    out.push('\n');
    out.push_str(&TRAILER.join("\n"));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_embeds_material_in_order() {
        let material = ClientMaterial {
            ca_certificate: "-----BEGIN CERTIFICATE-----\nCA\n-----END CERTIFICATE-----\n".into(),
            client_certificate: "CLIENT".into(),
            client_key: "KEY".into(),
            key_passphrase: None,
        };
        let text = render_client_config("203.0.113.5", 1194, &material);

        assert!(text.starts_with("client\ndev tun\nproto tcp\nremote 203.0.113.5 1194\n"));
        let ca = text.find("<ca>").unwrap_or(usize::MAX);
        let cert = text.find("<cert>\nCLIENT\n</cert>").unwrap_or(usize::MAX);
        let key = text.find("<key>\nKEY\n</key>").unwrap_or(usize::MAX);
        assert!(ca < cert && cert < key);
        assert!(text.contains("-----END CERTIFICATE-----\n</ca>"));
        assert!(text.ends_with("key-direction 1\nremote-cert-tls server\nauth-user-pass\n"));
    }
}
