// Address pool, PPP and OpenVPN server commands.

use std::net::Ipv4Addr;

use routerprov_api::Command;
use secrecy::{ExposeSecret, SecretString};

use super::RouterFacade;
use crate::envelope::Outcome;

/// Cipher suite offered by the OpenVPN server. The client bundle pins one.
pub const OPENVPN_CIPHERS: &str = "blowfish128,aes128-cbc,aes192-cbc,aes256-cbc";
pub const OPENVPN_AUTH: &str = "sha1,md5";

impl RouterFacade {
    pub async fn create_pool(&self, name: &str, start: Ipv4Addr, end: Ipv4Addr) -> Outcome {
        self.run_once(
            Command::new("/ip/pool/add")
                .param("name", name)
                .param("ranges", format!("{start}-{end}")),
        )
        .await
        .into()
    }

    /// PPP profile handing out addresses from `pool`, with `local_address`
    /// as the server side of each link.
    pub async fn create_ppp_profile(
        &self,
        name: &str,
        local_address: Ipv4Addr,
        pool: &str,
    ) -> Outcome {
        self.run_once(
            Command::new("/ppp/profile/add")
                .param("name", name)
                .param("local-address", local_address)
                .param("remote-address", pool)
                .param("change-tcp-mss", "yes"),
        )
        .await
        .into()
    }

    pub async fn create_ppp_secret(
        &self,
        user: &str,
        password: &SecretString,
        profile: &str,
    ) -> Outcome {
        self.run_once(
            Command::new("/ppp/secret/add")
                .param("name", user)
                .param("password", password.expose_secret())
                .param("profile", profile),
        )
        .await
        .into()
    }

    /// Enable the OpenVPN server on `port` with the given default profile
    /// and server certificate.
    pub async fn configure_openvpn(&self, port: u16, profile: &str, certificate: &str) -> Outcome {
        self.run_once(
            Command::new("/interface/ovpn-server/server/set")
                .param("enabled", "yes")
                .param("port", port)
                .param("default-profile", profile)
                .param("certificate", certificate)
                .param("cipher", OPENVPN_CIPHERS)
                .param("auth", OPENVPN_AUTH)
                .param("redirect-gateway", "def1"),
        )
        .await
        .into()
    }
}
