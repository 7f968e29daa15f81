// Tunnel interface commands.

use std::net::Ipv4Addr;

use routerprov_api::Command;

use super::RouterFacade;
use crate::envelope::Outcome;

/// One tunnel interface to create, with its type-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelInterface {
    Gre {
        name: String,
        remote_address: String,
    },
    Eoip {
        name: String,
        remote_address: String,
        tunnel_id: u32,
    },
    Vxlan {
        name: String,
        vni: u32,
        port: u16,
    },
    Ipip {
        name: String,
        remote_address: String,
    },
}

impl TunnelInterface {
    pub fn name(&self) -> &str {
        match self {
            Self::Gre { name, .. }
            | Self::Eoip { name, .. }
            | Self::Vxlan { name, .. }
            | Self::Ipip { name, .. } => name,
        }
    }

    fn command(&self) -> Command {
        match self {
            Self::Gre {
                name,
                remote_address,
            } => Command::new("/interface/gre/add")
                .param("name", name)
                .param("remote-address", remote_address),
            Self::Eoip {
                name,
                remote_address,
                tunnel_id,
            } => Command::new("/interface/eoip/add")
                .param("name", name)
                .param("remote-address", remote_address)
                .param("tunnel-id", tunnel_id),
            Self::Vxlan { name, vni, port } => Command::new("/interface/vxlan/add")
                .param("name", name)
                .param("vni", vni)
                .param("port", port),
            Self::Ipip {
                name,
                remote_address,
            } => Command::new("/interface/ipip/add")
                .param("name", name)
                .param("remote-address", remote_address),
        }
    }
}

impl RouterFacade {
    pub async fn create_tunnel_interface(&self, interface: &TunnelInterface) -> Outcome {
        self.run_once(interface.command()).await.into()
    }

    /// Bind a VXLAN interface to its remote peer.
    pub async fn add_vtep(&self, interface: &str, remote_ip: &str, port: u16) -> Outcome {
        self.run_once(
            Command::new("/interface/vxlan/vteps/add")
                .param("interface", interface)
                .param("remote-ip", remote_ip)
                .param("port", port),
        )
        .await
        .into()
    }

    /// Assign `address/prefix` to `interface`.
    pub async fn assign_address(&self, interface: &str, address: Ipv4Addr, prefix: u8) -> Outcome {
        self.run_once(
            Command::new("/ip/address/add")
                .param("interface", interface)
                .param("address", format!("{address}/{prefix}")),
        )
        .await
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eoip_carries_tunnel_id() {
        let cmd = TunnelInterface::Eoip {
            name: "eoip_tunnel_to_branch_api".into(),
            remote_address: "203.0.113.5".into(),
            tunnel_id: 4242,
        }
        .command();
        assert_eq!(cmd.path(), "/interface/eoip/add");
        assert_eq!(cmd.param_value("tunnel-id"), Some("4242"));
    }

    #[test]
    fn vxlan_has_no_remote_address() {
        let iface = TunnelInterface::Vxlan {
            name: "vxlan_tunnel_to_hq_api".into(),
            vni: 77,
            port: 8472,
        };
        let cmd = iface.command();
        assert_eq!(iface.name(), "vxlan_tunnel_to_hq_api");
        assert_eq!(cmd.param_value("remote-address"), None);
        assert_eq!(cmd.param_value("port"), Some("8472"));
    }
}
