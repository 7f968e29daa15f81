#![allow(clippy::unwrap_used)]
// Tunnel workflow against two in-memory devices.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use routerprov_core::{OnDeviceStrategy, Provisioner, Side, TunnelRequest, TunnelStage};

use common::{FakeDevice, FakeNetwork};

const SOURCE: &str = "10.0.0.1:8728";
const DESTINATION: &str = "203.0.113.5:8728";

fn network() -> FakeNetwork {
    let network = FakeNetwork::new();
    network.add(
        SOURCE,
        FakeDevice::new("HQ-Core").with_address("192.168.88.1/24", "192.168.88.0", "bridge"),
    );
    network.add(
        DESTINATION,
        FakeDevice::new("Branch Office-2").with_address("172.16.5.1/24", "172.16.5.0", "ether1"),
    );
    network
}

fn provisioner(network: &FakeNetwork) -> (Provisioner, tempfile::TempDir) {
    let root = tempfile::tempdir().unwrap();
    let provisioner = common::provisioner(network, Arc::new(OnDeviceStrategy), root.path());
    (provisioner, root)
}

fn request(tunnel_type: &str) -> TunnelRequest {
    serde_json::from_value(json!({
        "tunnelType": tunnel_type,
        "source": {
            "local": { "address": "10.0.0.1", "port": 8728 },
            "username": "admin", "password": "secret"
        },
        "destination": {
            "public": { "address": "203.0.113.5", "port": 8728 },
            "username": "admin", "password": "secret"
        }
    }))
    .unwrap()
}

// ── Success ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_gre_tunnel_shares_one_network() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("gre")).await;

    assert_eq!(envelope.status, 200);
    let report = envelope.data.unwrap();
    let source_ip = report.source.tunnel_address.unwrap().octets();
    let destination_ip = report.destination.tunnel_address.unwrap().octets();
    assert_eq!(source_ip[..3], destination_ip[..3]);
    assert_eq!((source_ip[3], destination_ip[3]), (1, 2));
    assert_eq!(report.stage, TunnelStage::Done);
    assert!(envelope.message.starts_with(&format!(
        "GRE tunnel created successfully with this ip:\nsource:{}",
        report.source.tunnel_address.unwrap()
    )));

    let allocated = report.network.unwrap().to_string();
    assert!(allocated != "192.168.88.0" && allocated != "172.16.5.0");

    assert_eq!(
        report.source.interface.as_deref(),
        Some("gre_tunnel_to_branchOffice2_api")
    );
    assert_eq!(
        report.destination.interface.as_deref(),
        Some("gre_tunnel_to_hqCore_api")
    );
    assert!(report.source.creation.as_ref().unwrap().succeeded);
    assert!(report.destination.address_assignment.as_ref().unwrap().succeeded);

    let remote = |key| {
        network.with(key, |d| {
            d.interfaces[0].get("remote-address").map(str::to_owned)
        })
    };
    assert_eq!(remote(SOURCE).as_deref(), Some("203.0.113.5"));
    assert_eq!(remote(DESTINATION).as_deref(), Some("10.0.0.1"));

    let assigned = network.with(SOURCE, |d| {
        d.addresses.last().unwrap().get("address").map(str::to_owned)
    });
    assert_eq!(
        assigned,
        Some(format!("{}/24", report.source.tunnel_address.unwrap()))
    );
}

#[tokio::test]
async fn test_every_session_is_closed() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);

    provisioner.create_tunnel(&request("ipip")).await;

    for key in [SOURCE, DESTINATION] {
        let (opened, closed) = network.sessions(key);
        assert!(opened > 0);
        assert_eq!(opened, closed);
    }
}

#[tokio::test]
async fn test_eoip_uses_one_tunnel_id_on_both_sides() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("eoip")).await;
    assert_eq!(envelope.status, 200);

    let tunnel_id = |key| {
        network.with(key, |d| {
            d.interfaces[0].get("tunnel-id").map(str::to_owned)
        })
    };
    assert!(tunnel_id(SOURCE).is_some());
    assert_eq!(tunnel_id(SOURCE), tunnel_id(DESTINATION));
}

#[tokio::test]
async fn test_vxlan_adds_vteps_towards_the_peer() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("vxlan")).await;
    assert_eq!(envelope.status, 200, "{}", envelope.message);

    let vtep = |key| {
        network.with(key, |d| {
            d.log
                .iter()
                .find(|c| c.path() == "/interface/vxlan/vteps/add")
                .map(|c| {
                    (
                        c.param_value("remote-ip").map(str::to_owned),
                        c.param_value("port").map(str::to_owned),
                    )
                })
                .unwrap()
        })
    };
    let (source_remote, source_port) = vtep(SOURCE);
    let (destination_remote, destination_port) = vtep(DESTINATION);
    assert_eq!(source_remote.as_deref(), Some("203.0.113.5"));
    assert_eq!(destination_remote.as_deref(), Some("10.0.0.1"));
    assert_eq!(source_port, destination_port);

    let port: u16 = source_port.unwrap().parse().unwrap();
    assert!((500..=9000).contains(&port));
    assert_ne!(port, 8728);

    let vni = |key| network.with(key, |d| d.interfaces[0].get("vni").map(str::to_owned));
    assert_eq!(vni(SOURCE), vni(DESTINATION));
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_source_creation_failure_names_the_source() {
    let network = FakeNetwork::new();
    network.add(
        SOURCE,
        FakeDevice::new("HQ-Core").failing("/interface/gre/add"),
    );
    network.add(DESTINATION, FakeDevice::new("Branch Office-2"));
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("gre")).await;

    assert_eq!(envelope.status, 508);
    assert_eq!(envelope.message, "couldn't create gre tunnel on source router");
    let report = envelope.data.unwrap();
    let aborted = report.aborted.unwrap();
    assert_eq!(aborted.step, "create");
    assert_eq!(aborted.sides, vec![Side::Source]);

    assert_eq!(network.count(SOURCE, "/ip/address/add"), 0);
    // The destination keeps its interface: nothing is rolled back.
    assert_eq!(network.with(DESTINATION, |d| d.interfaces.len()), 1);
}

#[tokio::test]
async fn test_address_failure_on_both_sides() {
    let network = FakeNetwork::new();
    network.add(SOURCE, FakeDevice::new("hq").failing("/ip/address/add"));
    network.add(DESTINATION, FakeDevice::new("branch").failing("/ip/address/add"));
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("ipip")).await;

    assert_eq!(envelope.status, 508);
    assert_eq!(
        envelope.message,
        "couldn't assign IP address to ipip tunnel on source and destination routers"
    );
    assert_eq!(envelope.data.unwrap().stage, TunnelStage::InterfacesCreated);
}

#[tokio::test]
async fn test_unreachable_destination_fails_fast() {
    let network = FakeNetwork::new();
    network.add(SOURCE, FakeDevice::new("hq"));
    network.add(DESTINATION, FakeDevice::new("branch").unreachable());
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("gre")).await;

    assert_eq!(envelope.status, 504);
    assert_eq!(envelope.message, "Connection to destination router failed");
    assert!(
        network
            .paths(SOURCE)
            .iter()
            .all(|p| !p.starts_with("/interface"))
    );
}

#[tokio::test]
async fn test_network_listing_failure_names_the_side() {
    let network = FakeNetwork::new();
    network.add(SOURCE, FakeDevice::new("hq"));
    network.add(DESTINATION, FakeDevice::new("branch").failing("/ip/address/print"));
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("gre")).await;

    assert_eq!(envelope.status, 500);
    assert_eq!(envelope.message, "Failed to retrieve destination router networks");
}

#[tokio::test]
async fn test_missing_alternative_makes_no_remote_calls() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);
    let request: TunnelRequest = serde_json::from_value(json!({
        "tunnelType": "gre",
        "source": { "local": { "address": "10.0.0.1", "port": 8728 }, "username": "a", "password": "b" },
        "destination": { "username": "a", "password": "b" }
    }))
    .unwrap();

    let envelope = provisioner.create_tunnel(&request).await;

    assert_eq!(envelope.status, 406);
    assert_eq!(
        envelope.message,
        "You should provide one of local or public IP for destination"
    );
    assert_eq!(network.sessions(SOURCE), (0, 0));
    assert_eq!(network.sessions(DESTINATION), (0, 0));
}

#[tokio::test]
async fn test_unknown_type_is_not_actionable() {
    let network = network();
    let (provisioner, _root) = provisioner(&network);

    let envelope = provisioner.create_tunnel(&request("wireguard")).await;

    assert_eq!(envelope.status, 204);
    assert_eq!(envelope.message, "Selected tunnel type is not valid");
    assert!(envelope.data.is_none());
    assert_eq!(network.sessions(SOURCE), (0, 0));
}
