#![allow(clippy::unwrap_used)]
// Re-running the VPN workflow must not re-issue certificates.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;
use serde_json::json;

use routerprov_core::certificate::CertificateState;
use routerprov_core::{LocalToolchainStrategy, OnDeviceStrategy, VpnRequest};

use common::{FakeDevice, FakeNetwork, FakeToolchain};

const ROUTER: &str = "10.20.0.1:8728";

fn request() -> VpnRequest {
    serde_json::from_value(json!({
        "vpnType": "openVpn",
        "router": { "local": { "address": "10.20.0.1", "port": 8728 } },
        "credential": { "username": "admin", "password": "secret" }
    }))
    .unwrap()
}

fn mutations(network: &FakeNetwork) -> usize {
    ["/certificate/add", "/certificate/sign", "/certificate/set", "/certificate/import"]
        .into_iter()
        .map(|path| network.count(ROUTER, path))
        .sum()
}

#[tokio::test]
async fn test_on_device_second_run_issues_nothing() {
    let network = FakeNetwork::new();
    network.add(ROUTER, FakeDevice::new("lab"));
    let root = tempfile::tempdir().unwrap();
    let provisioner = common::provisioner(&network, Arc::new(OnDeviceStrategy), root.path());

    let first = provisioner.create_vpn(&request()).await;
    assert_eq!(first.status, 200, "{}", first.message);
    assert_eq!(network.count(ROUTER, "/certificate/add"), 3);
    assert_eq!(network.count(ROUTER, "/certificate/sign"), 3);

    network.clear_log(ROUTER);
    let second = provisioner.create_vpn(&request()).await;

    assert_eq!(second.status, 200, "{}", second.message);
    assert_eq!(mutations(&network), 0);
    assert_eq!(network.count(ROUTER, "/ip/pool/add"), 0);
    assert_eq!(network.count(ROUTER, "/ppp/profile/add"), 0);

    let triad = second.data.unwrap().certificates.unwrap();
    for asset in [&triad.ca, &triad.server, &triad.client] {
        assert_eq!(asset.state, CertificateState::Trusted);
        assert_eq!(asset.skipped, vec!["create", "sign", "trust"]);
    }
    assert_eq!(network.with(ROUTER, |d| d.certificates.len()), 3);
}

#[tokio::test]
async fn test_on_device_resumes_a_partial_triad() {
    let network = FakeNetwork::new();
    network.add(
        ROUTER,
        FakeDevice::new("lab").with_certificate("CA-Template-OPENVPN-API", true),
    );
    let root = tempfile::tempdir().unwrap();
    let provisioner = common::provisioner(&network, Arc::new(OnDeviceStrategy), root.path());

    let envelope = provisioner.create_vpn(&request()).await;

    assert_eq!(envelope.status, 200, "{}", envelope.message);
    assert_eq!(network.count(ROUTER, "/certificate/add"), 2);
    let signs: Vec<Option<String>> = network.with(ROUTER, |d| {
        d.log
            .iter()
            .filter(|c| c.path() == "/certificate/sign")
            .map(|c| c.param_value("ca").map(str::to_owned))
            .collect()
    });
    assert_eq!(signs.len(), 2);
    assert!(
        signs
            .iter()
            .all(|ca| ca.as_deref() == Some("CA-Template-OPENVPN-API"))
    );
}

#[tokio::test]
async fn test_local_second_run_skips_generation() {
    let network = FakeNetwork::new();
    network.add(ROUTER, FakeDevice::new("lab"));
    let root = tempfile::tempdir().unwrap();
    let toolchain = Arc::new(FakeToolchain::default());
    let provisioner = common::provisioner(
        &network,
        Arc::new(LocalToolchainStrategy::new(toolchain.clone())),
        root.path(),
    );

    let first = provisioner.create_vpn(&request()).await;
    assert_eq!(first.status, 200, "{}", first.message);

    network.clear_log(ROUTER);
    let second = provisioner.create_vpn(&request()).await;

    assert_eq!(second.status, 200, "{}", second.message);
    assert_eq!(toolchain.authorities.load(Ordering::SeqCst), 1);
    assert_eq!(toolchain.signed.load(Ordering::SeqCst), 2);
    assert_eq!(mutations(&network), 0);
    assert_eq!(network.count(ROUTER, "/file/add"), 0);

    let report = second.data.unwrap();
    let triad = report.certificates.unwrap();
    assert_eq!(triad.client.state, CertificateState::Imported);
    assert_eq!(triad.client.skipped, vec!["generate", "upload", "import"]);
    // Client material now comes from a device export.
    assert!(report.key_passphrase.is_some());
}

#[tokio::test]
async fn test_local_lost_ca_key_is_not_found() {
    let network = FakeNetwork::new();
    network.add(
        ROUTER,
        FakeDevice::new("lab").with_certificate("CA-Template-OPENVPN-API.pem_0", true),
    );
    let root = tempfile::tempdir().unwrap();
    let toolchain = Arc::new(FakeToolchain::default());
    let provisioner = common::provisioner(
        &network,
        Arc::new(LocalToolchainStrategy::new(toolchain.clone())),
        root.path(),
    );

    let envelope = provisioner.create_vpn(&request()).await;

    assert_eq!(envelope.status, 404);
    let report = envelope.data.unwrap();
    assert_eq!(report.aborted.unwrap().step, "certificates");
    let triad = report.certificates.unwrap();
    assert_eq!(triad.server.failed_step.as_deref(), Some("generate"));
    assert_eq!(toolchain.authorities.load(Ordering::SeqCst), 0);
    assert_eq!(network.count(ROUTER, "/interface/ovpn-server/server/set"), 0);
}

#[tokio::test]
async fn test_sign_failure_is_reported_on_the_certificate() {
    let network = FakeNetwork::new();
    network.add(ROUTER, FakeDevice::new("lab").failing("/certificate/sign"));
    let root = tempfile::tempdir().unwrap();
    let provisioner = common::provisioner(&network, Arc::new(OnDeviceStrategy), root.path());

    let envelope = provisioner.create_vpn(&request()).await;

    assert_eq!(envelope.status, 500);
    let triad = envelope.data.unwrap().certificates.unwrap();
    assert_eq!(triad.ca.state, CertificateState::Created);
    assert_eq!(triad.ca.failed_step.as_deref(), Some("sign"));
    assert_eq!(triad.server.state, CertificateState::Absent);
}

#[tokio::test]
async fn test_on_device_sign_of_missing_certificate_is_not_found() {
    let network = FakeNetwork::new();
    network.add(ROUTER, FakeDevice::new("lab").forgetting_created_certificates());
    let root = tempfile::tempdir().unwrap();
    let provisioner = common::provisioner(&network, Arc::new(OnDeviceStrategy), root.path());

    let envelope = provisioner.create_vpn(&request()).await;

    assert_eq!(envelope.status, 404, "{}", envelope.message);
    let report = envelope.data.unwrap();
    assert_eq!(report.aborted.unwrap().step, "certificates");
    let triad = report.certificates.unwrap();
    assert_eq!(triad.ca.state, CertificateState::Created);
    assert_eq!(triad.ca.failed_step.as_deref(), Some("sign"));
    assert_eq!(triad.server.state, CertificateState::Absent);

    let lookups = network.with(ROUTER, |d| {
        d.log
            .iter()
            .filter(|c| c.path() == "/certificate/print")
            .filter(|c| c.query_value("name") == Some("CA-Template-OPENVPN-API"))
            .count()
    });
    assert!(lookups >= 1);
    assert_eq!(network.count(ROUTER, "/certificate/sign"), 0);
    assert_eq!(network.count(ROUTER, "/certificate/set"), 0);
    assert_eq!(network.count(ROUTER, "/certificate/add"), 1);
    assert_eq!(network.count(ROUTER, "/interface/ovpn-server/server/set"), 0);
}
