//! `routerprov serve`: the workflows as JSON routes.
//!
//! Every route answers HTTP 200 with the envelope as the body; the envelope
//! status carries the outcome. A body that does not parse answers a 406
//! envelope naming the parse error.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use routerprov_core::{
    ComputeAuth, DeviceRequest, Envelope, MachineRequest, PingRequest, Provisioner, SecretRequest,
    TunnelRequest, VpnRequest, status,
};

use crate::error::CliError;

pub fn router(provisioner: Provisioner) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/devices/addresses", post(list_addresses))
        .route("/api/devices/validate", post(validate_connection))
        .route("/api/devices/profiles", post(list_profiles))
        .route("/api/devices/secrets", post(list_secrets))
        .route("/api/devices/resource", post(system_resource))
        .route("/api/devices/ping", post(ping))
        .route("/api/tunnels", post(create_tunnel))
        .route("/api/vpns", post(create_vpn))
        .route("/api/secrets", post(create_secret))
        .route("/api/compute/clusters", post(list_clusters))
        .route("/api/compute/machines", post(create_machines))
        .with_state(provisioner)
}

/// Bind `bind` and serve until Ctrl-C.
pub async fn serve(provisioner: Provisioner, bind: &str) -> Result<(), CliError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|source| CliError::Bind {
            bind: bind.to_owned(),
            source,
        })?;
    info!(address = %bind, "listening");
    axum::serve(listener, router(provisioner))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
}

// ── Plumbing ─────────────────────────────────────────────────────────

fn reply<T: Serialize>(envelope: Envelope<T>) -> Response {
    Json(envelope).into_response()
}

fn parse<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        reply(Envelope::<()>::failure(
            status::MISSING_ALTERNATIVE,
            format!("Invalid request body: {e}"),
        ))
    })
}

// ── Handlers ─────────────────────────────────────────────────────────

#[allow(clippy::unused_async)]
async fn health() -> Response {
    reply(Envelope::ok(env!("CARGO_PKG_VERSION"), "ok"))
}

async fn list_addresses(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<DeviceRequest>(&body) {
        Ok(request) => reply(p.list_addresses(&request).await),
        Err(rejection) => rejection,
    }
}

async fn validate_connection(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<DeviceRequest>(&body) {
        Ok(request) => reply(p.validate_connection(&request).await),
        Err(rejection) => rejection,
    }
}

async fn list_profiles(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<DeviceRequest>(&body) {
        Ok(request) => reply(p.list_ppp_profiles(&request).await),
        Err(rejection) => rejection,
    }
}

async fn list_secrets(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<DeviceRequest>(&body) {
        Ok(request) => reply(p.list_ppp_secrets(&request).await),
        Err(rejection) => rejection,
    }
}

async fn system_resource(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<DeviceRequest>(&body) {
        Ok(request) => reply(p.system_resource(&request).await),
        Err(rejection) => rejection,
    }
}

async fn ping(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<PingRequest>(&body) {
        Ok(request) => reply(p.ping(&request).await),
        Err(rejection) => rejection,
    }
}

async fn create_tunnel(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<TunnelRequest>(&body) {
        Ok(request) => reply(p.create_tunnel(&request).await),
        Err(rejection) => rejection,
    }
}

async fn create_vpn(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<VpnRequest>(&body) {
        Ok(request) => reply(p.create_vpn(&request).await),
        Err(rejection) => rejection,
    }
}

async fn create_secret(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<SecretRequest>(&body) {
        Ok(request) => reply(p.create_secret(&request).await),
        Err(rejection) => rejection,
    }
}

async fn list_clusters(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<ComputeAuth>(&body) {
        Ok(auth) => reply(p.list_clusters(&auth).await),
        Err(rejection) => rejection,
    }
}

async fn create_machines(State(p): State<Provisioner>, body: Bytes) -> Response {
    match parse::<MachineRequest>(&body) {
        Ok(request) => reply(p.create_machines(&request).await),
        Err(rejection) => rejection,
    }
}
