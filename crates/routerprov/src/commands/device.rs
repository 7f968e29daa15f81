//! Single-router query handlers.

use tabled::Tabled;

use routerprov_api::Record;
use routerprov_core::{AddressEntry, PingRequest, PppProfile, PppSecret};

use crate::cli::{DeviceArgs, DeviceCommand};
use crate::error::CliError;
use crate::output::{self, View};

use super::{Ctx, util};

// ── Row types ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct AddressRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Interface")]
    interface: String,
    #[tabled(rename = "Disabled")]
    disabled: String,
}

impl From<&AddressEntry> for AddressRow {
    fn from(a: &AddressEntry) -> Self {
        Self {
            id: a.id.clone().unwrap_or_default(),
            address: a.address.clone(),
            network: util::opt_display(a.network.as_ref()),
            interface: a.interface.clone().unwrap_or_default(),
            disabled: util::yes_no(a.disabled),
        }
    }
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "Remote")]
    remote: String,
}

impl From<&PppProfile> for ProfileRow {
    fn from(p: &PppProfile) -> Self {
        Self {
            id: p.id.clone().unwrap_or_default(),
            name: p.name.clone(),
            local: p.local_address.clone().unwrap_or_default(),
            remote: p.remote_address.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct SecretRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Profile")]
    profile: String,
    #[tabled(rename = "Service")]
    service: String,
}

impl From<&PppSecret> for SecretRow {
    fn from(s: &PppSecret) -> Self {
        Self {
            id: s.id.clone().unwrap_or_default(),
            name: s.name.clone(),
            profile: s.profile.clone().unwrap_or_default(),
            service: s.service.clone().unwrap_or_default(),
        }
    }
}

// ── Views ────────────────────────────────────────────────────────────

fn addresses_detail(entries: &Vec<AddressEntry>) -> String {
    let rows: Vec<AddressRow> = entries.iter().map(AddressRow::from).collect();
    output::render_table(&rows)
}

fn addresses_plain(entries: &Vec<AddressEntry>) -> String {
    entries
        .iter()
        .map(|a| a.address.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn profiles_detail(entries: &Vec<PppProfile>) -> String {
    let rows: Vec<ProfileRow> = entries.iter().map(ProfileRow::from).collect();
    output::render_table(&rows)
}

fn secrets_detail(entries: &Vec<PppSecret>) -> String {
    let rows: Vec<SecretRow> = entries.iter().map(SecretRow::from).collect();
    output::render_table(&rows)
}

fn names<T>(entries: &[T], name: impl Fn(&T) -> &str) -> String {
    entries.iter().map(name).collect::<Vec<_>>().join("\n")
}

fn record_detail(record: &Record) -> String {
    let pairs: Vec<(&str, String)> = record.iter().map(|(k, v)| (k, v.to_owned())).collect();
    output::kv_lines(&pairs)
}

fn record_plain(record: &Record) -> String {
    record
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `key: value` block per record, separated by blank lines.
pub(super) fn records_detail(records: &Vec<Record>) -> String {
    records
        .iter()
        .map(record_detail)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn records_plain(records: &Vec<Record>) -> String {
    records
        .iter()
        .map(|r| {
            r.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn nothing(_: &()) -> String {
    String::new()
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(ctx: &Ctx<'_>, args: DeviceArgs) -> Result<(), CliError> {
    let p = ctx.provisioner;
    match args.command {
        DeviceCommand::Addresses(endpoint) => {
            let request = util::device_request(endpoint)?;
            ctx.emit(
                &p.list_addresses(&request).await,
                &View {
                    detail: &addresses_detail,
                    plain: &addresses_plain,
                },
            )
        }

        DeviceCommand::Validate(endpoint) => {
            let request = util::device_request(endpoint)?;
            ctx.emit(
                &p.validate_connection(&request).await,
                &View {
                    detail: &nothing,
                    plain: &nothing,
                },
            )
        }

        DeviceCommand::Profiles(endpoint) => {
            let request = util::device_request(endpoint)?;
            ctx.emit(
                &p.list_ppp_profiles(&request).await,
                &View {
                    detail: &profiles_detail,
                    plain: &|e: &Vec<PppProfile>| names(e, |p| p.name.as_str()),
                },
            )
        }

        DeviceCommand::Secrets(endpoint) => {
            let request = util::device_request(endpoint)?;
            ctx.emit(
                &p.list_ppp_secrets(&request).await,
                &View {
                    detail: &secrets_detail,
                    plain: &|e: &Vec<PppSecret>| names(e, |s| s.name.as_str()),
                },
            )
        }

        DeviceCommand::Resource(endpoint) => {
            let request = util::device_request(endpoint)?;
            ctx.emit(
                &p.system_resource(&request).await,
                &View {
                    detail: &record_detail,
                    plain: &record_plain,
                },
            )
        }

        DeviceCommand::Ping {
            endpoint,
            target,
            count,
        } => {
            let request = PingRequest {
                auth: util::device_request(endpoint)?,
                target,
                count,
            };
            let bar = util::spinner(ctx.global, "pinging");
            let envelope = p.ping(&request).await;
            util::finish(bar);
            ctx.emit(
                &envelope,
                &View {
                    detail: &records_detail,
                    plain: &records_plain,
                },
            )
        }
    }
}
