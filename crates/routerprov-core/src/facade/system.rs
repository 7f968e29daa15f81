// Read-only device queries.

use std::collections::BTreeSet;

use routerprov_api::{Command, Record};

use super::RouterFacade;
use crate::error::CoreError;
use crate::model::{
    AddressEntry, CertificateEntry, PoolEntry, PppProfile, PppSecret, parse_port_list,
};

/// Sources of ports already in use, with the attribute holding them.
const PORT_SOURCES: [(&str, &str); 3] = [
    ("/ip/service/print", "port"),
    ("/ip/firewall/nat/print", "dst-port"),
    ("/ip/firewall/filter/print", "dst-port"),
];

impl RouterFacade {
    /// Open and close a session without issuing anything else.
    pub async fn validate(&self) -> Result<(), CoreError> {
        self.open().await?.close().await;
        Ok(())
    }

    /// The device's human-readable identity (`/system identity`).
    pub async fn identity(&self) -> Result<String, CoreError> {
        let records = self.run_once(Command::new("/system/identity/print")).await?;
        records
            .first()
            .and_then(Record::name)
            .map(str::to_owned)
            .ok_or_else(|| CoreError::CommandFailed {
                command: "/system/identity/print".into(),
                message: "device reported no identity".into(),
            })
    }

    pub async fn system_resource(&self) -> Result<Record, CoreError> {
        let records = self.run_once(Command::new("/system/resource/print")).await?;
        Ok(records.into_iter().next().unwrap_or_default())
    }

    pub async fn list_addresses(&self) -> Result<Vec<AddressEntry>, CoreError> {
        let records = self.run_once(Command::new("/ip/address/print")).await?;
        Ok(records.iter().filter_map(AddressEntry::from_record).collect())
    }

    pub async fn list_pools(&self) -> Result<Vec<PoolEntry>, CoreError> {
        let records = self.run_once(Command::new("/ip/pool/print")).await?;
        Ok(records.iter().filter_map(PoolEntry::from_record).collect())
    }

    pub async fn list_certificates(&self) -> Result<Vec<CertificateEntry>, CoreError> {
        let records = self.run_once(Command::new("/certificate/print")).await?;
        Ok(records
            .iter()
            .filter_map(CertificateEntry::from_record)
            .collect())
    }

    pub async fn list_ppp_profiles(&self) -> Result<Vec<PppProfile>, CoreError> {
        let records = self.run_once(Command::new("/ppp/profile/print")).await?;
        Ok(records.iter().filter_map(PppProfile::from_record).collect())
    }

    pub async fn list_ppp_secrets(&self) -> Result<Vec<PppSecret>, CoreError> {
        let records = self.run_once(Command::new("/ppp/secret/print")).await?;
        Ok(records.iter().filter_map(PppSecret::from_record).collect())
    }

    /// Ports bound by services or referenced by NAT / filter rules.
    pub async fn used_ports(&self) -> Result<BTreeSet<u16>, CoreError> {
        let mut session = self.open().await?;
        let result = async {
            let mut ports = BTreeSet::new();
            for (path, attribute) in PORT_SOURCES {
                for record in session.run(&Command::new(path)).await? {
                    if let Some(raw) = record.get(attribute) {
                        parse_port_list(raw, &mut ports);
                    }
                }
            }
            Ok(ports)
        }
        .await;
        session.close().await;
        result
    }

    /// Ping `address` from the device. Replies are returned raw.
    pub async fn ping(&self, address: &str, count: u32) -> Result<Vec<Record>, CoreError> {
        self.run_once(
            Command::new("/ping")
                .param("address", address)
                .param("count", count),
        )
        .await
    }
}
