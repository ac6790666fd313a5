// # Mapping Entries
//
// One record maps a CPE address to the ECS address sent upstream on its
// behalf. The textual form is `tag cpe_ip ecs_ip [ignored...]`.
//
// IPv4-mapped IPv6 addresses are canonicalized to IPv4, so
// `::ffff:10.0.0.1` and `10.0.0.1` are the same key.

use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::error::{AddressField, Error, Result};

/// A CPE → ECS mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Lookup key
    pub cpe_address: IpAddr,
    /// Substitute subnet address
    pub ecs_address: IpAddr,
    /// Whether `ecs_address` is IPv6
    pub is_v6: bool,
    /// Label of the source record, only used for load-time filtering
    pub tag: String,
    /// When the entry was parsed
    pub stored_at: DateTime<Utc>,
}

impl MappingEntry {
    /// Create an entry stamped with the current time
    pub fn new(tag: impl Into<String>, cpe_address: IpAddr, ecs_address: IpAddr) -> Self {
        let ecs_address = ecs_address.to_canonical();
        Self {
            cpe_address: cpe_address.to_canonical(),
            is_v6: ecs_address.is_ipv6(),
            ecs_address,
            tag: tag.into(),
            stored_at: Utc::now(),
        }
    }
}

/// Parse one record
///
/// Records with fewer than three fields are not an error: they yield
/// `Ok(None)` and are skipped by the loader.
pub fn parse_entry(line: &str) -> Result<Option<MappingEntry>> {
    let mut fields = line.split_whitespace();
    let (Some(tag), Some(cpe), Some(ecs)) = (fields.next(), fields.next(), fields.next()) else {
        return Ok(None);
    };

    let cpe: IpAddr = cpe
        .parse()
        .map_err(|_| Error::parse(AddressField::Cpe, line))?;
    let ecs: IpAddr = ecs
        .parse()
        .map_err(|_| Error::parse(AddressField::Ecs, line))?;

    Ok(Some(MappingEntry::new(tag, cpe, ecs)))
}
