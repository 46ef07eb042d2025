//! Static vendor registry.
//!
//! Maps a discovered device onto exactly one protocol. Advertised service
//! UUIDs are authoritative; the name prefix is a fallback for devices that do
//! not advertise their primary service. A device that matches nothing, or
//! whose name matches several protocols, is rejected rather than guessed.

use cubelink_crypto::{DeviceId, KeyFamily};
use cubelink_proto::{GanVersion, Protocol};

use crate::error::SessionError;

/// What a device announced before connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Advertisement {
    /// Local name, if advertised
    pub name: Option<String>,
    /// Advertised service UUIDs, lowercase or uppercase
    pub services: Vec<String>,
    /// Manufacturer-specific data keyed by company identifier
    pub manufacturer_data: Vec<(u16, Vec<u8>)>,
}

/// One supported protocol and its GATT layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorEntry {
    /// Wire protocol
    pub protocol: Protocol,
    /// Primary service UUID
    pub service: &'static str,
    /// Notify characteristic UUID
    pub notify: &'static str,
    /// Write characteristic UUID
    pub write: &'static str,
    /// Advertised name prefixes
    pub name_prefixes: &'static [&'static str],
}

const GAN_PREFIXES: &[&str] = &["GAN", "MG", "AiCube"];

/// Every supported protocol.
pub static REGISTRY: [VendorEntry; 4] = [
    VendorEntry {
        protocol: Protocol::Gan(GanVersion::Gen2),
        service: "6e400001-b5a3-f393-e0a9-e50e24dc4179",
        notify: "28be4cb6-cd67-11e9-a32f-2a2ae2dbcce4",
        write: "28be4a4a-cd67-11e9-a32f-2a2ae2dbcce4",
        name_prefixes: GAN_PREFIXES,
    },
    VendorEntry {
        protocol: Protocol::Gan(GanVersion::Gen3),
        service: "8653000a-43e6-47b7-9cb0-5fc21d4ae340",
        notify: "8653000b-43e6-47b7-9cb0-5fc21d4ae340",
        write: "8653000c-43e6-47b7-9cb0-5fc21d4ae340",
        name_prefixes: GAN_PREFIXES,
    },
    VendorEntry {
        protocol: Protocol::Gan(GanVersion::Gen4),
        service: "00000010-0000-fff7-fff6-fff5fff4fff0",
        notify: "0000fff6-0000-1000-8000-00805f9b34fb",
        write: "0000fff5-0000-1000-8000-00805f9b34fb",
        name_prefixes: GAN_PREFIXES,
    },
    VendorEntry {
        protocol: Protocol::MoYu32,
        service: "0783b03e-7735-b5a0-1760-a305d2795cb0",
        notify: "0783b03e-7735-b5a0-1760-a305d2795cb1",
        write: "0783b03e-7735-b5a0-1760-a305d2795cb2",
        name_prefixes: &["WCU_MY3"],
    },
];

/// MoYu32 identifiers share this prefix; the name carries the last two bytes.
const MOYU_ID_PREFIX: [u8; 4] = [0xCF, 0x30, 0x16, 0x00];

/// Registry entry for a protocol.
#[must_use]
pub fn entry_for(protocol: Protocol) -> &'static VendorEntry {
    match protocol {
        Protocol::Gan(GanVersion::Gen2) => &REGISTRY[0],
        Protocol::Gan(GanVersion::Gen3) => &REGISTRY[1],
        Protocol::Gan(GanVersion::Gen4) => &REGISTRY[2],
        Protocol::MoYu32 => &REGISTRY[3],
    }
}

/// Key family used by a protocol.
#[must_use]
pub fn key_family(protocol: Protocol) -> KeyFamily {
    match protocol {
        Protocol::Gan(_) => KeyFamily::Gan,
        Protocol::MoYu32 => KeyFamily::MoYu32,
    }
}

/// Select the registry entry for an advertisement.
///
/// # Errors
///
/// - `SessionError::UnknownDriver` if no service matches and the name prefix
///   matches zero or several protocols
pub fn match_device(adv: &Advertisement) -> Result<&'static VendorEntry, SessionError> {
    let by_service = REGISTRY
        .iter()
        .find(|entry| adv.services.iter().any(|s| s.eq_ignore_ascii_case(entry.service)));
    if let Some(entry) = by_service {
        tracing::debug!(protocol = %entry.protocol, "matched device by service");
        return Ok(entry);
    }

    let unknown = |reason| SessionError::UnknownDriver { name: adv.name.clone(), reason };
    let Some(name) = adv.name.as_deref() else {
        return Err(unknown("no known service and no name"));
    };

    let mut by_name = REGISTRY
        .iter()
        .filter(|entry| entry.name_prefixes.iter().any(|p| name.starts_with(p)));
    match (by_name.next(), by_name.next()) {
        (Some(entry), None) => {
            tracing::debug!(protocol = %entry.protocol, name, "matched device by name prefix");
            Ok(entry)
        },
        (Some(_), Some(_)) => Err(unknown("name prefix matches several protocols")),
        (None, _) => Err(unknown("no known service or name prefix")),
    }
}

/// Harvest the device identifier from advertisement data.
#[must_use]
pub fn recover_identifier(protocol: Protocol, adv: &Advertisement) -> Option<DeviceId> {
    match protocol {
        Protocol::Gan(_) => adv
            .manufacturer_data
            .iter()
            .find(|(company, data)| company & 0xFF == 0x01 && data.len() >= 6)
            .map(|(_, data)| {
                let mut bytes = [0u8; 6];
                for (i, byte) in bytes.iter_mut().enumerate() {
                    *byte = data[data.len() - 1 - i];
                }
                DeviceId::from_bytes(bytes)
            }),
        Protocol::MoYu32 => {
            let name = adv.name.as_deref()?;
            let suffix = name.strip_prefix("WCU_MY32_")?;
            if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            let hi = u8::from_str_radix(&suffix[..2], 16).ok()?;
            let lo = u8::from_str_radix(&suffix[2..], 16).ok()?;
            let [a, b, c, d] = MOYU_ID_PREFIX;
            Some(DeviceId::from_bytes([a, b, c, d, hi, lo]))
        },
    }
}

/// Identifier to derive keys from: the host's if given, else the
/// advertisement's.
///
/// # Errors
///
/// - `SessionError::IdentifierUnavailable` if neither source has one
pub fn resolve_identifier(
    protocol: Protocol,
    adv: &Advertisement,
    known: Option<DeviceId>,
) -> Result<DeviceId, SessionError> {
    if let Some(id) = known {
        return Ok(id);
    }
    recover_identifier(protocol, adv)
        .ok_or_else(|| SessionError::IdentifierUnavailable { name: adv.name.clone() })
}
