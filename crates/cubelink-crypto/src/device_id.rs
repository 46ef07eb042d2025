//! Six-byte device identifier.

use std::{fmt, str::FromStr};

use crate::error::CryptoError;

/// Number of bytes in a device identifier.
pub const DEVICE_ID_LEN: usize = 6;

/// Stable per-device identifier (the radio address), stored in textual order.
///
/// `"AB:12:34:62:BC:15"` holds `[0xAB, 0x12, 0x34, 0x62, 0xBC, 0x15]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId([u8; DEVICE_ID_LEN]);

impl DeviceId {
    /// Wrap raw bytes in textual order.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DEVICE_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Bytes in textual order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DEVICE_ID_LEN] {
        &self.0
    }

    /// Bytes in reverse order, as mixed into the vendor base key.
    #[must_use]
    pub fn salt(&self) -> [u8; DEVICE_ID_LEN] {
        let mut salt = self.0;
        salt.reverse();
        salt
    }
}

impl FromStr for DeviceId {
    type Err = CryptoError;

    /// Accepts `:` or `-` separators, or none at all. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        if digits.len() != DEVICE_ID_LEN * 2 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidIdentifier(s.to_string()));
        }

        let mut bytes = [0u8; DEVICE_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16)
                .map_err(|_| CryptoError::InvalidIdentifier(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_common_separators() {
        let expected = DeviceId::from_bytes([0xAB, 0x12, 0x34, 0x62, 0xBC, 0x15]);
        for text in ["AB:12:34:62:BC:15", "ab-12-34-62-bc-15", "AB123462BC15"] {
            assert_eq!(text.parse::<DeviceId>(), Ok(expected), "{text}");
        }
        assert_eq!(expected.to_string(), "AB:12:34:62:BC:15");
    }

    #[test]
    fn parse_rejects_malformed() {
        for text in ["", "AB:12:34:62:BC", "AB:12:34:62:BC:1G", "AB:12:34:62:BC:15:00", "ÄB:12:34:62:BC:1"]
        {
            assert!(text.parse::<DeviceId>().is_err(), "{text}");
        }
    }

    #[test]
    fn parse_rejects_signs() {
        for text in ["AB:12:34:62:BC:+5", "+B:12:34:62:BC:15"] {
            assert!(text.parse::<DeviceId>().is_err(), "{text}");
        }
    }

    #[test]
    fn salt_is_reversed() {
        let id: DeviceId = "01:02:03:04:05:06".parse().unwrap();
        assert_eq!(id.salt(), [6, 5, 4, 3, 2, 1]);
    }
}
