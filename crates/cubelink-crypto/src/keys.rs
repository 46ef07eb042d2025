//! Vendor base keys and per-device session key derivation.

use zeroize::Zeroize;

use crate::device_id::{DEVICE_ID_LEN, DeviceId};

/// AES-128 key and IV length.
pub const KEY_LEN: usize = 16;

/// Vendor base key/IV pair.
struct BaseKey {
    key: [u8; KEY_LEN],
    iv: [u8; KEY_LEN],
}

/// Shared by GAN Gen2, Gen3 and Gen4.
const GAN_BASE: BaseKey = BaseKey {
    key: [1, 2, 66, 40, 49, 145, 22, 7, 32, 5, 24, 84, 66, 17, 18, 83],
    iv: [17, 3, 50, 40, 33, 1, 118, 39, 32, 149, 120, 20, 50, 18, 2, 67],
};

const MOYU32_BASE: BaseKey = BaseKey {
    key: [5, 18, 2, 69, 2, 1, 41, 86, 18, 120, 18, 118, 129, 1, 8, 3],
    iv: [1, 68, 40, 6, 134, 33, 34, 40, 81, 5, 8, 49, 130, 2, 33, 6],
};

/// Which vendor base key a protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyFamily {
    /// GAN smart cubes, every generation
    Gan,
    /// MoYu AI 2023
    MoYu32,
}

impl KeyFamily {
    fn base(self) -> &'static BaseKey {
        match self {
            Self::Gan => &GAN_BASE,
            Self::MoYu32 => &MOYU32_BASE,
        }
    }
}

/// Per-device AES-128 key and IV.
///
/// # Security
///
/// Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    key: [u8; KEY_LEN],
    iv: [u8; KEY_LEN],
}

impl SessionKey {
    /// Wrap raw key material.
    #[must_use]
    pub fn new(key: [u8; KEY_LEN], iv: [u8; KEY_LEN]) -> Self {
        Self { key, iv }
    }

    /// Cipher key.
    #[must_use]
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// Block IV.
    #[must_use]
    pub fn iv(&self) -> &[u8; KEY_LEN] {
        &self.iv
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey").finish_non_exhaustive()
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

/// Derive the session key for a device.
///
/// The identifier is reversed and added byte-wise, mod 255, into the low six
/// bytes of the vendor base key and IV. The remaining ten bytes are the base
/// bytes unchanged.
///
/// Note the modulus is 255, not 256: `0x91 + 0xAB` yields `0x3D`, not `0x3C`.
#[must_use]
pub fn derive_session_key(family: KeyFamily, device: &DeviceId) -> SessionKey {
    let base = family.base();
    let salt = device.salt();

    let mut key = base.key;
    let mut iv = base.iv;
    for i in 0..DEVICE_ID_LEN {
        key[i] = ((u16::from(base.key[i]) + u16::from(salt[i])) % 255) as u8;
        iv[i] = ((u16::from(base.iv[i]) + u16::from(salt[i])) % 255) as u8;
    }

    SessionKey { key, iv }
}
