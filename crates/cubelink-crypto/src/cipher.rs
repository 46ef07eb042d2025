//! Two-ended AES-128 frame transform.
//!
//! Frames are 16 or 20 bytes. There is no chaining mode: each end of the
//! frame is treated as one block, and for 20-byte frames the two blocks
//! overlap in bytes 4..16.
//!
//! ```text
//! decrypt: last block  ── AES⁻¹ ── ⊕ IV   (only if len > 16)
//!          first block ── AES⁻¹ ── ⊕ IV
//! encrypt: first block ── ⊕ IV ── AES
//!          last block  ── ⊕ IV ── AES     (only if len > 16)
//! ```
//!
//! The order matters because of the overlap. Decrypting the first block
//! before the last one yields garbage without any error.

use aes::{
    Aes128,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray},
};
use zeroize::Zeroize;

use crate::{error::CryptoError, keys::SessionKey};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Frame encryptor/decryptor bound to one session key.
pub struct FrameCipher {
    cipher: Aes128,
    iv: [u8; BLOCK_SIZE],
}

impl FrameCipher {
    /// Build a cipher from derived session material.
    #[must_use]
    pub fn new(session: &SessionKey) -> Self {
        Self { cipher: Aes128::new(GenericArray::from_slice(session.key())), iv: *session.iv() }
    }

    /// Decrypt a frame.
    ///
    /// # Errors
    ///
    /// - `CryptoError::BlockTooShort` if the frame is shorter than one block
    pub fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let len = frame.len();
        if len < BLOCK_SIZE {
            return Err(CryptoError::BlockTooShort(len));
        }

        let mut out = frame.to_vec();
        if len > BLOCK_SIZE {
            self.decrypt_block(&mut out[len - BLOCK_SIZE..]);
        }
        self.decrypt_block(&mut out[..BLOCK_SIZE]);
        Ok(out)
    }

    /// Encrypt a frame. Exact inverse of [`FrameCipher::decrypt`].
    ///
    /// # Errors
    ///
    /// - `CryptoError::BlockTooShort` if the frame is shorter than one block
    pub fn encrypt(&self, frame: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let len = frame.len();
        if len < BLOCK_SIZE {
            return Err(CryptoError::BlockTooShort(len));
        }

        let mut out = frame.to_vec();
        self.encrypt_block(&mut out[..BLOCK_SIZE]);
        if len > BLOCK_SIZE {
            self.encrypt_block(&mut out[len - BLOCK_SIZE..]);
        }
        Ok(out)
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        for (b, iv) in block.iter_mut().zip(self.iv) {
            *b ^= iv;
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        for (b, iv) in block.iter_mut().zip(self.iv) {
            *b ^= iv;
        }
        self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCipher").finish_non_exhaustive()
    }
}

impl Drop for FrameCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{DeviceId, KeyFamily, derive_session_key};

    fn golden_cipher() -> FrameCipher {
        let id: DeviceId = "AB:12:34:62:BC:15".parse().unwrap();
        FrameCipher::new(&derive_session_key(KeyFamily::Gan, &id))
    }

    #[test]
    fn twenty_byte_golden_frame() {
        let cipher = golden_cipher();
        let ciphertext = hex::decode("4161c9d466ab517cf708b7b819014662e3252c48").unwrap();
        let plaintext = cipher.decrypt(&ciphertext).unwrap();
        assert_eq!(hex::encode(&plaintext), "ef01570000000000000000000000000000000000");
        assert_eq!(cipher.encrypt(&plaintext).unwrap(), ciphertext);
    }

    #[test]
    fn sixteen_byte_golden_frame() {
        let cipher = golden_cipher();
        let ciphertext = hex::decode("66e3a10abac645dc8e1699215b3e4eac").unwrap();
        let plaintext = cipher.decrypt(&ciphertext).unwrap();
        assert_eq!(hex::encode(plaintext), "55100140000000000000000000000000");
    }

    #[test]
    fn short_frames_are_rejected() {
        let cipher = golden_cipher();
        assert_eq!(cipher.decrypt(&[0u8; 15]), Err(CryptoError::BlockTooShort(15)));
        assert_eq!(cipher.encrypt(&[]), Err(CryptoError::BlockTooShort(0)));
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(frame in prop::collection::vec(any::<u8>(), 16..=32)) {
            let cipher = golden_cipher();
            let ciphertext = cipher.encrypt(&frame).unwrap();
            prop_assert_eq!(cipher.decrypt(&ciphertext).unwrap(), frame);
        }
    }
}
