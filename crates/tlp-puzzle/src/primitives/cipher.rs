use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rug::Integer;
use tlp_types::codec::{integer_from_bytes, integer_to_fixed_bytes};

use crate::PuzzleError;

/// Symmetric cipher whose keys are packed into a residue mod `n`.
pub trait SymmetricCipher: Send + Sync {
    fn key_bits(&self) -> u32;
    fn generate_key(&self) -> Integer;
    fn encrypt(&self, key: &Integer, plaintext: &[u8]) -> Result<Vec<u8>, PuzzleError>;
    fn decrypt(&self, key: &Integer, ciphertext: &[u8]) -> Result<Vec<u8>, PuzzleError>;
}

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM. Output is `nonce || ciphertext || tag`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    fn cipher(key: &Integer) -> Result<Aes256Gcm, PuzzleError> {
        let bytes = integer_to_fixed_bytes(key, KEY_LEN).map_err(|_| PuzzleError::KeyOutOfRange)?;
        Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&bytes)))
    }
}

impl SymmetricCipher for AesGcmCipher {
    fn key_bits(&self) -> u32 {
        (KEY_LEN * 8) as u32
    }

    // Keys always come from the OS, even when the protocol randomness is seeded.
    fn generate_key(&self) -> Integer {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        integer_from_bytes(&bytes)
    }

    fn encrypt(&self, key: &Integer, plaintext: &[u8]) -> Result<Vec<u8>, PuzzleError> {
        let cipher = Self::cipher(key)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| PuzzleError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, key: &Integer, ciphertext: &[u8]) -> Result<Vec<u8>, PuzzleError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(PuzzleError::Decryption);
        }
        // A recovered key above 256 bits can only come from the wrong delay.
        let cipher = Self::cipher(key).map_err(|_| PuzzleError::Decryption)?;
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| PuzzleError::Decryption)
    }
}
