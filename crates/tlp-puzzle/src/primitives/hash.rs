use sha2::{Digest, Sha512};
use sha3::Keccak256;

/// Commitment hash. Output length fixes how commitments are compared.
pub trait HashFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn output_len(&self) -> usize;
    fn digest(&self, data: &[u8]) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha512Hash;

impl HashFunction for Sha512Hash {
    fn name(&self) -> &'static str {
        "SHA512"
    }

    fn output_len(&self) -> usize {
        64
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        Sha512::digest(data).to_vec()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hash;

impl HashFunction for Keccak256Hash {
    fn name(&self) -> &'static str {
        "KECCAK256"
    }

    fn output_len(&self) -> usize {
        32
    }

    fn digest(&self, data: &[u8]) -> Vec<u8> {
        Keccak256::digest(data).to_vec()
    }
}
