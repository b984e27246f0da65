mod cipher;
mod hash;
mod modulus;
mod random;

pub use cipher::{AesGcmCipher, SymmetricCipher};
pub use hash::{HashFunction, Keccak256Hash, Sha512Hash};
pub use modulus::{ModulusGenerator, PrimeModulus, RsaModulus, validate_keysize};
pub use random::{ChaChaRandom, RandomSource};
