use std::fmt;

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use rug::Integer;

use crate::TypesError;
use crate::codec::{append_integer, expect_list_len, integer_at};

/// Public parameters of a single time-lock puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlpPublic {
    pub n: Integer, // RSA modulus
    pub t: Integer, // forced squarings
    pub r: Integer, // random base, coprime to n
}

/// Trapdoor material. Held by the generating party only.
#[derive(Clone, PartialEq, Eq)]
pub struct TlpSecret {
    pub p: Integer,
    pub q: Integer,
    pub phi_n: Integer,
    pub a: Integer, // 2^t mod phi_n
}

impl fmt::Debug for TlpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlpSecret")
            .field("p", &"<redacted>")
            .field("q", &"<redacted>")
            .field("phi_n", &"<redacted>")
            .field("a", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlpPuzzle {
    pub encrypted_key: Integer,
    pub encrypted_message: Vec<u8>,
}

impl TlpPuzzle {
    pub fn new(encrypted_key: Integer, encrypted_message: Vec<u8>) -> Self {
        Self {
            encrypted_key,
            encrypted_message,
        }
    }

    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let rlp = Rlp::new(bytes);
        Ok(Self::decode(&rlp)?)
    }
}

impl Encodable for TlpPuzzle {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        append_integer(s, &self.encrypted_key);
        s.append(&self.encrypted_message);
    }
}

impl Decodable for TlpPuzzle {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 2)?;
        Ok(TlpPuzzle {
            encrypted_key: integer_at(rlp, 0)?,
            encrypted_message: rlp.val_at(1)?,
        })
    }
}

/// Encodes an ordered puzzle chain for hand-off to a solver.
pub fn encode_puzzles(puzzles: &[TlpPuzzle]) -> Vec<u8> {
    rlp::encode_list::<TlpPuzzle, _>(puzzles).to_vec()
}

pub fn decode_puzzles(bytes: &[u8]) -> Result<Vec<TlpPuzzle>, TypesError> {
    Ok(Rlp::new(bytes).as_list()?)
}
