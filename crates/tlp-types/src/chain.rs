use std::fmt;

use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use rug::Integer;

use crate::TypesError;
use crate::codec::{append_integer, expect_list_len, integer_at, integer_from_bytes};

/// Lengths needed to split a solved plaintext back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryInfo {
    pub hash_name: String,
    pub len_commitment: usize,
    pub len_r: usize,
}

impl Encodable for AuxiliaryInfo {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.hash_name);
        s.append(&(self.len_commitment as u64));
        s.append(&(self.len_r as u64));
    }
}

impl Decodable for AuxiliaryInfo {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        let len_commitment: u64 = rlp.val_at(1)?;
        let len_r: u64 = rlp.val_at(2)?;
        Ok(AuxiliaryInfo {
            hash_name: rlp.val_at(0)?,
            len_commitment: usize::try_from(len_commitment)
                .map_err(|_| DecoderError::Custom("commitment length overflow"))?,
            len_r: usize::try_from(len_r).map_err(|_| DecoderError::Custom("r length overflow"))?,
        })
    }
}

/// Public key of a shared-interval chain: one `t` for every puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MitlpPublic {
    pub aux: AuxiliaryInfo,
    pub n: Integer,
    pub t: Integer,
    pub r0: Integer,
}

#[derive(Clone, PartialEq, Eq)]
pub struct MitlpSecret {
    pub a: Integer,
    pub r: Vec<Vec<u8>>, // z fixed-width bases, r[0] encodes r0
    pub d: Vec<Vec<u8>>, // z commitment nonces
}

impl fmt::Debug for MitlpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MitlpSecret")
            .field("a", &"<redacted>")
            .field("r", &self.r.len())
            .field("d", &self.d.len())
            .finish()
    }
}

/// Public key of a distinct-interval chain: `t[i]` per puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmitlpPublic {
    pub aux: AuxiliaryInfo,
    pub n: Integer,
    pub t: Vec<Integer>,
    pub r0: Integer,
}

impl GmitlpPublic {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let rlp = Rlp::new(bytes);
        Ok(Self::decode(&rlp)?)
    }
}

impl Encodable for GmitlpPublic {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.aux);
        append_integer(s, &self.n);
        s.begin_list(self.t.len());
        for t in &self.t {
            append_integer(s, t);
        }
        append_integer(s, &self.r0);
    }
}

impl Decodable for GmitlpPublic {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 4)?;
        let delays: Vec<Vec<u8>> = rlp.list_at(2)?;
        Ok(GmitlpPublic {
            aux: rlp.val_at(0)?,
            n: integer_at(rlp, 1)?,
            t: delays.iter().map(|bytes| integer_from_bytes(bytes)).collect(),
            r0: integer_at(rlp, 3)?,
        })
    }
}

/// Per-puzzle trapdoors `a[i] = 2^t[i] mod phi(n)`, plus `z` bases and `z` nonces.
#[derive(Clone, PartialEq, Eq)]
pub struct GmitlpSecret {
    pub a: Vec<Integer>,
    pub r: Vec<Vec<u8>>,
    pub d: Vec<Vec<u8>>,
}

impl fmt::Debug for GmitlpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GmitlpSecret")
            .field("a", &self.a.len())
            .field("r", &self.r.len())
            .field("d", &self.d.len())
            .finish()
    }
}
