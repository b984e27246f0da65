use ethereum_types::{Address, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::TypesError;
use crate::codec::expect_list_len;

pub type Coins = U256;

/// Milliseconds. Offsets for terms, Unix time for recorded events.
pub type Timestamp = u64;

/// Claimed squaring throughput of a helper, in squarings per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerInfo {
    pub squarings: u64,
}

impl ServerInfo {
    pub fn new(squarings: u64) -> Self {
        Self { squarings }
    }
}

/// A solved puzzle as registered on the escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub ciphertext: Vec<u8>,
    pub witness: Vec<u8>,
    pub timestamp: Timestamp,
    pub solver: Address,
}

impl Encodable for Solution {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.ciphertext);
        s.append(&self.witness);
        s.append(&self.timestamp);
        s.append(&self.solver);
    }
}

impl Decodable for Solution {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 4)?;
        let mut iter = rlp.iter();
        Ok(Solution {
            ciphertext: iter.next().ok_or(DecoderError::RlpIsTooShort)?.as_val()?,
            witness: iter.next().ok_or(DecoderError::RlpIsTooShort)?.as_val()?,
            timestamp: iter.next().ok_or(DecoderError::RlpIsTooShort)?.as_val()?,
            solver: iter.next().ok_or(DecoderError::RlpIsTooShort)?.as_val()?,
        })
    }
}

/// What a server deposits when it initiates an escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowTerms {
    pub coins: Vec<Coins>,
    pub start_time: Timestamp,
    pub extra_time: Vec<Timestamp>,
    pub upper_bounds: Vec<Timestamp>,
    pub helper: Address,
}

impl EscrowTerms {
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Per-puzzle vectors must align, and deadlines must never move backwards.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.coins.is_empty() {
            return Err(TypesError::InvalidTerms("no puzzles".to_string()));
        }
        if self.upper_bounds.len() != self.coins.len() {
            return Err(TypesError::InvalidTerms(format!(
                "{} upper bounds for {} coin deposits",
                self.upper_bounds.len(),
                self.coins.len()
            )));
        }
        if self.extra_time.len() != self.coins.len() {
            return Err(TypesError::InvalidTerms(format!(
                "{} extra delays for {} coin deposits",
                self.extra_time.len(),
                self.coins.len()
            )));
        }
        let mut previous = self.start_time;
        for (i, bound) in self.upper_bounds.iter().enumerate() {
            if *bound < previous {
                return Err(TypesError::InvalidTerms(format!(
                    "upper bound {} ({} ms) precedes {} ms",
                    i, bound, previous
                )));
            }
            previous = *bound;
        }
        Ok(())
    }
}

impl Encodable for EscrowTerms {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5);
        s.append_list::<Coins, _>(&self.coins);
        s.append(&self.start_time);
        s.append_list::<u64, _>(&self.extra_time);
        s.append_list::<u64, _>(&self.upper_bounds);
        s.append(&self.helper);
    }
}

impl Decodable for EscrowTerms {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 5)?;
        Ok(EscrowTerms {
            coins: rlp.list_at(0)?,
            start_time: rlp.val_at(1)?,
            extra_time: rlp.list_at(2)?,
            upper_bounds: rlp.list_at(3)?,
            helper: rlp.val_at(4)?,
        })
    }
}

/// Terms together with who deposited them and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRecord {
    pub terms: EscrowTerms,
    pub server: Address,
    pub initial_timestamp: Timestamp,
}

impl EscrowRecord {
    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let rlp = Rlp::new(bytes);
        Ok(Self::decode(&rlp)?)
    }
}

impl Encodable for EscrowRecord {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.terms);
        s.append(&self.server);
        s.append(&self.initial_timestamp);
    }
}

impl Decodable for EscrowRecord {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        expect_list_len(rlp, 3)?;
        Ok(EscrowRecord {
            terms: rlp.val_at(0)?,
            server: rlp.val_at(1)?,
            initial_timestamp: rlp.val_at(2)?,
        })
    }
}

/// How an escrowed deposit was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Paid,
    PaidBack,
}

impl Settlement {
    pub fn as_u8(self) -> u8 {
        match self {
            Settlement::Paid => 1,
            Settlement::PaidBack => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Settlement::Paid),
            2 => Some(Settlement::PaidBack),
            _ => None,
        }
    }
}

impl Encodable for Settlement {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.as_u8());
    }
}

impl Decodable for Settlement {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let value: u8 = rlp.as_val()?;
        Settlement::from_u8(value).ok_or(DecoderError::Custom("unknown settlement"))
    }
}
