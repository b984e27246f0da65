use rlp::{DecoderError, Rlp, RlpStream};
use rug::Integer;
use rug::integer::Order;

use crate::TypesError;

/// Big-endian magnitude of `value`. Zero encodes to an empty vector.
pub fn integer_to_bytes(value: &Integer) -> Vec<u8> {
    value.to_digits::<u8>(Order::MsfBe)
}

pub fn integer_from_bytes(bytes: &[u8]) -> Integer {
    Integer::from_digits(bytes, Order::MsfBe)
}

/// Encodes `value` into exactly `len` big-endian bytes, left padded with zeros.
pub fn integer_to_fixed_bytes(value: &Integer, len: usize) -> Result<Vec<u8>, TypesError> {
    if value.is_negative() {
        return Err(TypesError::NegativeInteger);
    }
    let digits = integer_to_bytes(value);
    if digits.len() > len {
        return Err(TypesError::IntegerTooLarge {
            len: digits.len(),
            max: len,
        });
    }
    let mut out = vec![0u8; len - digits.len()];
    out.extend_from_slice(&digits);
    Ok(out)
}

pub(crate) fn append_integer(stream: &mut RlpStream, value: &Integer) {
    stream.append(&integer_to_bytes(value));
}

pub(crate) fn integer_at(rlp: &Rlp, index: usize) -> Result<Integer, DecoderError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    Ok(integer_from_bytes(&bytes))
}

pub(crate) fn expect_list_len(rlp: &Rlp, expected: usize) -> Result<(), DecoderError> {
    if rlp.item_count()? != expected {
        return Err(DecoderError::RlpIncorrectListLen);
    }
    Ok(())
}
