use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    #[error("RLP decode error: {0}")]
    RlpDecode(#[from] rlp::DecoderError),

    #[error("Integer needs {len} bytes, only {max} available")]
    IntegerTooLarge { len: usize, max: usize },

    #[error("Negative integers have no byte encoding")]
    NegativeInteger,

    #[error("Invalid escrow terms: {0}")]
    InvalidTerms(String),
}
