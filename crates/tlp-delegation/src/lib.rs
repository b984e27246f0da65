pub mod config;
pub mod delegation;
pub mod error;

pub use config::{DelegationConfig, EscrowRequest, custom_extra_delay};
pub use delegation::{ClientKey, Delegation, Dgmitlp, Edtlp};
pub use error::DelegationError;
