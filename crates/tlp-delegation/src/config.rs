use rug::{Integer, Rational};
use tlp_puzzle::config::{DEFAULT_KEYSIZE, squarings_upper_bound};
use tlp_types::{Address, Coins, ServerInfo, Timestamp};

use crate::DelegationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelegationConfig {
    /// Offset of the first puzzle slot from escrow initiation.
    pub start_delay_ms: Timestamp,
}

impl DelegationConfig {
    pub fn new(start_delay_ms: Timestamp) -> Self {
        Self { start_delay_ms }
    }

    pub fn get_default() -> Self {
        Self { start_delay_ms: 0 }
    }
}

/// Compensating delay, in seconds, for a helper claiming `server_info.squarings`
/// against the assumed best rate `upper_bound`:
/// `seconds * (upper_bound / claimed - 1)`, computed exactly.
pub fn custom_extra_delay(
    upper_bound: u64,
    seconds: u64,
    server_info: &ServerInfo,
) -> Result<Rational, DelegationError> {
    let claimed = server_info.squarings;
    if claimed == 0 {
        return Err(DelegationError::InvalidInput(
            "claimed squaring rate is zero".to_string(),
        ));
    }
    if claimed > upper_bound {
        return Err(DelegationError::ClaimedRateExceedsBound {
            claimed,
            bound: upper_bound,
        });
    }
    let numerator = Integer::from(seconds) * (upper_bound - claimed);
    Ok(Rational::from((numerator, Integer::from(claimed))))
}

/// What the server needs to open an escrow for a batch of puzzles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowRequest {
    /// Per-puzzle delays in seconds.
    pub intervals: Vec<u64>,
    pub server_info: ServerInfo,
    pub coins: Vec<Coins>,
    pub start_time: Timestamp,
    pub helper: Address,
    /// Falls back to the table entry for `keysize` when unset.
    pub squarings_upper_bound: Option<u64>,
    pub keysize: u32,
}

impl EscrowRequest {
    pub fn new(
        intervals: Vec<u64>,
        server_info: ServerInfo,
        coins: Vec<Coins>,
        start_time: Timestamp,
        helper: Address,
    ) -> Self {
        EscrowRequest {
            intervals,
            server_info,
            coins,
            start_time,
            helper,
            squarings_upper_bound: None,
            keysize: DEFAULT_KEYSIZE,
        }
    }

    pub fn with_squarings_upper_bound(mut self, bound: u64) -> Self {
        self.squarings_upper_bound = Some(bound);
        self
    }

    pub fn with_keysize(mut self, keysize: u32) -> Self {
        self.keysize = keysize;
        self
    }

    pub fn resolved_upper_bound(&self) -> Result<u64, DelegationError> {
        match self.squarings_upper_bound {
            Some(bound) => Ok(bound),
            None => squarings_upper_bound(self.keysize)
                .ok_or(DelegationError::UnknownKeysize(self.keysize)),
        }
    }
}
