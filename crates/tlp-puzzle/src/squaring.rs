use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rug::Integer;

use crate::PuzzleError;

/// Shared flag for aborting a running solve.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[inline]
fn square_mod(value: &mut Integer, modulus: &Integer) {
    value.square_mut();
    *value %= modulus;
}

/// Computes `base^(2^t) mod modulus` by `t` sequential squarings.
pub fn repeated_squaring(
    base: &Integer,
    t: &Integer,
    modulus: &Integer,
    cancelled: &CancellationToken,
) -> Result<Integer, PuzzleError> {
    if *modulus <= 1 {
        return Err(PuzzleError::InvalidModulus);
    }
    if t.is_negative() {
        return Err(PuzzleError::Arithmetic("negative squaring count".to_string()));
    }
    let iterations = match t.to_u64() {
        Some(val) => val,
        None => return repeated_squaring_large(base, t, modulus, cancelled),
    };

    let mut y = Integer::from(base % modulus);
    let check_interval = (iterations / 100).clamp(1, 10000);

    for i in 1..=iterations {
        if i % check_interval == 0 && cancelled.is_cancelled() {
            return Err(PuzzleError::Cancelled);
        }
        square_mod(&mut y, modulus);
    }
    Ok(y)
}

// Counter no longer fits in u64.
fn repeated_squaring_large(
    base: &Integer,
    t: &Integer,
    modulus: &Integer,
    cancelled: &CancellationToken,
) -> Result<Integer, PuzzleError> {
    const LARGE_CHECK_INTERVAL: u64 = 100000;

    let mut y = Integer::from(base % modulus);
    let mut current = Integer::from(1);
    let mut check_counter = 0u64;

    while &current <= t {
        check_counter += 1;
        if check_counter >= LARGE_CHECK_INTERVAL {
            check_counter = 0;
            if cancelled.is_cancelled() {
                return Err(PuzzleError::Cancelled);
            }
        }
        square_mod(&mut y, modulus);
        current += 1;
    }
    Ok(y)
}
