/// Length of every commitment nonce `d_i`, in bytes (128 bits).
pub const COMMITMENT_LENGTH: usize = 16;

pub const MIN_KEYSIZE: u32 = 512;
pub const DEFAULT_KEYSIZE: u32 = 2048;
pub const DEFAULT_WORKERS: usize = 8;

/// Assumed best squaring rate of any solver, per modulus size (bits, squarings per second).
pub const SQUARINGS_PER_SEC_UPPER_BOUND: &[(u32, u64)] = &[
    (1024, 5_600_000),
    (2048, 1_900_000),
    (3072, 950_000),
    (4096, 560_000),
];

pub fn squarings_upper_bound(keysize: u32) -> Option<u64> {
    SQUARINGS_PER_SEC_UPPER_BOUND
        .iter()
        .find(|(bits, _)| *bits == keysize)
        .map(|(_, rate)| *rate)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleConfig {
    pub keysize: u32,
    pub workers: usize,
}

impl PuzzleConfig {
    pub fn new(keysize: u32, workers: usize) -> Self {
        Self { keysize, workers }
    }

    pub fn get_default() -> Self {
        Self {
            keysize: DEFAULT_KEYSIZE,
            workers: DEFAULT_WORKERS,
        }
    }

    pub fn squarings_upper_bound(&self) -> Option<u64> {
        squarings_upper_bound(self.keysize)
    }
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self::get_default()
    }
}
