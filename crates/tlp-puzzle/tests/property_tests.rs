use proptest::prelude::*;
use rug::Integer;
use tlp_puzzle::squaring::repeated_squaring;
use tlp_puzzle::{CancellationToken, ChainedTlp, Gmitlp, Tlp};

const KEYSIZE: u32 = 512;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property test: a single puzzle always yields its message back
    #[test]
    fn prop_tlp_roundtrip(
        seed in any::<u64>(),
        interval in 0u64..=4,
        squarings in 1u64..=8,
        message in prop::collection::vec(any::<u8>(), 0..=256)
    ) {
        let tlp = Tlp::seeded(seed);
        let (pk, sk) = tlp.setup(interval, squarings, KEYSIZE).unwrap();
        let puzzle = tlp.generate(&pk, &sk.a, &message).unwrap();
        prop_assert!(puzzle.encrypted_key < pk.n);
        prop_assert_eq!(tlp.solve(&pk, &puzzle).unwrap(), message);
    }

    /// Property test: chains return every message in index order
    #[test]
    fn prop_chain_order(
        seed in any::<u64>(),
        messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=32), 1..=4)
    ) {
        let gmitlp = Gmitlp::seeded(seed);
        let intervals: Vec<u64> = (0..messages.len() as u64).map(|i| i % 3 + 1).collect();
        let (pk, sk) = gmitlp.setup(&intervals, 1, KEYSIZE).unwrap();
        let (puzzles, digests) = gmitlp.generate(&messages, &pk, &sk).unwrap();

        let solved: Vec<_> = gmitlp.solve(&pk, &puzzles).collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(solved.len(), messages.len());
        for (i, (m, d)) in solved.iter().enumerate() {
            prop_assert_eq!(m, &messages[i]);
            prop_assert!(gmitlp.verify(m, d, &digests[i]).is_ok());
        }
    }

    /// Property test: sequential squaring agrees with exponentiation by 2^t
    #[test]
    fn prop_squaring_matches_pow_mod(
        base in 0u64..=1_000_000,
        t in 0u32..=64,
        modulus in 2u64..=u64::MAX
    ) {
        let base = Integer::from(base);
        let n = Integer::from(modulus);
        let exponent = Integer::from(1) << t;
        let expected = base.clone().pow_mod(&exponent, &n).unwrap();
        let got = repeated_squaring(&base, &Integer::from(t), &n, &CancellationToken::new()).unwrap();
        prop_assert_eq!(got, expected);
    }
}
