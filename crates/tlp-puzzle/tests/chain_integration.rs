use std::sync::Arc;

use rug::Integer;
use tlp_puzzle::primitives::Keccak256Hash;
use tlp_puzzle::{CancellationToken, ChainedTlp, Gctlp, Gmitlp, Mitlp, PuzzleError, Tlp};
use tlp_types::{TlpPublic, decode_puzzles, encode_puzzles};

const KEYSIZE: u32 = 512;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn to_messages(raw: &[&[u8]]) -> Vec<Vec<u8>> {
    raw.iter().map(|m| m.to_vec()).collect()
}

fn assert_chain_roundtrip(chain: &dyn ChainedTlp, raw: &[&[u8]], intervals: &[u64], keysize: u32) {
    let messages = to_messages(raw);
    let (pk, sk) = chain.setup(intervals, 1, keysize).unwrap();
    let (puzzles, digests) = chain.generate(&messages, &pk, &sk).unwrap();
    assert_eq!(puzzles.len(), messages.len());
    assert_eq!(digests.len(), messages.len());

    let solved: Vec<_> = chain.solve(&pk, &puzzles).collect::<Result<_, _>>().unwrap();
    assert_eq!(solved.len(), messages.len());
    for (i, (m, d)) in solved.iter().enumerate() {
        assert_eq!(m, &messages[i], "message {} out of order", i);
        assert_eq!(d, &sk.d[i]);
        chain.verify(m, d, &digests[i]).unwrap();
    }
}

#[test]
fn test_gmitlp_message_sets() {
    init_logger();
    let gmitlp = Gmitlp::seeded(42);
    assert_chain_roundtrip(&gmitlp, &[b""], &[1], KEYSIZE);
    assert_chain_roundtrip(&gmitlp, &[b"test1"], &[1], KEYSIZE);
    assert_chain_roundtrip(&gmitlp, &[b"test1", b"test2"], &[1, 2], KEYSIZE);
    assert_chain_roundtrip(
        &gmitlp,
        &[b"test1", b"test2", b"test3", b"test4"],
        &[1, 2, 1, 2],
        KEYSIZE,
    );
}

#[test]
fn test_gctlp_message_sets() {
    let gctlp = Gctlp::new(Gmitlp::seeded(43), 8).unwrap();
    assert_chain_roundtrip(&gctlp, &[b""], &[1], KEYSIZE);
    assert_chain_roundtrip(
        &gctlp,
        &[b"test1", b"test2", b"test3", b"test4"],
        &[1, 2, 1, 2],
        KEYSIZE,
    );
}

#[test]
fn test_end_to_end_two_messages_1024() {
    init_logger();
    let gmitlp = Gmitlp::seeded(2024);
    let messages = to_messages(&[b"test1", b"test2"]);
    let (pk, sk) = gmitlp.setup(&[1, 2], 1, 1024).unwrap();
    assert_eq!(pk.t, vec![Integer::from(1), Integer::from(2)]);
    assert_eq!(pk.n.significant_bits(), 1024);

    let (puzzles, digests) = gmitlp.generate(&messages, &pk, &sk).unwrap();
    assert_eq!(puzzles.len(), 2);

    let solved: Vec<_> = gmitlp.solve(&pk, &puzzles).collect::<Result<_, _>>().unwrap();
    assert_eq!(
        solved,
        vec![
            (b"test1".to_vec(), sk.d[0].clone()),
            (b"test2".to_vec(), sk.d[1].clone()),
        ]
    );
    for (i, (m, d)) in solved.iter().enumerate() {
        gmitlp.verify(m, d, &digests[i]).unwrap();
    }
}

#[test]
fn test_mitlp_message_sets() {
    let mitlp = Mitlp::seeded(7);
    for raw in [
        vec![&b""[..]],
        vec![&b"test1"[..]],
        vec![&b"test1"[..], &b"test2"[..]],
        vec![&b"test1"[..], &b"test2"[..], &b"test3"[..], &b"test4"[..]],
    ] {
        let messages = to_messages(&raw);
        let (pk, sk) = mitlp.setup(messages.len(), 1, 2, KEYSIZE).unwrap();
        let (puzzles, digests) = mitlp.generate(&messages, &pk, &sk).unwrap();
        let solved: Vec<_> = mitlp.solve(&pk, &puzzles).collect::<Result<_, _>>().unwrap();
        for (i, (m, d)) in solved.iter().enumerate() {
            assert_eq!(m, &messages[i]);
            mitlp.verify(m, d, &digests[i]).unwrap();
        }
    }
}

#[test]
fn test_cannot_skip_ahead() {
    let gmitlp = Gmitlp::seeded(11);
    let messages = to_messages(&[b"first", b"second", b"third"]);
    let (pk, sk) = gmitlp.setup(&[1, 1, 1], 3, KEYSIZE).unwrap();
    let (puzzles, _) = gmitlp.generate(&messages, &pk, &sk).unwrap();

    // The only public base is r0; it does not open puzzle 1.
    let shortcut = TlpPublic {
        n: pk.n.clone(),
        t: pk.t[1].clone(),
        r: pk.r0.clone(),
    };
    assert!(gmitlp.tlp().solve(&shortcut, &puzzles[1]).is_err());

    // Dropping the first puzzle shifts every base by one.
    let mut shifted = pk.clone();
    shifted.t.remove(0);
    let mut iter = gmitlp.solve(&shifted, &puzzles[1..]);
    assert!(iter.next().unwrap().is_err());
    assert!(iter.next().is_none());
}

#[test]
fn test_partial_consumption() {
    let gmitlp = Gmitlp::seeded(12);
    let messages = to_messages(&[b"one", b"two", b"three"]);
    let (pk, sk) = gmitlp.setup(&[1, 1, 1], 2, KEYSIZE).unwrap();
    let (puzzles, _) = gmitlp.generate(&messages, &pk, &sk).unwrap();

    let mut iter = gmitlp.solve(&pk, &puzzles);
    let (first, _) = iter.next().unwrap().unwrap();
    assert_eq!(first, b"one");
    drop(iter);

    // A fresh solve restarts from puzzle 0.
    let firsts: Vec<_> = gmitlp
        .solve(&pk, &puzzles)
        .take(2)
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(firsts, vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn test_verify_rejects_tampering() {
    let gmitlp = Gmitlp::seeded(13);
    let messages = to_messages(&[b"test1", b"test2"]);
    let (pk, sk) = gmitlp.setup(&[1, 2], 1, KEYSIZE).unwrap();
    let (puzzles, digests) = gmitlp.generate(&messages, &pk, &sk).unwrap();
    let solved: Vec<_> = gmitlp.solve(&pk, &puzzles).collect::<Result<_, _>>().unwrap();

    for (i, (m, d)) in solved.iter().enumerate() {
        for bit in 0..8 {
            let mut bad_m = m.clone();
            bad_m[0] ^= 1 << bit;
            assert!(matches!(
                gmitlp.verify(&bad_m, d, &digests[i]),
                Err(PuzzleError::CommitmentMismatch)
            ));

            let mut bad_d = d.clone();
            bad_d[bit] ^= 0x80;
            assert!(gmitlp.verify(m, &bad_d, &digests[i]).is_err());
        }
        // Commitments are not interchangeable between indices.
        assert!(gmitlp.verify(m, d, &digests[1 - i]).is_err());
    }
}

#[test]
fn test_tampered_puzzle_stops_chain() {
    let gmitlp = Gmitlp::seeded(14);
    let messages = to_messages(&[b"a", b"b", b"c"]);
    let (pk, sk) = gmitlp.setup(&[1, 1, 1], 1, KEYSIZE).unwrap();
    let (mut puzzles, _) = gmitlp.generate(&messages, &pk, &sk).unwrap();
    let last = puzzles[1].encrypted_message.len() - 1;
    puzzles[1].encrypted_message[last] ^= 0x01;

    let results: Vec<_> = gmitlp.solve(&pk, &puzzles).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(PuzzleError::Decryption)));
}

#[test]
fn test_cancellation_forfeits_chain() {
    let gmitlp = Gmitlp::seeded(15);
    let messages = to_messages(&[b"slow", b"slower"]);
    let (pk, sk) = gmitlp.setup(&[1, 1], 1_000_000, KEYSIZE).unwrap();
    let (puzzles, _) = gmitlp.generate(&messages, &pk, &sk).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let mut iter = gmitlp.solve_with_cancellation(&pk, &puzzles, token);
    assert!(matches!(iter.next(), Some(Err(PuzzleError::Cancelled))));
    assert!(iter.next().is_none());
}

#[test]
fn test_gctlp_puzzles_solve_with_gmitlp() {
    let gctlp = Gctlp::new(Gmitlp::seeded(16), 2).unwrap();
    let messages = to_messages(&[b"x", b"y", b"z"]);
    let (pk, sk) = gctlp.setup(&[2, 1, 3], 1, KEYSIZE).unwrap();
    let (puzzles, _) = gctlp.generate(&messages, &pk, &sk).unwrap();

    let plain = Gmitlp::seeded(99);
    let solved: Vec<_> = plain
        .solve(&pk, &puzzles)
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(solved, messages);
}

#[test]
fn test_puzzles_survive_transport() {
    let gmitlp = Gmitlp::seeded(17);
    let messages = to_messages(&[b"over", b"the", b"wire"]);
    let (pk, sk) = gmitlp.setup(&[1, 2, 3], 1, KEYSIZE).unwrap();
    let (puzzles, _) = gmitlp.generate(&messages, &pk, &sk).unwrap();

    let received = decode_puzzles(&encode_puzzles(&puzzles)).unwrap();
    let pk_received = tlp_types::GmitlpPublic::from_rlp_bytes(&pk.to_rlp_bytes()).unwrap();
    let solved: Vec<_> = gmitlp
        .solve(&pk_received, &received)
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(solved, messages);
}

#[test]
fn test_keccak_commitments() {
    let gmitlp = Gmitlp::new(Tlp::seeded(18), Arc::new(Keccak256Hash));
    let messages = to_messages(&[b"ledger", b"friendly"]);
    let (pk, sk) = gmitlp.setup(&[1, 1], 1, KEYSIZE).unwrap();
    assert_eq!(pk.aux.hash_name, "KECCAK256");
    let (puzzles, digests) = gmitlp.generate(&messages, &pk, &sk).unwrap();
    assert!(digests.iter().all(|d| d.len() == 32));
    for (i, pair) in gmitlp.solve(&pk, &puzzles).enumerate() {
        let (m, d) = pair.unwrap();
        gmitlp.verify(&m, &d, &digests[i]).unwrap();
    }
}
