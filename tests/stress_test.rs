//! Stress tests for the offer-crossing engine.
//!
//! These tests verify:
//! 1. The engine stays stable under a long random transaction stream
//! 2. Determinism is preserved across runs
//! 3. Owner bookkeeping stays consistent with the directories
//!
//! ## Running Stress Tests
//!
//! ```bash
//! # Run all stress tests (release mode recommended)
//! cargo test --release --test stress_test -- --nocapture
//!
//! # Run specific test
//! cargo test --release --test stress_test stress_random_stream -- --nocapture
//! ```

use std::time::Instant;

use ledger_crossing::config::LedgerConfig;
use ledger_crossing::ledger::{dir_entries, read_account, Ledger};
use ledger_crossing::types::{keylet, AccountId, Amount, Issue, OfferCreate, Transaction};
use ledger_crossing::{apply, Malformed, TxError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Transactions in the main stress run
const STRESS_TX_COUNT: usize = 20_000;

/// Funded trading accounts
const TRADER_COUNT: u64 = 50;

const GATEWAY: AccountId = AccountId(1_000);
const FEE: u64 = 10;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn usd() -> Issue {
    Issue::issued("USD", GATEWAY).unwrap()
}

fn eur() -> Issue {
    Issue::issued("EUR", GATEWAY).unwrap()
}

fn traders() -> impl Iterator<Item = AccountId> {
    (1..=TRADER_COUNT).map(AccountId)
}

fn genesis() -> Ledger {
    let config = LedgerConfig::default();
    let mut ledger = Ledger::with_capacity(config.ledger_info(1, 0), 4_096);
    ledger.create_account(GATEWAY, 100_000_000_000).unwrap();
    for id in traders() {
        ledger.create_account(id, 100_000_000_000).unwrap();
        ledger.create_trust_line(id, usd(), 10_000_000).unwrap();
        ledger.create_trust_line(id, eur(), 10_000_000).unwrap();
    }
    ledger
}

/// Generate one random transaction against the current ledger.
///
/// Uses a seeded RNG for reproducibility. Same seed = same stream.
/// Offers trade USD/XRP and EUR/XRP around fixed mid prices, plus direct
/// USD/EUR offers so bridging competes with the direct book.
fn next_transaction(rng: &mut ChaCha8Rng, ledger: &Ledger) -> Transaction {
    let account = AccountId(rng.gen_range(1..=TRADER_COUNT));
    let sequence = read_account(ledger, account).unwrap().sequence;

    if sequence > 1 && rng.gen_bool(0.2) {
        let target = rng.gen_range(1..sequence);
        return Transaction::offer_cancel(account, sequence, FEE, target);
    }

    let (a, b, mid) = match rng.gen_range(0..3) {
        0 => (usd(), Issue::Native, 2_000i64),
        1 => (eur(), Issue::Native, 2_200i64),
        _ => (usd(), eur(), 1_000i64),
    };
    let (pays_issue, gets_issue) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };

    // +-5% around mid, 1000 units of the first asset per `mid` of the second
    let quantity = rng.gen_range(1..=500i64);
    let spread = rng.gen_range(-50..=50i64);
    let counter = (quantity * (mid + mid * spread / 1_000)).div_euclid(1_000).max(1);
    let (pays, gets) = if pays_issue == a {
        (Amount::new(pays_issue, quantity), Amount::new(gets_issue, counter))
    } else {
        (Amount::new(pays_issue, counter), Amount::new(gets_issue, quantity))
    };

    let mut create = OfferCreate::new(pays, gets);
    if rng.gen_bool(0.05) {
        create = create.with_flags(ledger_crossing::types::TF_IMMEDIATE_OR_CANCEL);
    }
    Transaction::offer_create(account, sequence, FEE, create)
}

struct RunStats {
    fills: usize,
    failures: usize,
}

fn run_stream(ledger: &mut Ledger, seed: u64, count: usize) -> RunStats {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stats = RunStats { fills: 0, failures: 0 };
    for _ in 0..count {
        let tx = next_transaction(&mut rng, ledger);
        let outcome = apply(ledger, &tx);
        assert!(
            !matches!(outcome.result, Err(TxError::Internal(_)) | Err(TxError::Malformed(Malformed::BadOffer))),
            "unexpected {} for {:?}",
            outcome.token(),
            tx
        );
        assert!(outcome.applied, "{} not applied: {}", tx.account, outcome.token());
        if outcome.result.is_err() {
            stats.failures += 1;
        }
        stats.fills += outcome.fills.len();
    }
    stats
}

/// Run a deterministic stream and return the final state root.
fn run_deterministic_sequence(seed: u64, count: usize) -> [u8; 32] {
    let mut ledger = genesis();
    run_stream(&mut ledger, seed, count);
    ledger.state_root().unwrap()
}

fn assert_owner_bookkeeping(ledger: &Ledger) {
    for id in traders() {
        let root = read_account(ledger, id).unwrap();
        let owned = dir_entries(ledger, &keylet::owner_dir(id)).unwrap();
        assert_eq!(root.owner_count as usize, owned.len(), "owner count of {}", id);
    }
}

// ============================================================================
// STRESS TESTS
// ============================================================================

/// Main stress test: a long random stream of creates and cancels.
///
/// # Verification
/// - Every transaction is applied and none hits an internal error
/// - Some crossing occurred
/// - Owner counts equal owner directory sizes at the end
#[test]
fn stress_random_stream() {
    println!("\n=== STRESS TEST: {} Transactions ===\n", STRESS_TX_COUNT);

    let mut ledger = genesis();
    let start = Instant::now();
    let stats = run_stream(&mut ledger, 42, STRESS_TX_COUNT);
    let elapsed = start.elapsed();
    let throughput = STRESS_TX_COUNT as f64 / elapsed.as_secs_f64();

    println!("  Transactions:      {:>12}", STRESS_TX_COUNT);
    println!("  Fills:             {:>12}", stats.fills);
    println!("  Claimed failures:  {:>12}", stats.failures);
    println!("  Ledger entries:    {:>12}", ledger.len());
    println!("  Elapsed time:      {:>12.2?}", elapsed);
    println!("  Throughput:        {:>12.0} tx/sec", throughput);
    println!("  State root:        {}", ledger.state_root_hex().unwrap());

    assert!(stats.fills > 0, "Expected some crossing to occur");
    assert_owner_bookkeeping(&ledger);

    println!("\n=== STRESS TEST PASSED ===\n");
}

/// Verify determinism: Same stream produces identical state root.
#[test]
fn verify_determinism() {
    const TEST_COUNT: usize = 3_000;
    const SEED: u64 = 12345;

    let root1 = run_deterministic_sequence(SEED, TEST_COUNT);
    let root2 = run_deterministic_sequence(SEED, TEST_COUNT);
    println!("  Run 1 state root: {}", hex::encode(root1));
    println!("  Run 2 state root: {}", hex::encode(root2));
    assert_eq!(root1, root2, "State roots must match for determinism");

    let root3 = run_deterministic_sequence(SEED + 1, TEST_COUNT);
    println!("  Different seed:   {}", hex::encode(root3));
    assert_ne!(root1, root3, "Different seeds should produce different roots");
}

/// Books drain: once every trader cancels everything, no offer remains.
#[test]
fn stress_cancel_everything() {
    let mut ledger = genesis();
    run_stream(&mut ledger, 7, 2_000);

    for id in traders() {
        for key in dir_entries(&ledger, &keylet::owner_dir(id)).unwrap() {
            let offer = ledger_crossing::ledger::read_offer(&ledger, &key).unwrap().unwrap();
            let sequence = read_account(&ledger, id).unwrap().sequence;
            let tx = Transaction::offer_cancel(id, sequence, FEE, offer.sequence);
            assert_eq!(apply(&mut ledger, &tx).token(), "tesSUCCESS");
        }
        assert_eq!(read_account(&ledger, id).unwrap().owner_count, 0);
    }

    let offers = ledger.iter().filter(|(_, e)| e.as_offer().is_some()).count();
    let directories = ledger.iter().filter(|(_, e)| e.as_directory().is_some()).count();
    assert_eq!(offers, 0);
    assert_eq!(directories, 0, "empty directories must be removed");
}
