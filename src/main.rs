//! Ledger Crossing - Binary Entry Point
//!
//! Builds a small genesis ledger, runs a direct and a bridged crossing, and
//! prints what happened. Set `RUST_LOG=ledger_crossing=trace` to watch every
//! step.

use std::error::Error;

use tracing_subscriber::{fmt, EnvFilter};

use ledger_crossing::config::LedgerConfig;
use ledger_crossing::ledger::{ledger_data, LedgerDataRequest};
use ledger_crossing::types::{AccountId, Amount, Issue, OfferCreate, Transaction};
use ledger_crossing::{apply, ApplyOutcome, Ledger};

const GATEWAY: AccountId = AccountId(100);
const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);

fn report(label: &str, outcome: &ApplyOutcome) {
    println!("  {}: {} (applied: {})", label, outcome.token(), outcome.applied);
    for fill in &outcome.fills {
        println!(
            "    fill: owner {} seq {} paid {} got {} at {}",
            fill.owner(),
            fill.offer_sequence,
            fill.taker_paid,
            fill.taker_got,
            fill.quality()
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    println!("===========================================");
    println!("  Ledger Crossing - offer crossing demo");
    println!("===========================================");
    println!();

    let config = LedgerConfig::load()?;
    let usd = Issue::issued("USD", GATEWAY).ok_or("bad currency code")?;
    let eur = Issue::issued("EUR", GATEWAY).ok_or("bad currency code")?;

    let mut ledger = Ledger::new(config.ledger_info(1, 0));
    ledger.create_account(GATEWAY, 1_000_000_000)?;
    for account in [ALICE, BOB, CAROL] {
        ledger.create_account(account, 1_000_000_000)?;
        ledger.create_trust_line(account, usd, 1_000_000_000)?;
        ledger.create_trust_line(account, eur, 1_000_000_000)?;
    }
    println!("Genesis: {} entries, root {}", ledger.len(), ledger.state_root_hex()?);
    println!();

    println!("Direct crossing:");
    let fee = config.fees.base_fee;
    let sell = OfferCreate::new(
        Amount::from_decimal(Issue::Native, "100")?,
        Amount::from_decimal(usd, "50")?,
    );
    report("alice offers 50 USD for 100 XRP", &apply(&mut ledger, &Transaction::offer_create(ALICE, 1, fee, sell)));
    let buy = OfferCreate::new(
        Amount::from_decimal(usd, "20")?,
        Amount::from_decimal(Issue::Native, "40")?,
    );
    report("bob buys 20 USD for 40 XRP", &apply(&mut ledger, &Transaction::offer_create(BOB, 1, fee, buy)));
    println!();

    println!("Bridged crossing (EUR -> XRP -> USD):");
    let xrp_for_eur = OfferCreate::new(
        Amount::from_decimal(eur, "10")?,
        Amount::from_decimal(Issue::Native, "30")?,
    );
    report("carol offers 30 XRP for 10 EUR", &apply(&mut ledger, &Transaction::offer_create(CAROL, 1, fee, xrp_for_eur)));
    let usd_for_eur = OfferCreate::new(
        Amount::from_decimal(usd, "10")?,
        Amount::from_decimal(eur, "10")?,
    );
    report("bob buys 10 USD for 10 EUR", &apply(&mut ledger, &Transaction::offer_create(BOB, 2, fee, usd_for_eur)));
    println!();

    let page = ledger_data(&ledger, &LedgerDataRequest { limit: Some(8), ..Default::default() })?;
    println!("Ledger {}: {} entries, root {}", page.ledger_seq, ledger.len(), page.state_root);
    for item in &page.state {
        println!("  {}", item.index);
    }
    if page.marker.is_some() {
        println!("  ...");
    }

    Ok(())
}
