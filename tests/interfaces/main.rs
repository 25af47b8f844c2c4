//! Interface tests for the points ledger using Cucumber.
//!
//! Scenarios exercise the add and spend rules end to end against the
//! allocation engine:
//!
//! ```bash
//! cargo test --test interfaces
//! ```

mod steps;

use cucumber::World;
use steps::ledger::LedgerWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Ledger Interface Tests ===\n");
    LedgerWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/interfaces/features")
        .await;
}
