//! Ledger interface step definitions.

use chrono::{DateTime, Utc};
use cucumber::gherkin::Step;
use cucumber::{given, then, when, World};
use points_ledger::{
    AllocationEngine, DebitRecord, LedgerError, Points, SpendPolicy, Timestamp, Transaction,
};

/// Test context for ledger scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct LedgerWorld {
    engine: AllocationEngine,
    last_debits: Vec<DebitRecord>,
    last_error: Option<LedgerError>,
    total_before: Points,
}

impl LedgerWorld {
    fn new() -> Self {
        Self {
            engine: AllocationEngine::default(),
            last_debits: Vec::new(),
            last_error: None,
            total_before: 0,
        }
    }

    fn record<T>(&mut self, result: Result<T, LedgerError>) {
        self.last_error = result.err();
    }

    fn report(&mut self, payer: String, points: Points, timestamp: &str) {
        let transaction = Transaction::new(payer, points, parse_timestamp(timestamp));
        let result = self.engine.add(transaction);
        self.record(result);
    }

    fn report_batch(&mut self, step: &Step) {
        let table = step.table.as_ref().expect("transaction table");
        let transactions: Vec<Transaction> = table
            .rows
            .iter()
            .skip(1)
            .map(|row| {
                Transaction::new(
                    row[0].clone(),
                    row[1].parse().expect("points column"),
                    parse_timestamp(&row[2]),
                )
            })
            .collect();
        let result = self.engine.add_multiple(transactions);
        self.record(result);
    }
}

fn parse_timestamp(value: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|e| panic!("bad timestamp {value}: {e}"))
        .with_timezone(&Utc)
}

// --- Given steps ---

#[given("an empty points ledger")]
async fn given_empty_ledger(world: &mut LedgerWorld) {
    world.engine = AllocationEngine::default();
}

#[given("an empty points ledger that refuses short spends")]
async fn given_all_or_nothing_ledger(world: &mut LedgerWorld) {
    world.engine = AllocationEngine::new(SpendPolicy::AllOrNothing);
}

#[given(expr = "{string} reported {int} points at {string}")]
async fn given_payer_reported(
    world: &mut LedgerWorld,
    payer: String,
    points: Points,
    timestamp: String,
) {
    world.report(payer, points, &timestamp);
}

#[given("these transactions were reported:")]
async fn given_transactions_reported(world: &mut LedgerWorld, step: &Step) {
    world.report_batch(step);
}

// --- When steps ---

#[when(expr = "{string} reports {int} points at {string}")]
async fn when_payer_reports(
    world: &mut LedgerWorld,
    payer: String,
    points: Points,
    timestamp: String,
) {
    world.report(payer, points, &timestamp);
}

#[when("these transactions are reported:")]
async fn when_transactions_reported(world: &mut LedgerWorld, step: &Step) {
    world.report_batch(step);
}

#[when("an empty batch is reported")]
async fn when_empty_batch(world: &mut LedgerWorld) {
    let result = world.engine.add_multiple(Vec::new());
    world.record(result);
}

#[when(expr = "I spend {int} points")]
async fn when_spend(world: &mut LedgerWorld, points: Points) {
    world.total_before = world.engine.store().total_balance();
    match world.engine.spend(points) {
        Ok(debits) => {
            world.last_debits = debits;
            world.last_error = None;
        }
        Err(err) => {
            world.last_debits = match &err {
                LedgerError::InsufficientBalance { debits, .. } => debits.clone(),
                _ => Vec::new(),
            };
            world.last_error = Some(err);
        }
    }
}

// --- Then steps ---

#[then("the request succeeds")]
async fn then_succeeds(world: &mut LedgerWorld) {
    assert!(
        world.last_error.is_none(),
        "unexpected error: {:?}",
        world.last_error
    );
}

#[then("the transaction is rejected as invalid")]
async fn then_invalid_transaction(world: &mut LedgerWorld) {
    assert!(
        matches!(world.last_error, Some(LedgerError::InvalidTransaction(_))),
        "expected invalid transaction, got {:?}",
        world.last_error
    );
}

#[then("the spend is rejected as invalid")]
async fn then_invalid_spend(world: &mut LedgerWorld) {
    assert!(
        matches!(world.last_error, Some(LedgerError::InvalidSpend(_))),
        "expected invalid spend, got {:?}",
        world.last_error
    );
}

#[then(expr = "the spend is short by {int} points")]
async fn then_short_by(world: &mut LedgerWorld, expected: Points) {
    match &world.last_error {
        Some(LedgerError::InsufficientBalance { shortfall, .. }) => {
            assert_eq!(*shortfall, expected)
        }
        other => panic!("expected insufficient balance, got {other:?}"),
    }
}

#[then("the spend draws nothing")]
async fn then_draws_nothing(world: &mut LedgerWorld) {
    assert!(
        world.last_debits.is_empty(),
        "unexpected debits: {:?}",
        world.last_debits
    );
}

#[then("the spend draws:")]
async fn then_spend_draws(world: &mut LedgerWorld, step: &Step) {
    let table = step.table.as_ref().expect("debit table");
    let expected: Vec<DebitRecord> = table
        .rows
        .iter()
        .skip(1)
        .map(|row| DebitRecord {
            payer: row[0].clone(),
            points: row[1].parse().expect("points column"),
            timestamp: parse_timestamp(&row[2]),
        })
        .collect();
    assert_eq!(world.last_debits, expected);
}

#[then(expr = "the total balance drops by {int}")]
async fn then_total_drops(world: &mut LedgerWorld, amount: Points) {
    assert_eq!(
        world.engine.store().total_balance(),
        world.total_before - amount
    );
}

#[then(expr = "the total balance is {int}")]
async fn then_total_is(world: &mut LedgerWorld, expected: Points) {
    assert_eq!(world.engine.store().total_balance(), expected);
}

#[then(expr = "{string} has a balance of {int}")]
async fn then_payer_balance(world: &mut LedgerWorld, payer: String, expected: Points) {
    assert_eq!(world.engine.store().balance(&payer), Some(expected));
}

#[then(expr = "{string} has {int} ledger entries")]
async fn then_entry_count(world: &mut LedgerWorld, payer: String, expected: usize) {
    let entries = world.engine.store().entries(&payer).expect("known payer");
    assert_eq!(entries.len(), expected, "entries: {entries:?}");
}

#[then(expr = "the head entry of {string} holds {int} points at {string}")]
async fn then_head_entry(world: &mut LedgerWorld, payer: String, points: Points, timestamp: String) {
    let entries = world.engine.store().entries(&payer).expect("known payer");
    let head = entries.first().expect("non-empty ledger");
    assert_eq!(head.points, points);
    assert_eq!(head.timestamp, parse_timestamp(&timestamp));
}

#[then("every ledger upholds its invariants")]
async fn then_invariants(world: &mut LedgerWorld) {
    let store = world.engine.store();
    for payer in store.payers() {
        let ledger = store.ledger(payer).expect("payer has a ledger");
        assert_eq!(store.balance(payer), Some(ledger.sum()), "balance drift for {payer}");

        let entries: Vec<_> = ledger.iter().collect();
        let non_positive: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.points <= 0)
            .map(|(i, _)| i)
            .collect();
        assert!(non_positive.len() <= 1, "{payer}: {entries:?}");
        assert!(non_positive.iter().all(|i| *i == 0), "{payer}: {entries:?}");
    }
}
