//! Shared test concepts.

use concord_engine::{ActionRef, Concept, EngineConfig, SyncEngine};
use concord_foundation::{Error, Fields, Result, fields};

/// A small bookkeeping concept.
///
/// - `open { owner } -> { account }` hands out `acct1`, `acct2`, ...
/// - `note { .. } -> { .. }` echoes its input
/// - `fail` always fails
/// - `_rows { }` returns the configured rows in order
pub struct Ledger {
    next: u32,
    rows: Vec<Fields>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<Fields>) -> Self {
        Self { next: 0, rows }
    }
}

impl Concept for Ledger {
    fn name(&self) -> &'static str {
        "Ledger"
    }

    fn perform(&mut self, action: &str, input: &Fields) -> Result<Fields> {
        match action {
            "open" => {
                input.get_str("owner")?;
                self.next += 1;
                Ok(fields! { "account" => format!("acct{}", self.next) })
            }
            "request" | "note" => Ok(input.clone()),
            "fail" => Err(Error::invalid_argument("refused")),
            _ => Err(Error::unknown_action(self.name(), action)),
        }
    }

    fn query(&self, query: &str, _args: &Fields) -> Result<Vec<Fields>> {
        match query {
            "_rows" => Ok(self.rows.clone()),
            _ => Err(Error::unknown_query(self.name(), query)),
        }
    }
}

pub const REQUEST: ActionRef = ActionRef::new("Ledger", "request");
pub const OPEN: ActionRef = ActionRef::new("Ledger", "open");
pub const NOTE: ActionRef = ActionRef::new("Ledger", "note");
pub const FAIL: ActionRef = ActionRef::new("Ledger", "fail");

pub fn engine_with(ledger: Ledger, config: EngineConfig) -> SyncEngine {
    let engine = SyncEngine::new(config);
    engine.register_concept(ledger).unwrap();
    engine
}

pub fn engine() -> SyncEngine {
    engine_with(Ledger::new(), EngineConfig::new())
}
