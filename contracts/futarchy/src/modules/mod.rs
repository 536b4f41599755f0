pub mod admin;
pub mod agreement;
pub mod amm;
pub mod coexec;
pub mod council;
pub mod dao;
pub mod dispatcher;
pub mod escrow;
pub mod events;
pub mod fees;
pub mod lifecycle;
pub mod oracle;
pub mod proposal_fees;
pub mod queue;
pub mod treasury;

use soroban_sdk::Env;

/// Protocol durations are milliseconds; the ledger clock is seconds.
pub fn now_ms(e: &Env) -> u64 {
    e.ledger().timestamp().saturating_mul(1000)
}
