use soroban_sdk::{symbol_short, Address, BytesN, Env, String};

/// Standardized event emission.
///
/// Topic layout:
/// - Topic 0: event name (short symbol, max 9 chars)
/// - Topic 1: primary identifier (dao_id or proposal_id)
/// - Topic 2: triggering address, where one exists
///
/// Indexers can reconstruct DAO and market state by following this schema.

/// Topics: [dao_creat, dao_id, creator]
/// Data: (asset_token, stable_token)
pub fn emit_dao_created(e: &Env, dao_id: u64, creator: Address, asset: Address, stable: Address) {
    e.events()
        .publish((symbol_short!("dao_creat"), dao_id, creator), (asset, stable));
}

/// Topics: [prop_sub, proposal_id, proposer]
/// Data: (dao_id, fee, uses_dao_liquidity, queued)
pub fn emit_proposal_submitted(
    e: &Env,
    proposal_id: u64,
    proposer: Address,
    dao_id: u64,
    fee: i128,
    uses_dao_liquidity: bool,
    queued: bool,
) {
    e.events().publish(
        (symbol_short!("prop_sub"), proposal_id, proposer),
        (dao_id, fee, uses_dao_liquidity, queued),
    );
}

/// Topics: [prop_act, proposal_id, activator]
/// Data: (reward)
pub fn emit_proposal_activated(e: &Env, proposal_id: u64, activator: Address, reward: i128) {
    e.events()
        .publish((symbol_short!("prop_act"), proposal_id, activator), reward);
}

/// Topics: [mkt_init, proposal_id]
/// Data: (asset_per_outcome, stable_per_outcome, outcome_count)
pub fn emit_market_initialized(
    e: &Env,
    proposal_id: u64,
    asset_per_outcome: i128,
    stable_per_outcome: i128,
    outcome_count: u32,
) {
    e.events().publish(
        (symbol_short!("mkt_init"), proposal_id),
        (asset_per_outcome, stable_per_outcome, outcome_count),
    );
}

/// Topics: [stage_adv, proposal_id]
/// Data: (new_state_tag)
pub fn emit_stage_advanced(e: &Env, proposal_id: u64, new_state: u32) {
    e.events()
        .publish((symbol_short!("stage_adv"), proposal_id), new_state);
}

/// Topics: [finalized, proposal_id]
/// Data: (winning_outcome)
pub fn emit_finalized(e: &Env, proposal_id: u64, winning_outcome: u32) {
    e.events()
        .publish((symbol_short!("finalized"), proposal_id), winning_outcome);
}

/// Topics: [res_sign, proposal_id, signer]
/// Data: (winning_outcome, result)
pub fn emit_result_signed(
    e: &Env,
    proposal_id: u64,
    signer: Address,
    winning_outcome: u32,
    result: String,
) {
    e.events().publish(
        (symbol_short!("res_sign"), proposal_id, signer),
        (winning_outcome, result),
    );
}

/// Topics: [prop_exec, proposal_id]
/// Data: (winning_outcome, action_count)
pub fn emit_proposal_executed(e: &Env, proposal_id: u64, winning_outcome: u32, action_count: u32) {
    e.events().publish(
        (symbol_short!("prop_exec"), proposal_id),
        (winning_outcome, action_count),
    );
}

/// Topics: [swap, proposal_id, trader]
/// Data: (outcome, amount_in, amount_out, asset_to_stable)
pub fn emit_swap(
    e: &Env,
    proposal_id: u64,
    trader: Address,
    outcome: u32,
    amount_in: i128,
    amount_out: i128,
    asset_to_stable: bool,
) {
    e.events().publish(
        (symbol_short!("swap"), proposal_id, trader),
        (outcome, amount_in, amount_out, asset_to_stable),
    );
}

/// Topics: [prop_evic, proposal_id]
/// Data: (fee_slashed)
pub fn emit_proposal_evicted(e: &Env, proposal_id: u64, fee_slashed: i128) {
    e.events()
        .publish((symbol_short!("prop_evic"), proposal_id), fee_slashed);
}

/// Topics: [bondslash, proposal_id]
/// Data: (amount, to_treasury)
pub fn emit_bond_slashed(e: &Env, proposal_id: u64, amount: i128, to_treasury: bool) {
    e.events()
        .publish((symbol_short!("bondslash"), proposal_id), (amount, to_treasury));
}

/// Topics: [fee_colct, dao_id]
/// Data: (amount, months)
pub fn emit_recurring_fee_collected(e: &Env, dao_id: u64, amount: i128, months: u64) {
    e.events()
        .publish((symbol_short!("fee_colct"), dao_id), (amount, months));
}

/// Topics: [fee_pause, dao_id]
/// Data: (amount_due)
pub fn emit_proposals_paused_unpaid_fees(e: &Env, dao_id: u64, amount_due: i128) {
    e.events()
        .publish((symbol_short!("fee_pause"), dao_id), amount_due);
}

/// Topics: [fee_unpse, dao_id]
pub fn emit_proposals_unpaused(e: &Env, dao_id: u64) {
    e.events().publish((symbol_short!("fee_unpse"), dao_id), ());
}

/// Topics: [fee_pend, 0]
/// Data: (new_fee, effective_ms)
pub fn emit_fee_update_scheduled(e: &Env, new_fee: i128, effective_ms: u64) {
    e.events()
        .publish((symbol_short!("fee_pend"), 0u64), (new_fee, effective_ms));
}

/// Topics: [coexec, dao_id, council]
/// Data: (kind_tag)
pub fn emit_coexecution(e: &Env, dao_id: u64, council_id: u64, kind: u32) {
    e.events()
        .publish((symbol_short!("coexec"), dao_id, council_id), kind);
}

/// Topics: [oa_batch, dao_id]
/// Data: (digest, edit_count)
pub fn emit_oa_batch_applied(e: &Env, dao_id: u64, digest: BytesN<32>, edit_count: u32) {
    e.events()
        .publish((symbol_short!("oa_batch"), dao_id), (digest, edit_count));
}

/// Topics: [dissolve, dao_id]
/// Data: (full)
pub fn emit_dissolution(e: &Env, dao_id: u64, full: bool) {
    e.events().publish((symbol_short!("dissolve"), dao_id), full);
}

/// Topics: [strm_new, stream_id, recipient]
/// Data: (dao_id, amount_per_epoch, num_epochs)
pub fn emit_stream_created(
    e: &Env,
    stream_id: u64,
    recipient: Address,
    dao_id: u64,
    amount_per_epoch: i128,
    num_epochs: u32,
) {
    e.events().publish(
        (symbol_short!("strm_new"), stream_id, recipient),
        (dao_id, amount_per_epoch, num_epochs),
    );
}

/// Topics: [strm_cncl, stream_id]
/// Data: (refunded)
pub fn emit_stream_cancelled(e: &Env, stream_id: u64, refunded: i128) {
    e.events()
        .publish((symbol_short!("strm_cncl"), stream_id), refunded);
}
