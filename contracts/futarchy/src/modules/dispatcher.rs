use crate::errors::ErrorCode;
use crate::modules::{coexec, dao, events, lifecycle, treasury};
use crate::types::{Action, Dao, OperationalState, ProposalState};
use soroban_sdk::{contracttype, Address, Env, Vec};

#[contracttype]
pub enum DataKey {
    /// (proposal_id, outcome) -> action sequence
    Actions(u64, u32),
    /// proposal_id -> terminal replay shield
    Executed(u64),
}

/// One-shot witness tying an execution to a finalized proposal. Not a
/// contract type: it exists only inside the executing invocation.
pub struct ProposalExecutionContext {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub winning_outcome: u32,
}

/// Register the action sequence for one outcome. Proposer-only, and only
/// while the market has not finalized.
pub fn register_actions(
    e: &Env,
    proposal_id: u64,
    caller: Address,
    outcome: u32,
    actions: Vec<Action>,
) -> Result<(), ErrorCode> {
    caller.require_auth();
    let proposal = lifecycle::get_proposal(e, proposal_id)?;
    if caller != proposal.proposer {
        return Err(ErrorCode::NotAuthorized);
    }
    if proposal.state == ProposalState::Finalized {
        return Err(ErrorCode::AlreadyFinalized);
    }
    if outcome >= proposal.outcome_count {
        return Err(ErrorCode::OutcomeOutOfRange);
    }
    e.storage()
        .persistent()
        .set(&DataKey::Actions(proposal_id, outcome), &actions);
    Ok(())
}

/// Sequences are readable once the market has finalized.
pub fn get_actions(e: &Env, proposal_id: u64, outcome: u32) -> Result<Vec<Action>, ErrorCode> {
    let proposal = lifecycle::get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Finalized {
        return Err(ErrorCode::MarketNotFinalized);
    }
    e.storage()
        .persistent()
        .get(&DataKey::Actions(proposal_id, outcome))
        .ok_or(ErrorCode::NoIntentKey)
}

/// Recoverable readiness probe: whether the winning sequence can run
/// now, and if not, the timestamp the caller should retry after (zero
/// when execution is spent or impossible).
pub fn can_execute(e: &Env, proposal_id: u64) -> (bool, u64) {
    let proposal = match lifecycle::get_proposal(e, proposal_id) {
        Ok(p) => p,
        Err(_) => return (false, 0),
    };
    if is_executed(e, proposal_id) {
        return (false, 0);
    }
    if proposal.state != ProposalState::Finalized {
        let retry_at = match (proposal.trading_start_ms, proposal.market_init_ms) {
            (Some(start), _) => start + proposal.trading_period_ms,
            (None, Some(init)) => init + proposal.review_period_ms + proposal.trading_period_ms,
            (None, None) => 0,
        };
        return (false, retry_at);
    }
    (true, 0)
}

pub fn is_executed(e: &Env, proposal_id: u64) -> bool {
    e.storage()
        .persistent()
        .get(&DataKey::Executed(proposal_id))
        .unwrap_or(false)
}

fn mark_executed(e: &Env, proposal_id: u64) {
    e.storage()
        .persistent()
        .set(&DataKey::Executed(proposal_id), &true);
}

/// Run the winning outcome's action sequence. A Reject win is advisory:
/// nothing executes beyond the replay shield. Any failing action aborts
/// the whole sequence; the shield is only set after the last one.
pub fn execute(e: &Env, proposal_id: u64) -> Result<u32, ErrorCode> {
    let proposal = lifecycle::get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Finalized {
        return Err(ErrorCode::MarketNotFinalized);
    }
    if is_executed(e, proposal_id) {
        return Err(ErrorCode::AlreadyFinalized);
    }
    let winning_outcome = proposal.winning_outcome.ok_or(ErrorCode::MarketNotFinalized)?;

    let context = ProposalExecutionContext {
        proposal_id,
        dao_id: proposal.dao_id,
        winning_outcome,
    };

    let mut executed_count: u32 = 0;
    if context.winning_outcome != 0 {
        let actions: Vec<Action> = e
            .storage()
            .persistent()
            .get(&DataKey::Actions(proposal_id, context.winning_outcome))
            .ok_or(ErrorCode::NoIntentKey)?;
        for action in actions.iter() {
            dispatch(e, &context, &action)?;
            executed_count += 1;
        }
    }

    mark_executed(e, context.proposal_id);
    let mut info = lifecycle::get_info(e, proposal_id)?;
    info.executed = true;
    lifecycle::update_info(e, &info);

    events::emit_proposal_executed(e, proposal_id, context.winning_outcome, executed_count);
    Ok(executed_count)
}

fn is_dissolution_action(action: &Action) -> bool {
    matches!(
        action,
        Action::PartialDissolution(_) | Action::FullDissolution(_) | Action::CancelDissolution(_)
    )
}

fn dispatch(e: &Env, context: &ProposalExecutionContext, action: &Action) -> Result<(), ErrorCode> {
    let dao = dao::get_dao(e, context.dao_id)?;
    if dao.operational_state == OperationalState::Dissolving && !is_dissolution_action(action) {
        return Err(ErrorCode::InvalidState);
    }

    match action {
        Action::Transfer(transfer) => {
            treasury::withdraw(e, dao.id, &transfer.token, &transfer.recipient, transfer.amount)
        }
        Action::Mint(mint) => {
            if mint.amount <= 0 {
                return Err(ErrorCode::InvalidAmount);
            }
            treasury::credit(e, dao.id, &dao.asset_token, mint.amount);
            Ok(())
        }
        Action::Burn(burn) => {
            if burn.amount <= 0 {
                return Err(ErrorCode::InvalidAmount);
            }
            treasury::debit(e, dao.id, &dao.asset_token, burn.amount)
        }
        Action::RecurringPayment(payment) => {
            check_coin(&dao, &payment.token)?;
            treasury::create_stream(
                e,
                dao.id,
                payment.recipient.clone(),
                payment.token.clone(),
                payment.amount_per_epoch,
                payment.num_epochs,
                payment.epoch_duration_ms,
                payment.cancellable,
            )
            .map(|_| ())
        }
        Action::CancelStream(cancel) => {
            treasury::cancel_stream(e, dao.id, cancel.stream_id).map(|_| ())
        }
        Action::TradingParamsUpdate(update) => {
            dao::set_trading_params(e, dao.id, update.params.clone())
        }
        Action::TwapConfigUpdate(update) => dao::set_twap_config(e, dao.id, update.twap.clone()),
        Action::GovernanceUpdate(update) => {
            dao::set_governance(e, dao.id, update.governance.clone())
        }
        Action::MetadataUpdate(update) => dao::set_metadata(e, dao.id, update.metadata.clone()),
        Action::MetadataTableUpdate(update) => {
            dao::set_metadata_entry(e, dao.id, update.key.clone(), update.value.clone());
            Ok(())
        }
        Action::QueueParamsUpdate(update) => dao::set_queue_params(
            e,
            dao.id,
            update.max_concurrent_proposals,
            update.max_proposer_funded,
        ),
        Action::PartialDissolution(dissolution) => {
            check_coin(&dao, &dissolution.token)?;
            treasury::withdraw(
                e,
                dao.id,
                &dissolution.token,
                &dissolution.recipient,
                dissolution.amount,
            )?;
            events::emit_dissolution(e, dao.id, false);
            Ok(())
        }
        Action::FullDissolution(dissolution) => {
            // Pull market liquidity back first, then sweep both coin
            // types to the recipient.
            let pool = treasury::liquidity(e, dao.id);
            if pool.asset > 0 || pool.stable > 0 {
                treasury::remove_liquidity_to_treasury(e, dao.id, pool.asset, pool.stable)?;
            }
            let asset_balance = treasury::balance(e, dao.id, &dao.asset_token);
            if asset_balance > 0 {
                treasury::withdraw(e, dao.id, &dao.asset_token, &dissolution.recipient, asset_balance)?;
            }
            let stable_balance = treasury::balance(e, dao.id, &dao.stable_token);
            if stable_balance > 0 {
                treasury::withdraw(e, dao.id, &dao.stable_token, &dissolution.recipient, stable_balance)?;
            }
            dao::begin_dissolution(e, dao.id)?;
            events::emit_dissolution(e, dao.id, true);
            Ok(())
        }
        Action::CancelDissolution(cancel) => {
            if cancel.dao_id != dao.id {
                return Err(ErrorCode::WrongDao);
            }
            dao::cancel_dissolution(e, dao.id)
        }
        Action::AddLiquidity(liquidity) => {
            if liquidity.pool_id != dao.liquidity_pool_id {
                return Err(ErrorCode::PoolIdMismatch);
            }
            treasury::add_liquidity_from_treasury(
                e,
                dao.id,
                liquidity.asset_amount,
                liquidity.stable_amount,
            )
        }
        Action::RemoveLiquidity(liquidity) => {
            if liquidity.pool_id != dao.liquidity_pool_id {
                return Err(ErrorCode::PoolIdMismatch);
            }
            treasury::remove_liquidity_to_treasury(
                e,
                dao.id,
                liquidity.asset_amount,
                liquidity.stable_amount,
            )
        }
        Action::OaBatch(batch) => {
            coexec::execute_oa_batch(e, dao.id, &batch.edits, &batch.digest, batch.expires_at_ms)
        }
        Action::SetPolicy(policy) => coexec::execute_set_policy(e, dao.id, policy),
        Action::RemovePolicy(policy) => {
            coexec::execute_remove_policy(e, dao.id, &policy.resource_key, policy.expires_at_ms)
        }
        Action::AcceptUpgradeCap(upgrade) => {
            coexec::accept_and_lock_upgrade_cap(e, dao.id, upgrade.council_id, upgrade.expires_at_ms)
        }
    }
}

fn check_coin(dao: &Dao, token: &Address) -> Result<(), ErrorCode> {
    if *token != dao.asset_token && *token != dao.stable_token {
        return Err(ErrorCode::WrongCoinType);
    }
    Ok(())
}
