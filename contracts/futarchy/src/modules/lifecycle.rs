use crate::errors::ErrorCode;
use crate::modules::{amm, dao, escrow, events, proposal_fees, queue, treasury};
use crate::types::{
    Dao, MarketState, Proposal, ProposalData, ProposalInfo, ProposalState, Side, MAX_DETAIL_LEN,
    MAX_TITLE_LEN, MIN_OUTCOMES,
};
use soroban_sdk::{contracttype, token, Address, Env, String, Vec};

#[contracttype]
pub enum DataKey {
    Proposal(u64),
    Info(u64),
    Market(u64),
    ProposalCount,
}

/// Proof that a proposal finalized in this invocation and its liquidity
/// awaits return. Not a contract type: it cannot be stored or escape the
/// transaction, so the return and completion bookkeeping fire exactly
/// once, here.
#[must_use]
pub struct FinalizationReceipt {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub winning_outcome: u32,
    pub uses_dao_liquidity: bool,
    pub liquidity_provider: Address,
}

pub fn next_proposal_id(e: &Env) -> u64 {
    let mut count: u64 = e
        .storage()
        .instance()
        .get(&DataKey::ProposalCount)
        .unwrap_or(0);
    count += 1;
    e.storage().instance().set(&DataKey::ProposalCount, &count);
    count
}

pub fn get_proposal(e: &Env, proposal_id: u64) -> Result<Proposal, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Proposal(proposal_id))
        .ok_or(ErrorCode::ProposalNotFound)
}

pub fn update_proposal(e: &Env, proposal: &Proposal) {
    e.storage()
        .persistent()
        .set(&DataKey::Proposal(proposal.id), proposal);
}

pub fn get_info(e: &Env, proposal_id: u64) -> Result<ProposalInfo, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Info(proposal_id))
        .ok_or(ErrorCode::ProposalNotFound)
}

pub fn update_info(e: &Env, info: &ProposalInfo) {
    e.storage()
        .persistent()
        .set(&DataKey::Info(info.proposal_id), info);
}

pub fn get_market(e: &Env, proposal_id: u64) -> Result<MarketState, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Market(proposal_id))
        .ok_or(ErrorCode::ProposalNotFound)
}

fn save_market(e: &Env, market: &MarketState) {
    e.storage()
        .persistent()
        .set(&DataKey::Market(market.proposal_id), market);
}

pub fn validate_proposal_data(e: &Env, dao: &Dao, data: &ProposalData) -> Result<(), ErrorCode> {
    let count = data.outcome_messages.len();
    if count < MIN_OUTCOMES || count > dao.config.governance.max_outcomes {
        return Err(ErrorCode::InvalidOutcomeCount);
    }
    if data.outcome_details.len() != count
        || data.asset_amounts.len() != count
        || data.stable_amounts.len() != count
    {
        return Err(ErrorCode::InvalidMessages);
    }
    if data.title.len() == 0 || data.title.len() > MAX_TITLE_LEN {
        return Err(ErrorCode::InvalidTitle);
    }

    if data.outcome_messages.get_unchecked(0) != String::from_str(e, "Reject") {
        return Err(ErrorCode::InvalidMessages);
    }
    if count == 2 && data.outcome_messages.get_unchecked(1) != String::from_str(e, "Accept") {
        return Err(ErrorCode::InvalidMessages);
    }

    for i in 0..count {
        let message = data.outcome_messages.get_unchecked(i);
        if message.len() == 0 {
            return Err(ErrorCode::InvalidMessages);
        }
        let detail = data.outcome_details.get_unchecked(i);
        if detail.len() > MAX_DETAIL_LEN {
            return Err(ErrorCode::InvalidDetail);
        }
        for j in (i + 1)..count {
            if message == data.outcome_messages.get_unchecked(j) {
                return Err(ErrorCode::InvalidMessages);
            }
        }
    }
    Ok(())
}

/// Materialise a premarket proposal with no market attached.
pub fn create_premarket(
    e: &Env,
    proposal_id: u64,
    dao: &Dao,
    proposer: Address,
    data: &ProposalData,
    uses_dao_liquidity: bool,
) -> Result<(), ErrorCode> {
    validate_proposal_data(e, dao, data)?;
    let now = super::now_ms(e);
    let count = data.outcome_messages.len();

    let mut creators: Vec<Address> = Vec::new(e);
    for _ in 0..count {
        creators.push_back(proposer.clone());
    }

    let proposal = Proposal {
        id: proposal_id,
        dao_id: dao.id,
        proposer: proposer.clone(),
        title: data.title.clone(),
        state: ProposalState::Premarket,
        outcome_count: count,
        outcome_messages: data.outcome_messages.clone(),
        outcome_details: data.outcome_details.clone(),
        outcome_creators: creators,
        asset_amounts: data.asset_amounts.clone(),
        stable_amounts: data.stable_amounts.clone(),
        review_period_ms: dao.config.trading.review_period_ms,
        trading_period_ms: dao.config.trading.trading_period_ms,
        twap: dao.config.twap.clone(),
        amm_total_fee_bps: dao.config.trading.amm_total_fee_bps,
        created_at_ms: now,
        market_init_ms: None,
        trading_start_ms: None,
        winning_outcome: None,
        uses_dao_liquidity,
        liquidity_provider: proposer.clone(),
    };
    update_proposal(e, &proposal);

    let info = ProposalInfo {
        proposal_id,
        dao_id: dao.id,
        proposer,
        created_at_ms: now,
        state: ProposalState::Premarket,
        outcome_count: count,
        title: data.title.clone(),
        result: None,
        execution_time_ms: None,
        executed: false,
    };
    update_info(e, &info);

    let mut dao = dao::get_dao(e, dao.id)?;
    dao.proposals_created += 1;
    dao::update_dao(e, &dao);
    Ok(())
}

/// Append an outcome while premarket. The caller pays the per-outcome fee
/// (escrowed until finalization) and is recorded as the outcome's
/// creator, earning the rebate if it wins.
pub fn add_outcome(
    e: &Env,
    proposal_id: u64,
    caller: Address,
    message: String,
    detail: String,
    asset_amount: i128,
    stable_amount: i128,
) -> Result<(), ErrorCode> {
    let mut proposal = get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Premarket {
        return Err(ErrorCode::InvalidState);
    }
    let dao = dao::get_dao(e, proposal.dao_id)?;
    if proposal.outcome_count + 1 > dao.config.governance.max_outcomes {
        return Err(ErrorCode::InvalidOutcomeCount);
    }
    if message.len() == 0 || detail.len() > MAX_DETAIL_LEN {
        return Err(ErrorCode::InvalidMessages);
    }
    for i in 0..proposal.outcome_count {
        if proposal.outcome_messages.get_unchecked(i) == message {
            return Err(ErrorCode::InvalidMessages);
        }
    }

    let fee = dao.config.governance.proposal_fee_per_outcome;
    if fee > 0 {
        let fee_token = crate::modules::fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(&caller, &e.current_contract_address(), &fee);
        proposal_fees::hold_outcome_fee(e, proposal_id, fee);
    }

    proposal.outcome_messages.push_back(message);
    proposal.outcome_details.push_back(detail);
    proposal.outcome_creators.push_back(caller);
    proposal.asset_amounts.push_back(asset_amount);
    proposal.stable_amounts.push_back(stable_amount);
    proposal.outcome_count += 1;
    update_proposal(e, &proposal);

    let mut info = get_info(e, proposal_id)?;
    info.outcome_count = proposal.outcome_count;
    update_info(e, &info);
    Ok(())
}

/// Replace an outcome's detail while premarket. The mutator must differ
/// from the current creator, pays the per-outcome fee to the original
/// proposer, and takes over as the outcome's creator.
pub fn mutate_outcome(
    e: &Env,
    proposal_id: u64,
    caller: Address,
    outcome: u32,
    new_detail: String,
) -> Result<(), ErrorCode> {
    let mut proposal = get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Premarket {
        return Err(ErrorCode::InvalidState);
    }
    if outcome >= proposal.outcome_count {
        return Err(ErrorCode::OutcomeOutOfRange);
    }
    if new_detail.len() > MAX_DETAIL_LEN {
        return Err(ErrorCode::InvalidDetail);
    }
    if proposal.outcome_creators.get_unchecked(outcome) == caller {
        return Err(ErrorCode::SameCreator);
    }

    let dao = dao::get_dao(e, proposal.dao_id)?;
    let fee = dao.config.governance.proposal_fee_per_outcome;
    if fee > 0 {
        let fee_token = crate::modules::fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(&caller, &proposal.proposer, &fee);
    }

    proposal.outcome_details.set(outcome, new_detail);
    proposal.outcome_creators.set(outcome, caller);
    update_proposal(e, &proposal);
    Ok(())
}

/// Build the market for a premarket proposal: escrow, complete sets,
/// per-outcome pools with their oracles. Transitions to Review.
///
/// The provided liquidity splits evenly across outcomes into pool
/// reserves; the rest of the minted sets stays with the provider and
/// comes back at finalization.
pub fn initialize_market(
    e: &Env,
    proposal_id: u64,
    provider: Address,
    asset_total: i128,
    stable_total: i128,
    transfer_in: bool,
) -> Result<(), ErrorCode> {
    let mut proposal = get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Premarket {
        return Err(ErrorCode::InvalidState);
    }
    let dao = dao::get_dao(e, proposal.dao_id)?;
    let count = proposal.outcome_count;

    let asset_per_outcome = asset_total / count as i128;
    let stable_per_outcome = stable_total / count as i128;
    if asset_per_outcome < dao.config.trading.min_asset_amount
        || stable_per_outcome < dao.config.trading.min_stable_amount
    {
        return Err(ErrorCode::InvalidMinAmounts);
    }

    if transfer_in {
        let this = e.current_contract_address();
        token::Client::new(e, &dao.asset_token).transfer(&provider, &this, &asset_total);
        token::Client::new(e, &dao.stable_token).transfer(&provider, &this, &stable_total);
    }

    escrow::create_escrow(e, proposal_id, dao.id, count);
    escrow::mint_complete_set(e, proposal_id, Side::Asset, &provider, asset_total)?;
    escrow::mint_complete_set(e, proposal_id, Side::Stable, &provider, stable_total)?;
    for outcome in 0..count {
        escrow::debit(e, proposal_id, outcome, Side::Asset, &provider, asset_per_outcome)?;
        escrow::debit(e, proposal_id, outcome, Side::Stable, &provider, stable_per_outcome)?;
    }

    let now = super::now_ms(e);
    amm::init_pools(
        e,
        proposal_id,
        count,
        asset_per_outcome,
        stable_per_outcome,
        proposal.amm_total_fee_bps,
        &proposal.twap,
        now,
    );

    let market = MarketState {
        proposal_id,
        dao_id: dao.id,
        outcome_count: count,
        outcome_messages: proposal.outcome_messages.clone(),
        trading_end_ms: None,
        finalized: false,
        winning_outcome: None,
    };
    save_market(e, &market);

    proposal.state = ProposalState::Review;
    proposal.market_init_ms = Some(now);
    proposal.liquidity_provider = provider;
    update_proposal(e, &proposal);

    let mut info = get_info(e, proposal_id)?;
    info.state = ProposalState::Review;
    update_info(e, &info);

    events::emit_market_initialized(e, proposal_id, asset_per_outcome, stable_per_outcome, count);
    Ok(())
}

/// Same as `initialize_market` but sourced from the DAO-owned liquidity
/// pool; legal only for proposals flagged as DAO-funded.
pub fn initialize_market_with_dao_liquidity(e: &Env, proposal_id: u64) -> Result<(), ErrorCode> {
    let proposal = get_proposal(e, proposal_id)?;
    if !proposal.uses_dao_liquidity {
        return Err(ErrorCode::ProposalNotDaoFunded);
    }
    let (asset_total, stable_total) = treasury::drain_liquidity(e, proposal.dao_id)?;
    let this = e.current_contract_address();
    initialize_market(e, proposal_id, this, asset_total, stable_total, false)?;

    let mut dao = dao::get_dao(e, proposal.dao_id)?;
    dao.dao_liquidity_in_use = true;
    dao::update_dao(e, &dao);
    Ok(())
}

/// Permissionless crank. Review moves to Trading once the review period
/// lapses; Trading finalizes once the window closes. Idempotent after
/// finalization.
pub fn advance_stage(e: &Env, proposal_id: u64) -> Result<(), ErrorCode> {
    let mut proposal = get_proposal(e, proposal_id)?;
    let now = super::now_ms(e);

    match proposal.state {
        ProposalState::Premarket => Err(ErrorCode::InvalidState),
        ProposalState::Review => {
            let init = proposal.market_init_ms.ok_or(ErrorCode::InvalidState)?;
            if now < init + proposal.review_period_ms {
                return Err(ErrorCode::TooEarly);
            }
            proposal.state = ProposalState::Trading;
            proposal.trading_start_ms = Some(now);
            update_proposal(e, &proposal);

            let mut market = get_market(e, proposal_id)?;
            market.trading_end_ms = Some(now + proposal.trading_period_ms);
            save_market(e, &market);

            let mut info = get_info(e, proposal_id)?;
            info.state = ProposalState::Trading;
            update_info(e, &info);

            events::emit_stage_advanced(e, proposal_id, 2);
            Ok(())
        }
        ProposalState::Trading => {
            let start = proposal.trading_start_ms.ok_or(ErrorCode::InvalidState)?;
            let trading_end = start + proposal.trading_period_ms;
            if now < trading_end {
                return Err(ErrorCode::TooEarly);
            }
            let receipt = finalize(e, &mut proposal, trading_end)?;
            consume_receipt(e, receipt)
        }
        ProposalState::Finalized => Ok(()),
    }
}

fn pick_winner(e: &Env, proposal: &Proposal, trading_end: u64) -> Result<u32, ErrorCode> {
    if proposal.outcome_count == 2 {
        let accept_twap = amm::final_twap(e, proposal.id, 1, trading_end)?;
        return Ok(if accept_twap > proposal.twap.threshold { 1 } else { 0 });
    }
    let mut winner: u32 = 0;
    let mut best: i128 = amm::final_twap(e, proposal.id, 0, trading_end)?;
    for outcome in 1..proposal.outcome_count {
        let value = amm::final_twap(e, proposal.id, outcome, trading_end)?;
        if value > best {
            best = value;
            winner = outcome;
        }
    }
    Ok(winner)
}

fn finalize(
    e: &Env,
    proposal: &mut Proposal,
    trading_end: u64,
) -> Result<FinalizationReceipt, ErrorCode> {
    let winner = pick_winner(e, proposal, trading_end)?;

    proposal.state = ProposalState::Finalized;
    proposal.winning_outcome = Some(winner);
    update_proposal(e, proposal);

    let mut market = get_market(e, proposal.id)?;
    market.finalized = true;
    market.winning_outcome = Some(winner);
    save_market(e, &market);

    let mut info = get_info(e, proposal.id)?;
    info.state = ProposalState::Finalized;
    update_info(e, &info);

    events::emit_finalized(e, proposal.id, winner);

    Ok(FinalizationReceipt {
        proposal_id: proposal.id,
        dao_id: proposal.dao_id,
        winning_outcome: winner,
        uses_dao_liquidity: proposal.uses_dao_liquidity,
        liquidity_provider: proposal.liquidity_provider.clone(),
    })
}

/// Return the market liquidity bound in the receipt and close out queue
/// bookkeeping. Consumes the receipt.
fn consume_receipt(e: &Env, receipt: FinalizationReceipt) -> Result<(), ErrorCode> {
    let proposal = get_proposal(e, receipt.proposal_id)?;
    let dao = dao::get_dao(e, receipt.dao_id)?;
    let winner = receipt.winning_outcome;

    // Recombine the winning pool's reserves with the provider's leftover
    // sets; winning conditionals redeem 1:1 against the backing.
    let (pool_asset, pool_stable) = amm::drain_pool(e, receipt.proposal_id, winner)?;
    escrow::burn_winning_supply(e, receipt.proposal_id, winner, Side::Asset, pool_asset)?;
    escrow::burn_winning_supply(e, receipt.proposal_id, winner, Side::Stable, pool_stable)?;

    let provider_asset = escrow::balance(
        e,
        receipt.proposal_id,
        winner,
        Side::Asset,
        &receipt.liquidity_provider,
    );
    let provider_stable = escrow::balance(
        e,
        receipt.proposal_id,
        winner,
        Side::Stable,
        &receipt.liquidity_provider,
    );
    if provider_asset > 0 {
        escrow::redeem_winning(
            e,
            receipt.proposal_id,
            winner,
            Side::Asset,
            &receipt.liquidity_provider,
            provider_asset,
        )?;
    }
    if provider_stable > 0 {
        escrow::redeem_winning(
            e,
            receipt.proposal_id,
            winner,
            Side::Stable,
            &receipt.liquidity_provider,
            provider_stable,
        )?;
    }

    let asset_return = pool_asset + provider_asset;
    let stable_return = pool_stable + provider_stable;

    if receipt.uses_dao_liquidity {
        treasury::refill_liquidity(e, receipt.dao_id, asset_return, stable_return);
        let mut dao = dao.clone();
        dao.dao_liquidity_in_use = false;
        dao::update_dao(e, &dao);
    } else {
        let this = e.current_contract_address();
        if asset_return > 0 {
            token::Client::new(e, &dao.asset_token).transfer(
                &this,
                &receipt.liquidity_provider,
                &asset_return,
            );
        }
        if stable_return > 0 {
            token::Client::new(e, &dao.stable_token).transfer(
                &this,
                &receipt.liquidity_provider,
                &stable_return,
            );
        }
    }

    let winning_creator = proposal.outcome_creators.get_unchecked(winner);
    proposal_fees::settle_outcome_fees(e, receipt.proposal_id, &winning_creator, proposal.outcome_count)?;

    queue::mark_completed(e, receipt.dao_id, receipt.proposal_id, receipt.uses_dao_liquidity);
    Ok(())
}

/// Record the resolved result on the index entry. Resolution is sticky:
/// it survives later execution failures and can fire exactly once.
pub fn sign_result(e: &Env, proposal_id: u64, signer: Address) -> Result<(), ErrorCode> {
    signer.require_auth();
    let proposal = get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Finalized {
        return Err(ErrorCode::MarketNotFinalized);
    }
    let winner = proposal.winning_outcome.ok_or(ErrorCode::MarketNotFinalized)?;

    let mut info = get_info(e, proposal_id)?;
    if info.result.is_some() {
        return Err(ErrorCode::AlreadyExecuted);
    }
    let result = proposal.outcome_messages.get_unchecked(winner);
    info.result = Some(result.clone());
    info.execution_time_ms = Some(super::now_ms(e));
    update_info(e, &info);

    events::emit_result_signed(e, proposal_id, signer, winner, result);
    Ok(())
}
