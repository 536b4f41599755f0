use crate::errors::ErrorCode;
use crate::modules::{dao, events, fees, lifecycle, proposal_fees, treasury};
use crate::types::{Dao, ProposalData, QueuedProposal, MAX_QUEUE_SIZE, STALE_DURATION_MS};
use soroban_sdk::{contracttype, token, Address, Env, Vec};

/// Per-DAO admission state. Entries are kept unordered; extraction scans
/// for the max-priority entry, keyed by fee with earliest-submission
/// tie-break.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueState {
    pub dao_id: u64,
    pub entries: Vec<QueuedProposal>,
    pub active_concurrent: u32,
    pub active_proposer_funded: u32,
    pub dao_slot_in_use: bool,
    pub reserved_proposal_id: Option<u64>,
}

#[contracttype]
pub enum DataKey {
    Queue(u64),
    /// dao_id -> entry popped for premarket handoff, pending market init
    Reserved(u64),
}

pub fn get_queue(e: &Env, dao_id: u64) -> QueueState {
    e.storage()
        .persistent()
        .get(&DataKey::Queue(dao_id))
        .unwrap_or(QueueState {
            dao_id,
            entries: Vec::new(e),
            active_concurrent: 0,
            active_proposer_funded: 0,
            dao_slot_in_use: false,
            reserved_proposal_id: None,
        })
}

pub fn save_queue(e: &Env, queue: &QueueState) {
    e.storage()
        .persistent()
        .set(&DataKey::Queue(queue.dao_id), queue);
}

fn best_index(queue: &QueueState) -> Option<u32> {
    let mut best: Option<(u32, i128, u64)> = None;
    for i in 0..queue.entries.len() {
        let entry = queue.entries.get_unchecked(i);
        let better = match best {
            None => true,
            Some((_, fee, ts)) => {
                entry.fee > fee || (entry.fee == fee && entry.submitted_at_ms < ts)
            }
        };
        if better {
            best = Some((i, entry.fee, entry.submitted_at_ms));
        }
    }
    best.map(|(i, _, _)| i)
}

fn has_capacity(dao: &Dao, queue: &QueueState, uses_dao_liquidity: bool) -> bool {
    if queue.active_concurrent >= dao.config.governance.max_concurrent_proposals {
        return false;
    }
    if uses_dao_liquidity {
        !queue.dao_slot_in_use
    } else {
        queue.active_proposer_funded < dao.config.governance.max_proposer_funded
    }
}

fn note_activated(e: &Env, dao_id: u64, queue: &mut QueueState, uses_dao_liquidity: bool) {
    queue.active_concurrent += 1;
    if uses_dao_liquidity {
        queue.dao_slot_in_use = true;
        if let Ok(mut dao) = dao::get_dao(e, dao_id) {
            dao.dao_liquidity_in_use = true;
            dao::update_dao(e, &dao);
        }
    } else {
        queue.active_proposer_funded += 1;
    }
}

/// Admit a proposal. The submission fee and any bond have already been
/// transferred in by the facade. Returns the minted proposal id and
/// whether a free slot let it skip the queue into Review.
#[allow(clippy::too_many_arguments)]
pub fn submit(
    e: &Env,
    dao: &Dao,
    proposer: Address,
    data: ProposalData,
    fee: i128,
    bond: i128,
    uses_dao_liquidity: bool,
    immediate_asset: i128,
    immediate_stable: i128,
) -> Result<(u64, bool), ErrorCode> {
    dao::require_accepting_proposals(dao)?;
    lifecycle::validate_proposal_data(e, dao, &data)?;
    if uses_dao_liquidity && bond < dao.config.governance.required_bond_amount {
        return Err(ErrorCode::InvalidBond);
    }
    let min_fee =
        dao.config.governance.proposal_fee_per_outcome * data.outcome_messages.len() as i128;
    if fee < min_fee {
        return Err(ErrorCode::InvalidPayment);
    }

    let proposal_id = lifecycle::next_proposal_id(e);
    proposal_fees::hold_fee(e, proposal_id, fee);

    let mut queue = get_queue(e, dao.id);
    if has_capacity(dao, &queue, uses_dao_liquidity) {
        lifecycle::create_premarket(e, proposal_id, dao, proposer.clone(), &data, uses_dao_liquidity)?;
        if uses_dao_liquidity {
            // The bond only secures a queue slot; immediate creation
            // hands it straight back.
            if bond > 0 {
                let fee_token = fees::fee_token(e)?;
                token::Client::new(e, &fee_token).transfer(
                    &e.current_contract_address(),
                    &proposer,
                    &bond,
                );
            }
            lifecycle::initialize_market_with_dao_liquidity(e, proposal_id)?;
        } else {
            lifecycle::initialize_market(
                e,
                proposal_id,
                proposer.clone(),
                immediate_asset,
                immediate_stable,
                true,
            )?;
        }
        note_activated(e, dao.id, &mut queue, uses_dao_liquidity);
        save_queue(e, &queue);
        proposal_fees::settle_without_reward(e, proposal_id);
        events::emit_proposal_submitted(e, proposal_id, proposer, dao.id, fee, uses_dao_liquidity, false);
        return Ok((proposal_id, true));
    }

    if queue.entries.len() >= MAX_QUEUE_SIZE {
        return Err(ErrorCode::QueueFull);
    }
    let entry = QueuedProposal {
        proposal_id,
        dao_id: dao.id,
        fee,
        uses_dao_liquidity,
        proposer: proposer.clone(),
        data,
        bond,
        submitted_at_ms: super::now_ms(e),
    };
    queue.entries.push_back(entry);
    save_queue(e, &queue);
    events::emit_proposal_submitted(e, proposal_id, proposer, dao.id, fee, uses_dao_liquidity, true);
    Ok((proposal_id, false))
}

/// Crank the top proposer-funded entry into a live market, with the
/// cranker supplying the liquidity and earning the activator reward.
pub fn activate_next_proposer_funded(
    e: &Env,
    dao: &Dao,
    activator: Address,
    asset_total: i128,
    stable_total: i128,
) -> Result<u64, ErrorCode> {
    let mut queue = get_queue(e, dao.id);
    let index = best_index(&queue).ok_or(ErrorCode::QueueEmpty)?;
    let entry = queue.entries.get_unchecked(index);
    if entry.uses_dao_liquidity {
        return Err(ErrorCode::ProposalUsesDaoLiquidity);
    }
    if !has_capacity(dao, &queue, false) {
        return Err(ErrorCode::MaxConcurrentReached);
    }
    queue.entries.remove(index);
    note_activated(e, dao.id, &mut queue, false);
    save_queue(e, &queue);

    lifecycle::create_premarket(e, entry.proposal_id, dao, entry.proposer.clone(), &entry.data, false)?;
    lifecycle::initialize_market(
        e,
        entry.proposal_id,
        activator.clone(),
        asset_total,
        stable_total,
        true,
    )?;
    let reward = proposal_fees::pay_activator_reward(e, entry.proposal_id, &activator)?;
    events::emit_proposal_activated(e, entry.proposal_id, activator, reward);
    Ok(entry.proposal_id)
}

/// Crank the top DAO-funded entry: bond returns to the proposer, the DAO
/// liquidity pool seeds the market, and the exclusive slot is taken.
pub fn activate_next_dao_funded(
    e: &Env,
    dao: &Dao,
    activator: Address,
) -> Result<u64, ErrorCode> {
    let mut queue = get_queue(e, dao.id);
    let index = best_index(&queue).ok_or(ErrorCode::QueueEmpty)?;
    let entry = queue.entries.get_unchecked(index);
    if !entry.uses_dao_liquidity {
        return Err(ErrorCode::ProposalNotDaoFunded);
    }
    if queue.dao_slot_in_use {
        return Err(ErrorCode::DaoSlotInUse);
    }
    if queue.active_concurrent >= dao.config.governance.max_concurrent_proposals {
        return Err(ErrorCode::MaxConcurrentReached);
    }
    queue.entries.remove(index);
    note_activated(e, dao.id, &mut queue, true);
    save_queue(e, &queue);

    if entry.bond > 0 {
        let fee_token = fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(
            &e.current_contract_address(),
            &entry.proposer,
            &entry.bond,
        );
    }

    lifecycle::create_premarket(e, entry.proposal_id, dao, entry.proposer.clone(), &entry.data, true)?;
    lifecycle::initialize_market_with_dao_liquidity(e, entry.proposal_id)?;
    let reward = proposal_fees::pay_activator_reward(e, entry.proposal_id, &activator)?;
    events::emit_proposal_activated(e, entry.proposal_id, activator, reward);
    Ok(entry.proposal_id)
}

/// Remove an entry that has sat in the queue past the stale horizon. The
/// submission fee is slashed to protocol revenue; a DAO-funded bond goes
/// to the treasury, or back to the proposer when none is configured.
pub fn evict_stale(e: &Env, dao: &Dao, proposal_id: u64) -> Result<(), ErrorCode> {
    let mut queue = get_queue(e, dao.id);
    let now = super::now_ms(e);

    let mut found: Option<u32> = None;
    for i in 0..queue.entries.len() {
        if queue.entries.get_unchecked(i).proposal_id == proposal_id {
            found = Some(i);
            break;
        }
    }
    let index = found.ok_or(ErrorCode::ProposalNotFound)?;
    let entry = queue.entries.get_unchecked(index);
    if now <= entry.submitted_at_ms + STALE_DURATION_MS {
        return Err(ErrorCode::StaleProposalNotYet);
    }

    queue.entries.remove(index);
    save_queue(e, &queue);

    let slashed = proposal_fees::slash_to_revenue(e, proposal_id);
    events::emit_proposal_evicted(e, proposal_id, slashed);

    if entry.bond > 0 {
        let fee_token = fees::fee_token(e)?;
        if dao.has_treasury {
            treasury::credit(e, dao.id, &fee_token, entry.bond);
            events::emit_bond_slashed(e, proposal_id, entry.bond, true);
        } else {
            token::Client::new(e, &fee_token).transfer(
                &e.current_contract_address(),
                &entry.proposer,
                &entry.bond,
            );
            events::emit_bond_slashed(e, proposal_id, entry.bond, false);
        }
    }
    Ok(())
}

/// Finalization bookkeeping: free the capacity the proposal held and
/// consume the reservation if it was the reserved one.
pub fn mark_completed(e: &Env, dao_id: u64, proposal_id: u64, uses_dao_liquidity: bool) {
    let mut queue = get_queue(e, dao_id);
    queue.active_concurrent = queue.active_concurrent.saturating_sub(1);
    if uses_dao_liquidity {
        queue.dao_slot_in_use = false;
    } else {
        queue.active_proposer_funded = queue.active_proposer_funded.saturating_sub(1);
    }
    if queue.reserved_proposal_id == Some(proposal_id) {
        queue.reserved_proposal_id = None;
    }
    save_queue(e, &queue);
}

/// Premarket handoff: near the end of the current market's trading
/// window, pop the top entry into a premarket proposal so it can gather
/// outcomes before the current one ends. One reservation at a time.
pub fn reserve_next_for_premarket(
    e: &Env,
    dao: &Dao,
    current_proposal_id: u64,
    threshold_ms: u64,
) -> Result<u64, ErrorCode> {
    let mut queue = get_queue(e, dao.id);
    if queue.reserved_proposal_id.is_some() {
        return Err(ErrorCode::ReservationAlreadySet);
    }

    let market = lifecycle::get_market(e, current_proposal_id)?;
    let trading_end = market.trading_end_ms.ok_or(ErrorCode::InvalidState)?;
    let now = super::now_ms(e);
    if now + threshold_ms < trading_end {
        return Err(ErrorCode::TooEarly);
    }

    let index = best_index(&queue).ok_or(ErrorCode::QueueEmpty)?;
    let entry = queue.entries.get_unchecked(index);
    queue.entries.remove(index);
    queue.reserved_proposal_id = Some(entry.proposal_id);
    save_queue(e, &queue);

    lifecycle::create_premarket(
        e,
        entry.proposal_id,
        dao,
        entry.proposer.clone(),
        &entry.data,
        entry.uses_dao_liquidity,
    )?;
    e.storage().persistent().set(&DataKey::Reserved(dao.id), &entry);
    Ok(entry.proposal_id)
}

/// Give the reserved premarket proposal its market, clearing the
/// reservation. Proposer-funded reservations take the activator's coins;
/// DAO-funded ones wait for the slot and drain the DAO pool.
pub fn initialize_reserved_premarket(
    e: &Env,
    dao: &Dao,
    activator: Address,
    asset_total: i128,
    stable_total: i128,
) -> Result<u64, ErrorCode> {
    let mut queue = get_queue(e, dao.id);
    let proposal_id = queue.reserved_proposal_id.ok_or(ErrorCode::NoReservation)?;
    let entry: QueuedProposal = e
        .storage()
        .persistent()
        .get(&DataKey::Reserved(dao.id))
        .ok_or(ErrorCode::NoReservation)?;

    if !has_capacity(dao, &queue, entry.uses_dao_liquidity) {
        return Err(if entry.uses_dao_liquidity {
            ErrorCode::DaoSlotInUse
        } else {
            ErrorCode::MaxConcurrentReached
        });
    }

    if entry.uses_dao_liquidity {
        if entry.bond > 0 {
            let fee_token = fees::fee_token(e)?;
            token::Client::new(e, &fee_token).transfer(
                &e.current_contract_address(),
                &entry.proposer,
                &entry.bond,
            );
        }
        lifecycle::initialize_market_with_dao_liquidity(e, proposal_id)?;
    } else {
        lifecycle::initialize_market(e, proposal_id, activator.clone(), asset_total, stable_total, true)?;
    }
    note_activated(e, dao.id, &mut queue, entry.uses_dao_liquidity);
    queue.reserved_proposal_id = None;
    save_queue(e, &queue);
    e.storage().persistent().remove(&DataKey::Reserved(dao.id));

    let reward = proposal_fees::pay_activator_reward(e, proposal_id, &activator)?;
    events::emit_proposal_activated(e, proposal_id, activator, reward);
    Ok(proposal_id)
}
