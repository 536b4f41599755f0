use crate::errors::ErrorCode;
use crate::modules::{admin, fees};
use crate::types::ACTIVATOR_REWARD;
use soroban_sdk::{contracttype, token, Address, Env};

#[contracttype]
pub enum DataKey {
    /// proposal_id -> submission fee held until activation or eviction
    HeldFee(u64),
    /// proposal_id -> per-outcome fees escrowed until finalization
    OutcomeFeeEscrow(u64),
    /// Slashed and settled fees aggregate here until admin withdrawal.
    ProtocolRevenue,
}

pub fn held_fee(e: &Env, proposal_id: u64) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::HeldFee(proposal_id))
        .unwrap_or(0)
}

/// Record custody of a submission fee already transferred in by the caller.
pub fn hold_fee(e: &Env, proposal_id: u64, amount: i128) {
    e.storage()
        .persistent()
        .set(&DataKey::HeldFee(proposal_id), &amount);
}

pub fn protocol_revenue(e: &Env) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::ProtocolRevenue)
        .unwrap_or(0)
}

fn credit_revenue(e: &Env, amount: i128) {
    let current = protocol_revenue(e);
    e.storage()
        .persistent()
        .set(&DataKey::ProtocolRevenue, &(current + amount));
}

fn take_held(e: &Env, proposal_id: u64) -> i128 {
    let amount = held_fee(e, proposal_id);
    e.storage().persistent().remove(&DataKey::HeldFee(proposal_id));
    amount
}

/// Pay the fixed activator reward to the cranker; the rest of the held
/// submission fee becomes protocol revenue.
pub fn pay_activator_reward(
    e: &Env,
    proposal_id: u64,
    activator: &Address,
) -> Result<i128, ErrorCode> {
    let held = take_held(e, proposal_id);
    let reward = if held < ACTIVATOR_REWARD { held } else { ACTIVATOR_REWARD };
    if reward > 0 {
        let fee_token = fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(&e.current_contract_address(), activator, &reward);
    }
    credit_revenue(e, held - reward);
    Ok(reward)
}

/// Immediate creation waives the activator reward; the whole fee is
/// protocol revenue.
pub fn settle_without_reward(e: &Env, proposal_id: u64) {
    let held = take_held(e, proposal_id);
    credit_revenue(e, held);
}

/// Eviction slashes the entire held fee to protocol revenue.
pub fn slash_to_revenue(e: &Env, proposal_id: u64) -> i128 {
    let held = take_held(e, proposal_id);
    credit_revenue(e, held);
    held
}

pub fn outcome_fee_escrow(e: &Env, proposal_id: u64) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::OutcomeFeeEscrow(proposal_id))
        .unwrap_or(0)
}

/// Escrow a per-outcome fee already transferred in by the caller. Held
/// until finalization.
pub fn hold_outcome_fee(e: &Env, proposal_id: u64, amount: i128) {
    let current = outcome_fee_escrow(e, proposal_id);
    e.storage()
        .persistent()
        .set(&DataKey::OutcomeFeeEscrow(proposal_id), &(current + amount));
}

/// At finalization, the winning outcome's creator gets their proportional
/// share of the escrowed outcome fees; the rest is protocol revenue.
pub fn settle_outcome_fees(
    e: &Env,
    proposal_id: u64,
    winning_creator: &Address,
    outcome_count: u32,
) -> Result<i128, ErrorCode> {
    let escrowed = outcome_fee_escrow(e, proposal_id);
    e.storage()
        .persistent()
        .remove(&DataKey::OutcomeFeeEscrow(proposal_id));
    if escrowed == 0 {
        return Ok(0);
    }
    let rebate = escrowed / outcome_count as i128;
    if rebate > 0 {
        let fee_token = fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(
            &e.current_contract_address(),
            winning_creator,
            &rebate,
        );
    }
    credit_revenue(e, escrowed - rebate);
    Ok(rebate)
}

pub fn withdraw_protocol_revenue(e: &Env, to: &Address) -> Result<i128, ErrorCode> {
    admin::require_admin(e)?;
    let amount = protocol_revenue(e);
    if amount > 0 {
        e.storage().persistent().set(&DataKey::ProtocolRevenue, &0i128);
        let fee_token = fees::fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(&e.current_contract_address(), to, &amount);
    }
    Ok(amount)
}
