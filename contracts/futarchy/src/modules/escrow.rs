use crate::errors::ErrorCode;
use crate::types::Side;
use soroban_sdk::{contracttype, Address, Env, Vec};

/// Backing vault for one proposal's conditional markets.
///
/// Depositing `n` collateral on one side mints `n` conditional tokens of
/// every outcome on that side (a complete set); burning a complete set
/// releases the collateral. After finalization, winning-outcome tokens
/// redeem 1:1 and losing-outcome tokens are worthless.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenEscrow {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub outcome_count: u32,
    pub asset_backing: i128,
    pub stable_backing: i128,
    pub asset_supplies: Vec<i128>,
    pub stable_supplies: Vec<i128>,
}

#[contracttype]
pub enum DataKey {
    Escrow(u64),
    /// (proposal_id, outcome, side, holder) -> conditional balance
    Balance(u64, u32, Side, Address),
}

pub fn create_escrow(e: &Env, proposal_id: u64, dao_id: u64, outcome_count: u32) {
    let mut asset_supplies = Vec::new(e);
    let mut stable_supplies = Vec::new(e);
    for _ in 0..outcome_count {
        asset_supplies.push_back(0i128);
        stable_supplies.push_back(0i128);
    }
    let escrow = TokenEscrow {
        proposal_id,
        dao_id,
        outcome_count,
        asset_backing: 0,
        stable_backing: 0,
        asset_supplies,
        stable_supplies,
    };
    save_escrow(e, &escrow);
}

pub fn get_escrow(e: &Env, proposal_id: u64) -> Result<TokenEscrow, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Escrow(proposal_id))
        .ok_or(ErrorCode::ProposalNotFound)
}

pub fn save_escrow(e: &Env, escrow: &TokenEscrow) {
    e.storage()
        .persistent()
        .set(&DataKey::Escrow(escrow.proposal_id), escrow);
}

pub fn balance(e: &Env, proposal_id: u64, outcome: u32, side: Side, holder: &Address) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::Balance(proposal_id, outcome, side, holder.clone()))
        .unwrap_or(0)
}

pub fn credit(e: &Env, proposal_id: u64, outcome: u32, side: Side, holder: &Address, amount: i128) {
    let key = DataKey::Balance(proposal_id, outcome, side, holder.clone());
    let current: i128 = e.storage().persistent().get(&key).unwrap_or(0);
    e.storage().persistent().set(&key, &(current + amount));
}

pub fn debit(
    e: &Env,
    proposal_id: u64,
    outcome: u32,
    side: Side,
    holder: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    let key = DataKey::Balance(proposal_id, outcome, side, holder.clone());
    let current: i128 = e.storage().persistent().get(&key).unwrap_or(0);
    if current < amount {
        return Err(ErrorCode::InsufficientBalance);
    }
    e.storage().persistent().set(&key, &(current - amount));
    Ok(())
}

fn supplies_mut(escrow: &TokenEscrow, side: &Side) -> Vec<i128> {
    match side {
        Side::Asset => escrow.asset_supplies.clone(),
        Side::Stable => escrow.stable_supplies.clone(),
    }
}

fn store_supplies(escrow: &mut TokenEscrow, side: &Side, supplies: Vec<i128>) {
    match side {
        Side::Asset => escrow.asset_supplies = supplies,
        Side::Stable => escrow.stable_supplies = supplies,
    }
}

fn backing(escrow: &TokenEscrow, side: &Side) -> i128 {
    match side {
        Side::Asset => escrow.asset_backing,
        Side::Stable => escrow.stable_backing,
    }
}

fn set_backing(escrow: &mut TokenEscrow, side: &Side, value: i128) {
    match side {
        Side::Asset => escrow.asset_backing = value,
        Side::Stable => escrow.stable_backing = value,
    }
}

/// Mint a complete set: collateral already received by the contract is
/// recorded as backing, and every outcome's supply and the owner's
/// balances grow by the same amount.
pub fn mint_complete_set(
    e: &Env,
    proposal_id: u64,
    side: Side,
    owner: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    if amount <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let mut escrow = get_escrow(e, proposal_id)?;

    let mut supplies = supplies_mut(&escrow, &side);
    for outcome in 0..escrow.outcome_count {
        let s = supplies.get(outcome).unwrap_or(0);
        supplies.set(outcome, s + amount);
        credit(e, proposal_id, outcome, side.clone(), owner, amount);
    }
    store_supplies(&mut escrow, &side, supplies);
    let new_backing = backing(&escrow, &side) + amount;
    set_backing(&mut escrow, &side, new_backing);
    save_escrow(e, &escrow);
    Ok(())
}

/// Burn one token of every outcome on one side and release the backing.
pub fn redeem_complete_set(
    e: &Env,
    proposal_id: u64,
    side: Side,
    owner: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    if amount <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let mut escrow = get_escrow(e, proposal_id)?;

    for outcome in 0..escrow.outcome_count {
        if balance(e, proposal_id, outcome, side.clone(), owner) < amount {
            return Err(ErrorCode::IncompleteSet);
        }
    }

    let mut supplies = supplies_mut(&escrow, &side);
    for outcome in 0..escrow.outcome_count {
        debit(e, proposal_id, outcome, side.clone(), owner, amount)?;
        let s = supplies.get(outcome).unwrap_or(0);
        supplies.set(outcome, s - amount);
    }
    store_supplies(&mut escrow, &side, supplies);
    let new_backing = backing(&escrow, &side) - amount;
    set_backing(&mut escrow, &side, new_backing);
    save_escrow(e, &escrow);
    Ok(())
}

/// Burn winning-outcome tokens 1:1 against the backing after finalization.
pub fn redeem_winning(
    e: &Env,
    proposal_id: u64,
    winner: u32,
    side: Side,
    owner: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    if amount <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    debit(e, proposal_id, winner, side.clone(), owner, amount)?;
    burn_winning_supply(e, proposal_id, winner, side, amount)
}

/// Reduce winning supply and backing without a holder balance, used when
/// pool reserves are recombined at finalization.
pub fn burn_winning_supply(
    e: &Env,
    proposal_id: u64,
    winner: u32,
    side: Side,
    amount: i128,
) -> Result<(), ErrorCode> {
    if amount == 0 {
        return Ok(());
    }
    let mut escrow = get_escrow(e, proposal_id)?;
    let mut supplies = supplies_mut(&escrow, &side);
    let s = supplies.get(winner).ok_or(ErrorCode::OutcomeOutOfRange)?;
    if s < amount || backing(&escrow, &side) < amount {
        return Err(ErrorCode::InsufficientBalance);
    }
    supplies.set(winner, s - amount);
    store_supplies(&mut escrow, &side, supplies);
    let new_backing = backing(&escrow, &side) - amount;
    set_backing(&mut escrow, &side, new_backing);
    save_escrow(e, &escrow);
    Ok(())
}
