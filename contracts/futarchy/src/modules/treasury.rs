use crate::errors::ErrorCode;
use crate::modules::{dao, events};
use crate::types::Stream;
use soroban_sdk::{contracttype, token, Address, Env};

#[contracttype]
pub enum DataKey {
    /// (dao_id, token) -> treasury balance held by the contract
    Treasury(u64, Address),
    /// dao_id -> DAO-owned market liquidity
    LiquidityPool(u64),
    Stream(u64),
    StreamCount,
}

/// Asset/stable pool a DAO sets aside to fund its own proposals.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DaoLiquidity {
    pub asset: i128,
    pub stable: i128,
}

// ---------------------------------------------------------------------------
// Treasury balances
// ---------------------------------------------------------------------------

pub fn balance(e: &Env, dao_id: u64, token_addr: &Address) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::Treasury(dao_id, token_addr.clone()))
        .unwrap_or(0)
}

pub fn credit(e: &Env, dao_id: u64, token_addr: &Address, amount: i128) {
    let key = DataKey::Treasury(dao_id, token_addr.clone());
    let current: i128 = e.storage().persistent().get(&key).unwrap_or(0);
    e.storage().persistent().set(&key, &(current + amount));
}

pub fn debit(e: &Env, dao_id: u64, token_addr: &Address, amount: i128) -> Result<(), ErrorCode> {
    let key = DataKey::Treasury(dao_id, token_addr.clone());
    let current: i128 = e.storage().persistent().get(&key).unwrap_or(0);
    if current < amount {
        return Err(ErrorCode::InsufficientBalance);
    }
    e.storage().persistent().set(&key, &(current - amount));
    Ok(())
}

/// Pull tokens from a depositor into the DAO treasury.
pub fn deposit(
    e: &Env,
    dao_id: u64,
    token_addr: &Address,
    from: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    if amount <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    token::Client::new(e, token_addr).transfer(from, &e.current_contract_address(), &amount);
    credit(e, dao_id, token_addr, amount);
    Ok(())
}

/// Pay out of the treasury. Crate-internal; reachable through executed
/// actions and fee collection only.
pub fn withdraw(
    e: &Env,
    dao_id: u64,
    token_addr: &Address,
    to: &Address,
    amount: i128,
) -> Result<(), ErrorCode> {
    debit(e, dao_id, token_addr, amount)?;
    token::Client::new(e, token_addr).transfer(&e.current_contract_address(), to, &amount);
    Ok(())
}

// ---------------------------------------------------------------------------
// DAO liquidity pool
// ---------------------------------------------------------------------------

pub fn liquidity(e: &Env, dao_id: u64) -> DaoLiquidity {
    e.storage()
        .persistent()
        .get(&DataKey::LiquidityPool(dao_id))
        .unwrap_or(DaoLiquidity { asset: 0, stable: 0 })
}

fn save_liquidity(e: &Env, dao_id: u64, pool: &DaoLiquidity) {
    e.storage()
        .persistent()
        .set(&DataKey::LiquidityPool(dao_id), pool);
}

/// Fund the DAO liquidity pool from an external depositor.
pub fn deposit_liquidity(
    e: &Env,
    dao_id: u64,
    from: &Address,
    asset_amount: i128,
    stable_amount: i128,
) -> Result<(), ErrorCode> {
    if asset_amount <= 0 || stable_amount <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let dao = dao::get_dao(e, dao_id)?;
    let this = e.current_contract_address();
    token::Client::new(e, &dao.asset_token).transfer(from, &this, &asset_amount);
    token::Client::new(e, &dao.stable_token).transfer(from, &this, &stable_amount);

    let mut pool = liquidity(e, dao_id);
    pool.asset += asset_amount;
    pool.stable += stable_amount;
    save_liquidity(e, dao_id, &pool);
    Ok(())
}

/// Empty the pool into a newly initialized DAO-funded market.
pub fn drain_liquidity(e: &Env, dao_id: u64) -> Result<(i128, i128), ErrorCode> {
    let mut pool = liquidity(e, dao_id);
    if pool.asset == 0 || pool.stable == 0 {
        return Err(ErrorCode::InsufficientLiquidity);
    }
    let out = (pool.asset, pool.stable);
    pool.asset = 0;
    pool.stable = 0;
    save_liquidity(e, dao_id, &pool);
    Ok(out)
}

/// Return finalization proceeds of a DAO-funded market to the pool.
pub fn refill_liquidity(e: &Env, dao_id: u64, asset_amount: i128, stable_amount: i128) {
    let mut pool = liquidity(e, dao_id);
    pool.asset += asset_amount;
    pool.stable += stable_amount;
    save_liquidity(e, dao_id, &pool);
}

/// Move treasury funds into the liquidity pool (AddLiquidity action).
pub fn add_liquidity_from_treasury(
    e: &Env,
    dao_id: u64,
    asset_amount: i128,
    stable_amount: i128,
) -> Result<(), ErrorCode> {
    let dao = dao::get_dao(e, dao_id)?;
    debit(e, dao_id, &dao.asset_token, asset_amount)?;
    debit(e, dao_id, &dao.stable_token, stable_amount)?;
    let mut pool = liquidity(e, dao_id);
    pool.asset += asset_amount;
    pool.stable += stable_amount;
    save_liquidity(e, dao_id, &pool);
    Ok(())
}

/// Move pool funds back to the treasury (RemoveLiquidity action).
pub fn remove_liquidity_to_treasury(
    e: &Env,
    dao_id: u64,
    asset_amount: i128,
    stable_amount: i128,
) -> Result<(), ErrorCode> {
    let dao = dao::get_dao(e, dao_id)?;
    let mut pool = liquidity(e, dao_id);
    if pool.asset < asset_amount || pool.stable < stable_amount {
        return Err(ErrorCode::InsufficientLiquidity);
    }
    pool.asset -= asset_amount;
    pool.stable -= stable_amount;
    save_liquidity(e, dao_id, &pool);
    credit(e, dao_id, &dao.asset_token, asset_amount);
    credit(e, dao_id, &dao.stable_token, stable_amount);
    Ok(())
}

// ---------------------------------------------------------------------------
// Recurring payment streams
// ---------------------------------------------------------------------------

pub fn create_stream(
    e: &Env,
    dao_id: u64,
    recipient: Address,
    token_addr: Address,
    amount_per_epoch: i128,
    num_epochs: u32,
    epoch_duration_ms: u64,
    cancellable: bool,
) -> Result<u64, ErrorCode> {
    if amount_per_epoch <= 0 || num_epochs == 0 || epoch_duration_ms == 0 {
        return Err(ErrorCode::InvalidAmount);
    }

    let mut count: u64 = e.storage().instance().get(&DataKey::StreamCount).unwrap_or(0);
    count += 1;

    let stream = Stream {
        id: count,
        dao_id,
        recipient: recipient.clone(),
        token: token_addr,
        amount_per_epoch,
        epochs_remaining: num_epochs,
        epoch_duration_ms,
        next_claim_ms: super::now_ms(e) + epoch_duration_ms,
        cancellable,
    };
    e.storage().persistent().set(&DataKey::Stream(count), &stream);
    e.storage().instance().set(&DataKey::StreamCount, &count);

    events::emit_stream_created(e, count, recipient, dao_id, amount_per_epoch, num_epochs);
    Ok(count)
}

pub fn get_stream(e: &Env, stream_id: u64) -> Result<Stream, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Stream(stream_id))
        .ok_or(ErrorCode::StreamNotFound)
}

/// Pay out every epoch that has come due. Permissionless; funds come from
/// the DAO treasury at claim time.
pub fn claim_stream_payment(e: &Env, stream_id: u64) -> Result<i128, ErrorCode> {
    let mut stream = get_stream(e, stream_id)?;
    let now = super::now_ms(e);

    let mut epochs_due: u32 = 0;
    let mut next = stream.next_claim_ms;
    while next <= now && epochs_due < stream.epochs_remaining {
        epochs_due += 1;
        next += stream.epoch_duration_ms;
    }
    if epochs_due == 0 {
        return Err(ErrorCode::NothingDue);
    }

    let total = stream.amount_per_epoch * epochs_due as i128;
    withdraw(e, stream.dao_id, &stream.token.clone(), &stream.recipient.clone(), total)?;

    stream.epochs_remaining -= epochs_due;
    stream.next_claim_ms = next;
    if stream.epochs_remaining == 0 {
        e.storage().persistent().remove(&DataKey::Stream(stream_id));
    } else {
        e.storage().persistent().set(&DataKey::Stream(stream_id), &stream);
    }
    Ok(total)
}

/// Cancel a stream (CancelStream action). Due epochs are paid out first;
/// the unvested remainder stays in the treasury.
pub fn cancel_stream(e: &Env, dao_id: u64, stream_id: u64) -> Result<i128, ErrorCode> {
    let stream = get_stream(e, stream_id)?;
    if stream.dao_id != dao_id {
        return Err(ErrorCode::WrongDao);
    }
    if !stream.cancellable {
        return Err(ErrorCode::StreamNotCancellable);
    }

    // Settle anything already vested before tearing down.
    match claim_stream_payment(e, stream_id) {
        Ok(_) | Err(ErrorCode::NothingDue) => {}
        Err(err) => return Err(err),
    }

    let remaining = match get_stream(e, stream_id) {
        Ok(s) => {
            e.storage().persistent().remove(&DataKey::Stream(stream_id));
            s.amount_per_epoch * s.epochs_remaining as i128
        }
        // Fully vested and removed by the claim above.
        Err(_) => 0,
    };

    events::emit_stream_cancelled(e, stream_id, remaining);
    Ok(remaining)
}
