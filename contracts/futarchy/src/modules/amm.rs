use crate::errors::ErrorCode;
use crate::modules::oracle::{self, Oracle};
use crate::types::{TwapConfig, BPS_DENOM};
use soroban_sdk::{contracttype, Env};

/// Constant-product pool over one outcome's conditional token pair.
/// The swap fee stays in the reserves, so `k` never decreases.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pool {
    pub proposal_id: u64,
    pub outcome: u32,
    pub asset_reserve: i128,
    pub stable_reserve: i128,
    pub fee_bps: u32,
    pub oracle: Oracle,
}

#[contracttype]
pub enum DataKey {
    Pool(u64, u32),
}

/// Instant price in oracle units: stable reserve per unit of asset reserve.
pub fn instant_price(pool: &Pool) -> i128 {
    pool.stable_reserve / pool.asset_reserve
}

pub fn init_pools(
    e: &Env,
    proposal_id: u64,
    outcome_count: u32,
    asset_per_outcome: i128,
    stable_per_outcome: i128,
    fee_bps: u32,
    twap: &TwapConfig,
    market_init_ms: u64,
) {
    for outcome in 0..outcome_count {
        let mut pool = Pool {
            proposal_id,
            outcome,
            asset_reserve: asset_per_outcome,
            stable_reserve: stable_per_outcome,
            fee_bps,
            oracle: oracle::new_oracle(market_init_ms, twap, 0),
        };
        pool.oracle.last_price = instant_price(&pool);
        save_pool(e, &pool);
    }
}

pub fn get_pool(e: &Env, proposal_id: u64, outcome: u32) -> Result<Pool, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Pool(proposal_id, outcome))
        .ok_or(ErrorCode::ProposalNotFound)
}

pub fn save_pool(e: &Env, pool: &Pool) {
    e.storage()
        .persistent()
        .set(&DataKey::Pool(pool.proposal_id, pool.outcome), pool);
}

fn out_for_in(amount_in: i128, reserve_in: i128, reserve_out: i128, fee_bps: u32) -> i128 {
    let in_after_fee = (amount_in * (BPS_DENOM - fee_bps as i128)) / BPS_DENOM;
    (reserve_out * in_after_fee) / (reserve_in + in_after_fee)
}

/// Swap conditional stable into conditional asset on one outcome pool.
/// The oracle samples the pre-swap price; the full input joins the
/// reserves so the fee accrues to `k`.
pub fn swap_stable_for_asset(
    e: &Env,
    proposal_id: u64,
    outcome: u32,
    amount_in: i128,
    min_amount_out: i128,
    now_ms: u64,
) -> Result<i128, ErrorCode> {
    if amount_in <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let mut pool = get_pool(e, proposal_id, outcome)?;

    let price = instant_price(&pool);
    oracle::observe(&mut pool.oracle, now_ms, price)?;

    let amount_out = out_for_in(amount_in, pool.stable_reserve, pool.asset_reserve, pool.fee_bps);
    if amount_out <= 0 {
        return Err(ErrorCode::InsufficientLiquidity);
    }
    if amount_out < min_amount_out {
        return Err(ErrorCode::ExcessiveSlippage);
    }

    pool.stable_reserve += amount_in;
    pool.asset_reserve -= amount_out;
    save_pool(e, &pool);

    Ok(amount_out)
}

/// Swap conditional asset into conditional stable on one outcome pool.
pub fn swap_asset_for_stable(
    e: &Env,
    proposal_id: u64,
    outcome: u32,
    amount_in: i128,
    min_amount_out: i128,
    now_ms: u64,
) -> Result<i128, ErrorCode> {
    if amount_in <= 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let mut pool = get_pool(e, proposal_id, outcome)?;

    let price = instant_price(&pool);
    oracle::observe(&mut pool.oracle, now_ms, price)?;

    let amount_out = out_for_in(amount_in, pool.asset_reserve, pool.stable_reserve, pool.fee_bps);
    if amount_out <= 0 {
        return Err(ErrorCode::InsufficientLiquidity);
    }
    if amount_out < min_amount_out {
        return Err(ErrorCode::ExcessiveSlippage);
    }

    pool.asset_reserve += amount_in;
    pool.stable_reserve -= amount_out;
    save_pool(e, &pool);

    Ok(amount_out)
}

pub fn quote_stable_for_asset(
    e: &Env,
    proposal_id: u64,
    outcome: u32,
    amount_in: i128,
) -> Result<i128, ErrorCode> {
    let pool = get_pool(e, proposal_id, outcome)?;
    Ok(out_for_in(amount_in, pool.stable_reserve, pool.asset_reserve, pool.fee_bps))
}

pub fn quote_asset_for_stable(
    e: &Env,
    proposal_id: u64,
    outcome: u32,
    amount_in: i128,
) -> Result<i128, ErrorCode> {
    let pool = get_pool(e, proposal_id, outcome)?;
    Ok(out_for_in(amount_in, pool.asset_reserve, pool.stable_reserve, pool.fee_bps))
}

/// Finalization-time TWAP for one outcome, read at the trading end.
pub fn final_twap(e: &Env, proposal_id: u64, outcome: u32, end_ms: u64) -> Result<i128, ErrorCode> {
    let pool = get_pool(e, proposal_id, outcome)?;
    oracle::twap(&pool.oracle, end_ms)
}

/// Empty a pool's reserves at finalization. Returns (asset, stable).
pub fn drain_pool(e: &Env, proposal_id: u64, outcome: u32) -> Result<(i128, i128), ErrorCode> {
    let mut pool = get_pool(e, proposal_id, outcome)?;
    let out = (pool.asset_reserve, pool.stable_reserve);
    pool.asset_reserve = 0;
    pool.stable_reserve = 0;
    save_pool(e, &pool);
    Ok(out)
}
