use crate::errors::ErrorCode;
use crate::types::TwapConfig;
use soroban_sdk::contracttype;

/// Step-clamped TWAP accumulator attached to one outcome pool.
///
/// Observations start `start_delay_ms` after market init. Each sample is
/// clamped to at most `step_max` price units away from the previous one,
/// so a single late trade cannot spike the average.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Oracle {
    pub market_init_ms: u64,
    pub start_delay_ms: u64,
    pub step_max: i128,
    pub last_obs_ms: u64,
    pub last_price: i128,
    pub cumulative: i128,
}

pub fn new_oracle(market_init_ms: u64, twap: &TwapConfig, initial_price: i128) -> Oracle {
    Oracle {
        market_init_ms,
        start_delay_ms: twap.start_delay_ms,
        step_max: twap.step_max,
        // Sampling window opens after the warm-up; the pre-delay spot
        // price seeds the first clamp anchor.
        last_obs_ms: market_init_ms + twap.start_delay_ms,
        last_price: initial_price,
        cumulative: 0,
    }
}

fn clamp_step(oracle: &Oracle, price: i128) -> i128 {
    let lo = oracle.last_price - oracle.step_max;
    let hi = oracle.last_price + oracle.step_max;
    if price < lo {
        lo
    } else if price > hi {
        hi
    } else {
        price
    }
}

/// Record one observation of the pool's instant price. Called before every
/// swap is applied. No-op during the warm-up window; samples must be
/// monotone in time.
pub fn observe(oracle: &mut Oracle, now_ms: u64, instant_price: i128) -> Result<(), ErrorCode> {
    if now_ms < oracle.market_init_ms + oracle.start_delay_ms {
        return Ok(());
    }
    if now_ms < oracle.last_obs_ms {
        return Err(ErrorCode::InvalidState);
    }

    let clamped = clamp_step(oracle, instant_price);
    let elapsed = (now_ms - oracle.last_obs_ms) as i128;
    oracle.cumulative += clamped * elapsed;
    oracle.last_price = clamped;
    oracle.last_obs_ms = now_ms;
    Ok(())
}

/// Time-weighted average over [market_init + start_delay, end_ms], carrying
/// the last observation forward to the window end.
pub fn twap(oracle: &Oracle, end_ms: u64) -> Result<i128, ErrorCode> {
    let window_start = oracle.market_init_ms + oracle.start_delay_ms;
    if end_ms <= window_start {
        return Err(ErrorCode::SamplingNotStarted);
    }
    if end_ms < oracle.last_obs_ms {
        return Err(ErrorCode::InvalidState);
    }

    let tail = oracle.last_price * ((end_ms - oracle.last_obs_ms) as i128);
    let window = (end_ms - window_start) as i128;
    Ok((oracle.cumulative + tail) / window)
}
