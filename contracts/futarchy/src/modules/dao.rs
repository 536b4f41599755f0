use crate::errors::ErrorCode;
use crate::types::{
    Dao, DaoConfig, GovernanceConfig, MetadataConfig, OperationalState, TradingParams, TwapConfig,
    MAX_AMM_FEE_BPS, MAX_OUTCOMES, MAX_REVIEW_PERIOD_MS, MAX_TRADING_PERIOD_MS,
    MAX_TWAP_START_DELAY_MS, MAX_TWAP_THRESHOLD, MIN_AMM_SAFE_AMOUNT, MIN_OUTCOMES,
    MONTHLY_FEE_PERIOD_MS, TWAP_DELAY_STEP_MS,
};
use soroban_sdk::{contracttype, Address, Env, String};

#[contracttype]
pub enum DataKey {
    Dao(u64),
    DaoCount,
    PoolIdCount,
    MetadataEntry(u64, String),
}

pub fn create_dao(
    e: &Env,
    creator: Address,
    asset_token: Address,
    stable_token: Address,
    config: DaoConfig,
    has_treasury: bool,
) -> Result<u64, ErrorCode> {
    validate_config(&config)?;

    let mut count: u64 = e.storage().instance().get(&DataKey::DaoCount).unwrap_or(0);
    count += 1;

    let mut pool_count: u64 = e
        .storage()
        .instance()
        .get(&DataKey::PoolIdCount)
        .unwrap_or(0);
    pool_count += 1;

    let dao = Dao {
        id: count,
        creator,
        asset_token,
        stable_token,
        config,
        operational_state: OperationalState::Active,
        proposal_creation_enabled: true,
        has_treasury,
        next_fee_due_ms: super::now_ms(e) + MONTHLY_FEE_PERIOD_MS,
        dao_liquidity_in_use: false,
        liquidity_pool_id: pool_count,
        proposals_created: 0,
    };

    e.storage().persistent().set(&DataKey::Dao(count), &dao);
    e.storage().instance().set(&DataKey::DaoCount, &count);
    e.storage().instance().set(&DataKey::PoolIdCount, &pool_count);

    Ok(count)
}

pub fn get_dao(e: &Env, dao_id: u64) -> Result<Dao, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Dao(dao_id))
        .ok_or(ErrorCode::DaoNotFound)
}

pub fn update_dao(e: &Env, dao: &Dao) {
    e.storage().persistent().set(&DataKey::Dao(dao.id), dao);
}

/// Submission gate: the DAO must be active and not in fee arrears.
pub fn require_accepting_proposals(dao: &Dao) -> Result<(), ErrorCode> {
    if dao.operational_state != OperationalState::Active || !dao.proposal_creation_enabled {
        return Err(ErrorCode::ProposalCreationDisabled);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config mutators. Crate-internal; reachable only through executed actions.
// Validation is centralised here.
// ---------------------------------------------------------------------------

pub fn validate_config(config: &DaoConfig) -> Result<(), ErrorCode> {
    validate_trading_params(&config.trading)?;
    validate_twap_config(&config.twap)?;
    validate_governance(&config.governance)?;
    if config.trading.trading_period_ms <= config.twap.start_delay_ms + TWAP_DELAY_STEP_MS {
        return Err(ErrorCode::InvalidPeriod);
    }
    Ok(())
}

fn validate_trading_params(params: &TradingParams) -> Result<(), ErrorCode> {
    if params.min_asset_amount <= MIN_AMM_SAFE_AMOUNT || params.min_stable_amount <= MIN_AMM_SAFE_AMOUNT
    {
        return Err(ErrorCode::InvalidMinAmounts);
    }
    if params.review_period_ms > MAX_REVIEW_PERIOD_MS
        || params.trading_period_ms > MAX_TRADING_PERIOD_MS
    {
        return Err(ErrorCode::InvalidPeriod);
    }
    if params.amm_total_fee_bps > MAX_AMM_FEE_BPS {
        return Err(ErrorCode::InvalidFeeBps);
    }
    Ok(())
}

fn validate_twap_config(twap: &TwapConfig) -> Result<(), ErrorCode> {
    if twap.start_delay_ms % TWAP_DELAY_STEP_MS != 0 || twap.start_delay_ms > MAX_TWAP_START_DELAY_MS
    {
        return Err(ErrorCode::InvalidTwapDelay);
    }
    if twap.step_max < 1 {
        return Err(ErrorCode::InvalidStepMax);
    }
    if twap.threshold < 0 || twap.threshold > MAX_TWAP_THRESHOLD {
        return Err(ErrorCode::InvalidThreshold);
    }
    Ok(())
}

fn validate_governance(governance: &GovernanceConfig) -> Result<(), ErrorCode> {
    if governance.max_outcomes < MIN_OUTCOMES || governance.max_outcomes > MAX_OUTCOMES {
        return Err(ErrorCode::InvalidOutcomeCount);
    }
    if governance.max_concurrent_proposals == 0
        || governance.max_proposer_funded > governance.max_concurrent_proposals
    {
        return Err(ErrorCode::InvalidAmount);
    }
    if governance.proposal_fee_per_outcome < 0 || governance.required_bond_amount < 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    Ok(())
}

pub fn set_trading_params(e: &Env, dao_id: u64, params: TradingParams) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    let mut config = dao.config.clone();
    config.trading = params;
    validate_config(&config)?;
    dao.config = config;
    update_dao(e, &dao);
    Ok(())
}

pub fn set_twap_config(e: &Env, dao_id: u64, twap: TwapConfig) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    let mut config = dao.config.clone();
    config.twap = twap;
    validate_config(&config)?;
    dao.config = config;
    update_dao(e, &dao);
    Ok(())
}

pub fn set_governance(e: &Env, dao_id: u64, governance: GovernanceConfig) -> Result<(), ErrorCode> {
    validate_governance(&governance)?;
    let mut dao = get_dao(e, dao_id)?;
    dao.config.governance = governance;
    update_dao(e, &dao);
    Ok(())
}

pub fn set_metadata(e: &Env, dao_id: u64, metadata: MetadataConfig) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    dao.config.metadata = metadata;
    update_dao(e, &dao);
    Ok(())
}

pub fn set_queue_params(
    e: &Env,
    dao_id: u64,
    max_concurrent: u32,
    max_proposer_funded: u32,
) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    let mut governance = dao.config.governance.clone();
    governance.max_concurrent_proposals = max_concurrent;
    governance.max_proposer_funded = max_proposer_funded;
    validate_governance(&governance)?;
    dao.config.governance = governance;
    update_dao(e, &dao);
    Ok(())
}

pub fn set_metadata_entry(e: &Env, dao_id: u64, key: String, value: String) {
    e.storage()
        .persistent()
        .set(&DataKey::MetadataEntry(dao_id, key), &value);
}

pub fn get_metadata_entry(e: &Env, dao_id: u64, key: String) -> Option<String> {
    e.storage()
        .persistent()
        .get(&DataKey::MetadataEntry(dao_id, key))
}

// ---------------------------------------------------------------------------
// Operational state
// ---------------------------------------------------------------------------

pub fn begin_dissolution(e: &Env, dao_id: u64) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    dao.operational_state = OperationalState::Dissolving;
    dao.proposal_creation_enabled = false;
    update_dao(e, &dao);
    Ok(())
}

pub fn cancel_dissolution(e: &Env, dao_id: u64) -> Result<(), ErrorCode> {
    let mut dao = get_dao(e, dao_id)?;
    if dao.operational_state != OperationalState::Dissolving {
        return Err(ErrorCode::NotDissolving);
    }
    dao.operational_state = OperationalState::Active;
    dao.proposal_creation_enabled = true;
    update_dao(e, &dao);
    Ok(())
}
