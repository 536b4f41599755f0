#![cfg(test)]

use crate::types::{
    DaoConfig, GovernanceConfig, MetadataConfig, ProposalData, ProposalState, TradingParams,
    TwapConfig,
};
use crate::{ErrorCode, Futarchy, FutarchyClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{token, Address, Env, String, Vec};

pub(crate) struct TestCtx {
    pub env: Env,
    pub client: FutarchyClient<'static>,
    pub admin: Address,
    pub fee_token: Address,
    pub asset_token: Address,
    pub stable_token: Address,
}

pub(crate) fn setup_with_fees(
    dao_creation_fee: i128,
    proposal_creation_fee: i128,
    verification_fee: i128,
    monthly_dao_fee: i128,
) -> TestCtx {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let fee_token = env
        .register_stellar_asset_contract_v2(token_admin.clone())
        .address();
    let asset_token = env
        .register_stellar_asset_contract_v2(token_admin.clone())
        .address();
    let stable_token = env
        .register_stellar_asset_contract_v2(token_admin)
        .address();

    let contract_id = env.register_contract(None, Futarchy);
    let client = FutarchyClient::new(&env, &contract_id);
    client.initialize(
        &admin,
        &fee_token,
        &dao_creation_fee,
        &proposal_creation_fee,
        &verification_fee,
        &monthly_dao_fee,
    );

    TestCtx {
        env,
        client,
        admin,
        fee_token,
        asset_token,
        stable_token,
    }
}

pub(crate) fn setup() -> TestCtx {
    setup_with_fees(0, 0, 0, 0)
}

pub(crate) fn mint(ctx: &TestCtx, token_addr: &Address, to: &Address, amount: i128) {
    token::StellarAssetClient::new(&ctx.env, token_addr).mint(to, &amount);
}

pub(crate) fn token_balance(ctx: &TestCtx, token_addr: &Address, who: &Address) -> i128 {
    token::Client::new(&ctx.env, token_addr).balance(who)
}

/// The ledger clock is seconds; protocol time is milliseconds.
pub(crate) fn set_time_ms(env: &Env, ms: u64) {
    env.ledger().with_mut(|li| li.timestamp = ms / 1000);
}

pub(crate) fn default_config(env: &Env) -> DaoConfig {
    DaoConfig {
        trading: TradingParams {
            min_asset_amount: 10_000,
            min_stable_amount: 10_000,
            review_period_ms: 600_000,
            trading_period_ms: 3_600_000,
            amm_total_fee_bps: 30,
        },
        twap: TwapConfig {
            start_delay_ms: 60_000,
            step_max: 1_000_000,
            threshold: 100,
        },
        governance: GovernanceConfig {
            max_outcomes: 3,
            max_concurrent_proposals: 2,
            max_proposer_funded: 2,
            proposal_fee_per_outcome: 0,
            required_bond_amount: 100_000_000,
        },
        metadata: MetadataConfig {
            name: String::from_str(env, "Meridian Collective"),
            description: String::from_str(env, "Treasury governed by markets"),
            icon_url: String::from_str(env, "ipfs://meridian/icon.png"),
        },
    }
}

pub(crate) fn binary_data(env: &Env) -> ProposalData {
    ProposalData {
        title: String::from_str(env, "Fund the grants program"),
        metadata: String::from_str(env, ""),
        outcome_messages: Vec::from_array(
            env,
            [String::from_str(env, "Reject"), String::from_str(env, "Accept")],
        ),
        outcome_details: Vec::from_array(
            env,
            [
                String::from_str(env, "Keep the treasury as is"),
                String::from_str(env, "Fund 50k to the grants program"),
            ],
        ),
        asset_amounts: Vec::from_array(env, [100_000i128, 100_000i128]),
        stable_amounts: Vec::from_array(env, [100_000i128, 100_000i128]),
    }
}

pub(crate) fn create_dao(ctx: &TestCtx) -> (u64, Address) {
    create_dao_with(ctx, default_config(&ctx.env), true)
}

pub(crate) fn create_dao_with(ctx: &TestCtx, config: DaoConfig, has_treasury: bool) -> (u64, Address) {
    let creator = Address::generate(&ctx.env);
    let dao_id = ctx.client.create_dao(
        &creator,
        &ctx.asset_token,
        &ctx.stable_token,
        &config,
        &has_treasury,
        &0,
    );
    (dao_id, creator)
}

/// Submit a binary proposal that materialises immediately with
/// proposer-supplied liquidity of 200k on each side.
pub(crate) fn submit_immediate(ctx: &TestCtx, dao_id: u64) -> (u64, Address) {
    let proposer = Address::generate(&ctx.env);
    mint(ctx, &ctx.asset_token, &proposer, 200_000);
    mint(ctx, &ctx.stable_token, &proposer, 200_000);
    let proposal_id = ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &0,
        &false,
        &200_000,
        &200_000,
    );
    (proposal_id, proposer)
}

pub(crate) fn advance_to_trading(ctx: &TestCtx, proposal_id: u64) {
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    let init = proposal.market_init_ms.unwrap();
    set_time_ms(&ctx.env, init + proposal.review_period_ms);
    ctx.client.advance_stage(&proposal_id);
}

pub(crate) fn finalize(ctx: &TestCtx, proposal_id: u64) {
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    let start = proposal.trading_start_ms.unwrap();
    set_time_ms(&ctx.env, start + proposal.trading_period_ms);
    ctx.client.advance_stage(&proposal_id);
}

/// Buy enough Accept-side asset to hold the instant price well above the
/// default threshold for the rest of the window.
pub(crate) fn trade_accept_up(ctx: &TestCtx, proposal_id: u64) -> Address {
    let trader = Address::generate(&ctx.env);
    mint(ctx, &ctx.stable_token, &trader, 1_200_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &1_200_000);
    ctx.client
        .swap_stable_to_asset(&trader, &proposal_id, &1, &1_120_000, &0);
    trader
}

/// Drive a binary proposal to a finalized Accept win with the given
/// action sequence registered on outcome 1.
pub(crate) fn run_accept_proposal(
    ctx: &TestCtx,
    dao_id: u64,
    actions: soroban_sdk::Vec<crate::types::Action>,
) -> u64 {
    let (proposal_id, proposer) = submit_immediate(ctx, dao_id);
    ctx.client
        .register_actions(&proposer, &proposal_id, &1, &actions);
    advance_to_trading(ctx, proposal_id);
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    set_time_ms(&ctx.env, proposal.trading_start_ms.unwrap() + 10_000);
    trade_accept_up(ctx, proposal_id);
    finalize(ctx, proposal_id);
    proposal_id
}

// ---------------------------------------------------------------------------

#[test]
fn test_binary_happy_path_accept_wins() {
    let ctx = setup();
    let (dao_id, _creator) = create_dao(&ctx);
    let (proposal_id, proposer) = submit_immediate(&ctx, dao_id);

    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(proposal.state, ProposalState::Review);
    assert_eq!(proposal.outcome_count, 2);

    // Both pools seeded with an even split of the 200k totals.
    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    assert_eq!(pool.asset_reserve, 100_000);
    assert_eq!(pool.stable_reserve, 100_000);

    advance_to_trading(&ctx, proposal_id);

    set_time_ms(&ctx.env, 610_000);
    let trader = trade_accept_up(&ctx, proposal_id);

    // 1_120_000 in at 30 bps against 100k/100k reserves.
    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    assert_eq!(pool.stable_reserve, 1_220_000);
    assert_eq!(pool.asset_reserve, 8_220);
    assert_eq!(pool.stable_reserve / pool.asset_reserve, 148);

    finalize(&ctx, proposal_id);
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(proposal.state, ProposalState::Finalized);
    assert_eq!(proposal.winning_outcome, Some(1));

    // Liquidity return: winning pool reserves plus the provider's
    // leftover conditional sets.
    assert_eq!(token_balance(&ctx, &ctx.asset_token, &proposer), 108_220);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &proposer), 1_320_000);

    // The trader exits winning-side tokens 1:1.
    ctx.client
        .redeem_winning_tokens(&trader, &proposal_id, &crate::types::Side::Asset, &91_780);
    ctx.client
        .redeem_winning_tokens(&trader, &proposal_id, &crate::types::Side::Stable, &80_000);
    assert_eq!(token_balance(&ctx, &ctx.asset_token, &trader), 91_780);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &trader), 80_000);

    let signer = Address::generate(&ctx.env);
    ctx.client.sign_result(&signer, &proposal_id);
    let info = ctx.client.get_proposal_info(&proposal_id).unwrap();
    assert_eq!(info.result, Some(String::from_str(&ctx.env, "Accept")));

    // Result signing is one-shot.
    assert_eq!(
        ctx.client.try_sign_result(&signer, &proposal_id),
        Err(Ok(ErrorCode::AlreadyExecuted))
    );
}

#[test]
fn test_no_trades_means_reject_wins() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);
    finalize(&ctx, proposal_id);

    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(proposal.winning_outcome, Some(0));
}

#[test]
fn test_outcome_message_conventions() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 600_000);
    mint(&ctx, &ctx.stable_token, &proposer, 600_000);

    let mut bad_first = binary_data(&ctx.env);
    bad_first.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Decline"),
            String::from_str(&ctx.env, "Accept"),
        ],
    );
    assert_eq!(
        ctx.client.try_submit_to_queue(
            &proposer, &dao_id, &bad_first, &0, &0, &false, &200_000, &200_000
        ),
        Err(Ok(ErrorCode::InvalidMessages))
    );

    let mut bad_second = binary_data(&ctx.env);
    bad_second.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Reject"),
            String::from_str(&ctx.env, "Approve"),
        ],
    );
    assert_eq!(
        ctx.client.try_submit_to_queue(
            &proposer, &dao_id, &bad_second, &0, &0, &false, &200_000, &200_000
        ),
        Err(Ok(ErrorCode::InvalidMessages))
    );

    // Three outcomes: only the first name is reserved.
    let mut ternary = binary_data(&ctx.env);
    ternary.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Reject"),
            String::from_str(&ctx.env, "Hire two engineers"),
            String::from_str(&ctx.env, "Hire one engineer"),
        ],
    );
    ternary.outcome_details = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
        ],
    );
    ternary.asset_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);
    ternary.stable_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);
    let proposal_id = ctx.client.submit_to_queue(
        &proposer, &dao_id, &ternary, &0, &0, &false, &600_000, &600_000,
    );
    assert_eq!(
        ctx.client.get_proposal(&proposal_id).unwrap().outcome_count,
        3
    );
}

#[test]
fn test_duplicate_outcome_messages_rejected() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let proposer = Address::generate(&ctx.env);

    let mut dup = binary_data(&ctx.env);
    dup.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Reject"),
            String::from_str(&ctx.env, "Reject"),
        ],
    );
    assert_eq!(
        ctx.client
            .try_submit_to_queue(&proposer, &dao_id, &dup, &0, &0, &false, &200_000, &200_000),
        Err(Ok(ErrorCode::InvalidMessages))
    );
}

#[test]
fn test_advance_stage_timing_and_idempotence() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);

    // Still in review.
    set_time_ms(&ctx.env, 599_000);
    assert_eq!(
        ctx.client.try_advance_stage(&proposal_id),
        Err(Ok(ErrorCode::TooEarly))
    );

    advance_to_trading(&ctx, proposal_id);
    set_time_ms(&ctx.env, 1_000_000);
    assert_eq!(
        ctx.client.try_advance_stage(&proposal_id),
        Err(Ok(ErrorCode::TooEarly))
    );

    finalize(&ctx, proposal_id);
    let before = ctx.client.get_proposal(&proposal_id).unwrap();

    // Advancing a finalized proposal is a no-op.
    ctx.client.advance_stage(&proposal_id);
    let after = ctx.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_config_validation_at_creation() {
    let ctx = setup();

    let mut misaligned = default_config(&ctx.env);
    misaligned.twap.start_delay_ms = 61_000;
    let creator = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client.try_create_dao(
            &creator,
            &ctx.asset_token,
            &ctx.stable_token,
            &misaligned,
            &true,
            &0
        ),
        Err(Ok(ErrorCode::InvalidTwapDelay))
    );

    // Zero delay is aligned and accepted.
    let mut zero_delay = default_config(&ctx.env);
    zero_delay.twap.start_delay_ms = 0;
    ctx.client.create_dao(
        &creator,
        &ctx.asset_token,
        &ctx.stable_token,
        &zero_delay,
        &true,
        &0,
    );

    // Minimums must strictly exceed the AMM floor.
    let mut floor = default_config(&ctx.env);
    floor.trading.min_asset_amount = 1_000;
    assert_eq!(
        ctx.client.try_create_dao(
            &creator,
            &ctx.asset_token,
            &ctx.stable_token,
            &floor,
            &true,
            &0
        ),
        Err(Ok(ErrorCode::InvalidMinAmounts))
    );

    // Trading window must clear the oracle warm-up.
    let mut tight = default_config(&ctx.env);
    tight.trading.trading_period_ms = 120_000;
    tight.twap.start_delay_ms = 60_000;
    assert_eq!(
        ctx.client.try_create_dao(
            &creator,
            &ctx.asset_token,
            &ctx.stable_token,
            &tight,
            &true,
            &0
        ),
        Err(Ok(ErrorCode::InvalidPeriod))
    );
}

#[test]
fn test_dao_creation_fee_exact_match() {
    let ctx = setup_with_fees(5_000, 0, 0, 0);
    let creator = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &creator, 10_000);
    let config = default_config(&ctx.env);

    assert_eq!(
        ctx.client.try_create_dao(
            &creator,
            &ctx.asset_token,
            &ctx.stable_token,
            &config,
            &true,
            &4_999
        ),
        Err(Ok(ErrorCode::InvalidPayment))
    );
    assert_eq!(
        ctx.client.try_create_dao(
            &creator,
            &ctx.asset_token,
            &ctx.stable_token,
            &config,
            &true,
            &5_001
        ),
        Err(Ok(ErrorCode::InvalidPayment))
    );

    ctx.client.create_dao(
        &creator,
        &ctx.asset_token,
        &ctx.stable_token,
        &config,
        &true,
        &5_000,
    );
    assert_eq!(ctx.client.get_protocol_fee_balance(), 5_000);
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &creator), 5_000);
}

#[test]
fn test_uninitialized_market_liquidity_minimums() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 200_000);
    mint(&ctx, &ctx.stable_token, &proposer, 200_000);

    // 15k total over two outcomes misses the 10k per-outcome minimum.
    assert_eq!(
        ctx.client.try_submit_to_queue(
            &proposer,
            &dao_id,
            &binary_data(&ctx.env),
            &0,
            &0,
            &false,
            &15_000,
            &200_000
        ),
        Err(Ok(ErrorCode::InvalidMinAmounts))
    );
}

#[test]
fn test_initialize_guarded() {
    let ctx = setup();
    let other = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client
            .try_initialize(&other, &ctx.fee_token, &0, &0, &0, &0),
        Err(Ok(ErrorCode::AlreadyInitialized))
    );
    assert_eq!(ctx.client.get_admin(), Some(ctx.admin.clone()));
}
