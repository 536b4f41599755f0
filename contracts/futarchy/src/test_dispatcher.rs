#![cfg(test)]

use crate::test::{
    advance_to_trading, create_dao, finalize, mint, run_accept_proposal, set_time_ms, setup,
    submit_immediate, token_balance, trade_accept_up, TestCtx,
};
use crate::types::{
    Action, AddLiquidityAction, CancelDissolutionAction, CancelStreamAction, FullDissolutionAction,
    GovernanceUpdateAction, OperationalState, RecurringPaymentAction, TransferAction,
    TwapConfigUpdateAction, TwapConfig,
};
use crate::ErrorCode;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, Vec};

fn fund_treasury_stable(ctx: &TestCtx, dao_id: u64, amount: i128) {
    let backer = Address::generate(&ctx.env);
    mint(ctx, &ctx.stable_token, &backer, amount);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &amount);
}

#[test]
fn test_execute_transfer_and_stream() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    fund_treasury_stable(&ctx, dao_id, 1_000_000);

    let recipient = Address::generate(&ctx.env);
    let actions = Vec::from_array(
        &ctx.env,
        [
            Action::Transfer(TransferAction {
                token: ctx.stable_token.clone(),
                recipient: recipient.clone(),
                amount: 50_000,
            }),
            Action::RecurringPayment(RecurringPaymentAction {
                recipient: recipient.clone(),
                token: ctx.stable_token.clone(),
                amount_per_epoch: 10_000,
                num_epochs: 3,
                epoch_duration_ms: 86_400_000,
                cancellable: true,
            }),
        ],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);

    let executed = ctx.client.execute_approved_proposal(&proposal_id);
    assert_eq!(executed, 2);
    assert!(ctx.client.is_executed(&proposal_id));
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 50_000);

    let stream = ctx.client.get_stream(&1).unwrap();
    assert_eq!(stream.epochs_remaining, 3);
    assert_eq!(
        ctx.client.try_claim_stream_payment(&1),
        Err(Ok(ErrorCode::NothingDue))
    );

    set_time_ms(&ctx.env, stream.next_claim_ms);
    let paid = ctx.client.claim_stream_payment(&1);
    assert_eq!(paid, 10_000);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 60_000);
    assert_eq!(ctx.client.get_stream(&1).unwrap().epochs_remaining, 2);

    // A later proposal cancels the stream; the unvested remainder stays
    // in the treasury.
    let cancel = Vec::from_array(
        &ctx.env,
        [Action::CancelStream(CancelStreamAction { stream_id: 1 })],
    );
    let cancel_proposal = run_accept_proposal(&ctx, dao_id, cancel);
    ctx.client.execute_approved_proposal(&cancel_proposal);

    assert_eq!(ctx.client.get_stream(&1), None);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 60_000);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.stable_token),
        940_000
    );
}

#[test]
fn test_reject_win_is_advisory() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    fund_treasury_stable(&ctx, dao_id, 100_000);

    let recipient = Address::generate(&ctx.env);
    let (proposal_id, proposer) = submit_immediate(&ctx, dao_id);
    ctx.client.register_actions(
        &proposer,
        &proposal_id,
        &1,
        &Vec::from_array(
            &ctx.env,
            [Action::Transfer(TransferAction {
                token: ctx.stable_token.clone(),
                recipient: recipient.clone(),
                amount: 100_000,
            })],
        ),
    );
    advance_to_trading(&ctx, proposal_id);
    finalize(&ctx, proposal_id);

    let executed = ctx.client.execute_approved_proposal(&proposal_id);
    assert_eq!(executed, 0);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 0);
    assert!(ctx.client.is_executed(&proposal_id));
}

#[test]
fn test_execution_is_one_shot() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    fund_treasury_stable(&ctx, dao_id, 200_000);

    let recipient = Address::generate(&ctx.env);
    let actions = Vec::from_array(
        &ctx.env,
        [Action::Transfer(TransferAction {
            token: ctx.stable_token.clone(),
            recipient: recipient.clone(),
            amount: 75_000,
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);

    ctx.client.execute_approved_proposal(&proposal_id);
    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::AlreadyFinalized))
    );
    // Exactly one application.
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 75_000);
}

#[test]
fn test_execute_requires_finalization() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);

    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::MarketNotFinalized))
    );
}

#[test]
fn test_missing_sequence_fails() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    set_time_ms(&ctx.env, proposal.trading_start_ms.unwrap() + 10_000);
    trade_accept_up(&ctx, proposal_id);
    finalize(&ctx, proposal_id);

    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::NoIntentKey))
    );
}

#[test]
fn test_register_actions_proposer_only() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);

    let outsider = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client.try_register_actions(
            &outsider,
            &proposal_id,
            &1,
            &Vec::from_array(
                &ctx.env,
                [Action::CancelStream(CancelStreamAction { stream_id: 1 })]
            )
        ),
        Err(Ok(ErrorCode::NotAuthorized))
    );
}

#[test]
fn test_invalid_config_action_aborts_sequence() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    fund_treasury_stable(&ctx, dao_id, 100_000);

    let recipient = Address::generate(&ctx.env);
    let actions = Vec::from_array(
        &ctx.env,
        [
            Action::Transfer(TransferAction {
                token: ctx.stable_token.clone(),
                recipient: recipient.clone(),
                amount: 10_000,
            }),
            // 61s is not aligned to the minute grid.
            Action::TwapConfigUpdate(TwapConfigUpdateAction {
                twap: TwapConfig {
                    start_delay_ms: 61_000,
                    step_max: 50,
                    threshold: 100,
                },
            }),
        ],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);

    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::InvalidTwapDelay))
    );
    // Atomic: the transfer before the bad action did not stick.
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &recipient), 0);
    assert!(!ctx.client.is_executed(&proposal_id));
}

#[test]
fn test_governance_update_action() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let mut governance = ctx.client.get_dao(&dao_id).unwrap().config.governance;
    governance.proposal_fee_per_outcome = 2_500;
    let actions = Vec::from_array(
        &ctx.env,
        [Action::GovernanceUpdate(GovernanceUpdateAction {
            governance: governance.clone(),
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);
    ctx.client.execute_approved_proposal(&proposal_id);

    assert_eq!(
        ctx.client
            .get_dao(&dao_id)
            .unwrap()
            .config
            .governance
            .proposal_fee_per_outcome,
        2_500
    );
}

#[test]
fn test_liquidity_actions_check_pool_id() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let backer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &backer, 50_000);
    mint(&ctx, &ctx.stable_token, &backer, 50_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.asset_token, &50_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &50_000);

    let wrong = Vec::from_array(
        &ctx.env,
        [Action::AddLiquidity(AddLiquidityAction {
            pool_id: 9_999,
            asset_amount: 10_000,
            stable_amount: 10_000,
        })],
    );
    let bad_proposal = run_accept_proposal(&ctx, dao_id, wrong);
    assert_eq!(
        ctx.client.try_execute_approved_proposal(&bad_proposal),
        Err(Ok(ErrorCode::PoolIdMismatch))
    );

    let pool_id = ctx.client.get_dao(&dao_id).unwrap().liquidity_pool_id;
    let good = Vec::from_array(
        &ctx.env,
        [Action::AddLiquidity(AddLiquidityAction {
            pool_id,
            asset_amount: 10_000,
            stable_amount: 10_000,
        })],
    );
    let good_proposal = run_accept_proposal(&ctx, dao_id, good);
    ctx.client.execute_approved_proposal(&good_proposal);

    let pool = ctx.client.get_dao_liquidity(&dao_id);
    assert_eq!(pool.asset, 10_000);
    assert_eq!(pool.stable, 10_000);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.asset_token),
        40_000
    );
}

#[test]
fn test_dissolution_and_cancellation() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    fund_treasury_stable(&ctx, dao_id, 300_000);

    let heir = Address::generate(&ctx.env);

    // Two concurrent proposals: one dissolves, one cancels.
    let (dissolve_id, proposer_a) = submit_immediate(&ctx, dao_id);
    ctx.client.register_actions(
        &proposer_a,
        &dissolve_id,
        &1,
        &Vec::from_array(
            &ctx.env,
            [Action::FullDissolution(FullDissolutionAction {
                recipient: heir.clone(),
            })],
        ),
    );
    let (cancel_id, proposer_b) = submit_immediate(&ctx, dao_id);
    ctx.client.register_actions(
        &proposer_b,
        &cancel_id,
        &1,
        &Vec::from_array(
            &ctx.env,
            [Action::CancelDissolution(CancelDissolutionAction { dao_id })],
        ),
    );

    for proposal_id in [dissolve_id, cancel_id] {
        advance_to_trading(&ctx, proposal_id);
        let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
        set_time_ms(&ctx.env, proposal.trading_start_ms.unwrap() + 10_000);
        trade_accept_up(&ctx, proposal_id);
        finalize(&ctx, proposal_id);
    }

    ctx.client.execute_approved_proposal(&dissolve_id);
    let dao = ctx.client.get_dao(&dao_id).unwrap();
    assert_eq!(dao.operational_state, OperationalState::Dissolving);
    assert!(!dao.proposal_creation_enabled);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &heir), 300_000);

    // Only dissolution actions run while dissolving; the cancel is one.
    ctx.client.execute_approved_proposal(&cancel_id);
    let dao = ctx.client.get_dao(&dao_id).unwrap();
    assert_eq!(dao.operational_state, OperationalState::Active);
    assert!(dao.proposal_creation_enabled);
}
