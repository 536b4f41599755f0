#![cfg(test)]

use crate::test::{binary_data, create_dao, mint, set_time_ms, setup, setup_with_fees, token_balance};
use crate::types::{OperationalState, FEE_UPDATE_DELAY_MS, MONTHLY_FEE_PERIOD_MS};
use crate::{ErrorCode, FeePurpose};
use soroban_sdk::testutils::Address as _;
use soroban_sdk::Address;

#[test]
fn test_recurring_fee_pause_and_recovery() {
    let ctx = setup_with_fees(0, 0, 0, 10_000_000);
    let (dao_id, _) = create_dao(&ctx);
    let due = MONTHLY_FEE_PERIOD_MS;

    let backer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &backer, 5_000_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &5_000_000);

    assert_eq!(
        ctx.client.try_collect_dao_platform_fee(&dao_id),
        Err(Ok(ErrorCode::RecurringFeeNotDue))
    );

    set_time_ms(&ctx.env, due);
    let (unchanged, collected) = ctx.client.collect_dao_platform_fee(&dao_id);
    assert_eq!(unchanged, due);
    assert!(!collected);

    let dao = ctx.client.get_dao(&dao_id).unwrap();
    assert!(!dao.proposal_creation_enabled);
    assert_eq!(dao.operational_state, OperationalState::Paused);

    // Paused DAOs refuse submissions.
    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 200_000);
    mint(&ctx, &ctx.stable_token, &proposer, 200_000);
    assert_eq!(
        ctx.client.try_submit_to_queue(
            &proposer,
            &dao_id,
            &binary_data(&ctx.env),
            &0,
            &0,
            &false,
            &200_000,
            &200_000
        ),
        Err(Ok(ErrorCode::ProposalCreationDisabled))
    );

    // Topping up the treasury lets the next collection succeed and
    // unpause.
    mint(&ctx, &ctx.stable_token, &backer, 15_000_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &15_000_000);
    let (advanced, collected) = ctx.client.collect_dao_platform_fee(&dao_id);
    assert!(collected);
    assert_eq!(advanced, due + MONTHLY_FEE_PERIOD_MS);

    let dao = ctx.client.get_dao(&dao_id).unwrap();
    assert!(dao.proposal_creation_enabled);
    assert_eq!(dao.operational_state, OperationalState::Active);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.stable_token),
        10_000_000
    );
    assert_eq!(ctx.client.get_stable_fee_balance(&ctx.stable_token), 10_000_000);
}

#[test]
fn test_overdue_months_accumulate() {
    let ctx = setup_with_fees(0, 0, 0, 10_000_000);
    let (dao_id, _) = create_dao(&ctx);

    let backer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &backer, 40_000_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &40_000_000);

    // Two and a half periods past the first due date: three months owed.
    set_time_ms(&ctx.env, MONTHLY_FEE_PERIOD_MS * 7 / 2);
    let (advanced, collected) = ctx.client.collect_dao_platform_fee(&dao_id);
    assert!(collected);
    assert_eq!(advanced, MONTHLY_FEE_PERIOD_MS * 4);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.stable_token),
        10_000_000
    );
}

#[test]
fn test_monthly_fee_update_is_delayed() {
    let ctx = setup_with_fees(0, 0, 0, 10_000_000);
    let (dao_id, _) = create_dao(&ctx);

    let backer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &backer, 200_000_000);
    ctx.client
        .deposit_treasury(&backer, &dao_id, &ctx.stable_token, &200_000_000);

    ctx.client.set_dao_monthly_fee(&20_000_000);
    let pending = ctx.client.get_pending_fee_update().unwrap();
    assert_eq!(pending.new_fee, 20_000_000);
    assert_eq!(pending.effective_ms, FEE_UPDATE_DELAY_MS);

    // The first collection predates the effectivity point: old rate.
    set_time_ms(&ctx.env, MONTHLY_FEE_PERIOD_MS);
    ctx.client.collect_dao_platform_fee(&dao_id);
    assert_eq!(ctx.client.get_monthly_fee(), 10_000_000);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.stable_token),
        190_000_000
    );

    // Past the delay the pending value applies lazily, covering all six
    // months owed at the new rate.
    set_time_ms(&ctx.env, MONTHLY_FEE_PERIOD_MS * 7);
    let (advanced, collected) = ctx.client.collect_dao_platform_fee(&dao_id);
    assert!(collected);
    assert_eq!(ctx.client.get_monthly_fee(), 20_000_000);
    assert_eq!(ctx.client.get_pending_fee_update(), None);
    assert_eq!(advanced, MONTHLY_FEE_PERIOD_MS * 8);
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.stable_token),
        70_000_000
    );
}

#[test]
fn test_protocol_fee_channels_exact_match() {
    let ctx = setup_with_fees(0, 0, 7_000, 0);
    let payer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &payer, 20_000);

    assert_eq!(
        ctx.client
            .try_deposit_protocol_fee(&payer, &FeePurpose::Verification, &6_999),
        Err(Ok(ErrorCode::InvalidPayment))
    );
    assert_eq!(
        ctx.client
            .try_deposit_protocol_fee(&payer, &FeePurpose::Verification, &7_001),
        Err(Ok(ErrorCode::InvalidPayment))
    );
    ctx.client
        .deposit_protocol_fee(&payer, &FeePurpose::Verification, &7_000);
    assert_eq!(ctx.client.get_protocol_fee_balance(), 7_000);

    let receiver = Address::generate(&ctx.env);
    let withdrawn = ctx.client.withdraw_protocol_fees(&receiver);
    assert_eq!(withdrawn, 7_000);
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &receiver), 7_000);
    assert_eq!(ctx.client.get_protocol_fee_balance(), 0);
}

#[test]
fn test_withdraw_absent_stable_type_is_noop() {
    let ctx = setup();
    let receiver = Address::generate(&ctx.env);
    let withdrawn = ctx.client.withdraw_stable_fees(&ctx.stable_token, &receiver);
    assert_eq!(withdrawn, 0);
}
