#![cfg(test)]

use crate::test::{
    advance_to_trading, binary_data, create_dao, create_dao_with, default_config, finalize, mint,
    set_time_ms, setup, submit_immediate, token_balance,
};
use crate::types::Side;
use crate::ErrorCode;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, String, Vec};

#[test]
fn test_complete_set_roundtrip_conserves_backing() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &trader, 50_000);

    ctx.client
        .mint_complete_set_asset(&trader, &proposal_id, &50_000);
    let escrow = ctx.client.get_escrow(&proposal_id).unwrap();
    assert_eq!(escrow.asset_backing, 250_000);
    // Supply deltas are equal across outcomes.
    assert_eq!(escrow.asset_supplies.get_unchecked(0), 250_000);
    assert_eq!(escrow.asset_supplies.get_unchecked(1), 250_000);

    ctx.client
        .redeem_complete_set_asset(&trader, &proposal_id, &50_000);
    let escrow = ctx.client.get_escrow(&proposal_id).unwrap();
    assert_eq!(escrow.asset_backing, 200_000);
    assert_eq!(escrow.asset_supplies.get_unchecked(0), 200_000);
    assert_eq!(token_balance(&ctx, &ctx.asset_token, &trader), 50_000);
}

#[test]
fn test_redeem_incomplete_set_fails() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &trader, 10_000);
    ctx.client
        .mint_complete_set_asset(&trader, &proposal_id, &10_000);

    // Selling away one outcome's tokens breaks the set.
    set_time_ms(&ctx.env, 601_000);
    ctx.client
        .swap_asset_to_stable(&trader, &proposal_id, &1, &4_000, &0);

    assert_eq!(
        ctx.client
            .try_redeem_complete_set_asset(&trader, &proposal_id, &10_000),
        Err(Ok(ErrorCode::IncompleteSet))
    );
}

#[test]
fn test_swap_k_never_decreases() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);
    set_time_ms(&ctx.env, 601_000);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 500_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &500_000);

    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    let k_before = pool.asset_reserve * pool.stable_reserve;

    let out = ctx
        .client
        .swap_stable_to_asset(&trader, &proposal_id, &1, &250_000, &0);
    assert!(out > 0);

    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    let k_after = pool.asset_reserve * pool.stable_reserve;
    assert!(k_after >= k_before);

    // And again on the way back out.
    ctx.client
        .swap_asset_to_stable(&trader, &proposal_id, &1, &out, &0);
    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    assert!(pool.asset_reserve * pool.stable_reserve >= k_after);
}

#[test]
fn test_slippage_guard() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);
    set_time_ms(&ctx.env, 601_000);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 100_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &100_000);

    let quote = ctx.client.quote_stable_to_asset(&proposal_id, &1, &50_000);
    assert_eq!(
        ctx.client
            .try_swap_stable_to_asset(&trader, &proposal_id, &1, &50_000, &(quote + 1)),
        Err(Ok(ErrorCode::ExcessiveSlippage))
    );
    let out = ctx
        .client
        .swap_stable_to_asset(&trader, &proposal_id, &1, &50_000, &quote);
    assert_eq!(out, quote);
}

#[test]
fn test_step_cap_resists_late_spike() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.twap.step_max = 50;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 10_000_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &10_000_000);

    // A last-minute buy pushes the instant price past 10_000...
    set_time_ms(&ctx.env, 4_198_000);
    ctx.client
        .swap_stable_to_asset(&trader, &proposal_id, &1, &10_000_000, &0);
    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    assert!(pool.stable_reserve / pool.asset_reserve > 10_000);

    // ...but the next sample only moves one step from the anchor.
    set_time_ms(&ctx.env, 4_199_000);
    ctx.client
        .swap_asset_to_stable(&trader, &proposal_id, &1, &100, &0);
    let pool = ctx.client.get_pool(&proposal_id, &1).unwrap();
    assert_eq!(pool.oracle.last_price, 51);

    finalize(&ctx, proposal_id);
    let proposal = ctx.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(proposal.winning_outcome, Some(0));
}

#[test]
fn test_multi_outcome_argmax_winner() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 300_000);
    mint(&ctx, &ctx.stable_token, &proposer, 300_000);
    let mut data = binary_data(&ctx.env);
    data.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Reject"),
            String::from_str(&ctx.env, "Hire two engineers"),
            String::from_str(&ctx.env, "Hire one engineer"),
        ],
    );
    data.outcome_details = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
        ],
    );
    data.asset_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);
    data.stable_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);

    let proposal_id = ctx
        .client
        .submit_to_queue(&proposer, &dao_id, &data, &0, &0, &false, &300_000, &300_000);
    advance_to_trading(&ctx, proposal_id);

    set_time_ms(&ctx.env, 610_000);
    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 900_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &900_000);
    ctx.client
        .swap_stable_to_asset(&trader, &proposal_id, &2, &800_000, &0);

    finalize(&ctx, proposal_id);
    assert_eq!(
        ctx.client.get_proposal(&proposal_id).unwrap().winning_outcome,
        Some(2)
    );
}

#[test]
fn test_multi_outcome_tie_goes_to_reject() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 300_000);
    mint(&ctx, &ctx.stable_token, &proposer, 300_000);
    let mut data = binary_data(&ctx.env);
    data.outcome_messages = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, "Reject"),
            String::from_str(&ctx.env, "Plan A"),
            String::from_str(&ctx.env, "Plan B"),
        ],
    );
    data.outcome_details = Vec::from_array(
        &ctx.env,
        [
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
            String::from_str(&ctx.env, ""),
        ],
    );
    data.asset_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);
    data.stable_amounts = Vec::from_array(&ctx.env, [100_000i128, 100_000i128, 100_000i128]);

    let proposal_id = ctx
        .client
        .submit_to_queue(&proposer, &dao_id, &data, &0, &0, &false, &300_000, &300_000);
    advance_to_trading(&ctx, proposal_id);
    finalize(&ctx, proposal_id);

    // No trades: every oracle reads the same average, index 0 wins.
    assert_eq!(
        ctx.client.get_proposal(&proposal_id).unwrap().winning_outcome,
        Some(0)
    );
}

#[test]
fn test_swap_requires_trading_window() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 100_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &100_000);

    // Still in review.
    assert_eq!(
        ctx.client
            .try_swap_stable_to_asset(&trader, &proposal_id, &1, &10_000, &0),
        Err(Ok(ErrorCode::InvalidState))
    );

    advance_to_trading(&ctx, proposal_id);

    // Past the window end the pool refuses new samples.
    set_time_ms(&ctx.env, 4_200_000);
    assert_eq!(
        ctx.client
            .try_swap_stable_to_asset(&trader, &proposal_id, &1, &10_000, &0),
        Err(Ok(ErrorCode::Expired))
    );
}

#[test]
fn test_redeem_winning_requires_finalization() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 100_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &100_000);

    assert_eq!(
        ctx.client
            .try_redeem_winning_tokens(&trader, &proposal_id, &Side::Stable, &100_000),
        Err(Ok(ErrorCode::MarketNotFinalized))
    );

    finalize(&ctx, proposal_id);
    // Reject won; stable tokens on outcome 0 redeem 1:1.
    ctx.client
        .redeem_winning_tokens(&trader, &proposal_id, &Side::Stable, &100_000);
    assert_eq!(token_balance(&ctx, &ctx.stable_token, &trader), 100_000);
}

#[test]
fn test_losing_tokens_do_not_redeem() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (proposal_id, _) = submit_immediate(&ctx, dao_id);
    advance_to_trading(&ctx, proposal_id);

    let trader = Address::generate(&ctx.env);
    mint(&ctx, &ctx.stable_token, &trader, 100_000);
    ctx.client
        .mint_complete_set_stable(&trader, &proposal_id, &100_000);
    finalize(&ctx, proposal_id);

    // Winner is 0; outcome-1 holdings are worthless and the holder's
    // outcome-0 balance caps what can be claimed.
    ctx.client
        .redeem_winning_tokens(&trader, &proposal_id, &Side::Stable, &100_000);
    assert_eq!(
        ctx.client
            .try_redeem_winning_tokens(&trader, &proposal_id, &Side::Stable, &1),
        Err(Ok(ErrorCode::InsufficientBalance))
    );
}
