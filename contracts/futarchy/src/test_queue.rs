#![cfg(test)]

use crate::test::{
    advance_to_trading, binary_data, create_dao, create_dao_with, default_config, finalize, mint,
    set_time_ms, setup, submit_immediate, token_balance,
};
use crate::types::{ProposalState, STALE_DURATION_MS};
use crate::ErrorCode;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, String};

#[test]
fn test_dao_slot_mutex() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);

    let backer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &backer, 1_000_000);
    mint(&ctx, &ctx.stable_token, &backer, 1_000_000);
    ctx.client
        .deposit_dao_liquidity(&backer, &dao_id, &1_000_000, &1_000_000);

    // A activates immediately and takes the exclusive slot.
    let proposer_a = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer_a, 100_000_000);
    let proposal_a = ctx.client.submit_to_queue(
        &proposer_a,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &100_000_000,
        &true,
        &0,
        &0,
    );
    assert_eq!(
        ctx.client.get_proposal(&proposal_a).unwrap().state,
        ProposalState::Review
    );
    assert!(ctx.client.get_queue(&dao_id).dao_slot_in_use);
    // Immediate creation hands the bond straight back.
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &proposer_a), 100_000_000);
    assert_eq!(ctx.client.get_dao_liquidity(&dao_id).asset, 0);

    // B has to queue behind the slot.
    let proposer_b = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer_b, 100_000_000);
    let proposal_b = ctx.client.submit_to_queue(
        &proposer_b,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &100_000_000,
        &true,
        &0,
        &0,
    );
    assert_eq!(ctx.client.get_queue(&dao_id).entries.len(), 1);

    let activator = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client.try_activate_next_dao_funded(&activator, &dao_id),
        Err(Ok(ErrorCode::DaoSlotInUse))
    );

    // Finalizing A frees the slot and refills the pool in full.
    advance_to_trading(&ctx, proposal_a);
    finalize(&ctx, proposal_a);
    assert!(!ctx.client.get_queue(&dao_id).dao_slot_in_use);
    let pool = ctx.client.get_dao_liquidity(&dao_id);
    assert_eq!(pool.asset, 1_000_000);
    assert_eq!(pool.stable, 1_000_000);

    ctx.client.activate_next_dao_funded(&activator, &dao_id);
    assert_eq!(
        ctx.client.get_proposal(&proposal_b).unwrap().state,
        ProposalState::Review
    );
    assert!(ctx.client.get_queue(&dao_id).dao_slot_in_use);
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &proposer_b), 100_000_000);
}

#[test]
fn test_bond_required_for_dao_funded() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer, 50_000_000);

    assert_eq!(
        ctx.client.try_submit_to_queue(
            &proposer,
            &dao_id,
            &binary_data(&ctx.env),
            &0,
            &50_000_000,
            &true,
            &0,
            &0
        ),
        Err(Ok(ErrorCode::InvalidBond))
    );
}

fn fill_capacity_and_queue(ctx: &crate::test::TestCtx, dao_id: u64) -> u64 {
    // One-slot DAO: the first immediate submission occupies it.
    let (active, _) = submit_immediate(ctx, dao_id);
    active
}

#[test]
fn test_priority_order_fee_then_timestamp() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let active = fill_capacity_and_queue(&ctx, dao_id);

    let submit_named = |title: &str, fee: i128, at_ms: u64| -> u64 {
        set_time_ms(&ctx.env, at_ms);
        let proposer = Address::generate(&ctx.env);
        mint(&ctx, &ctx.fee_token, &proposer, fee);
        let mut data = binary_data(&ctx.env);
        data.title = String::from_str(&ctx.env, title);
        ctx.client
            .submit_to_queue(&proposer, &dao_id, &data, &fee, &0, &false, &0, &0)
    };

    let _low = submit_named("low fee", 10, 1_000);
    let high_early = submit_named("high fee early", 20, 2_000);
    let _high_late = submit_named("high fee late", 20, 3_000);

    advance_to_trading(&ctx, active);
    finalize(&ctx, active);

    let activator = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &activator, 200_000);
    mint(&ctx, &ctx.stable_token, &activator, 200_000);
    let popped =
        ctx.client
            .activate_next_proposer_funded(&activator, &dao_id, &200_000, &200_000);
    assert_eq!(popped, high_early);
    assert_eq!(
        ctx.client.get_proposal(&popped).unwrap().title,
        String::from_str(&ctx.env, "high fee early")
    );
}

#[test]
fn test_activator_reward_paid_from_fee() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let active = fill_capacity_and_queue(&ctx, dao_id);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer, 5_000_000);
    ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &5_000_000,
        &0,
        &false,
        &0,
        &0,
    );

    advance_to_trading(&ctx, active);
    finalize(&ctx, active);

    let activator = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &activator, 200_000);
    mint(&ctx, &ctx.stable_token, &activator, 200_000);
    ctx.client
        .activate_next_proposer_funded(&activator, &dao_id, &200_000, &200_000);

    assert_eq!(token_balance(&ctx, &ctx.fee_token, &activator), 1_000_000);
    assert_eq!(ctx.client.get_protocol_revenue(), 4_000_000);
}

#[test]
fn test_activate_wrong_funding_kind() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let _active = fill_capacity_and_queue(&ctx, dao_id);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer, 100_000_000);
    ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &100_000_000,
        &true,
        &0,
        &0,
    );

    let activator = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client
            .try_activate_next_proposer_funded(&activator, &dao_id, &200_000, &200_000),
        Err(Ok(ErrorCode::ProposalUsesDaoLiquidity))
    );
}

#[test]
fn test_stale_eviction_slashes_fee_and_bond() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let _active = fill_capacity_and_queue(&ctx, dao_id);

    set_time_ms(&ctx.env, 1_000_000);
    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer, 105_000_000);
    let queued = ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &5_000_000,
        &100_000_000,
        &true,
        &0,
        &0,
    );

    // The stale horizon itself is not enough.
    set_time_ms(&ctx.env, 1_000_000 + STALE_DURATION_MS);
    assert_eq!(
        ctx.client.try_evict_stale_proposal(&dao_id, &queued),
        Err(Ok(ErrorCode::StaleProposalNotYet))
    );

    set_time_ms(&ctx.env, 1_000_000 + STALE_DURATION_MS + 1_000);
    ctx.client.evict_stale_proposal(&dao_id, &queued);

    assert_eq!(ctx.client.get_queue(&dao_id).entries.len(), 0);
    assert_eq!(ctx.client.get_protocol_revenue(), 5_000_000);
    // Bond goes to the DAO treasury, denominated in the fee token.
    assert_eq!(
        ctx.client.get_treasury_balance(&dao_id, &ctx.fee_token),
        100_000_000
    );
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &proposer), 0);
}

#[test]
fn test_stale_eviction_without_treasury_returns_bond() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, false);
    let _active = fill_capacity_and_queue(&ctx, dao_id);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.fee_token, &proposer, 102_000_000);
    let queued = ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &2_000_000,
        &100_000_000,
        &true,
        &0,
        &0,
    );

    set_time_ms(&ctx.env, STALE_DURATION_MS + 1_000);
    ctx.client.evict_stale_proposal(&dao_id, &queued);

    // No treasury configured: the bond comes back, never burns.
    assert_eq!(token_balance(&ctx, &ctx.fee_token, &proposer), 100_000_000);
    assert_eq!(ctx.client.get_protocol_revenue(), 2_000_000);
}

#[test]
fn test_premarket_reservation_flow() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let (active, _) = submit_immediate(&ctx, dao_id);

    let proposer = Address::generate(&ctx.env);
    let queued = ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &0,
        &false,
        &0,
        &0,
    );

    advance_to_trading(&ctx, active);

    // Too far from the end of the current trading window.
    set_time_ms(&ctx.env, 700_000);
    assert_eq!(
        ctx.client
            .try_reserve_next_for_premarket(&dao_id, &active, &600_000),
        Err(Ok(ErrorCode::TooEarly))
    );

    set_time_ms(&ctx.env, 3_700_000);
    let reserved = ctx
        .client
        .reserve_next_for_premarket(&dao_id, &active, &600_000);
    assert_eq!(reserved, queued);
    assert_eq!(
        ctx.client.get_queue(&dao_id).reserved_proposal_id,
        Some(queued)
    );
    assert_eq!(
        ctx.client.get_proposal(&queued).unwrap().state,
        ProposalState::Premarket
    );
    assert_eq!(
        ctx.client
            .try_reserve_next_for_premarket(&dao_id, &active, &600_000),
        Err(Ok(ErrorCode::ReservationAlreadySet))
    );

    // The premarket window accepts new outcomes and rival details.
    let challenger = Address::generate(&ctx.env);
    ctx.client.add_outcome(
        &challenger,
        &queued,
        &String::from_str(&ctx.env, "Fund half"),
        &String::from_str(&ctx.env, "Half-size grants round"),
        &100_000,
        &100_000,
    );
    assert_eq!(ctx.client.get_proposal(&queued).unwrap().outcome_count, 3);

    assert_eq!(
        ctx.client.try_mutate_outcome(
            &challenger,
            &queued,
            &2,
            &String::from_str(&ctx.env, "Same author rewrite")
        ),
        Err(Ok(ErrorCode::SameCreator))
    );
    ctx.client.mutate_outcome(
        &proposer,
        &queued,
        &2,
        &String::from_str(&ctx.env, "Quarter-size grants round"),
    );
    let proposal = ctx.client.get_proposal(&queued).unwrap();
    assert_eq!(proposal.outcome_creators.get_unchecked(2), proposer);

    finalize(&ctx, active);

    let activator = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &activator, 300_000);
    mint(&ctx, &ctx.stable_token, &activator, 300_000);
    ctx.client
        .initialize_reserved_premarket(&activator, &dao_id, &300_000, &300_000);

    assert_eq!(
        ctx.client.get_proposal(&queued).unwrap().state,
        ProposalState::Review
    );
    assert_eq!(ctx.client.get_queue(&dao_id).reserved_proposal_id, None);
    assert_eq!(ctx.client.get_queue(&dao_id).active_concurrent, 1);
}

#[test]
fn test_queue_capacity_forces_queueing() {
    let ctx = setup();
    let mut config = default_config(&ctx.env);
    config.governance.max_concurrent_proposals = 1;
    config.governance.max_proposer_funded = 1;
    let (dao_id, _) = create_dao_with(&ctx, config, true);
    let (_active, _) = submit_immediate(&ctx, dao_id);

    let proposer = Address::generate(&ctx.env);
    mint(&ctx, &ctx.asset_token, &proposer, 200_000);
    mint(&ctx, &ctx.stable_token, &proposer, 200_000);
    let queued = ctx.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_data(&ctx.env),
        &0,
        &0,
        &false,
        &200_000,
        &200_000,
    );

    // Queued, not materialised: no proposal record yet.
    assert_eq!(ctx.client.get_proposal(&queued), None);
    assert_eq!(ctx.client.get_queue(&dao_id).entries.len(), 1);
    // And the proposer kept their coins.
    assert_eq!(token_balance(&ctx, &ctx.asset_token, &proposer), 200_000);
}
