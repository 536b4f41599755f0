mod common;

use common::{balance, binary_proposal, config, mint, set_time_ms, setup};
use futarchy::types::{Action, ProposalState, Side, TransferAction};
use futarchy::ErrorCode;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, String, Vec};

/// Full governance round: create a DAO for an exact fee, run a binary
/// market where traders push Accept above the threshold, execute the
/// winning treasury transfer, and let holders exit their conditionals.
#[test]
fn test_full_governance_round() {
    let world = setup(5_000, 0);

    let creator = Address::generate(&world.env);
    mint(&world, &world.fee_token, &creator, 5_000);
    let dao_id = world.client.create_dao(
        &creator,
        &world.asset_token,
        &world.stable_token,
        &config(&world.env),
        &true,
        &5_000,
    );
    assert_eq!(world.client.get_protocol_fee_balance(), 5_000);

    let backer = Address::generate(&world.env);
    mint(&world, &world.stable_token, &backer, 500_000);
    world
        .client
        .deposit_treasury(&backer, &dao_id, &world.stable_token, &500_000);

    // Immediate creation: a slot is free and the proposer provides both
    // sides of the market liquidity.
    let proposer = Address::generate(&world.env);
    mint(&world, &world.asset_token, &proposer, 200_000);
    mint(&world, &world.stable_token, &proposer, 200_000);
    let proposal_id = world.client.submit_to_queue(
        &proposer,
        &dao_id,
        &binary_proposal(&world.env),
        &0,
        &0,
        &false,
        &200_000,
        &200_000,
    );

    let grantee = Address::generate(&world.env);
    world.client.register_actions(
        &proposer,
        &proposal_id,
        &1,
        &Vec::from_array(
            &world.env,
            [Action::Transfer(TransferAction {
                token: world.stable_token.clone(),
                recipient: grantee.clone(),
                amount: 50_000,
            })],
        ),
    );

    set_time_ms(&world, 600_000);
    world.client.advance_stage(&proposal_id);
    assert_eq!(
        world.client.get_proposal(&proposal_id).unwrap().state,
        ProposalState::Trading
    );

    // The market believes in the grants program.
    set_time_ms(&world, 610_000);
    let trader = Address::generate(&world.env);
    mint(&world, &world.stable_token, &trader, 1_200_000);
    world
        .client
        .mint_complete_set_stable(&trader, &proposal_id, &1_200_000);
    world
        .client
        .swap_stable_to_asset(&trader, &proposal_id, &1, &1_120_000, &0);

    // Too early to finalize; exactly at the window end it goes through.
    set_time_ms(&world, 4_199_000);
    assert_eq!(
        world.client.try_advance_stage(&proposal_id),
        Err(Ok(ErrorCode::TooEarly))
    );
    set_time_ms(&world, 4_200_000);
    world.client.advance_stage(&proposal_id);

    let proposal = world.client.get_proposal(&proposal_id).unwrap();
    assert_eq!(proposal.state, ProposalState::Finalized);
    assert_eq!(proposal.winning_outcome, Some(1));

    let signer = Address::generate(&world.env);
    world.client.sign_result(&signer, &proposal_id);
    assert_eq!(
        world.client.get_proposal_info(&proposal_id).unwrap().result,
        Some(String::from_str(&world.env, "Accept"))
    );

    world.client.execute_approved_proposal(&proposal_id);
    assert_eq!(balance(&world, &world.stable_token, &grantee), 50_000);
    assert_eq!(
        world.client.get_treasury_balance(&dao_id, &world.stable_token),
        450_000
    );

    // Winning conditionals exit 1:1; the proposer got the market
    // liquidity back at finalization.
    world
        .client
        .redeem_winning_tokens(&trader, &proposal_id, &Side::Asset, &91_780);
    assert_eq!(balance(&world, &world.asset_token, &trader), 91_780);
    assert_eq!(balance(&world, &world.asset_token, &proposer), 108_220);
    assert_eq!(balance(&world, &world.stable_token, &proposer), 1_320_000);
}

/// The recurring platform fee pauses an underfunded DAO and recovers
/// once the treasury is topped up.
#[test]
fn test_platform_fee_cycle() {
    let world = setup(0, 10_000_000);

    let creator = Address::generate(&world.env);
    let dao_id = world.client.create_dao(
        &creator,
        &world.asset_token,
        &world.stable_token,
        &config(&world.env),
        &true,
        &0,
    );

    let backer = Address::generate(&world.env);
    mint(&world, &world.stable_token, &backer, 5_000_000);
    world
        .client
        .deposit_treasury(&backer, &dao_id, &world.stable_token, &5_000_000);

    let due = world.client.get_dao(&dao_id).unwrap().next_fee_due_ms;
    set_time_ms(&world, due);
    let (_, collected) = world.client.collect_dao_platform_fee(&dao_id);
    assert!(!collected);
    assert!(!world.client.get_dao(&dao_id).unwrap().proposal_creation_enabled);

    mint(&world, &world.stable_token, &backer, 15_000_000);
    world
        .client
        .deposit_treasury(&backer, &dao_id, &world.stable_token, &15_000_000);
    let (advanced, collected) = world.client.collect_dao_platform_fee(&dao_id);
    assert!(collected);
    assert!(advanced > due);
    assert!(world.client.get_dao(&dao_id).unwrap().proposal_creation_enabled);
    assert_eq!(
        world.client.get_stable_fee_balance(&world.stable_token),
        10_000_000
    );

    let receiver = Address::generate(&world.env);
    assert_eq!(
        world.client.withdraw_stable_fees(&world.stable_token, &receiver),
        10_000_000
    );
    assert_eq!(balance(&world, &world.stable_token, &receiver), 10_000_000);
}
