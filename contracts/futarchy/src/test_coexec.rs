#![cfg(test)]

use crate::test::{create_dao, run_accept_proposal, set_time_ms, setup, TestCtx};
use crate::types::{
    AcceptUpgradeCapAction, Action, CouncilMember, OaBatchAction, OaEdit, SetPolicyAction,
};
use crate::ErrorCode;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{Address, BytesN, String, Vec};

fn two_member_council(ctx: &TestCtx) -> (u64, Address, Address) {
    let member_a = Address::generate(&ctx.env);
    let member_b = Address::generate(&ctx.env);
    let council_id = ctx.client.create_council(
        &Vec::from_array(
            &ctx.env,
            [
                CouncilMember {
                    address: member_a.clone(),
                    weight: 1,
                },
                CouncilMember {
                    address: member_b.clone(),
                    weight: 2,
                },
            ],
        ),
        &2,
    );
    (council_id, member_a, member_b)
}

fn single_line_batch(ctx: &TestCtx, text: &str) -> Vec<OaEdit> {
    Vec::from_array(
        &ctx.env,
        [OaEdit {
            action_type: 0,
            line_id: None,
            text: Some(String::from_str(&ctx.env, text)),
            difficulty: Some(5),
        }],
    )
}

#[test]
fn test_council_creation_validation() {
    let ctx = setup();

    assert_eq!(
        ctx.client.try_create_council(&Vec::new(&ctx.env), &1),
        Err(Ok(ErrorCode::InvalidMemberSet))
    );

    let member = Address::generate(&ctx.env);
    let zero_weight = Vec::from_array(
        &ctx.env,
        [CouncilMember {
            address: member.clone(),
            weight: 0,
        }],
    );
    assert_eq!(
        ctx.client.try_create_council(&zero_weight, &1),
        Err(Ok(ErrorCode::InvalidMemberSet))
    );

    let duplicated = Vec::from_array(
        &ctx.env,
        [
            CouncilMember {
                address: member.clone(),
                weight: 1,
            },
            CouncilMember {
                address: member.clone(),
                weight: 1,
            },
        ],
    );
    assert_eq!(
        ctx.client.try_create_council(&duplicated, &1),
        Err(Ok(ErrorCode::InvalidMemberSet))
    );

    let solo = Vec::from_array(
        &ctx.env,
        [CouncilMember {
            address: member,
            weight: 3,
        }],
    );
    assert_eq!(
        ctx.client.try_create_council(&solo, &4),
        Err(Ok(ErrorCode::InvalidMemberSet))
    );
    let council_id = ctx.client.create_council(&solo, &3);
    assert_eq!(ctx.client.get_council(&council_id).unwrap().threshold, 3);
}

#[test]
fn test_weighted_approval_accumulates() {
    let ctx = setup();
    let (council_id, member_a, member_b) = two_member_council(&ctx);
    let digest = BytesN::from_array(&ctx.env, &[7u8; 32]);

    let weight = ctx
        .client
        .approve_council_intent(&council_id, &member_a, &digest, &1_000_000);
    assert_eq!(weight, 1);
    assert_eq!(
        ctx.client
            .try_approve_council_intent(&council_id, &member_a, &digest, &1_000_000),
        Err(Ok(ErrorCode::AlreadyApproved))
    );
    let weight = ctx
        .client
        .approve_council_intent(&council_id, &member_b, &digest, &1_000_000);
    assert_eq!(weight, 3);

    let outsider = Address::generate(&ctx.env);
    assert_eq!(
        ctx.client
            .try_approve_council_intent(&council_id, &outsider, &digest, &1_000_000),
        Err(Ok(ErrorCode::NotAuthorized))
    );
}

#[test]
fn test_approval_expiry_checked() {
    let ctx = setup();
    let (council_id, member_a, _) = two_member_council(&ctx);
    let digest = BytesN::from_array(&ctx.env, &[9u8; 32]);

    set_time_ms(&ctx.env, 2_000_000);
    assert_eq!(
        ctx.client
            .try_approve_council_intent(&council_id, &member_a, &digest, &2_000_000),
        Err(Ok(ErrorCode::Expired))
    );
}

#[test]
fn test_oa_batch_bilateral_commit() {
    let ctx = setup();
    let (dao_id, creator) = create_dao(&ctx);
    let (council_id, member_a, member_b) = two_member_council(&ctx);
    ctx.client.set_initial_policy(
        &creator,
        &dao_id,
        &String::from_str(&ctx.env, "OA:Custodian"),
        &council_id,
    );

    let edits = single_line_batch(&ctx, "Article 1: markets decide");
    let batch_digest = ctx.client.compute_oa_batch_digest(&edits);

    // Digesting is a pure function of the batch bytes.
    assert_eq!(batch_digest, ctx.client.compute_oa_batch_digest(&edits));
    let other = single_line_batch(&ctx, "Article 1: admins decide");
    assert_ne!(batch_digest, ctx.client.compute_oa_batch_digest(&other));

    let expires_at: u64 = 100_000_000;
    let intent = ctx
        .client
        .oa_intent_digest(&dao_id, &batch_digest, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_a, &intent, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_b, &intent, &expires_at);

    let actions = Vec::from_array(
        &ctx.env,
        [Action::OaBatch(OaBatchAction {
            edits,
            digest: batch_digest,
            expires_at_ms: expires_at,
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);
    ctx.client.execute_approved_proposal(&proposal_id);

    let line = ctx.client.get_oa_line(&dao_id, &1).unwrap();
    assert_eq!(line.text, String::from_str(&ctx.env, "Article 1: markets decide"));
    assert_eq!(line.difficulty, 5);
    assert_eq!(ctx.client.get_oa_line_order(&dao_id).len(), 1);
}

#[test]
fn test_oa_digest_mismatch_blocks_commit() {
    let ctx = setup();
    let (dao_id, creator) = create_dao(&ctx);
    let (council_id, member_a, member_b) = two_member_council(&ctx);
    ctx.client.set_initial_policy(
        &creator,
        &dao_id,
        &String::from_str(&ctx.env, "OA:Custodian"),
        &council_id,
    );

    let edits = single_line_batch(&ctx, "Article 1: markets decide");
    let wrong_digest = ctx
        .client
        .compute_oa_batch_digest(&single_line_batch(&ctx, "Article 1: admins decide"));

    let expires_at: u64 = 100_000_000;
    let intent = ctx
        .client
        .oa_intent_digest(&dao_id, &wrong_digest, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_a, &intent, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_b, &intent, &expires_at);

    let actions = Vec::from_array(
        &ctx.env,
        [Action::OaBatch(OaBatchAction {
            edits,
            digest: wrong_digest,
            expires_at_ms: expires_at,
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);

    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::DigestMismatch))
    );
    assert_eq!(ctx.client.get_oa_line(&dao_id, &1), None);
    assert!(!ctx.client.is_executed(&proposal_id));
}

#[test]
fn test_oa_batch_needs_council_weight() {
    let ctx = setup();
    let (dao_id, creator) = create_dao(&ctx);
    let (council_id, member_a, _) = two_member_council(&ctx);
    ctx.client.set_initial_policy(
        &creator,
        &dao_id,
        &String::from_str(&ctx.env, "OA:Custodian"),
        &council_id,
    );

    let edits = single_line_batch(&ctx, "Article 1: markets decide");
    let batch_digest = ctx.client.compute_oa_batch_digest(&edits);
    let expires_at: u64 = 100_000_000;

    // Only one of two required weights approves.
    let intent = ctx
        .client
        .oa_intent_digest(&dao_id, &batch_digest, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_a, &intent, &expires_at);

    let actions = Vec::from_array(
        &ctx.env,
        [Action::OaBatch(OaBatchAction {
            edits,
            digest: batch_digest,
            expires_at_ms: expires_at,
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);
    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::ThresholdNotMet))
    );
}

#[test]
fn test_upgrade_cap_custody_flow() {
    let ctx = setup();
    let (dao_id, _) = create_dao(&ctx);
    let (council_id, member_a, member_b) = two_member_council(&ctx);

    let expires_at: u64 = 1_000_000_000;
    let intent = ctx
        .client
        .upgrade_intent_digest(&dao_id, &council_id, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_a, &intent, &expires_at);
    ctx.client
        .approve_council_intent(&council_id, &member_b, &intent, &expires_at);

    // One sequence: name the custodian, then hand over the authority.
    let actions = Vec::from_array(
        &ctx.env,
        [
            Action::SetPolicy(SetPolicyAction {
                resource_key: String::from_str(&ctx.env, "UpgradeCap:Custodian"),
                council_id,
                expires_at_ms: expires_at,
            }),
            Action::AcceptUpgradeCap(AcceptUpgradeCapAction {
                council_id,
                expires_at_ms: expires_at,
            }),
        ],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);
    ctx.client.execute_approved_proposal(&proposal_id);

    assert_eq!(
        ctx.client
            .get_policy(&dao_id, &String::from_str(&ctx.env, "UpgradeCap:Custodian")),
        Some(council_id)
    );
    let custody = ctx.client.get_upgrade_custody(&dao_id).unwrap();
    assert_eq!(custody.council_id, council_id);
    assert!(custody.locked);
}

#[test]
fn test_policy_admin_gates_later_changes() {
    let ctx = setup();
    let (dao_id, creator) = create_dao(&ctx);
    let (council_id, _, _) = two_member_council(&ctx);

    ctx.client.set_initial_policy(
        &creator,
        &dao_id,
        &String::from_str(&ctx.env, "PolicyRegistry:Admin"),
        &council_id,
    );

    // The genesis path closes once an admin custodian exists.
    assert_eq!(
        ctx.client.try_set_initial_policy(
            &creator,
            &dao_id,
            &String::from_str(&ctx.env, "Vault:AllowedCoinTypes"),
            &council_id
        ),
        Err(Ok(ErrorCode::NotAuthorized))
    );

    // And an unapproved policy change action no longer commits.
    let actions = Vec::from_array(
        &ctx.env,
        [Action::SetPolicy(SetPolicyAction {
            resource_key: String::from_str(&ctx.env, "Vault:AllowedCoinTypes"),
            council_id,
            expires_at_ms: 1_000_000_000,
        })],
    );
    let proposal_id = run_accept_proposal(&ctx, dao_id, actions);
    assert_eq!(
        ctx.client.try_execute_approved_proposal(&proposal_id),
        Err(Ok(ErrorCode::ProposalNotApproved))
    );
}
