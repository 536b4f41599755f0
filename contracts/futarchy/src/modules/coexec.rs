use crate::errors::ErrorCode;
use crate::modules::{agreement, council, events};
use crate::types::{OaEdit, SetPolicyAction};
use soroban_sdk::{contracttype, xdr::ToXdr, Bytes, BytesN, Env, String, Vec};

/// Bilateral (DAO + council) commits over critical resources.
///
/// The DAO side arrives as an executed proposal action; the council side
/// is a weighted-multisig approval over the intent digest. Both are
/// checked and consumed in one invocation, so neither commits alone.

#[contracttype]
pub enum DataKey {
    /// (dao_id, resource key) -> custodian council
    Policy(u64, String),
    /// dao_id -> upgrade authority custody
    UpgradeCap(u64),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpgradeCustody {
    pub council_id: u64,
    pub locked: bool,
}

const KIND_SET_POLICY: u32 = 0;
const KIND_REMOVE_POLICY: u32 = 1;
const KIND_OA_BATCH: u32 = 2;
const KIND_UPGRADE_CAP: u32 = 3;

pub fn key_oa_custodian(e: &Env) -> String {
    String::from_str(e, "OA:Custodian")
}

pub fn key_upgrade_cap_custodian(e: &Env) -> String {
    String::from_str(e, "UpgradeCap:Custodian")
}

pub fn key_policy_registry_admin(e: &Env) -> String {
    String::from_str(e, "PolicyRegistry:Admin")
}

pub fn get_policy(e: &Env, dao_id: u64, resource_key: &String) -> Option<u64> {
    e.storage()
        .persistent()
        .get(&DataKey::Policy(dao_id, resource_key.clone()))
}

fn require_unexpired(e: &Env, expires_at_ms: u64) -> Result<(), ErrorCode> {
    if super::now_ms(e) >= expires_at_ms {
        return Err(ErrorCode::Expired);
    }
    Ok(())
}

fn digest_fields(e: &Env, dao_id: u64, kind: u32, body: Bytes, expires_at_ms: u64) -> BytesN<32> {
    let mut stream = Bytes::new(e);
    stream.append(&dao_id.to_xdr(e));
    stream.append(&kind.to_xdr(e));
    stream.append(&body);
    stream.append(&expires_at_ms.to_xdr(e));
    e.crypto().keccak256(&stream).to_bytes()
}

/// Digest a council must approve to co-sign a policy set.
pub fn set_policy_digest(
    e: &Env,
    dao_id: u64,
    resource_key: &String,
    new_council_id: u64,
    expires_at_ms: u64,
) -> BytesN<32> {
    let mut body = resource_key.clone().to_xdr(e);
    body.append(&new_council_id.to_xdr(e));
    digest_fields(e, dao_id, KIND_SET_POLICY, body, expires_at_ms)
}

pub fn remove_policy_digest(
    e: &Env,
    dao_id: u64,
    resource_key: &String,
    expires_at_ms: u64,
) -> BytesN<32> {
    let body = resource_key.clone().to_xdr(e);
    digest_fields(e, dao_id, KIND_REMOVE_POLICY, body, expires_at_ms)
}

pub fn oa_batch_digest(e: &Env, dao_id: u64, batch: &BytesN<32>, expires_at_ms: u64) -> BytesN<32> {
    let body = Bytes::from(batch.clone());
    digest_fields(e, dao_id, KIND_OA_BATCH, body, expires_at_ms)
}

pub fn upgrade_cap_digest(e: &Env, dao_id: u64, council_id: u64, expires_at_ms: u64) -> BytesN<32> {
    let body = council_id.to_xdr(e);
    digest_fields(e, dao_id, KIND_UPGRADE_CAP, body, expires_at_ms)
}

/// Genesis path: the DAO creator seeds policy entries before a
/// `PolicyRegistry:Admin` custodian exists. Once one is installed, all
/// changes go through co-execution.
pub fn set_initial_policy(
    e: &Env,
    dao_id: u64,
    resource_key: String,
    council_id: u64,
) -> Result<(), ErrorCode> {
    if get_policy(e, dao_id, &key_policy_registry_admin(e)).is_some() {
        return Err(ErrorCode::NotAuthorized);
    }
    council::get_council(e, council_id)?;
    e.storage()
        .persistent()
        .set(&DataKey::Policy(dao_id, resource_key), &council_id);
    Ok(())
}

/// Install a policy entry. Until a `PolicyRegistry:Admin` custodian
/// exists, a winning proposal installs policies unilaterally; once one
/// is set, every change needs its matching approval.
pub fn execute_set_policy(e: &Env, dao_id: u64, action: &SetPolicyAction) -> Result<(), ErrorCode> {
    require_unexpired(e, action.expires_at_ms)?;
    council::get_council(e, action.council_id)?;

    let admin_key = key_policy_registry_admin(e);
    if let Some(admin_council) = get_policy(e, dao_id, &admin_key) {
        let digest = set_policy_digest(
            e,
            dao_id,
            &action.resource_key,
            action.council_id,
            action.expires_at_ms,
        );
        council::require_approved(e, admin_council, &digest)?;
        council::consume_approval(e, admin_council, &digest);
        events::emit_coexecution(e, dao_id, admin_council, KIND_SET_POLICY);
    }

    e.storage().persistent().set(
        &DataKey::Policy(dao_id, action.resource_key.clone()),
        &action.council_id,
    );
    Ok(())
}

pub fn execute_remove_policy(
    e: &Env,
    dao_id: u64,
    resource_key: &String,
    expires_at_ms: u64,
) -> Result<(), ErrorCode> {
    require_unexpired(e, expires_at_ms)?;
    if get_policy(e, dao_id, resource_key).is_none() {
        return Err(ErrorCode::NoPolicy);
    }

    let admin_key = key_policy_registry_admin(e);
    if let Some(admin_council) = get_policy(e, dao_id, &admin_key) {
        let digest = remove_policy_digest(e, dao_id, resource_key, expires_at_ms);
        council::require_approved(e, admin_council, &digest)?;
        council::consume_approval(e, admin_council, &digest);
        events::emit_coexecution(e, dao_id, admin_council, KIND_REMOVE_POLICY);
    }

    e.storage()
        .persistent()
        .remove(&DataKey::Policy(dao_id, resource_key.clone()));
    Ok(())
}

/// Apply a batch of operating-agreement edits. The batch digest binds
/// the council approval to the exact edits; any divergence fails before
/// any line changes.
pub fn execute_oa_batch(
    e: &Env,
    dao_id: u64,
    edits: &Vec<OaEdit>,
    declared_digest: &BytesN<32>,
    expires_at_ms: u64,
) -> Result<(), ErrorCode> {
    require_unexpired(e, expires_at_ms)?;

    let custodian = get_policy(e, dao_id, &key_oa_custodian(e)).ok_or(ErrorCode::NoPolicy)?;

    let batch_digest = agreement::compute_batch_digest(e, edits);
    if batch_digest != *declared_digest {
        return Err(ErrorCode::DigestMismatch);
    }

    let intent = oa_batch_digest(e, dao_id, &batch_digest, expires_at_ms);
    council::require_approved(e, custodian, &intent)?;

    let applied = agreement::apply_batch(e, dao_id, edits)?;

    council::consume_approval(e, custodian, &intent);
    events::emit_coexecution(e, dao_id, custodian, KIND_OA_BATCH);
    events::emit_oa_batch_applied(e, dao_id, batch_digest, applied);
    Ok(())
}

pub fn upgrade_custody(e: &Env, dao_id: u64) -> Option<UpgradeCustody> {
    e.storage().persistent().get(&DataKey::UpgradeCap(dao_id))
}

/// Withdraw the DAO's upgrade authority into council custody and lock
/// it. Requires the `UpgradeCap:Custodian` policy to already name the
/// council, and its matching approval.
pub fn accept_and_lock_upgrade_cap(
    e: &Env,
    dao_id: u64,
    council_id: u64,
    expires_at_ms: u64,
) -> Result<(), ErrorCode> {
    require_unexpired(e, expires_at_ms)?;

    let custodian =
        get_policy(e, dao_id, &key_upgrade_cap_custodian(e)).ok_or(ErrorCode::NoPolicy)?;
    if custodian != council_id {
        return Err(ErrorCode::WrongCouncil);
    }
    if let Some(custody) = upgrade_custody(e, dao_id) {
        if custody.locked {
            return Err(ErrorCode::UpgradeCapLocked);
        }
    }

    let digest = upgrade_cap_digest(e, dao_id, council_id, expires_at_ms);
    council::require_approved(e, council_id, &digest)?;

    e.storage().persistent().set(
        &DataKey::UpgradeCap(dao_id),
        &UpgradeCustody {
            council_id,
            locked: true,
        },
    );

    council::consume_approval(e, council_id, &digest);
    events::emit_coexecution(e, dao_id, council_id, KIND_UPGRADE_CAP);
    Ok(())
}
