use crate::errors::ErrorCode;
use crate::types::{Council, CouncilMember};
use soroban_sdk::{contracttype, Address, BytesN, Env, Vec};

#[contracttype]
pub enum DataKey {
    Council(u64),
    CouncilCount,
    /// (council_id, intent digest) -> accumulated approval
    Approval(u64, BytesN<32>),
}

/// Weight gathered so far for one intent digest.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApprovalRecord {
    pub total_weight: u64,
    pub approvers: Vec<Address>,
    pub expires_at_ms: u64,
}

pub fn create_council(
    e: &Env,
    members: Vec<CouncilMember>,
    threshold: u64,
) -> Result<u64, ErrorCode> {
    if members.is_empty() || threshold == 0 {
        return Err(ErrorCode::InvalidMemberSet);
    }
    let mut total_weight: u64 = 0;
    for i in 0..members.len() {
        let member = members.get_unchecked(i);
        if member.weight == 0 {
            return Err(ErrorCode::InvalidMemberSet);
        }
        for j in (i + 1)..members.len() {
            if members.get_unchecked(j).address == member.address {
                return Err(ErrorCode::InvalidMemberSet);
            }
        }
        total_weight += member.weight;
    }
    if threshold > total_weight {
        return Err(ErrorCode::InvalidMemberSet);
    }

    let mut count: u64 = e
        .storage()
        .instance()
        .get(&DataKey::CouncilCount)
        .unwrap_or(0);
    count += 1;

    let council = Council {
        id: count,
        members,
        threshold,
    };
    e.storage().persistent().set(&DataKey::Council(count), &council);
    e.storage().instance().set(&DataKey::CouncilCount, &count);
    Ok(count)
}

pub fn get_council(e: &Env, council_id: u64) -> Result<Council, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Council(council_id))
        .ok_or(ErrorCode::CouncilNotFound)
}

fn member_weight(council: &Council, member: &Address) -> Option<u64> {
    for i in 0..council.members.len() {
        let candidate = council.members.get_unchecked(i);
        if candidate.address == *member {
            return Some(candidate.weight);
        }
    }
    None
}

/// A member backs an intent digest with their weight. The first approval
/// fixes the expiry; approving twice is rejected.
pub fn approve_intent(
    e: &Env,
    council_id: u64,
    member: Address,
    digest: BytesN<32>,
    expires_at_ms: u64,
) -> Result<u64, ErrorCode> {
    member.require_auth();
    let council = get_council(e, council_id)?;
    let weight = member_weight(&council, &member).ok_or(ErrorCode::NotAuthorized)?;

    if super::now_ms(e) >= expires_at_ms {
        return Err(ErrorCode::Expired);
    }

    let key = DataKey::Approval(council_id, digest);
    let mut record: ApprovalRecord = e.storage().persistent().get(&key).unwrap_or(ApprovalRecord {
        total_weight: 0,
        approvers: Vec::new(e),
        expires_at_ms,
    });

    for i in 0..record.approvers.len() {
        if record.approvers.get_unchecked(i) == member {
            return Err(ErrorCode::AlreadyApproved);
        }
    }
    record.total_weight += weight;
    record.approvers.push_back(member);
    e.storage().persistent().set(&key, &record);
    Ok(record.total_weight)
}

pub fn approval_weight(e: &Env, council_id: u64, digest: &BytesN<32>) -> u64 {
    e.storage()
        .persistent()
        .get::<DataKey, ApprovalRecord>(&DataKey::Approval(council_id, digest.clone()))
        .map(|record| record.total_weight)
        .unwrap_or(0)
}

/// Threshold-and-expiry check used by the co-execution endpoints.
pub fn require_approved(
    e: &Env,
    council_id: u64,
    digest: &BytesN<32>,
) -> Result<(), ErrorCode> {
    let council = get_council(e, council_id)?;
    let record: ApprovalRecord = e
        .storage()
        .persistent()
        .get(&DataKey::Approval(council_id, digest.clone()))
        .ok_or(ErrorCode::ProposalNotApproved)?;
    if super::now_ms(e) >= record.expires_at_ms {
        return Err(ErrorCode::Expired);
    }
    if record.total_weight < council.threshold {
        return Err(ErrorCode::ThresholdNotMet);
    }
    Ok(())
}

/// Approvals are one-shot: the committing side removes the record.
pub fn consume_approval(e: &Env, council_id: u64, digest: &BytesN<32>) {
    e.storage()
        .persistent()
        .remove(&DataKey::Approval(council_id, digest.clone()));
}
