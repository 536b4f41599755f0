use crate::errors::ErrorCode;
use crate::modules::{admin, dao, events, treasury};
use crate::types::{ConfigKey, OperationalState, FEE_UPDATE_DELAY_MS, MONTHLY_FEE_PERIOD_MS};
use soroban_sdk::{contracttype, token, Address, Env};

#[contracttype]
pub enum DataKey {
    /// Protocol fee-token balance accumulated from the deposit channels.
    ProtocolFeeBalance,
    /// Per-stable-type side-table, created on first deposit.
    StableFees(Address),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FeePurpose {
    DaoCreation,
    ProposalCreation,
    Verification,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingFeeUpdate {
    pub new_fee: i128,
    pub effective_ms: u64,
}

pub fn fee_token(e: &Env) -> Result<Address, ErrorCode> {
    e.storage()
        .persistent()
        .get(&ConfigKey::FeeToken)
        .ok_or(ErrorCode::AdminNotSet)
}

pub fn configured_fee(e: &Env, purpose: &FeePurpose) -> i128 {
    let key = match purpose {
        FeePurpose::DaoCreation => ConfigKey::DaoCreationFee,
        FeePurpose::ProposalCreation => ConfigKey::ProposalCreationFee,
        FeePurpose::Verification => ConfigKey::VerificationFee,
    };
    e.storage().persistent().get(&key).unwrap_or(0)
}

/// Take a protocol fee payment. The payment must exactly match the
/// configured fee for the purpose; callers refund their own change.
pub fn deposit_payment(
    e: &Env,
    payer: &Address,
    purpose: FeePurpose,
    amount: i128,
) -> Result<(), ErrorCode> {
    let expected = configured_fee(e, &purpose);
    if amount != expected {
        return Err(ErrorCode::InvalidPayment);
    }
    if amount == 0 {
        return Ok(());
    }
    let fee_token = fee_token(e)?;
    token::Client::new(e, &fee_token).transfer(payer, &e.current_contract_address(), &amount);

    let current: i128 = e
        .storage()
        .persistent()
        .get(&DataKey::ProtocolFeeBalance)
        .unwrap_or(0);
    e.storage()
        .persistent()
        .set(&DataKey::ProtocolFeeBalance, &(current + amount));
    Ok(())
}

pub fn protocol_fee_balance(e: &Env) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::ProtocolFeeBalance)
        .unwrap_or(0)
}

/// Admin withdraws the full protocol fee-token balance.
pub fn withdraw_protocol_fees(e: &Env, to: &Address) -> Result<i128, ErrorCode> {
    admin::require_admin(e)?;
    let amount = protocol_fee_balance(e);
    if amount > 0 {
        e.storage().persistent().set(&DataKey::ProtocolFeeBalance, &0i128);
        let fee_token = fee_token(e)?;
        token::Client::new(e, &fee_token).transfer(&e.current_contract_address(), to, &amount);
    }
    Ok(amount)
}

pub fn stable_fee_balance(e: &Env, token_addr: &Address) -> i128 {
    e.storage()
        .persistent()
        .get(&DataKey::StableFees(token_addr.clone()))
        .unwrap_or(0)
}

pub fn credit_stable(e: &Env, token_addr: &Address, amount: i128) {
    let key = DataKey::StableFees(token_addr.clone());
    let current: i128 = e.storage().persistent().get(&key).unwrap_or(0);
    e.storage().persistent().set(&key, &(current + amount));
}

/// Withdraw one stable type's accumulated fees. Withdrawing a type that
/// was never deposited is a no-op, not an error.
pub fn withdraw_stable_fees(e: &Env, token_addr: &Address, to: &Address) -> Result<i128, ErrorCode> {
    admin::require_admin(e)?;
    let key = DataKey::StableFees(token_addr.clone());
    let amount: i128 = match e.storage().persistent().get(&key) {
        Some(v) => v,
        None => return Ok(0),
    };
    if amount > 0 {
        e.storage().persistent().set(&key, &0i128);
        token::Client::new(e, token_addr).transfer(&e.current_contract_address(), to, &amount);
    }
    Ok(amount)
}

// ---------------------------------------------------------------------------
// Recurring DAO fee
// ---------------------------------------------------------------------------

pub fn monthly_fee(e: &Env) -> i128 {
    e.storage()
        .persistent()
        .get(&ConfigKey::MonthlyDaoFee)
        .unwrap_or(0)
}

/// Schedule a monthly-fee change. The new value only takes effect after
/// the update delay, applied lazily by the next collection that crosses
/// the effective timestamp.
pub fn set_monthly_fee(e: &Env, new_fee: i128) -> Result<(), ErrorCode> {
    admin::require_admin(e)?;
    if new_fee < 0 {
        return Err(ErrorCode::InvalidAmount);
    }
    let effective_ms = super::now_ms(e) + FEE_UPDATE_DELAY_MS;
    let pending = PendingFeeUpdate { new_fee, effective_ms };
    e.storage().persistent().set(&ConfigKey::PendingFeeUpdate, &pending);
    events::emit_fee_update_scheduled(e, new_fee, effective_ms);
    Ok(())
}

pub fn pending_fee_update(e: &Env) -> Option<PendingFeeUpdate> {
    e.storage().persistent().get(&ConfigKey::PendingFeeUpdate)
}

fn apply_pending_fee(e: &Env, now_ms: u64) {
    if let Some(pending) = pending_fee_update(e) {
        if pending.effective_ms <= now_ms {
            e.storage()
                .persistent()
                .set(&ConfigKey::MonthlyDaoFee, &pending.new_fee);
            e.storage().persistent().remove(&ConfigKey::PendingFeeUpdate);
        }
    }
}

/// Collect the recurring platform fee from a DAO's treasury, in its
/// stable type. Returns the (possibly unchanged) due timestamp and
/// whether collection succeeded. Insufficient treasury pauses proposal
/// creation instead of failing the transaction.
pub fn collect_dao_recurring_fee(e: &Env, dao_id: u64) -> Result<(u64, bool), ErrorCode> {
    let mut dao = dao::get_dao(e, dao_id)?;
    let now = super::now_ms(e);
    if now < dao.next_fee_due_ms {
        return Err(ErrorCode::RecurringFeeNotDue);
    }

    apply_pending_fee(e, now);
    let fee = monthly_fee(e);

    let months_overdue = (now - dao.next_fee_due_ms) / MONTHLY_FEE_PERIOD_MS + 1;
    let total = fee * months_overdue as i128;

    if treasury::balance(e, dao_id, &dao.stable_token) < total {
        if dao.operational_state == OperationalState::Active {
            dao.operational_state = OperationalState::Paused;
        }
        dao.proposal_creation_enabled = false;
        dao::update_dao(e, &dao);
        events::emit_proposals_paused_unpaid_fees(e, dao_id, total);
        return Ok((dao.next_fee_due_ms, false));
    }

    treasury::debit(e, dao_id, &dao.stable_token, total)?;
    credit_stable(e, &dao.stable_token, total);

    dao.next_fee_due_ms += months_overdue * MONTHLY_FEE_PERIOD_MS;
    if dao.operational_state == OperationalState::Paused {
        dao.operational_state = OperationalState::Active;
        dao.proposal_creation_enabled = true;
        events::emit_proposals_unpaused(e, dao_id);
    }
    dao::update_dao(e, &dao);

    events::emit_recurring_fee_collected(e, dao_id, total, months_overdue);
    Ok((dao.next_fee_due_ms, true))
}
