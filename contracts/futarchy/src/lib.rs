#![no_std]
use soroban_sdk::{contract, contractimpl, token, Address, BytesN, Env, String, Vec};

mod errors;
mod modules;
mod test;
mod test_coexec;
mod test_dispatcher;
mod test_fees;
mod test_market;
mod test_queue;
pub mod types;

use crate::modules::{
    admin, agreement, amm, coexec, dao, dispatcher, escrow, events, fees, lifecycle, now_ms,
    proposal_fees, queue, treasury,
};
use crate::types::{
    Action, ConfigKey, CouncilMember, Dao, DaoConfig, MarketState, OaEdit, OaLine, Proposal,
    ProposalData, ProposalInfo, ProposalState, Side, Stream,
};

pub use crate::errors::ErrorCode;
pub use crate::modules::amm::Pool;
pub use crate::modules::coexec::UpgradeCustody;
pub use crate::types::Council;
pub use crate::modules::escrow::TokenEscrow;
pub use crate::modules::fees::{FeePurpose, PendingFeeUpdate};
pub use crate::modules::queue::QueueState;
pub use crate::modules::treasury::DaoLiquidity;

#[contract]
pub struct Futarchy;

#[contractimpl]
impl Futarchy {
    // ========================================================================
    // Protocol initialization and fees
    // ========================================================================

    pub fn initialize(
        e: Env,
        admin: Address,
        fee_token: Address,
        dao_creation_fee: i128,
        proposal_creation_fee: i128,
        verification_fee: i128,
        monthly_dao_fee: i128,
    ) -> Result<(), ErrorCode> {
        if e.storage().persistent().has(&ConfigKey::Admin) {
            return Err(ErrorCode::AlreadyInitialized);
        }
        admin::set_admin(&e, admin);
        e.storage().persistent().set(&ConfigKey::FeeToken, &fee_token);
        e.storage()
            .persistent()
            .set(&ConfigKey::DaoCreationFee, &dao_creation_fee);
        e.storage()
            .persistent()
            .set(&ConfigKey::ProposalCreationFee, &proposal_creation_fee);
        e.storage()
            .persistent()
            .set(&ConfigKey::VerificationFee, &verification_fee);
        e.storage()
            .persistent()
            .set(&ConfigKey::MonthlyDaoFee, &monthly_dao_fee);
        Ok(())
    }

    pub fn get_admin(e: Env) -> Option<Address> {
        admin::get_admin(&e)
    }

    pub fn deposit_protocol_fee(
        e: Env,
        payer: Address,
        purpose: FeePurpose,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        payer.require_auth();
        fees::deposit_payment(&e, &payer, purpose, amount)
    }

    pub fn withdraw_protocol_fees(e: Env, to: Address) -> Result<i128, ErrorCode> {
        fees::withdraw_protocol_fees(&e, &to)
    }

    pub fn withdraw_stable_fees(e: Env, token_addr: Address, to: Address) -> Result<i128, ErrorCode> {
        fees::withdraw_stable_fees(&e, &token_addr, &to)
    }

    pub fn withdraw_protocol_revenue(e: Env, to: Address) -> Result<i128, ErrorCode> {
        proposal_fees::withdraw_protocol_revenue(&e, &to)
    }

    pub fn get_protocol_fee_balance(e: Env) -> i128 {
        fees::protocol_fee_balance(&e)
    }

    pub fn get_stable_fee_balance(e: Env, token_addr: Address) -> i128 {
        fees::stable_fee_balance(&e, &token_addr)
    }

    pub fn get_protocol_revenue(e: Env) -> i128 {
        proposal_fees::protocol_revenue(&e)
    }

    pub fn set_dao_monthly_fee(e: Env, new_fee: i128) -> Result<(), ErrorCode> {
        fees::set_monthly_fee(&e, new_fee)
    }

    pub fn get_monthly_fee(e: Env) -> i128 {
        fees::monthly_fee(&e)
    }

    pub fn get_pending_fee_update(e: Env) -> Option<PendingFeeUpdate> {
        fees::pending_fee_update(&e)
    }

    /// Collect the recurring platform fee from a DAO's treasury. Returns
    /// the due timestamp and whether collection succeeded; failure
    /// pauses proposal creation rather than aborting.
    pub fn collect_dao_platform_fee(e: Env, dao_id: u64) -> Result<(u64, bool), ErrorCode> {
        admin::require_admin(&e)?;
        fees::collect_dao_recurring_fee(&e, dao_id)
    }

    // ========================================================================
    // DAO management
    // ========================================================================

    pub fn create_dao(
        e: Env,
        creator: Address,
        asset_token: Address,
        stable_token: Address,
        config: DaoConfig,
        has_treasury: bool,
        payment: i128,
    ) -> Result<u64, ErrorCode> {
        creator.require_auth();
        fees::deposit_payment(&e, &creator, FeePurpose::DaoCreation, payment)?;
        let dao_id = dao::create_dao(
            &e,
            creator.clone(),
            asset_token.clone(),
            stable_token.clone(),
            config,
            has_treasury,
        )?;
        events::emit_dao_created(&e, dao_id, creator, asset_token, stable_token);
        Ok(dao_id)
    }

    pub fn get_dao(e: Env, dao_id: u64) -> Option<Dao> {
        dao::get_dao(&e, dao_id).ok()
    }

    pub fn get_metadata_entry(e: Env, dao_id: u64, key: String) -> Option<String> {
        dao::get_metadata_entry(&e, dao_id, key)
    }

    pub fn deposit_treasury(
        e: Env,
        from: Address,
        dao_id: u64,
        token_addr: Address,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        from.require_auth();
        treasury::deposit(&e, dao_id, &token_addr, &from, amount)
    }

    pub fn get_treasury_balance(e: Env, dao_id: u64, token_addr: Address) -> i128 {
        treasury::balance(&e, dao_id, &token_addr)
    }

    pub fn deposit_dao_liquidity(
        e: Env,
        from: Address,
        dao_id: u64,
        asset_amount: i128,
        stable_amount: i128,
    ) -> Result<(), ErrorCode> {
        from.require_auth();
        treasury::deposit_liquidity(&e, dao_id, &from, asset_amount, stable_amount)
    }

    pub fn get_dao_liquidity(e: Env, dao_id: u64) -> DaoLiquidity {
        treasury::liquidity(&e, dao_id)
    }

    pub fn get_stream(e: Env, stream_id: u64) -> Option<Stream> {
        treasury::get_stream(&e, stream_id).ok()
    }

    /// Pay out every due epoch of a stream. Permissionless.
    pub fn claim_stream_payment(e: Env, stream_id: u64) -> Result<i128, ErrorCode> {
        treasury::claim_stream_payment(&e, stream_id)
    }

    // ========================================================================
    // Proposal queue
    // ========================================================================

    /// Submit a proposal. With a free slot it materialises immediately
    /// as a Review-stage market (the submitter supplies liquidity, or
    /// the DAO pool is drained); otherwise it queues by fee priority.
    /// DAO-funded submissions must post the required bond.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_to_queue(
        e: Env,
        proposer: Address,
        dao_id: u64,
        data: ProposalData,
        fee: i128,
        bond: i128,
        uses_dao_liquidity: bool,
        immediate_asset: i128,
        immediate_stable: i128,
    ) -> Result<u64, ErrorCode> {
        proposer.require_auth();
        let dao = dao::get_dao(&e, dao_id)?;

        if fee < 0 || bond < 0 {
            return Err(ErrorCode::InvalidAmount);
        }
        let fee_token = fees::fee_token(&e)?;
        let moved = fee + bond;
        if moved > 0 {
            token::Client::new(&e, &fee_token).transfer(
                &proposer,
                &e.current_contract_address(),
                &moved,
            );
        }

        let (proposal_id, _created) = queue::submit(
            &e,
            &dao,
            proposer,
            data,
            fee,
            bond,
            uses_dao_liquidity,
            immediate_asset,
            immediate_stable,
        )?;
        Ok(proposal_id)
    }

    /// Crank the best proposer-funded entry into a live market, paying
    /// the activator reward to the caller.
    pub fn activate_next_proposer_funded(
        e: Env,
        activator: Address,
        dao_id: u64,
        asset_total: i128,
        stable_total: i128,
    ) -> Result<u64, ErrorCode> {
        activator.require_auth();
        let dao = dao::get_dao(&e, dao_id)?;
        queue::activate_next_proposer_funded(&e, &dao, activator, asset_total, stable_total)
    }

    /// Crank the best DAO-funded entry, draining the DAO liquidity pool
    /// into the market and taking the exclusive slot.
    pub fn activate_next_dao_funded(
        e: Env,
        activator: Address,
        dao_id: u64,
    ) -> Result<u64, ErrorCode> {
        activator.require_auth();
        let dao = dao::get_dao(&e, dao_id)?;
        queue::activate_next_dao_funded(&e, &dao, activator)
    }

    /// Evict an entry stuck in the queue past the stale horizon,
    /// slashing its fee and bond.
    pub fn evict_stale_proposal(e: Env, dao_id: u64, proposal_id: u64) -> Result<(), ErrorCode> {
        let dao = dao::get_dao(&e, dao_id)?;
        queue::evict_stale(&e, &dao, proposal_id)
    }

    pub fn get_queue(e: Env, dao_id: u64) -> QueueState {
        queue::get_queue(&e, dao_id)
    }

    /// Pop the top entry into a premarket proposal while the current
    /// market winds down, so the next round can gather outcomes early.
    pub fn reserve_next_for_premarket(
        e: Env,
        dao_id: u64,
        current_proposal_id: u64,
        threshold_ms: u64,
    ) -> Result<u64, ErrorCode> {
        let dao = dao::get_dao(&e, dao_id)?;
        queue::reserve_next_for_premarket(&e, &dao, current_proposal_id, threshold_ms)
    }

    /// Give the reserved premarket proposal its market and clear the
    /// reservation.
    pub fn initialize_reserved_premarket(
        e: Env,
        activator: Address,
        dao_id: u64,
        asset_total: i128,
        stable_total: i128,
    ) -> Result<u64, ErrorCode> {
        activator.require_auth();
        let dao = dao::get_dao(&e, dao_id)?;
        queue::initialize_reserved_premarket(&e, &dao, activator, asset_total, stable_total)
    }

    // ========================================================================
    // Proposal lifecycle
    // ========================================================================

    pub fn add_outcome(
        e: Env,
        caller: Address,
        proposal_id: u64,
        message: String,
        detail: String,
        asset_amount: i128,
        stable_amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        lifecycle::add_outcome(&e, proposal_id, caller, message, detail, asset_amount, stable_amount)
    }

    pub fn mutate_outcome(
        e: Env,
        caller: Address,
        proposal_id: u64,
        outcome: u32,
        new_detail: String,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        lifecycle::mutate_outcome(&e, proposal_id, caller, outcome, new_detail)
    }

    /// Permissionless crank: Review moves to Trading after the review
    /// period; Trading finalizes after the window, returning liquidity
    /// and freeing queue capacity in the same invocation.
    pub fn advance_stage(e: Env, proposal_id: u64) -> Result<(), ErrorCode> {
        lifecycle::advance_stage(&e, proposal_id)
    }

    pub fn sign_result(e: Env, signer: Address, proposal_id: u64) -> Result<(), ErrorCode> {
        lifecycle::sign_result(&e, proposal_id, signer)
    }

    pub fn get_proposal(e: Env, proposal_id: u64) -> Option<Proposal> {
        lifecycle::get_proposal(&e, proposal_id).ok()
    }

    pub fn get_proposal_info(e: Env, proposal_id: u64) -> Option<ProposalInfo> {
        lifecycle::get_info(&e, proposal_id).ok()
    }

    pub fn get_market_state(e: Env, proposal_id: u64) -> Option<MarketState> {
        lifecycle::get_market(&e, proposal_id).ok()
    }

    // ========================================================================
    // Conditional markets
    // ========================================================================

    pub fn mint_complete_set_asset(
        e: Env,
        caller: Address,
        proposal_id: u64,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let (proposal, dao) = live_market(&e, proposal_id)?;
        token::Client::new(&e, &dao.asset_token).transfer(
            &caller,
            &e.current_contract_address(),
            &amount,
        );
        escrow::mint_complete_set(&e, proposal.id, Side::Asset, &caller, amount)
    }

    pub fn mint_complete_set_stable(
        e: Env,
        caller: Address,
        proposal_id: u64,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let (proposal, dao) = live_market(&e, proposal_id)?;
        token::Client::new(&e, &dao.stable_token).transfer(
            &caller,
            &e.current_contract_address(),
            &amount,
        );
        escrow::mint_complete_set(&e, proposal.id, Side::Stable, &caller, amount)
    }

    /// Burn one conditional token of every outcome on the asset side and
    /// take back the backing collateral.
    pub fn redeem_complete_set_asset(
        e: Env,
        caller: Address,
        proposal_id: u64,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let proposal = lifecycle::get_proposal(&e, proposal_id)?;
        let dao = dao::get_dao(&e, proposal.dao_id)?;
        escrow::redeem_complete_set(&e, proposal_id, Side::Asset, &caller, amount)?;
        token::Client::new(&e, &dao.asset_token).transfer(
            &e.current_contract_address(),
            &caller,
            &amount,
        );
        Ok(())
    }

    pub fn redeem_complete_set_stable(
        e: Env,
        caller: Address,
        proposal_id: u64,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let proposal = lifecycle::get_proposal(&e, proposal_id)?;
        let dao = dao::get_dao(&e, proposal.dao_id)?;
        escrow::redeem_complete_set(&e, proposal_id, Side::Stable, &caller, amount)?;
        token::Client::new(&e, &dao.stable_token).transfer(
            &e.current_contract_address(),
            &caller,
            &amount,
        );
        Ok(())
    }

    /// After finalization, winning-outcome tokens redeem 1:1 for the
    /// backing collateral; losing-outcome tokens are worthless.
    pub fn redeem_winning_tokens(
        e: Env,
        caller: Address,
        proposal_id: u64,
        side: Side,
        amount: i128,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let proposal = lifecycle::get_proposal(&e, proposal_id)?;
        if proposal.state != ProposalState::Finalized {
            return Err(ErrorCode::MarketNotFinalized);
        }
        let winner = proposal.winning_outcome.ok_or(ErrorCode::MarketNotFinalized)?;
        let dao = dao::get_dao(&e, proposal.dao_id)?;
        escrow::redeem_winning(&e, proposal_id, winner, side.clone(), &caller, amount)?;
        let token_addr = match side {
            Side::Asset => dao.asset_token,
            Side::Stable => dao.stable_token,
        };
        token::Client::new(&e, &token_addr).transfer(&e.current_contract_address(), &caller, &amount);
        Ok(())
    }

    /// Spend conditional stable for conditional asset on one outcome's
    /// pool. Only while that market is trading.
    pub fn swap_stable_to_asset(
        e: Env,
        trader: Address,
        proposal_id: u64,
        outcome: u32,
        amount_in: i128,
        min_amount_out: i128,
    ) -> Result<i128, ErrorCode> {
        trader.require_auth();
        require_trading(&e, proposal_id)?;
        escrow::debit(&e, proposal_id, outcome, Side::Stable, &trader, amount_in)?;
        let out = amm::swap_stable_for_asset(
            &e,
            proposal_id,
            outcome,
            amount_in,
            min_amount_out,
            now_ms(&e),
        )?;
        escrow::credit(&e, proposal_id, outcome, Side::Asset, &trader, out);
        events::emit_swap(&e, proposal_id, trader, outcome, amount_in, out, false);
        Ok(out)
    }

    pub fn swap_asset_to_stable(
        e: Env,
        trader: Address,
        proposal_id: u64,
        outcome: u32,
        amount_in: i128,
        min_amount_out: i128,
    ) -> Result<i128, ErrorCode> {
        trader.require_auth();
        require_trading(&e, proposal_id)?;
        escrow::debit(&e, proposal_id, outcome, Side::Asset, &trader, amount_in)?;
        let out = amm::swap_asset_for_stable(
            &e,
            proposal_id,
            outcome,
            amount_in,
            min_amount_out,
            now_ms(&e),
        )?;
        escrow::credit(&e, proposal_id, outcome, Side::Stable, &trader, out);
        events::emit_swap(&e, proposal_id, trader, outcome, amount_in, out, true);
        Ok(out)
    }

    pub fn quote_stable_to_asset(
        e: Env,
        proposal_id: u64,
        outcome: u32,
        amount_in: i128,
    ) -> Result<i128, ErrorCode> {
        amm::quote_stable_for_asset(&e, proposal_id, outcome, amount_in)
    }

    pub fn quote_asset_to_stable(
        e: Env,
        proposal_id: u64,
        outcome: u32,
        amount_in: i128,
    ) -> Result<i128, ErrorCode> {
        amm::quote_asset_for_stable(&e, proposal_id, outcome, amount_in)
    }

    pub fn get_pool(e: Env, proposal_id: u64, outcome: u32) -> Option<amm::Pool> {
        amm::get_pool(&e, proposal_id, outcome).ok()
    }

    pub fn get_conditional_balance(
        e: Env,
        proposal_id: u64,
        outcome: u32,
        side: Side,
        holder: Address,
    ) -> i128 {
        escrow::balance(&e, proposal_id, outcome, side, &holder)
    }

    pub fn get_escrow(e: Env, proposal_id: u64) -> Option<escrow::TokenEscrow> {
        escrow::get_escrow(&e, proposal_id).ok()
    }

    // ========================================================================
    // Intents and execution
    // ========================================================================

    /// Register the action sequence one outcome will execute if it wins.
    pub fn register_actions(
        e: Env,
        caller: Address,
        proposal_id: u64,
        outcome: u32,
        actions: Vec<Action>,
    ) -> Result<(), ErrorCode> {
        dispatcher::register_actions(&e, proposal_id, caller, outcome, actions)
    }

    pub fn get_actions(e: Env, proposal_id: u64, outcome: u32) -> Result<Vec<Action>, ErrorCode> {
        dispatcher::get_actions(&e, proposal_id, outcome)
    }

    pub fn is_executed(e: Env, proposal_id: u64) -> bool {
        dispatcher::is_executed(&e, proposal_id)
    }

    pub fn can_execute_proposal(e: Env, proposal_id: u64) -> (bool, u64) {
        dispatcher::can_execute(&e, proposal_id)
    }

    /// Run the winning outcome's action sequence, at most once per
    /// proposal. Permissionless once the market has finalized.
    pub fn execute_approved_proposal(e: Env, proposal_id: u64) -> Result<u32, ErrorCode> {
        dispatcher::execute(&e, proposal_id)
    }

    // ========================================================================
    // Security council and co-execution
    // ========================================================================

    pub fn create_council(
        e: Env,
        members: Vec<CouncilMember>,
        threshold: u64,
    ) -> Result<u64, ErrorCode> {
        crate::modules::council::create_council(&e, members, threshold)
    }

    pub fn get_council(e: Env, council_id: u64) -> Option<Council> {
        crate::modules::council::get_council(&e, council_id).ok()
    }

    /// A council member backs an intent digest with their weight.
    pub fn approve_council_intent(
        e: Env,
        council_id: u64,
        member: Address,
        digest: BytesN<32>,
        expires_at_ms: u64,
    ) -> Result<u64, ErrorCode> {
        crate::modules::council::approve_intent(&e, council_id, member, digest, expires_at_ms)
    }

    pub fn get_approval_weight(e: Env, council_id: u64, digest: BytesN<32>) -> u64 {
        crate::modules::council::approval_weight(&e, council_id, &digest)
    }

    pub fn get_policy(e: Env, dao_id: u64, resource_key: String) -> Option<u64> {
        coexec::get_policy(&e, dao_id, &resource_key)
    }

    /// Seed a policy entry at DAO genesis, before any
    /// `PolicyRegistry:Admin` custodian exists. Creator-only.
    pub fn set_initial_policy(
        e: Env,
        caller: Address,
        dao_id: u64,
        resource_key: String,
        council_id: u64,
    ) -> Result<(), ErrorCode> {
        caller.require_auth();
        let dao = dao::get_dao(&e, dao_id)?;
        if caller != dao.creator {
            return Err(ErrorCode::NotAuthorized);
        }
        coexec::set_initial_policy(&e, dao_id, resource_key, council_id)
    }

    pub fn get_upgrade_custody(e: Env, dao_id: u64) -> Option<coexec::UpgradeCustody> {
        coexec::upgrade_custody(&e, dao_id)
    }

    // Digest views so the DAO and council sides can bind to identical
    // parameters off-chain.

    pub fn compute_oa_batch_digest(e: Env, edits: Vec<OaEdit>) -> BytesN<32> {
        agreement::compute_batch_digest(&e, &edits)
    }

    pub fn oa_intent_digest(
        e: Env,
        dao_id: u64,
        batch_digest: BytesN<32>,
        expires_at_ms: u64,
    ) -> BytesN<32> {
        coexec::oa_batch_digest(&e, dao_id, &batch_digest, expires_at_ms)
    }

    pub fn set_policy_intent_digest(
        e: Env,
        dao_id: u64,
        resource_key: String,
        council_id: u64,
        expires_at_ms: u64,
    ) -> BytesN<32> {
        coexec::set_policy_digest(&e, dao_id, &resource_key, council_id, expires_at_ms)
    }

    pub fn remove_policy_intent_digest(
        e: Env,
        dao_id: u64,
        resource_key: String,
        expires_at_ms: u64,
    ) -> BytesN<32> {
        coexec::remove_policy_digest(&e, dao_id, &resource_key, expires_at_ms)
    }

    pub fn upgrade_intent_digest(
        e: Env,
        dao_id: u64,
        council_id: u64,
        expires_at_ms: u64,
    ) -> BytesN<32> {
        coexec::upgrade_cap_digest(&e, dao_id, council_id, expires_at_ms)
    }

    pub fn get_oa_line(e: Env, dao_id: u64, line_id: u64) -> Option<OaLine> {
        agreement::get_line(&e, dao_id, line_id).ok()
    }

    pub fn get_oa_line_order(e: Env, dao_id: u64) -> Vec<u64> {
        agreement::line_order(&e, dao_id)
    }
}

/// Escrow operations need a market that exists and has not finalized.
fn live_market(e: &Env, proposal_id: u64) -> Result<(Proposal, Dao), ErrorCode> {
    let proposal = lifecycle::get_proposal(e, proposal_id)?;
    match proposal.state {
        ProposalState::Review | ProposalState::Trading => {}
        ProposalState::Premarket => return Err(ErrorCode::InvalidState),
        ProposalState::Finalized => return Err(ErrorCode::AlreadyFinalized),
    }
    let dao = dao::get_dao(e, proposal.dao_id)?;
    Ok((proposal, dao))
}

/// Swaps only run during the trading window; a sample past the window
/// end would corrupt the finalization TWAP read.
fn require_trading(e: &Env, proposal_id: u64) -> Result<(), ErrorCode> {
    let proposal = lifecycle::get_proposal(e, proposal_id)?;
    if proposal.state != ProposalState::Trading {
        return Err(ErrorCode::InvalidState);
    }
    let start = proposal.trading_start_ms.ok_or(ErrorCode::InvalidState)?;
    if now_ms(e) >= start + proposal.trading_period_ms {
        return Err(ErrorCode::Expired);
    }
    Ok(())
}
