// Shared helpers for the integration suite.

use futarchy::types::{
    DaoConfig, GovernanceConfig, MetadataConfig, ProposalData, TradingParams, TwapConfig,
};
use futarchy::{Futarchy, FutarchyClient};
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{token, Address, Env, String, Vec};

pub struct World {
    pub env: Env,
    pub client: FutarchyClient<'static>,
    pub admin: Address,
    pub fee_token: Address,
    pub asset_token: Address,
    pub stable_token: Address,
}

/// Register the contract, three Stellar asset contracts, and initialize
/// the protocol with the given fee schedule.
pub fn setup(dao_creation_fee: i128, monthly_dao_fee: i128) -> World {
    let env = Env::default();
    env.mock_all_auths();

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let fee_token = env
        .register_stellar_asset_contract_v2(token_admin.clone())
        .address();
    let asset_token = env
        .register_stellar_asset_contract_v2(token_admin.clone())
        .address();
    let stable_token = env
        .register_stellar_asset_contract_v2(token_admin)
        .address();

    let contract_id = env.register_contract(None, Futarchy);
    let client = FutarchyClient::new(&env, &contract_id);
    client.initialize(&admin, &fee_token, &dao_creation_fee, &0, &0, &monthly_dao_fee);

    World {
        env,
        client,
        admin,
        fee_token,
        asset_token,
        stable_token,
    }
}

pub fn mint(world: &World, token_addr: &Address, to: &Address, amount: i128) {
    token::StellarAssetClient::new(&world.env, token_addr).mint(to, &amount);
}

pub fn balance(world: &World, token_addr: &Address, who: &Address) -> i128 {
    token::Client::new(&world.env, token_addr).balance(who)
}

pub fn set_time_ms(world: &World, ms: u64) {
    world.env.ledger().with_mut(|li| li.timestamp = ms / 1000);
}

pub fn config(env: &Env) -> DaoConfig {
    DaoConfig {
        trading: TradingParams {
            min_asset_amount: 10_000,
            min_stable_amount: 10_000,
            review_period_ms: 600_000,
            trading_period_ms: 3_600_000,
            amm_total_fee_bps: 30,
        },
        twap: TwapConfig {
            start_delay_ms: 60_000,
            step_max: 1_000_000,
            threshold: 100,
        },
        governance: GovernanceConfig {
            max_outcomes: 3,
            max_concurrent_proposals: 2,
            max_proposer_funded: 2,
            proposal_fee_per_outcome: 0,
            required_bond_amount: 100_000_000,
        },
        metadata: MetadataConfig {
            name: String::from_str(env, "Meridian Collective"),
            description: String::from_str(env, "Treasury governed by markets"),
            icon_url: String::from_str(env, "ipfs://meridian/icon.png"),
        },
    }
}

pub fn binary_proposal(env: &Env) -> ProposalData {
    ProposalData {
        title: String::from_str(env, "Fund the grants program"),
        metadata: String::from_str(env, ""),
        outcome_messages: Vec::from_array(
            env,
            [String::from_str(env, "Reject"), String::from_str(env, "Accept")],
        ),
        outcome_details: Vec::from_array(
            env,
            [
                String::from_str(env, "Keep the treasury as is"),
                String::from_str(env, "Fund 50k to the grants program"),
            ],
        ),
        asset_amounts: Vec::from_array(env, [100_000i128, 100_000i128]),
        stable_amounts: Vec::from_array(env, [100_000i128, 100_000i128]),
    }
}
