use soroban_sdk::{contracttype, Address, BytesN, String, Vec};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProposalState {
    Premarket,
    Review,
    Trading,
    Finalized,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationalState {
    Active,
    Paused,
    Dissolving,
}

/// Which side of the collateral a conditional token is backed by.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Asset,
    Stable,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TradingParams {
    pub min_asset_amount: i128,
    pub min_stable_amount: i128,
    pub review_period_ms: u64,
    pub trading_period_ms: u64,
    pub amm_total_fee_bps: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TwapConfig {
    /// Warm-up after market init before the oracle samples. Multiple of 60_000.
    pub start_delay_ms: u64,
    /// Per-sample clamp magnitude in oracle price units.
    pub step_max: i128,
    /// Premium the Accept outcome must sustain to win a binary proposal.
    pub threshold: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GovernanceConfig {
    pub max_outcomes: u32,
    pub max_concurrent_proposals: u32,
    pub max_proposer_funded: u32,
    pub proposal_fee_per_outcome: i128,
    pub required_bond_amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetadataConfig {
    pub name: String,
    pub description: String,
    pub icon_url: String,
}

/// Composed per-DAO configuration. Mutable only through executed actions.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DaoConfig {
    pub trading: TradingParams,
    pub twap: TwapConfig,
    pub governance: GovernanceConfig,
    pub metadata: MetadataConfig,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dao {
    pub id: u64,
    pub creator: Address,
    pub asset_token: Address,
    pub stable_token: Address,
    pub config: DaoConfig,
    pub operational_state: OperationalState,
    pub proposal_creation_enabled: bool,
    pub has_treasury: bool,
    pub next_fee_due_ms: u64,
    pub dao_liquidity_in_use: bool,
    pub liquidity_pool_id: u64,
    pub proposals_created: u64,
}

/// Compact index record per proposal, mutated only by result signing.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalInfo {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub proposer: Address,
    pub created_at_ms: u64,
    pub state: ProposalState,
    pub outcome_count: u32,
    pub title: String,
    pub result: Option<String>,
    pub execution_time_ms: Option<u64>,
    pub executed: bool,
}

/// The heavy per-proposal market object. Market fields are populated once
/// the proposal leaves Premarket.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Proposal {
    pub id: u64,
    pub dao_id: u64,
    pub proposer: Address,
    pub title: String,
    pub state: ProposalState,
    pub outcome_count: u32,
    pub outcome_messages: Vec<String>,
    pub outcome_details: Vec<String>,
    pub outcome_creators: Vec<Address>,
    pub asset_amounts: Vec<i128>,
    pub stable_amounts: Vec<i128>,
    pub review_period_ms: u64,
    pub trading_period_ms: u64,
    pub twap: TwapConfig,
    pub amm_total_fee_bps: u32,
    pub created_at_ms: u64,
    pub market_init_ms: Option<u64>,
    pub trading_start_ms: Option<u64>,
    pub winning_outcome: Option<u32>,
    pub uses_dao_liquidity: bool,
    pub liquidity_provider: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketState {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub outcome_count: u32,
    pub outcome_messages: Vec<String>,
    pub trading_end_ms: Option<u64>,
    pub finalized: bool,
    pub winning_outcome: Option<u32>,
}

/// Submission payload carried by a queue entry until activation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposalData {
    pub title: String,
    pub metadata: String,
    pub outcome_messages: Vec<String>,
    pub outcome_details: Vec<String>,
    pub asset_amounts: Vec<i128>,
    pub stable_amounts: Vec<i128>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueuedProposal {
    pub proposal_id: u64,
    pub dao_id: u64,
    pub fee: i128,
    pub uses_dao_liquidity: bool,
    pub proposer: Address,
    pub data: ProposalData,
    /// Bond held inside the entry. Zero for proposer-funded submissions.
    pub bond: i128,
    pub submitted_at_ms: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CouncilMember {
    pub address: Address,
    pub weight: u64,
}

/// Weighted multisig acting as the DAO's security council.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Council {
    pub id: u64,
    pub members: Vec<CouncilMember>,
    pub threshold: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stream {
    pub id: u64,
    pub dao_id: u64,
    pub recipient: Address,
    pub token: Address,
    pub amount_per_epoch: i128,
    pub epochs_remaining: u32,
    pub epoch_duration_ms: u64,
    pub next_claim_ms: u64,
    pub cancellable: bool,
}

/// One edit in an operating-agreement batch. `action_type` selects the
/// edit kind (see agreement module), the optional fields feed the digest.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OaEdit {
    pub action_type: u32,
    pub line_id: Option<u64>,
    pub text: Option<String>,
    pub difficulty: Option<u64>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OaLine {
    pub id: u64,
    pub text: String,
    pub difficulty: u64,
    pub immutable: bool,
}

// ---------------------------------------------------------------------------
// Action taxonomy
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferAction {
    pub token: Address,
    pub recipient: Address,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MintAction {
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BurnAction {
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecurringPaymentAction {
    pub recipient: Address,
    pub token: Address,
    pub amount_per_epoch: i128,
    pub num_epochs: u32,
    pub epoch_duration_ms: u64,
    pub cancellable: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CancelStreamAction {
    pub stream_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TradingParamsUpdateAction {
    pub params: TradingParams,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TwapConfigUpdateAction {
    pub twap: TwapConfig,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GovernanceUpdateAction {
    pub governance: GovernanceConfig,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetadataUpdateAction {
    pub metadata: MetadataConfig,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetadataTableUpdateAction {
    pub key: String,
    pub value: String,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueParamsUpdateAction {
    pub max_concurrent_proposals: u32,
    pub max_proposer_funded: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PartialDissolutionAction {
    pub token: Address,
    pub amount: i128,
    pub recipient: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FullDissolutionAction {
    pub recipient: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CancelDissolutionAction {
    pub dao_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddLiquidityAction {
    pub pool_id: u64,
    pub asset_amount: i128,
    pub stable_amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoveLiquidityAction {
    pub pool_id: u64,
    pub asset_amount: i128,
    pub stable_amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OaBatchAction {
    pub edits: Vec<OaEdit>,
    pub digest: BytesN<32>,
    pub expires_at_ms: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetPolicyAction {
    pub resource_key: String,
    pub council_id: u64,
    pub expires_at_ms: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemovePolicyAction {
    pub resource_key: String,
    pub expires_at_ms: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AcceptUpgradeCapAction {
    pub council_id: u64,
    pub expires_at_ms: u64,
}

/// Closed action sum. The dispatcher matches exhaustively; adding a
/// variant requires updating the dispatcher.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Transfer(TransferAction),
    Mint(MintAction),
    Burn(BurnAction),
    RecurringPayment(RecurringPaymentAction),
    CancelStream(CancelStreamAction),
    TradingParamsUpdate(TradingParamsUpdateAction),
    TwapConfigUpdate(TwapConfigUpdateAction),
    GovernanceUpdate(GovernanceUpdateAction),
    MetadataUpdate(MetadataUpdateAction),
    MetadataTableUpdate(MetadataTableUpdateAction),
    QueueParamsUpdate(QueueParamsUpdateAction),
    PartialDissolution(PartialDissolutionAction),
    FullDissolution(FullDissolutionAction),
    CancelDissolution(CancelDissolutionAction),
    AddLiquidity(AddLiquidityAction),
    RemoveLiquidity(RemoveLiquidityAction),
    OaBatch(OaBatchAction),
    SetPolicy(SetPolicyAction),
    RemovePolicy(RemovePolicyAction),
    AcceptUpgradeCap(AcceptUpgradeCapAction),
}

/// Protocol-level configuration written once at initialization.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigKey {
    Admin,
    FeeToken,
    DaoCreationFee,
    ProposalCreationFee,
    VerificationFee,
    MonthlyDaoFee,
    PendingFeeUpdate,
}

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

pub const MIN_OUTCOMES: u32 = 2;
pub const MAX_OUTCOMES: u32 = 3;

/// Floor under AMM reserve minimums; guards against rounding-dominated pools.
pub const MIN_AMM_SAFE_AMOUNT: i128 = 1_000;

pub const BPS_DENOM: i128 = 10_000;
pub const MAX_AMM_FEE_BPS: u32 = 1_000;

pub const MAX_REVIEW_PERIOD_MS: u64 = 604_800_000;
pub const MAX_TRADING_PERIOD_MS: u64 = 604_800_000;
pub const MAX_TWAP_START_DELAY_MS: u64 = 86_400_000;
pub const TWAP_DELAY_STEP_MS: u64 = 60_000;
pub const MAX_TWAP_THRESHOLD: i128 = 1_000_000;

/// Queue entries older than this may be evicted with fee and bond slashed.
pub const STALE_DURATION_MS: u64 = 2_592_000_000;

pub const MONTHLY_FEE_PERIOD_MS: u64 = 2_592_000_000;

/// Monthly-fee updates only take effect this long after the admin call.
pub const FEE_UPDATE_DELAY_MS: u64 = 15_552_000_000;

/// Fixed reward paid to whoever cranks a queued proposal into a live market.
pub const ACTIVATOR_REWARD: i128 = 1_000_000;

pub const DEFAULT_REQUIRED_BOND: i128 = 100_000_000;

pub const MAX_QUEUE_SIZE: u32 = 50;

pub const MAX_TITLE_LEN: u32 = 256;
pub const MAX_DETAIL_LEN: u32 = 2_048;
