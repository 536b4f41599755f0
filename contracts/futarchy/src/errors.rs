use soroban_sdk::contracterror;

#[contracterror(export = false)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ErrorCode {
    // Precondition violations
    AlreadyInitialized = 100,
    NotAuthorized = 101,
    AdminNotSet = 102,
    InvalidState = 103,
    AlreadyExecuted = 104,
    AlreadyFinalized = 105,
    MarketNotFinalized = 106,
    TooEarly = 107,
    ProposalCreationDisabled = 108,
    InsufficientBalance = 109,
    InsufficientLiquidity = 110,
    ExcessiveSlippage = 111,
    Expired = 112,
    RecurringFeeNotDue = 113,
    StaleProposalNotYet = 114,
    StreamNotCancellable = 115,
    NothingDue = 116,
    NotDissolving = 117,
    ProposalNotApproved = 118,
    SamplingNotStarted = 119,

    // Input validation
    InvalidPayment = 200,
    InvalidBond = 201,
    InvalidOutcomeCount = 202,
    InvalidMessages = 203,
    InvalidTitle = 204,
    InvalidDetail = 205,
    InvalidTwapDelay = 206,
    InvalidMinAmounts = 207,
    InvalidPeriod = 208,
    InvalidFeeBps = 209,
    InvalidThreshold = 210,
    InvalidStepMax = 211,
    InvalidAmount = 212,
    OutcomeOutOfRange = 213,
    IncompleteSet = 214,
    SameCreator = 215,
    InvalidMemberSet = 216,

    // Not found
    DaoNotFound = 300,
    ProposalNotFound = 301,
    StreamNotFound = 302,
    CouncilNotFound = 303,
    NoPolicy = 304,
    LineNotFound = 305,
    StableTypeNotFound = 306,
    NoIntentKey = 307,

    // Concurrency conflicts
    DaoSlotInUse = 400,
    MaxConcurrentReached = 401,
    ReservationAlreadySet = 402,
    NoReservation = 403,
    QueueFull = 404,
    QueueEmpty = 405,
    ProposalUsesDaoLiquidity = 406,
    ProposalNotDaoFunded = 407,

    // Integrity
    DigestMismatch = 500,
    WrongCouncil = 501,
    WrongDao = 502,
    WrongCoinType = 503,
    ProposalIdMismatch = 504,
    PoolIdMismatch = 505,
    ActionTypeMismatch = 506,
    ThresholdNotMet = 507,
    AlreadyApproved = 508,
    LineImmutable = 509,
    UpgradeCapLocked = 510,
}
