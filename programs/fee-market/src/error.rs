use anchor_lang::prelude::*;

#[error_code]
pub enum FeeMarketError {
    // ========== Block Processing (6000-6049) ==========
    #[msg("Gas used exceeds the block gas ceiling")]
    ExcessiveGas = 6000,
    #[msg("Max block gas must be greater than zero")]
    InvalidMaxBlockGas = 6001,
    #[msg("Fee market state not found")]
    MissingState = 6002,
    #[msg("Fee market params not found")]
    MissingParams = 6003,
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow = 6004,
    #[msg("Failed to encode a stored value")]
    StoreEncoding = 6005,

    // ========== Params Validation (6050-6099) ==========
    #[msg("Window must be between 1 and MAX_WINDOW")]
    InvalidWindow = 6050,
    #[msg("Beta must be within [0, 1]")]
    InvalidBeta = 6051,
    #[msg("Gamma must be within [0, 0.5]")]
    InvalidGamma = 6052,
    #[msg("Target block utilization must be within (0, 1]")]
    InvalidTargetUtilization = 6053,
    #[msg("Min learning rate exceeds max learning rate")]
    InvalidLearningRateBounds = 6054,
    #[msg("Invalid fee denom")]
    InvalidFeeDenom = 6055,
    #[msg("State violates params invariants")]
    InvalidState = 6056,
    #[msg("Invalid decimal string")]
    InvalidDecimal = 6057,

    // ========== Denom Conversion (6100-6149) ==========
    #[msg("No denom resolver configured")]
    ResolverUnavailable = 6100,
    #[msg("No conversion rate for denom")]
    UnknownDenom = 6101,
    #[msg("Denom rate limit reached")]
    DenomRateLimitReached = 6102,
    #[msg("Too many denoms in one price query")]
    TooManyDenoms = 6103,

    // ========== Access (6150-6199) ==========
    #[msg("Unauthorized")]
    Unauthorized = 6150,
    #[msg("Fee market already initialized")]
    AlreadyInitialized = 6151,
}
