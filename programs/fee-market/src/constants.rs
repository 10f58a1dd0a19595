//! PDA seed constants for the fee market program.
//!
//! Shared by the Anchor account constraints and any off-chain client that
//! derives the addresses.

/// Config PDA seed (authority, reporter, params)
/// PDA: ["fee_market_config"]
pub const SEED_CONFIG: &[u8] = b"fee_market_config";

/// Controller PDA seed (window, price, learning rate, enabled height)
/// PDA: ["fee_market_state"]
pub const SEED_STATE: &[u8] = b"fee_market_state";

/// Denom rate table PDA seed
/// PDA: ["denom_rates"]
pub const SEED_DENOM_RATES: &[u8] = b"denom_rates";
