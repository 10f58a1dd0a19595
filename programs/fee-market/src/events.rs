use anchor_lang::prelude::*;

use crate::fixed::Dec;

/// Emitted once when the PDAs are created and genesis has run
#[event]
pub struct FeeMarketInitialized {
    pub authority: Pubkey,
    pub reporter: Pubkey,
    pub fee_denom: String,
    pub window: u64,
    pub enabled: bool,
    /// Slot recorded as enabled height (0 when starting disabled)
    pub enabled_height: u64,
}

/// Emitted when the authority replaces params
#[event]
pub struct ParamsUpdated {
    pub authority: Pubkey,
    pub version: u32,
    pub window: u64,
    pub enabled: bool,
    pub enabled_height: u64,
    /// Learning rate after re-clamping into the new bounds
    pub learning_rate: Dec,
    /// Price after re-flooring to the new minimum
    pub base_gas_price: Dec,
}

/// Emitted for every gas report, applied or skipped
#[event]
pub struct GasReported {
    pub slot: u64,
    pub gas_used: u64,
    pub max_block_gas: u64,
    /// False when gated by `enabled` or the enabled height
    pub applied: bool,
}

/// Emitted when a block is closed
#[event]
pub struct BlockFinalized {
    pub slot: u64,
    /// Blocks processed since genesis
    pub height: u64,
    pub base_gas_price: Dec,
    pub learning_rate: Dec,
    pub applied: bool,
}

/// Emitted when a conversion rate is set (zero = removed)
#[event]
pub struct DenomRateSet {
    pub denom: String,
    pub rate: Dec,
    pub count: u8,
}

#[event]
pub struct AuthorityChanged {
    pub old_authority: Pubkey,
    pub new_authority: Pubkey,
}

#[event]
pub struct ReporterChanged {
    pub authority: Pubkey,
    pub old_reporter: Pubkey,
    pub new_reporter: Pubkey,
}
