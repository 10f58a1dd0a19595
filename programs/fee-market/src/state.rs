use anchor_lang::prelude::*;

use crate::error::FeeMarketError;
use crate::fixed::Dec;
use crate::params::*;

// ============================================================================
// State - Controller State Machine
// ============================================================================
//
// Ring buffer of per-block gas plus the current price and learning rate.
// Per block: update() -> learning rate -> base price -> advance().
// The math on top of it lives in compute.rs.

/// Mutable controller state
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    /// Per-block gas used, ring buffer of `params.window` slots
    pub window: Vec<u64>,
    /// Slot written by the current block
    pub index: u64,
    /// Price per gas unit in the native fee denom
    pub base_gas_price: Dec,
    /// Current AIMD gain
    pub learning_rate: Dec,
    /// Blocks processed since genesis
    pub height: u64,
    /// `window[index]` already holds the current block's gas
    pub reported: bool,
}

/// Signed distance of the window average from target gas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetGas {
    /// Congestion: average above target by the given amount
    Above(Dec),
    /// Slack: average below target by the given amount
    Below(Dec),
    OnTarget,
}

impl NetGas {
    #[inline]
    pub fn magnitude(self) -> Dec {
        match self {
            NetGas::Above(gas) | NetGas::Below(gas) => gas,
            NetGas::OnTarget => Dec::ZERO,
        }
    }
}

impl State {
    /// Borsh size upper bound:
    /// 4+8*64 (window) + 8 (index) + 16 (price) + 16 (rate) + 8 (height) + 1 (reported)
    pub const MAX_SIZE: usize = 4 + 8 * MAX_WINDOW as usize + 8 + 16 + 16 + 8 + 1;

    /// Zero-filled window, floor price, minimum learning rate
    pub fn genesis(params: &Params) -> Self {
        Self {
            window: vec![0; params.window_len()],
            index: 0,
            base_gas_price: params.min_base_gas_price,
            learning_rate: params.min_learning_rate,
            height: 0,
            reported: false,
        }
    }

    /// Check the state against the params it is meant to run under
    pub fn validate(&self, params: &Params) -> core::result::Result<(), FeeMarketError> {
        if self.window.len() != params.window_len() || self.index >= self.window.len() as u64 {
            return Err(FeeMarketError::InvalidState);
        }
        if self.learning_rate < params.min_learning_rate
            || self.learning_rate > params.max_learning_rate
        {
            return Err(FeeMarketError::InvalidState);
        }
        if self.base_gas_price < params.min_base_gas_price {
            return Err(FeeMarketError::InvalidState);
        }
        Ok(())
    }

    // ========================================================================
    // Gas Ingestion
    // ========================================================================

    /// Record the gas used by the current block into `window[index]`.
    /// Rejects before writing when `gas_used > max_block_gas`.
    pub fn update(
        &mut self,
        gas_used: u64,
        max_block_gas: u64,
    ) -> core::result::Result<(), FeeMarketError> {
        if gas_used > max_block_gas {
            return Err(FeeMarketError::ExcessiveGas);
        }
        let slot = self
            .window
            .get_mut(self.index as usize)
            .ok_or(FeeMarketError::InvalidState)?;
        *slot = gas_used;
        self.reported = true;
        Ok(())
    }

    // ========================================================================
    // Window Aggregation
    // ========================================================================

    /// Sum of all samples. Cannot overflow: 64 slots x u64::MAX fits u128.
    pub fn total_gas(&self) -> u128 {
        self.window.iter().map(|&gas| gas as u128).sum()
    }

    /// Mean gas per block over the window
    pub fn average_gas(&self) -> Dec {
        if self.window.is_empty() {
            return Dec::ZERO;
        }
        Dec::checked_from_ratio(self.total_gas(), self.window.len() as u128).unwrap_or(Dec::MAX)
    }

    /// Average gas minus target gas for `max_block_gas`
    pub fn net_gas(&self, params: &Params, max_block_gas: u64) -> NetGas {
        let average = self.average_gas();
        let target = params.target_gas(max_block_gas);
        if average > target {
            NetGas::Above(average.saturating_sub(target))
        } else if average < target {
            NetGas::Below(target.saturating_sub(average))
        } else {
            NetGas::OnTarget
        }
    }

    // ========================================================================
    // Height Advance
    // ========================================================================

    /// Move the cursor to the next slot and count the block.
    /// Runs once per block, after the price and learning-rate reads.
    pub fn advance(&mut self) {
        let len = self.window.len() as u64;
        self.index = if len == 0 { 0 } else { (self.index + 1) % len };
        self.height = self.height.saturating_add(1);
        self.reported = false;
    }

    // ========================================================================
    // Window Migration
    // ========================================================================

    /// Resize the window for a new `params.window`.
    ///
    /// History is laid out oldest to newest, the newest `min(old, new)`
    /// samples are kept and new slots are zero-filled at the oldest end.
    ///
    /// Between blocks `index` points at the oldest sample and the cursor
    /// resets to slot 0, which is written next. Once the current block has
    /// reported, `index` holds the newest sample instead, and the cursor
    /// moves to the last slot so that sample still belongs to its block.
    pub fn resize_window(&mut self, new_len: usize) {
        let len = self.window.len();
        if new_len == len || new_len == 0 {
            return;
        }

        let mut history = Vec::with_capacity(len);
        if len > 0 {
            let cursor = self.index as usize % len;
            let oldest = if self.reported { (cursor + 1) % len } else { cursor };
            history.extend_from_slice(&self.window[oldest..]);
            history.extend_from_slice(&self.window[..oldest]);
        }

        let kept = history.len().min(new_len);
        let mut window = vec![0u64; new_len - kept];
        window.extend_from_slice(&history[history.len() - kept..]);

        self.window = window;
        self.index = if self.reported { new_len as u64 - 1 } else { 0 };
    }
}

// ============================================================================
// Genesis
// ============================================================================

/// Params and state pair for chain start or export
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct GenesisState {
    pub params: Params,
    pub state: State,
}

impl GenesisState {
    pub fn new(params: Params) -> Self {
        let state = State::genesis(&params);
        Self { params, state }
    }

    pub fn validate(&self) -> core::result::Result<(), FeeMarketError> {
        self.params.validate()?;
        self.state.validate(&self.params)
    }
}

// ============================================================================
// FeeMarketConfig - Singleton Configuration PDA
// ============================================================================
//
// Seeds: ["fee_market_config"]

/// Params plus the keys allowed to touch them
#[account]
pub struct FeeMarketConfig {
    /// Authority that can replace params and edit denom rates
    pub authority: Pubkey,
    /// Key allowed to report gas and finalize blocks
    pub reporter: Pubkey,
    /// Active params
    pub params: Params,
    /// Bumped on every params replacement
    pub version: u32,
    /// PDA bump seed
    pub bump: u8,
}

impl FeeMarketConfig {
    /// 8 (discriminator) + 32 (authority) + 32 (reporter) + Params + 4 (version) + 1 (bump)
    pub const SIZE: usize = 8 + 32 + 32 + Params::MAX_SIZE + 4 + 1;
}

// ============================================================================
// ControllerAccount - Controller State PDA
// ============================================================================
//
// Seeds: ["fee_market_state"]

/// Persisted controller state and the enabled-height marker
#[account]
pub struct ControllerAccount {
    pub state: State,
    /// Host height of the last disabled -> enabled transition.
    /// Blocks at or before it are never charged under the controller.
    pub enabled_height: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl ControllerAccount {
    /// 8 (discriminator) + State + 8 (enabled_height) + 1 (bump)
    pub const SIZE: usize = 8 + State::MAX_SIZE + 8 + 1;
}

// ============================================================================
// DenomRates - Conversion Table PDA
// ============================================================================
//
// Seeds: ["denom_rates"]
// Native -> denom multipliers maintained by the authority.

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DenomRate {
    pub denom: String,
    /// Units of `denom` per native unit
    pub rate: Dec,
}

impl DenomRate {
    pub const MAX_SIZE: usize = 4 + MAX_DENOM_LEN + 16;
}

#[account]
#[derive(Default)]
pub struct DenomRates {
    pub rates: Vec<DenomRate>,
    /// PDA bump seed
    pub bump: u8,
}

impl DenomRates {
    /// 8 (discriminator) + 4+16 x DenomRate + 1 (bump)
    pub const SIZE: usize = 8 + 4 + MAX_DENOM_RATES * DenomRate::MAX_SIZE + 1;

    pub fn rate(&self, denom: &str) -> Option<Dec> {
        self.rates.iter().find(|entry| entry.denom == denom).map(|entry| entry.rate)
    }

    /// Insert or replace a rate. A zero rate removes the entry.
    pub fn set_rate(&mut self, denom: &str, rate: Dec) -> core::result::Result<(), FeeMarketError> {
        validate_denom(denom)?;

        let existing = self.rates.iter().position(|entry| entry.denom == denom);
        match (existing, rate.is_zero()) {
            (Some(idx), true) => {
                self.rates.remove(idx);
            }
            (Some(idx), false) => {
                self.rates[idx].rate = rate;
            }
            (None, true) => {}
            (None, false) => {
                if self.rates.len() >= MAX_DENOM_RATES {
                    return Err(FeeMarketError::DenomRateLimitReached);
                }
                self.rates.push(DenomRate { denom: denom.to_string(), rate });
            }
        }
        Ok(())
    }
}
