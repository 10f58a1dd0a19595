// ============================================================================
// Fee Market - Tunable Parameters
// ============================================================================
//
// Compile-time defaults and bounds. The live values are held in the
// FeeMarketConfig PDA and replaced wholesale by the authority.

use anchor_lang::prelude::*;

use crate::error::FeeMarketError;
use crate::fixed::Dec;

// ============================================================================
// Storage Bounds
// ============================================================================

/// Maximum window length (bounded by the controller account size)
pub const MAX_WINDOW: u64 = 64;

/// Maximum fee denom length in bytes
pub const MAX_DENOM_LEN: usize = 64;

/// Maximum number of entries in the denom rate table
pub const MAX_DENOM_RATES: usize = 16;

/// Maximum denoms per price query (return data is capped at 1024 bytes)
pub const MAX_QUERY_DENOMS: usize = 8;

// ============================================================================
// Shared Defaults
// ============================================================================

/// Native fee denom
pub const DEFAULT_FEE_DENOM: &str = "lamports";

/// Target utilization (0.5 = half full blocks at equilibrium)
pub const DEFAULT_TARGET_BLOCK_UTILIZATION: Dec = Dec::ratio(1, 2);

/// Floor for the base gas price (1 native unit per gas)
pub const DEFAULT_MIN_BASE_GAS_PRICE: Dec = Dec::from_int(1);

// ============================================================================
// EIP-1559 Preset (no learning-rate adaptation)
// ============================================================================

/// Single-block window, as in Ethereum
pub const EIP1559_WINDOW: u64 = 1;

/// Fixed learning rate (1/8 = 12.5% max move per block)
pub const EIP1559_LEARNING_RATE: Dec = Dec::ratio(1, 8);

// ============================================================================
// AIMD Preset
// ============================================================================

/// Blocks of history averaged for the control signal
pub const AIMD_WINDOW: u64 = 8;

/// Additive learning-rate increase (0.025)
pub const AIMD_ALPHA: Dec = Dec::ratio(25, 1000);

/// Multiplicative learning-rate decay (0.95)
pub const AIMD_BETA: Dec = Dec::ratio(95, 100);

/// Band half-width around target utilization (0.25)
pub const AIMD_GAMMA: Dec = Dec::ratio(25, 100);

/// Learning rate floor (0.01)
pub const AIMD_MIN_LEARNING_RATE: Dec = Dec::ratio(1, 100);

/// Learning rate ceiling (0.5)
pub const AIMD_MAX_LEARNING_RATE: Dec = Dec::ratio(1, 2);

// ============================================================================
// Params
// ============================================================================

/// Shape of the control loop. Never mutated by the controller itself.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Params {
    /// Number of trailing blocks tracked
    pub window: u64,
    /// Additive learning-rate increase step
    pub alpha: Dec,
    /// Multiplicative learning-rate decay factor, [0, 1]
    pub beta: Dec,
    /// Band half-width around target utilization, [0, 0.5]
    pub gamma: Dec,
    /// Floor for the computed base gas price
    pub min_base_gas_price: Dec,
    /// Fraction of max block gas considered on target, (0, 1]
    pub target_block_utilization: Dec,
    pub min_learning_rate: Dec,
    pub max_learning_rate: Dec,
    /// Native settlement unit of the base gas price
    pub fee_denom: String,
    /// Master switch
    pub enabled: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self::aimd()
    }
}

impl Params {
    /// Borsh size upper bound: 8 (window) + 7 x 16 (Dec) + 4+64 (fee_denom) + 1 (enabled)
    pub const MAX_SIZE: usize = 8 + 7 * 16 + 4 + MAX_DENOM_LEN + 1;

    /// Plain EIP-1559: constant learning rate, single block window
    pub fn eip1559() -> Self {
        Self {
            window: EIP1559_WINDOW,
            alpha: Dec::ZERO,
            beta: Dec::ONE,
            gamma: Dec::ZERO,
            min_base_gas_price: DEFAULT_MIN_BASE_GAS_PRICE,
            target_block_utilization: DEFAULT_TARGET_BLOCK_UTILIZATION,
            min_learning_rate: EIP1559_LEARNING_RATE,
            max_learning_rate: EIP1559_LEARNING_RATE,
            fee_denom: DEFAULT_FEE_DENOM.to_string(),
            enabled: true,
        }
    }

    /// EIP-1559 with AIMD learning-rate adaptation
    pub fn aimd() -> Self {
        Self {
            window: AIMD_WINDOW,
            alpha: AIMD_ALPHA,
            beta: AIMD_BETA,
            gamma: AIMD_GAMMA,
            min_base_gas_price: DEFAULT_MIN_BASE_GAS_PRICE,
            target_block_utilization: DEFAULT_TARGET_BLOCK_UTILIZATION,
            min_learning_rate: AIMD_MIN_LEARNING_RATE,
            max_learning_rate: AIMD_MAX_LEARNING_RATE,
            fee_denom: DEFAULT_FEE_DENOM.to_string(),
            enabled: true,
        }
    }

    /// Check every params invariant. Runs before new params are accepted.
    pub fn validate(&self) -> core::result::Result<(), FeeMarketError> {
        if self.window == 0 || self.window > MAX_WINDOW {
            return Err(FeeMarketError::InvalidWindow);
        }
        if self.beta > Dec::ONE {
            return Err(FeeMarketError::InvalidBeta);
        }
        if self.gamma > Dec::ratio(1, 2) {
            return Err(FeeMarketError::InvalidGamma);
        }
        if self.target_block_utilization.is_zero() || self.target_block_utilization > Dec::ONE {
            return Err(FeeMarketError::InvalidTargetUtilization);
        }
        if self.min_learning_rate > self.max_learning_rate {
            return Err(FeeMarketError::InvalidLearningRateBounds);
        }
        validate_denom(&self.fee_denom)
    }

    /// Window length as a slice length
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window as usize
    }

    /// Gas considered on target: `target_block_utilization x max_block_gas`.
    /// Cannot overflow once validated (utilization <= 1).
    pub fn target_gas(&self, max_block_gas: u64) -> Dec {
        self.target_block_utilization
            .checked_mul_int(max_block_gas)
            .unwrap_or(Dec::MAX)
    }
}

/// Denom rule: ASCII letter first, then `[A-Za-z0-9/:._-]`, at most MAX_DENOM_LEN bytes
pub fn validate_denom(denom: &str) -> core::result::Result<(), FeeMarketError> {
    let bytes = denom.as_bytes();
    let Some(first) = bytes.first() else {
        return Err(FeeMarketError::InvalidFeeDenom);
    };
    if bytes.len() > MAX_DENOM_LEN || !first.is_ascii_alphabetic() {
        return Err(FeeMarketError::InvalidFeeDenom);
    }
    let allowed =
        |b: &u8| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-');
    if !bytes.iter().all(allowed) {
        return Err(FeeMarketError::InvalidFeeDenom);
    }
    Ok(())
}
