//! Collaborator boundaries of the controller.
//!
//! The controller never talks to accounts, logs or oracles directly. It goes
//! through three narrow traits:
//!
//! ```text
//! FeeMarketStore  whole-object load/store of Params, State, enabled height
//! DenomResolver   native price -> price in another denom
//! Telemetry       side channel only, never feeds back into the math
//! ```
//!
//! On-chain the store is [`AccountStore`] over the two PDAs and the resolver
//! is the [`DenomRates`] table. [`MemoryStore`] keeps Borsh blobs in a map
//! for simulations and tests.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::error::FeeMarketError;
use crate::fixed::Dec;
use crate::keeper::BlockProgress;
use crate::params::Params;
use crate::state::{ControllerAccount, DenomRates, FeeMarketConfig, NetGas, State};

/// Amount of a given denom
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self { denom: denom.into(), amount }
    }
}

// ============================================================================
// Traits
// ============================================================================

pub type StoreResult = core::result::Result<(), FeeMarketError>;

/// Persistence collaborator. Objects are loaded and stored whole.
pub trait FeeMarketStore {
    fn params(&self) -> Option<Params>;
    fn set_params(&mut self, params: Params) -> StoreResult;
    fn state(&self) -> Option<State>;
    fn set_state(&mut self, state: State) -> StoreResult;
    /// Host height of the last disabled -> enabled transition
    fn enabled_height(&self) -> u64;
    fn set_enabled_height(&mut self, height: u64) -> StoreResult;
}

/// Converts a native-denom price into another denom
pub trait DenomResolver {
    fn convert(
        &self,
        price: &DecCoin,
        denom: &str,
    ) -> core::result::Result<DecCoin, FeeMarketError>;
}

/// Observation hooks. Implementations must not influence results.
pub trait Telemetry {
    fn learning_rate_updated(&self, _previous: Dec, _next: Dec) {}
    fn price_updated(&self, _previous: Dec, _next: Dec, _learning_rate: Dec, _net_gas: NetGas) {}
    fn block_skipped(&self, _height: u64, _progress: BlockProgress) {}
    fn conversion_skipped(&self, _denom: &str, _error: &FeeMarketError) {}
}

/// Discards everything
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {}

/// Writes to the Solana program log
pub struct ProgramLog;

impl Telemetry for ProgramLog {
    fn learning_rate_updated(&self, previous: Dec, next: Dec) {
        msg!("learning rate: {} -> {}", previous, next);
    }

    fn price_updated(&self, previous: Dec, next: Dec, learning_rate: Dec, net_gas: NetGas) {
        msg!(
            "base gas price: {} -> {} (lr={}, net_gas={:?})",
            previous,
            next,
            learning_rate,
            net_gas
        );
    }

    fn block_skipped(&self, height: u64, progress: BlockProgress) {
        msg!("fee market skipped height {}: {:?}", height, progress);
    }

    fn conversion_skipped(&self, denom: &str, error: &FeeMarketError) {
        msg!("skipping min gas price for {}: {}", denom, error);
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Store key for the Borsh-encoded Params blob
pub const KEY_PARAMS: &[u8] = b"params";
/// Store key for the Borsh-encoded State blob
pub const KEY_STATE: &[u8] = b"state";
/// Store key for the enabled height (u64 LE)
pub const KEY_ENABLED_HEIGHT: &[u8] = b"enabled_height";

/// Key-value store of opaque Borsh blobs.
/// A blob that fails to decode reads as missing.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_raw(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn set_raw(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    pub fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn load<T: AnchorDeserialize>(&self, key: &[u8]) -> Option<T> {
        self.get_raw(key).and_then(|bytes| T::try_from_slice(bytes).ok())
    }

    fn store<T: AnchorSerialize>(&mut self, key: &[u8], value: &T) -> StoreResult {
        let mut bytes = Vec::new();
        value
            .serialize(&mut bytes)
            .map_err(|_| FeeMarketError::StoreEncoding)?;
        self.set_raw(key, bytes);
        Ok(())
    }
}

impl FeeMarketStore for MemoryStore {
    fn params(&self) -> Option<Params> {
        self.load(KEY_PARAMS)
    }

    fn set_params(&mut self, params: Params) -> StoreResult {
        self.store(KEY_PARAMS, &params)
    }

    fn state(&self) -> Option<State> {
        self.load(KEY_STATE)
    }

    fn set_state(&mut self, state: State) -> StoreResult {
        self.store(KEY_STATE, &state)
    }

    fn enabled_height(&self) -> u64 {
        self.load(KEY_ENABLED_HEIGHT).unwrap_or(0)
    }

    fn set_enabled_height(&mut self, height: u64) -> StoreResult {
        self.store(KEY_ENABLED_HEIGHT, &height)
    }
}

// ============================================================================
// Account Store
// ============================================================================

/// Store backed by the config and controller PDAs.
/// An account whose window is empty has never seen genesis.
pub struct AccountStore<'a> {
    pub config: &'a mut FeeMarketConfig,
    pub controller: &'a mut ControllerAccount,
}

impl<'a> AccountStore<'a> {
    pub fn new(config: &'a mut FeeMarketConfig, controller: &'a mut ControllerAccount) -> Self {
        Self { config, controller }
    }
}

impl FeeMarketStore for AccountStore<'_> {
    fn params(&self) -> Option<Params> {
        if self.config.params.window == 0 {
            return None;
        }
        Some(self.config.params.clone())
    }

    fn set_params(&mut self, params: Params) -> StoreResult {
        self.config.params = params;
        Ok(())
    }

    fn state(&self) -> Option<State> {
        if self.controller.state.window.is_empty() {
            return None;
        }
        Some(self.controller.state.clone())
    }

    fn set_state(&mut self, state: State) -> StoreResult {
        self.controller.state = state;
        Ok(())
    }

    fn enabled_height(&self) -> u64 {
        self.controller.enabled_height
    }

    fn set_enabled_height(&mut self, height: u64) -> StoreResult {
        self.controller.enabled_height = height;
        Ok(())
    }
}

// ============================================================================
// Rate Table Resolver
// ============================================================================

impl DenomResolver for DenomRates {
    fn convert(
        &self,
        price: &DecCoin,
        denom: &str,
    ) -> core::result::Result<DecCoin, FeeMarketError> {
        if denom == price.denom {
            return Ok(price.clone());
        }
        let rate = self.rate(denom).ok_or(FeeMarketError::UnknownDenom)?;
        let amount = price
            .amount
            .checked_mul(rate)
            .ok_or(FeeMarketError::ArithmeticOverflow)?;
        Ok(DecCoin::new(denom, amount))
    }
}
