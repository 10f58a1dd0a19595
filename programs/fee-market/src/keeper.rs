use crate::compute::{update_base_gas_price, update_learning_rate};
use crate::error::FeeMarketError;
use crate::fixed::Dec;
use crate::host::{DecCoin, DenomResolver, FeeMarketStore, Telemetry};
use crate::params::Params;
use crate::state::{GenesisState, State};

type Result<T> = core::result::Result<T, FeeMarketError>;

// ============================================================================
// Keeper - Block Lifecycle
// ============================================================================
//
// Per host block: report_gas() any number of times, then finalize_block()
// once. Every mutating call loads whole objects, works on copies and only
// writes back when every step succeeded.

/// Outcome of a per-block call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockProgress {
    Applied,
    /// Params are disabled, nothing ran
    SkippedDisabled,
    /// Host height at or before the last enable transition
    SkippedBeforeEnabledHeight,
}

impl BlockProgress {
    #[inline]
    pub fn is_applied(self) -> bool {
        self == BlockProgress::Applied
    }
}

pub struct Keeper<S, T> {
    store: S,
    telemetry: T,
}

impl<S: FeeMarketStore, T: Telemetry> Keeper<S, T> {
    pub fn new(store: S, telemetry: T) -> Self {
        Self { store, telemetry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ========================================================================
    // Genesis
    // ========================================================================

    /// Validate and store a genesis pair into an empty store. When the params
    /// start enabled the genesis height becomes the enabled height.
    pub fn init_genesis(&mut self, genesis: GenesisState, height: u64) -> Result<()> {
        if self.store.state().is_some() {
            return Err(FeeMarketError::AlreadyInitialized);
        }
        genesis.validate()?;
        if genesis.params.enabled {
            self.store.set_enabled_height(height)?;
        }
        self.store.set_params(genesis.params)?;
        self.store.set_state(genesis.state)
    }

    pub fn export_genesis(&self) -> Result<GenesisState> {
        Ok(GenesisState {
            params: self.params()?,
            state: self.state()?,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn params(&self) -> Result<Params> {
        self.store.params().ok_or(FeeMarketError::MissingParams)
    }

    pub fn state(&self) -> Result<State> {
        self.store.state().ok_or(FeeMarketError::MissingState)
    }

    pub fn enabled_height(&self) -> u64 {
        self.store.enabled_height()
    }

    pub fn base_gas_price(&self) -> Result<Dec> {
        Ok(self.state()?.base_gas_price)
    }

    pub fn learning_rate(&self) -> Result<Dec> {
        Ok(self.state()?.learning_rate)
    }

    /// Minimum gas price in `denom`. The fee denom needs no resolver.
    pub fn min_gas_price(
        &self,
        denom: &str,
        resolver: Option<&dyn DenomResolver>,
    ) -> Result<DecCoin> {
        let native = self.native_price()?;
        if denom == native.denom {
            return Ok(native);
        }
        resolver
            .ok_or(FeeMarketError::ResolverUnavailable)?
            .convert(&native, denom)
    }

    /// Minimum gas prices for several denoms. A denom whose conversion fails
    /// is reported to telemetry and left out of the result.
    pub fn min_gas_prices(
        &self,
        denoms: &[String],
        resolver: Option<&dyn DenomResolver>,
    ) -> Result<Vec<DecCoin>> {
        let native = self.native_price()?;
        let mut prices = Vec::with_capacity(denoms.len());
        for denom in denoms {
            if *denom == native.denom {
                prices.push(native.clone());
                continue;
            }
            let resolver = resolver.ok_or(FeeMarketError::ResolverUnavailable)?;
            match resolver.convert(&native, denom) {
                Ok(price) => prices.push(price),
                Err(err) => self.telemetry.conversion_skipped(denom, &err),
            }
        }
        Ok(prices)
    }

    fn native_price(&self) -> Result<DecCoin> {
        let params = self.params()?;
        let state = self.state()?;
        Ok(DecCoin::new(params.fee_denom, state.base_gas_price))
    }

    // ========================================================================
    // Block Processing
    // ========================================================================

    fn gate(&self, params: &Params, height: u64) -> Option<BlockProgress> {
        let skip = if !params.enabled {
            BlockProgress::SkippedDisabled
        } else if height <= self.store.enabled_height() {
            BlockProgress::SkippedBeforeEnabledHeight
        } else {
            return None;
        };
        self.telemetry.block_skipped(height, skip);
        Some(skip)
    }

    /// Record gas used by the block at host `height`
    pub fn report_gas(
        &mut self,
        height: u64,
        gas_used: u64,
        max_block_gas: u64,
    ) -> Result<BlockProgress> {
        let params = self.params()?;
        if let Some(skip) = self.gate(&params, height) {
            return Ok(skip);
        }

        let mut state = self.state()?;
        state.update(gas_used, max_block_gas)?;
        self.store.set_state(state)?;
        Ok(BlockProgress::Applied)
    }

    /// Close the block at host `height`: learning rate, then base price,
    /// then advance the window.
    pub fn finalize_block(&mut self, height: u64, max_block_gas: u64) -> Result<BlockProgress> {
        let params = self.params()?;
        if let Some(skip) = self.gate(&params, height) {
            return Ok(skip);
        }
        if max_block_gas == 0 {
            return Err(FeeMarketError::InvalidMaxBlockGas);
        }

        let mut state = self.state()?;
        let previous_rate = state.learning_rate;
        state.learning_rate = update_learning_rate(&state, &params, max_block_gas);
        self.telemetry.learning_rate_updated(previous_rate, state.learning_rate);

        state.base_gas_price =
            update_base_gas_price(&self.telemetry, &state, &params, max_block_gas)?;
        state.advance();

        self.store.set_state(state)?;
        Ok(BlockProgress::Applied)
    }

    // ========================================================================
    // Params Update
    // ========================================================================

    /// Replace params at host `height`.
    ///
    /// The window is migrated to the new length and the learning rate and
    /// price are pulled into the new bounds. Without adaptation
    /// (`alpha = 0`, `beta = 1`) the rate is pinned to the minimum. A
    /// disabled -> enabled flip records `height` as the enabled height.
    pub fn update_params(&mut self, new_params: Params, height: u64) -> Result<()> {
        new_params.validate()?;
        let old_params = self.params()?;
        let mut state = self.state()?;

        state.resize_window(new_params.window_len());
        state.learning_rate = if new_params.alpha.is_zero() && new_params.beta == Dec::ONE {
            new_params.min_learning_rate
        } else {
            state
                .learning_rate
                .clamp_to(new_params.min_learning_rate, new_params.max_learning_rate)
        };
        state.base_gas_price = state.base_gas_price.max(new_params.min_base_gas_price);
        state.validate(&new_params)?;

        if !old_params.enabled && new_params.enabled {
            self.store.set_enabled_height(height)?;
        }
        self.store.set_params(new_params)?;
        self.store.set_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryStore, NoopTelemetry};
    use crate::state::{DenomRates, NetGas};
    use std::cell::RefCell;

    const MAX_GAS: u64 = 30_000_000;
    const GENESIS_HEIGHT: u64 = 10;

    #[derive(Default)]
    struct Recorder {
        skipped_blocks: RefCell<Vec<(u64, BlockProgress)>>,
        skipped_denoms: RefCell<Vec<String>>,
        rate_updates: RefCell<u32>,
    }

    impl Telemetry for Recorder {
        fn learning_rate_updated(&self, _previous: Dec, _next: Dec) {
            *self.rate_updates.borrow_mut() += 1;
        }

        fn price_updated(
            &self,
            _previous: Dec,
            _next: Dec,
            _learning_rate: Dec,
            _net_gas: NetGas,
        ) {
        }

        fn block_skipped(&self, height: u64, progress: BlockProgress) {
            self.skipped_blocks.borrow_mut().push((height, progress));
        }

        fn conversion_skipped(&self, denom: &str, _error: &FeeMarketError) {
            self.skipped_denoms.borrow_mut().push(denom.to_string());
        }
    }

    fn keeper_with(params: Params) -> Keeper<MemoryStore, Recorder> {
        let mut keeper = Keeper::new(MemoryStore::new(), Recorder::default());
        keeper.init_genesis(GenesisState::new(params), GENESIS_HEIGHT).unwrap();
        keeper
    }

    fn run_block(
        keeper: &mut Keeper<MemoryStore, Recorder>,
        height: u64,
        gas_used: u64,
    ) -> BlockProgress {
        let reported = keeper.report_gas(height, gas_used, MAX_GAS).unwrap();
        let finalized = keeper.finalize_block(height, MAX_GAS).unwrap();
        assert_eq!(reported, finalized);
        finalized
    }

    fn lcg(seed: &mut u64) -> u64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        *seed >> 33
    }

    // ========================================================================
    // Genesis
    // ========================================================================

    #[test]
    fn test_genesis_import_export() {
        let keeper = keeper_with(Params::aimd());
        let exported = keeper.export_genesis().unwrap();
        assert_eq!(exported, GenesisState::new(Params::aimd()));
        assert_eq!(keeper.enabled_height(), GENESIS_HEIGHT);
        assert_eq!(keeper.base_gas_price().unwrap(), Params::aimd().min_base_gas_price);
        assert_eq!(keeper.learning_rate().unwrap(), Params::aimd().min_learning_rate);
    }

    #[test]
    fn test_genesis_runs_once() {
        let mut keeper = keeper_with(Params::aimd());
        assert!(matches!(
            keeper.init_genesis(GenesisState::new(Params::eip1559()), 99),
            Err(FeeMarketError::AlreadyInitialized)
        ));
        assert_eq!(keeper.params().unwrap(), Params::aimd());
        assert_eq!(keeper.enabled_height(), GENESIS_HEIGHT);
    }

    #[test]
    fn test_disabled_genesis_keeps_enabled_height() {
        let params = Params { enabled: false, ..Params::aimd() };
        let keeper = keeper_with(params);
        assert_eq!(keeper.enabled_height(), 0);
    }

    #[test]
    fn test_invalid_genesis_rejected() {
        let mut keeper = Keeper::new(MemoryStore::new(), NoopTelemetry);
        let mut genesis = GenesisState::new(Params::aimd());
        genesis.state.window.pop();
        assert!(matches!(
            keeper.init_genesis(genesis, 1),
            Err(FeeMarketError::InvalidState)
        ));
        assert!(matches!(keeper.params(), Err(FeeMarketError::MissingParams)));
        assert!(matches!(keeper.state(), Err(FeeMarketError::MissingState)));
    }

    #[test]
    fn test_missing_objects_are_errors() {
        let mut keeper = Keeper::new(MemoryStore::new(), NoopTelemetry);
        assert!(matches!(keeper.report_gas(1, 0, MAX_GAS), Err(FeeMarketError::MissingParams)));
        assert!(matches!(keeper.finalize_block(1, MAX_GAS), Err(FeeMarketError::MissingParams)));
        assert!(matches!(keeper.export_genesis(), Err(FeeMarketError::MissingParams)));

        let mut store = MemoryStore::new();
        store.set_params(Params::aimd()).unwrap();
        let mut keeper = Keeper::new(store, NoopTelemetry);
        assert!(matches!(keeper.report_gas(1, 0, MAX_GAS), Err(FeeMarketError::MissingState)));
        assert!(matches!(keeper.base_gas_price(), Err(FeeMarketError::MissingState)));
    }

    // ========================================================================
    // Block Processing
    // ========================================================================

    #[test]
    fn test_block_cycle_moves_price_and_advances() {
        let mut keeper = keeper_with(Params { window: 2, ..Params::eip1559() });
        let start = keeper.base_gas_price().unwrap();

        assert_eq!(run_block(&mut keeper, GENESIS_HEIGHT + 1, MAX_GAS), BlockProgress::Applied);

        // average 15M sits on target for a two block window
        let state = keeper.state().unwrap();
        assert_eq!(state.window, vec![MAX_GAS, 0]);
        assert_eq!(state.index, 1);
        assert_eq!(state.height, 1);
        assert_eq!(state.base_gas_price, start);

        run_block(&mut keeper, GENESIS_HEIGHT + 2, MAX_GAS);
        let state = keeper.state().unwrap();
        assert_eq!(state.index, 0);
        assert_eq!(state.height, 2);
        assert!(state.base_gas_price > start);
        assert_eq!(*keeper.telemetry().rate_updates.borrow(), 2);
    }

    #[test]
    fn test_congested_then_idle_through_keeper() {
        let params = Params {
            window: 1,
            alpha: Dec::ZERO,
            beta: Dec::ONE,
            gamma: Dec::ZERO,
            min_base_gas_price: Dec::ratio(1, 100),
            min_learning_rate: Dec::ratio(1, 8),
            max_learning_rate: Dec::ratio(1, 8),
            ..Params::aimd()
        };
        let mut genesis = GenesisState::new(params);
        genesis.state.base_gas_price = Dec::from_int(100);
        let mut keeper = Keeper::new(MemoryStore::new(), NoopTelemetry);
        keeper.init_genesis(genesis, 0).unwrap();

        keeper.report_gas(1, 20_000_000, MAX_GAS).unwrap();
        keeper.finalize_block(1, MAX_GAS).unwrap();
        let raised = keeper.base_gas_price().unwrap();
        assert!(raised > Dec::from_int(100));

        keeper.report_gas(2, 5_000_000, MAX_GAS).unwrap();
        keeper.finalize_block(2, MAX_GAS).unwrap();
        assert!(keeper.base_gas_price().unwrap() < raised);
        assert_eq!(keeper.learning_rate().unwrap(), Dec::ratio(1, 8));
    }

    #[test]
    fn test_disabled_params_leave_state_unchanged() {
        let params = Params { enabled: false, ..Params::aimd() };
        let mut keeper = keeper_with(params);
        let before = keeper.state().unwrap();

        for height in 11..20 {
            assert_eq!(run_block(&mut keeper, height, MAX_GAS), BlockProgress::SkippedDisabled);
        }
        assert_eq!(keeper.state().unwrap(), before);
        assert_eq!(keeper.telemetry().skipped_blocks.borrow().len(), 18);
    }

    #[test]
    fn test_blocks_at_or_before_enabled_height_skipped() {
        let mut keeper = keeper_with(Params::aimd());
        let before = keeper.state().unwrap();

        assert_eq!(
            run_block(&mut keeper, GENESIS_HEIGHT, MAX_GAS),
            BlockProgress::SkippedBeforeEnabledHeight
        );
        assert_eq!(
            run_block(&mut keeper, GENESIS_HEIGHT - 3, MAX_GAS),
            BlockProgress::SkippedBeforeEnabledHeight
        );
        assert_eq!(keeper.state().unwrap(), before);

        assert!(run_block(&mut keeper, GENESIS_HEIGHT + 1, MAX_GAS).is_applied());
    }

    #[test]
    fn test_reenable_moves_enabled_height() {
        let mut keeper = keeper_with(Params::aimd());
        keeper
            .update_params(Params { enabled: false, ..Params::aimd() }, 20)
            .unwrap();
        assert_eq!(keeper.enabled_height(), GENESIS_HEIGHT);
        assert_eq!(run_block(&mut keeper, 25, MAX_GAS), BlockProgress::SkippedDisabled);

        keeper.update_params(Params::aimd(), 30).unwrap();
        assert_eq!(keeper.enabled_height(), 30);
        assert_eq!(
            run_block(&mut keeper, 30, MAX_GAS),
            BlockProgress::SkippedBeforeEnabledHeight
        );
        assert!(run_block(&mut keeper, 31, MAX_GAS).is_applied());

        // enabled -> enabled keeps the marker
        keeper.update_params(Params::aimd(), 40).unwrap();
        assert_eq!(keeper.enabled_height(), 30);
    }

    #[test]
    fn test_failed_calls_leave_store_untouched() {
        let mut keeper = keeper_with(Params::aimd());
        run_block(&mut keeper, 11, 1_000);
        let before = keeper.export_genesis().unwrap();

        assert!(matches!(
            keeper.report_gas(12, MAX_GAS + 1, MAX_GAS),
            Err(FeeMarketError::ExcessiveGas)
        ));
        assert!(matches!(
            keeper.finalize_block(12, 0),
            Err(FeeMarketError::InvalidMaxBlockGas)
        ));
        assert_eq!(keeper.export_genesis().unwrap(), before);
    }

    #[test]
    fn test_long_run_respects_bounds() {
        let params = Params::aimd();
        let mut keeper = keeper_with(params.clone());
        let mut seed = 42u64;
        for height in 11..1_011 {
            let gas = lcg(&mut seed) % (MAX_GAS + 1);
            run_block(&mut keeper, height, gas);

            let state = keeper.state().unwrap();
            assert!(state.base_gas_price >= params.min_base_gas_price);
            assert!(state.learning_rate >= params.min_learning_rate);
            assert!(state.learning_rate <= params.max_learning_rate);
        }
        assert_eq!(keeper.state().unwrap().height, 1_000);
    }

    // ========================================================================
    // Params Update
    // ========================================================================

    #[test]
    fn test_update_params_resizes_and_reclamps() {
        let mut keeper = keeper_with(Params::aimd());
        for (i, height) in (11..14).enumerate() {
            run_block(&mut keeper, height, (i as u64 + 1) * 1_000);
        }

        let mut next = Params::aimd();
        next.window = 2;
        next.min_learning_rate = Dec::ratio(2, 10);
        next.max_learning_rate = Dec::ratio(3, 10);
        next.min_base_gas_price = Dec::from_int(50);
        keeper.update_params(next.clone(), 14).unwrap();

        let state = keeper.state().unwrap();
        assert_eq!(keeper.params().unwrap(), next);
        // chronological history ends 2000, 3000
        assert_eq!(state.window, vec![2_000, 3_000]);
        assert_eq!(state.index, 0);
        assert_eq!(state.learning_rate, Dec::ratio(2, 10));
        assert_eq!(state.base_gas_price, Dec::from_int(50));
        assert_eq!(state.height, 3);
    }

    #[test]
    fn test_invalid_params_update_rejected() {
        let mut keeper = keeper_with(Params::aimd());
        let before = keeper.export_genesis().unwrap();

        let bad = Params { gamma: Dec::ONE, ..Params::aimd() };
        assert!(matches!(keeper.update_params(bad, 12), Err(FeeMarketError::InvalidGamma)));
        assert_eq!(keeper.export_genesis().unwrap(), before);
    }

    #[test]
    fn test_resize_between_report_and_finalize_keeps_open_block() {
        let mut keeper = keeper_with(Params::aimd());
        for (i, height) in (11..14).enumerate() {
            run_block(&mut keeper, height, (i as u64 + 1) * 1_000);
        }
        keeper.report_gas(14, 29_000_000, MAX_GAS).unwrap();

        keeper.update_params(Params { window: 2, ..Params::aimd() }, 14).unwrap();
        let state = keeper.state().unwrap();
        assert_eq!(state.window, vec![3_000, 29_000_000]);
        assert_eq!(state.index, 1);

        assert!(keeper.finalize_block(14, MAX_GAS).unwrap().is_applied());
        assert_eq!(keeper.state().unwrap().index, 0);

        // The next block overwrites the oldest kept sample
        keeper.report_gas(15, 5, MAX_GAS).unwrap();
        assert_eq!(keeper.state().unwrap().window, vec![5, 29_000_000]);
    }

    #[test]
    fn test_switch_to_fixed_rate_pins_minimum_learning_rate() {
        let params = Params::aimd();
        let mut keeper = keeper_with(params.clone());
        for height in 11..30 {
            run_block(&mut keeper, height, MAX_GAS);
        }
        assert!(keeper.learning_rate().unwrap() > params.min_learning_rate);

        let fixed = Params { alpha: Dec::ZERO, beta: Dec::ONE, ..params.clone() };
        keeper.update_params(fixed, 30).unwrap();
        assert_eq!(keeper.learning_rate().unwrap(), params.min_learning_rate);

        for height in 31..40 {
            run_block(&mut keeper, height, MAX_GAS);
            assert_eq!(keeper.learning_rate().unwrap(), params.min_learning_rate);
        }
    }

    /// Loads from memory, refuses every write
    struct ReadOnlyStore(MemoryStore);

    impl FeeMarketStore for ReadOnlyStore {
        fn params(&self) -> Option<Params> {
            self.0.params()
        }

        fn set_params(&mut self, _params: Params) -> Result<()> {
            Err(FeeMarketError::StoreEncoding)
        }

        fn state(&self) -> Option<State> {
            self.0.state()
        }

        fn set_state(&mut self, _state: State) -> Result<()> {
            Err(FeeMarketError::StoreEncoding)
        }

        fn enabled_height(&self) -> u64 {
            self.0.enabled_height()
        }

        fn set_enabled_height(&mut self, _height: u64) -> Result<()> {
            Err(FeeMarketError::StoreEncoding)
        }
    }

    #[test]
    fn test_store_write_failures_propagate() {
        let store = keeper_with(Params::aimd()).into_store();
        let mut keeper = Keeper::new(ReadOnlyStore(store), NoopTelemetry);

        assert!(matches!(
            keeper.report_gas(11, 1_000, MAX_GAS),
            Err(FeeMarketError::StoreEncoding)
        ));
        assert!(matches!(
            keeper.finalize_block(11, MAX_GAS),
            Err(FeeMarketError::StoreEncoding)
        ));
        assert!(matches!(
            keeper.update_params(Params::eip1559(), 11),
            Err(FeeMarketError::StoreEncoding)
        ));
    }

    // ========================================================================
    // Min Gas Prices
    // ========================================================================

    #[test]
    fn test_native_price_needs_no_resolver() {
        let keeper = keeper_with(Params::aimd());
        let price = keeper.min_gas_price("lamports", None).unwrap();
        assert_eq!(price, DecCoin::new("lamports", Params::aimd().min_base_gas_price));

        assert!(matches!(
            keeper.min_gas_price("usdc", None),
            Err(FeeMarketError::ResolverUnavailable)
        ));
        assert!(matches!(
            keeper.min_gas_prices(&["lamports".to_string(), "usdc".to_string()], None),
            Err(FeeMarketError::ResolverUnavailable)
        ));
    }

    #[test]
    fn test_failed_conversions_are_skipped() {
        let keeper = keeper_with(Params::aimd());
        let mut rates = DenomRates::default();
        rates.set_rate("usdc", Dec::from_int(3)).unwrap();

        let denoms = vec!["usdc".to_string(), "eth".to_string(), "lamports".to_string()];
        let prices = keeper.min_gas_prices(&denoms, Some(&rates)).unwrap();
        assert_eq!(
            prices,
            vec![
                DecCoin::new("usdc", Dec::from_int(3)),
                DecCoin::new("lamports", Dec::from_int(1)),
            ]
        );
        assert_eq!(*keeper.telemetry().skipped_denoms.borrow(), vec!["eth".to_string()]);

        assert!(matches!(
            keeper.min_gas_price("eth", Some(&rates)),
            Err(FeeMarketError::UnknownDenom)
        ));
    }
}
