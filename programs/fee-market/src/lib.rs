use anchor_lang::prelude::*;

declare_id!("Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS");

pub mod compute;
pub mod constants;
pub mod contexts;
pub mod error;
pub mod events;
pub mod fixed;
pub mod host;
pub mod keeper;
pub mod params;
pub mod state;

pub use contexts::*;
pub use error::FeeMarketError;
pub use events::*;
pub use fixed::Dec;
pub use host::{
    AccountStore, DecCoin, DenomResolver, FeeMarketStore, MemoryStore, NoopTelemetry, ProgramLog,
    Telemetry,
};
pub use keeper::{BlockProgress, Keeper};
pub use params::{Params, MAX_QUERY_DENOMS};
pub use state::*;

#[program]
pub mod fee_market {
    use super::*;

    /// Create the PDAs and run genesis at the current slot (once)
    pub fn initialize(ctx: Context<Initialize>, params: Params, reporter: Pubkey) -> Result<()> {
        let slot = Clock::get()?.slot;
        let authority = ctx.accounts.authority.key();
        let accounts = &mut *ctx.accounts;

        accounts.config.authority = authority;
        accounts.config.reporter = reporter;
        accounts.config.version = 1;
        accounts.config.bump = ctx.bumps.config;
        accounts.controller.bump = ctx.bumps.controller;
        accounts.denom_rates.bump = ctx.bumps.denom_rates;

        let genesis = GenesisState::new(params);
        Keeper::new(AccountStore::new(&mut accounts.config, &mut accounts.controller), ProgramLog)
            .init_genesis(genesis, slot)?;

        let params = &accounts.config.params;
        emit!(FeeMarketInitialized {
            authority,
            reporter,
            fee_denom: params.fee_denom.clone(),
            window: params.window,
            enabled: params.enabled,
            enabled_height: accounts.controller.enabled_height,
        });

        msg!(
            "Fee market initialized: authority={}, reporter={}, window={}, enabled={}",
            authority,
            reporter,
            params.window,
            params.enabled
        );
        Ok(())
    }

    /// Replace params wholesale (authority only).
    /// Migrates the window and re-clamps price and learning rate.
    pub fn update_params(ctx: Context<UpdateParams>, params: Params) -> Result<()> {
        let slot = Clock::get()?.slot;
        let accounts = &mut *ctx.accounts;

        Keeper::new(AccountStore::new(&mut accounts.config, &mut accounts.controller), ProgramLog)
            .update_params(params, slot)?;

        let config = &mut accounts.config;
        config.version = config.version.saturating_add(1);

        let state = &accounts.controller.state;
        emit!(ParamsUpdated {
            authority: accounts.authority.key(),
            version: config.version,
            window: config.params.window,
            enabled: config.params.enabled,
            enabled_height: accounts.controller.enabled_height,
            learning_rate: state.learning_rate,
            base_gas_price: state.base_gas_price,
        });

        msg!("Fee market params updated: version={}", config.version);
        Ok(())
    }

    /// Hand the authority role to another key (authority only)
    pub fn set_authority(ctx: Context<AdminConfig>, new_authority: Pubkey) -> Result<()> {
        let config = &mut ctx.accounts.config;
        let old_authority = config.authority;
        config.authority = new_authority;

        emit!(AuthorityChanged {
            old_authority,
            new_authority,
        });

        msg!("Fee market authority: {} -> {}", old_authority, new_authority);
        Ok(())
    }

    /// Change the key allowed to report gas (authority only)
    pub fn set_reporter(ctx: Context<AdminConfig>, new_reporter: Pubkey) -> Result<()> {
        let config = &mut ctx.accounts.config;
        let old_reporter = config.reporter;
        config.reporter = new_reporter;

        emit!(ReporterChanged {
            authority: ctx.accounts.authority.key(),
            old_reporter,
            new_reporter,
        });

        msg!("Fee market reporter: {} -> {}", old_reporter, new_reporter);
        Ok(())
    }

    /// Set the native -> `denom` conversion rate (authority only).
    /// A zero rate removes the entry.
    pub fn set_denom_rate(ctx: Context<SetDenomRate>, denom: String, rate: Dec) -> Result<()> {
        let denom_rates = &mut ctx.accounts.denom_rates;
        denom_rates.set_rate(&denom, rate)?;

        emit!(DenomRateSet {
            denom: denom.clone(),
            rate,
            count: denom_rates.rates.len() as u8,
        });

        msg!("Denom rate set: {}={}", denom, rate);
        Ok(())
    }

    /// Record gas used by the block at the current slot (reporter only)
    pub fn report_gas(ctx: Context<ReportBlock>, gas_used: u64, max_block_gas: u64) -> Result<()> {
        let slot = Clock::get()?.slot;
        let mut config = (*ctx.accounts.config).clone();
        let controller = &mut ctx.accounts.controller;

        let progress = Keeper::new(AccountStore::new(&mut config, controller), ProgramLog)
            .report_gas(slot, gas_used, max_block_gas)?;

        emit!(GasReported {
            slot,
            gas_used,
            max_block_gas,
            applied: progress.is_applied(),
        });
        Ok(())
    }

    /// Close the block at the current slot: learning rate, base price,
    /// window advance (reporter only)
    pub fn finalize_block(ctx: Context<ReportBlock>, max_block_gas: u64) -> Result<()> {
        let slot = Clock::get()?.slot;
        let mut config = (*ctx.accounts.config).clone();
        let controller = &mut ctx.accounts.controller;

        let progress = Keeper::new(AccountStore::new(&mut config, controller), ProgramLog)
            .finalize_block(slot, max_block_gas)?;

        let state = &controller.state;
        emit!(BlockFinalized {
            slot,
            height: state.height,
            base_gas_price: state.base_gas_price,
            learning_rate: state.learning_rate,
            applied: progress.is_applied(),
        });
        Ok(())
    }

    /// Minimum gas prices for `denoms` (CPI-callable, read-only).
    /// Denoms without a rate are logged and left out.
    pub fn get_min_gas_prices(
        ctx: Context<GetMinGasPrices>,
        denoms: Vec<String>,
    ) -> Result<Vec<DecCoin>> {
        require!(denoms.len() <= MAX_QUERY_DENOMS, FeeMarketError::TooManyDenoms);

        let mut config = (*ctx.accounts.config).clone();
        let mut controller = (*ctx.accounts.controller).clone();
        let rates: &DenomRates = &ctx.accounts.denom_rates;

        let keeper = Keeper::new(AccountStore::new(&mut config, &mut controller), ProgramLog);
        let prices = keeper.min_gas_prices(&denoms, Some(rates as &dyn DenomResolver))?;
        Ok(prices)
    }
}
