use anchor_lang::prelude::*;

use crate::constants::*;
use crate::error::FeeMarketError;
use crate::state::{ControllerAccount, DenomRates, FeeMarketConfig};

/// Create the config, controller and rate table PDAs (once)
#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init,
        payer = authority,
        space = FeeMarketConfig::SIZE,
        seeds = [SEED_CONFIG],
        bump,
    )]
    pub config: Account<'info, FeeMarketConfig>,

    #[account(
        init,
        payer = authority,
        space = ControllerAccount::SIZE,
        seeds = [SEED_STATE],
        bump,
    )]
    pub controller: Account<'info, ControllerAccount>,

    #[account(
        init,
        payer = authority,
        space = DenomRates::SIZE,
        seeds = [SEED_DENOM_RATES],
        bump,
    )]
    pub denom_rates: Account<'info, DenomRates>,

    pub system_program: Program<'info, System>,
}

/// Replace params (authority only)
#[derive(Accounts)]
pub struct UpdateParams<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [SEED_CONFIG],
        bump = config.bump,
        constraint = config.authority == authority.key() @ FeeMarketError::Unauthorized,
    )]
    pub config: Account<'info, FeeMarketConfig>,

    #[account(
        mut,
        seeds = [SEED_STATE],
        bump = controller.bump,
    )]
    pub controller: Account<'info, ControllerAccount>,
}

/// Rotate authority or reporter keys (authority only)
#[derive(Accounts)]
pub struct AdminConfig<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [SEED_CONFIG],
        bump = config.bump,
        constraint = config.authority == authority.key() @ FeeMarketError::Unauthorized,
    )]
    pub config: Account<'info, FeeMarketConfig>,
}

/// Edit the denom rate table (authority only)
#[derive(Accounts)]
pub struct SetDenomRate<'info> {
    pub authority: Signer<'info>,

    #[account(
        seeds = [SEED_CONFIG],
        bump = config.bump,
        constraint = config.authority == authority.key() @ FeeMarketError::Unauthorized,
    )]
    pub config: Account<'info, FeeMarketConfig>,

    #[account(
        mut,
        seeds = [SEED_DENOM_RATES],
        bump = denom_rates.bump,
    )]
    pub denom_rates: Account<'info, DenomRates>,
}

/// Report gas or finalize a block (reporter only)
#[derive(Accounts)]
pub struct ReportBlock<'info> {
    pub reporter: Signer<'info>,

    #[account(
        seeds = [SEED_CONFIG],
        bump = config.bump,
        constraint = config.reporter == reporter.key() @ FeeMarketError::Unauthorized,
    )]
    pub config: Account<'info, FeeMarketConfig>,

    #[account(
        mut,
        seeds = [SEED_STATE],
        bump = controller.bump,
    )]
    pub controller: Account<'info, ControllerAccount>,
}

/// Read-only price query (CPI-callable)
#[derive(Accounts)]
pub struct GetMinGasPrices<'info> {
    #[account(
        seeds = [SEED_CONFIG],
        bump = config.bump,
    )]
    pub config: Account<'info, FeeMarketConfig>,

    #[account(
        seeds = [SEED_STATE],
        bump = controller.bump,
    )]
    pub controller: Account<'info, ControllerAccount>,

    #[account(
        seeds = [SEED_DENOM_RATES],
        bump = denom_rates.bump,
    )]
    pub denom_rates: Account<'info, DenomRates>,
}
