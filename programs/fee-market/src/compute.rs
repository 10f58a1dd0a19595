use crate::error::FeeMarketError;
use crate::fixed::Dec;
use crate::host::Telemetry;
use crate::params::Params;
use crate::state::{NetGas, State};

// ============================================================================
// Controller Math
// ============================================================================
//
// Both functions read the state of the block being finalized and return the
// next value; the keeper writes it back. Order per block is fixed:
// learning rate first, then base price (which uses the new rate).

/// AIMD step for the learning rate.
///
/// Inside the band `[target * (1 - gamma), target * (1 + gamma)]`, edges
/// included, the rate decays multiplicatively by `beta`. Strictly outside
/// it grows additively by `alpha`. The result is clamped to the params bounds.
pub fn update_learning_rate(state: &State, params: &Params, max_block_gas: u64) -> Dec {
    let target = params.target_gas(max_block_gas);
    let lower = target.saturating_mul(Dec::ONE.saturating_sub(params.gamma));
    let upper = target.saturating_mul(Dec::ONE.saturating_add(params.gamma));

    let average = state.average_gas();
    let next = if average < lower || average > upper {
        state.learning_rate.saturating_add(params.alpha)
    } else {
        state.learning_rate.saturating_mul(params.beta)
    };

    next.clamp_to(params.min_learning_rate, params.max_learning_rate)
}

/// EIP-1559 step for the base gas price.
///
/// `step = (price * lr) * (|net_gas| / target_gas)`, every product truncated.
/// A non-zero deviation always moves the price by at least one ulp, so the
/// direction is strict even when the step truncates to zero. The result never
/// drops below `min_base_gas_price`.
pub fn update_base_gas_price<T: Telemetry + ?Sized>(
    telemetry: &T,
    state: &State,
    params: &Params,
    max_block_gas: u64,
) -> core::result::Result<Dec, FeeMarketError> {
    if max_block_gas == 0 {
        return Err(FeeMarketError::InvalidMaxBlockGas);
    }

    let price = state.base_gas_price;
    let learning_rate = state.learning_rate;
    let net_gas = state.net_gas(params, max_block_gas);

    let target = params.target_gas(max_block_gas);
    let deviation = net_gas
        .magnitude()
        .checked_div(target)
        .ok_or(FeeMarketError::InvalidMaxBlockGas)?;
    let step = price
        .saturating_mul(learning_rate)
        .saturating_mul(deviation)
        .max(Dec::ULP);

    let next = match net_gas {
        NetGas::Above(_) => price.saturating_add(step),
        NetGas::Below(_) => price.saturating_sub(step),
        NetGas::OnTarget => price,
    }
    .max(params.min_base_gas_price);

    telemetry.price_updated(price, next, learning_rate, net_gas);
    Ok(next)
}
