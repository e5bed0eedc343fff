//! Single-material evaluation.
//!
//! Each function takes one model and one independent-variable pair and returns
//! the fully populated `MaterialState`. Nothing is cached and nothing is
//! retried: a model failure comes back as `MixError::OutOfDomain`.

use crate::error::MixResult;
use mx_core::{CoreError, Real, RootConfig, expand_bracket, newton_bisect};
use mx_eos::{EosError, EosModel, MaterialState};

/// Starting temperature for inversions when the caller has no better guess.
pub const DEFAULT_TEMPERATURE_GUESS: Real = 300.0;

fn complete(
    model: &dyn EosModel,
    rho: Real,
    t: Real,
    sie: Real,
    pressure: Real,
) -> MixResult<MaterialState> {
    let bulk_modulus = model.bulk_modulus_from_density_temperature(rho, t)?;
    let gamma = model.gruneisen_param_from_density_temperature(rho, t)?;
    let cv = model.specific_heat_from_density_temperature(rho, t)?;
    Ok(MaterialState {
        density: rho,
        sie,
        pressure,
        temperature: t,
        bulk_modulus,
        dpde: gamma * rho,
        cv,
    })
}

pub fn from_density_energy(model: &dyn EosModel, rho: Real, sie: Real) -> MixResult<MaterialState> {
    let t = model.temperature_from_density_internal_energy(rho, sie)?;
    let p = model.pressure_from_density_internal_energy(rho, sie)?;
    complete(model, rho, t, sie, p)
}

pub fn from_density_temperature(
    model: &dyn EosModel,
    rho: Real,
    t: Real,
) -> MixResult<MaterialState> {
    let sie = model.internal_energy_from_density_temperature(rho, t)?;
    let p = model.pressure_from_density_temperature(rho, t)?;
    complete(model, rho, t, sie, p)
}

/// `rho_guess` warm starts the model's density inversion.
pub fn from_pressure_temperature(
    model: &dyn EosModel,
    p: Real,
    t: Real,
    rho_guess: Option<Real>,
) -> MixResult<MaterialState> {
    let (rho, sie) = model.density_energy_from_pressure_temperature(p, t, rho_guess)?;
    complete(model, rho, t, sie, p)
}

pub fn from_density_pressure(
    model: &dyn EosModel,
    rho: Real,
    p: Real,
    t_guess: Option<Real>,
) -> MixResult<MaterialState> {
    let t = temperature_from_density_pressure(model, rho, p, t_guess)?;
    let sie = model.internal_energy_from_density_temperature(rho, t)?;
    complete(model, rho, t, sie, p)
}

/// Invert `P(ρ, T) = p` for temperature at fixed density.
pub fn temperature_from_density_pressure(
    model: &dyn EosModel,
    rho: Real,
    p: Real,
    t_guess: Option<Real>,
) -> MixResult<Real> {
    if !p.is_finite() {
        return Err(EosError::OutOfDomain {
            what: "pressure",
            value: p,
        }
        .into());
    }
    let start = t_guess
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(DEFAULT_TEMPERATURE_GUESS);

    let bracket = expand_bracket(
        |t| model.pressure_from_density_temperature(rho, t).map(|v| v - p),
        start,
        4.0,
        (0.0, Real::INFINITY),
        200,
        "temperature",
    )
    .map_err(|e| match e {
        EosError::Numeric(CoreError::NotBracketed { .. }) => EosError::OutOfDomain {
            what: "pressure",
            value: p,
        },
        other => other,
    })?;

    let analytic = model.has_analytic_derivatives();
    let cfg = RootConfig {
        max_iterations: 200,
        x_tol: 1e-14,
        f_tol: 0.0,
    };
    let t = newton_bisect(
        |t| {
            let value = model.pressure_from_density_temperature(rho, t)? - p;
            let slope = if analytic {
                Some(model.derivatives_from_density_temperature(rho, t)?.dp_dt)
            } else {
                None
            };
            Ok::<_, EosError>((value, slope))
        },
        bracket,
        Some(start),
        &cfg,
        "temperature",
    )?;
    Ok(t)
}
