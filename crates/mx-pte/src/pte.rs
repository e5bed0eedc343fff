//! Pressure-temperature equilibrium for one cell.

use crate::config::{FallbackPolicy, PteConfig};
use crate::error::{MixError, MixResult};
use crate::fallback;
use crate::newton::{self, EnergyTarget, NewtonOutcome};
use crate::scratch::PteScratch;
use crate::single;
use mx_core::{CoreError, Real, RootConfig, expand_bracket, newton_bisect};
use mx_eos::{EosError, MaterialState};
use tracing::debug;

/// The independent-variable pair of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CellTarget {
    DensityEnergy { density: Real, sie: Real },
    DensityPressure { density: Real, pressure: Real },
    DensityTemperature { density: Real, temperature: Real },
    PressureTemperature { pressure: Real, temperature: Real },
}

impl CellTarget {
    pub fn density(&self) -> Option<Real> {
        match *self {
            CellTarget::DensityEnergy { density, .. }
            | CellTarget::DensityPressure { density, .. }
            | CellTarget::DensityTemperature { density, .. } => Some(density),
            CellTarget::PressureTemperature { .. } => None,
        }
    }

    fn check(&self) -> MixResult<()> {
        let out_of_domain = |what: &'static str, value: Real| -> MixResult<()> {
            Err(MixError::OutOfDomain(EosError::OutOfDomain { what, value }))
        };
        if let Some(rho) = self.density() {
            if !(rho.is_finite() && rho > 0.0) {
                return out_of_domain("cell density", rho);
            }
        }
        match *self {
            CellTarget::DensityEnergy { sie, .. } if !sie.is_finite() => {
                out_of_domain("cell specific internal energy", sie)
            }
            CellTarget::DensityPressure { pressure, .. } if !pressure.is_finite() => {
                out_of_domain("cell pressure", pressure)
            }
            CellTarget::DensityTemperature { temperature, .. }
            | CellTarget::PressureTemperature { temperature, .. }
                if !(temperature.is_finite() && temperature > 0.0) =>
            {
                out_of_domain("cell temperature", temperature)
            }
            CellTarget::PressureTemperature { pressure, .. } if !pressure.is_finite() => {
                out_of_domain("cell pressure", pressure)
            }
            _ => Ok(()),
        }
    }
}

/// Equilibrium of one cell. The per-material split is left in the scratch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PteSolution {
    pub pressure: Real,
    pub temperature: Real,
    /// 1 / Σ mᵢ/ρᵢ over the active materials
    pub density: Real,
    /// Σ mᵢ eᵢ over the active materials
    pub sie: Real,
    /// Newton iterations, or residual evaluations for the one-unknown modes
    pub iterations: usize,
    pub used_fallback: bool,
}

/// Solve the cell currently loaded in `scratch`.
///
/// On `PteConvergenceFailure` the scratch keeps the last accepted split and the
/// error carries the matching pressure and temperature.
pub fn solve(
    scratch: &mut PteScratch<'_>,
    target: CellTarget,
    cfg: &PteConfig,
) -> MixResult<PteSolution> {
    target.check()?;
    scratch.prepare(target.density())?;

    if let Some(index) = scratch.sole_active() {
        return solve_single(scratch, index, target);
    }

    match target {
        CellTarget::DensityEnergy { density, sie } => {
            solve_density_energy(scratch, EnergyTarget { density, sie }, cfg)
        }
        CellTarget::DensityPressure { density, pressure } => {
            solve_density_pressure(scratch, density, pressure, cfg)
        }
        CellTarget::DensityTemperature {
            density,
            temperature,
        } => solve_density_temperature(scratch, density, temperature, cfg),
        CellTarget::PressureTemperature {
            pressure,
            temperature,
        } => {
            let sums = scratch.evaluate(pressure, temperature)?;
            scratch.commit();
            Ok(PteSolution {
                pressure,
                temperature,
                density: 1.0 / sums.volume,
                sie: sums.energy,
                iterations: 0,
                used_fallback: false,
            })
        }
    }
}

fn solve_single(
    scratch: &mut PteScratch<'_>,
    index: usize,
    target: CellTarget,
) -> MixResult<PteSolution> {
    let slot = scratch.slots()[index];
    let state: MaterialState = match target {
        CellTarget::DensityEnergy { density, sie } => {
            single::from_density_energy(slot.model, density, sie)?
        }
        CellTarget::DensityPressure { density, pressure } => {
            single::from_density_pressure(slot.model, density, pressure, None)?
        }
        CellTarget::DensityTemperature {
            density,
            temperature,
        } => single::from_density_temperature(slot.model, density, temperature)?,
        CellTarget::PressureTemperature {
            pressure,
            temperature,
        } => single::from_pressure_temperature(slot.model, pressure, temperature, None)?,
    };
    scratch.set_split(index, state.density, state.sie);
    Ok(PteSolution {
        pressure: state.pressure,
        temperature: state.temperature,
        density: state.density,
        sie: state.sie,
        iterations: 0,
        used_fallback: false,
    })
}

fn solve_density_energy(
    scratch: &mut PteScratch<'_>,
    target: EnergyTarget,
    cfg: &PteConfig,
) -> MixResult<PteSolution> {
    let (p0, t0) = scratch.guess_from_density_energy(target.sie)?;

    let (pressure, temperature, iterations, residual) =
        match newton::solve(scratch, &target, p0, t0, cfg) {
            NewtonOutcome::Converged {
                pressure,
                temperature,
                iterations,
                sums,
            } => {
                return Ok(PteSolution {
                    pressure,
                    temperature,
                    density: 1.0 / sums.volume,
                    sie: sums.energy,
                    iterations,
                    used_fallback: false,
                });
            }
            NewtonOutcome::Stalled {
                pressure,
                temperature,
                iterations,
                residual,
                reason,
            } => {
                debug!(reason, iterations, residual, "PTE Newton iteration stalled");
                (pressure, temperature, iterations, residual)
            }
        };

    let failure = |residual| convergence_failure(iterations, residual, pressure, temperature);
    if cfg.fallback == FallbackPolicy::None {
        return Err(failure(residual));
    }

    match fallback::pressure_bisection(scratch, &target, pressure, temperature, cfg) {
        Ok(found) => {
            let (r_vol, r_energy) = target.residuals(&found.sums);
            let fallback_residual = r_vol.abs().max(r_energy.abs());
            if fallback_residual < cfg.residual_tol {
                scratch.commit();
                debug!(
                    evaluations = found.evaluations,
                    pressure = found.pressure,
                    temperature = found.temperature,
                    "PTE recovered by pressure bisection"
                );
                Ok(PteSolution {
                    pressure: found.pressure,
                    temperature: found.temperature,
                    density: 1.0 / found.sums.volume,
                    sie: found.sums.energy,
                    iterations: iterations + found.evaluations,
                    used_fallback: true,
                })
            } else {
                Err(failure(residual.min(fallback_residual)))
            }
        }
        Err(e) => {
            debug!(error = %e, "PTE pressure bisection failed");
            Err(failure(residual))
        }
    }
}

/// Convergence failure at (`pressure`, `temperature`). An infinite residual
/// means that point was never evaluated, so no state is reported.
fn convergence_failure(
    iterations: usize,
    residual: Real,
    pressure: Real,
    temperature: Real,
) -> MixError {
    let (pressure, temperature) = if residual.is_finite() {
        (pressure, temperature)
    } else {
        (Real::NAN, Real::NAN)
    };
    MixError::PteConvergenceFailure {
        iterations,
        residual,
        pressure,
        temperature,
    }
}

/// Map a failed bracketed search to a convergence failure; model errors pass.
fn one_unknown_failure(e: MixError, iterations: usize) -> MixError {
    match e {
        MixError::OutOfDomain(EosError::Numeric(
            CoreError::NotBracketed { .. }
            | CoreError::NoConvergence { .. }
            | CoreError::NoAdmissiblePoint { .. },
        )) => convergence_failure(iterations, Real::INFINITY, Real::NAN, Real::NAN),
        other => other,
    }
}

/// Finish a one-unknown solve: accept the root and check the volume residual.
fn finish_one_unknown(
    scratch: &mut PteScratch<'_>,
    density: Real,
    pressure: Real,
    temperature: Real,
    iterations: usize,
    cfg: &PteConfig,
) -> MixResult<PteSolution> {
    let sums = scratch.evaluate(pressure, temperature)?;
    let residual = (sums.volume * density - 1.0).abs();
    if residual >= cfg.residual_tol {
        return Err(MixError::PteConvergenceFailure {
            iterations,
            residual,
            pressure,
            temperature,
        });
    }
    scratch.commit();
    Ok(PteSolution {
        pressure,
        temperature,
        density: 1.0 / sums.volume,
        sie: sums.energy,
        iterations,
        used_fallback: false,
    })
}

fn one_unknown_config(cfg: &PteConfig) -> RootConfig {
    RootConfig {
        max_iterations: cfg.max_iterations + cfg.max_bisection_iterations,
        x_tol: 1e-14,
        f_tol: 0.0,
    }
}

/// Temperature is fixed; find the pressure that closes the volume.
fn solve_density_temperature(
    scratch: &mut PteScratch<'_>,
    density: Real,
    temperature: Real,
    cfg: &PteConfig,
) -> MixResult<PteSolution> {
    let p0 = scratch.guess_pressure_at(temperature)?;
    let root_cfg = one_unknown_config(cfg);
    let mut evaluations = 0;

    let mut residual = |p: Real| -> MixResult<(Real, Option<Real>)> {
        evaluations += 1;
        let sums = scratch.evaluate(p, temperature)?;
        Ok((sums.volume * density - 1.0, Some(sums.dvolume_dp * density)))
    };
    let found = expand_bracket(
        |p| residual(p).map(|(r, _)| r),
        p0,
        2.0,
        (0.0, Real::INFINITY),
        200,
        "PTE pressure",
    )
    .and_then(|bracket| newton_bisect(&mut residual, bracket, Some(p0), &root_cfg, "PTE pressure"));

    match found {
        Ok(pressure) => finish_one_unknown(scratch, density, pressure, temperature, evaluations, cfg),
        Err(e) => Err(one_unknown_failure(e, evaluations)),
    }
}

/// Pressure is fixed; find the temperature that closes the volume.
fn solve_density_pressure(
    scratch: &mut PteScratch<'_>,
    density: Real,
    pressure: Real,
    cfg: &PteConfig,
) -> MixResult<PteSolution> {
    let t0 = scratch.guess_temperature_at(pressure)?;
    let root_cfg = one_unknown_config(cfg);
    let mut evaluations = 0;

    let mut residual = |t: Real| -> MixResult<(Real, Option<Real>)> {
        evaluations += 1;
        let sums = scratch.evaluate(pressure, t)?;
        Ok((sums.volume * density - 1.0, Some(sums.dvolume_dt * density)))
    };
    let found = expand_bracket(
        |t| residual(t).map(|(r, _)| r),
        t0,
        2.0,
        (0.0, Real::INFINITY),
        200,
        "PTE temperature",
    )
    .and_then(|bracket| {
        newton_bisect(&mut residual, bracket, Some(t0), &root_cfg, "PTE temperature")
    });

    match found {
        Ok(temperature) => {
            finish_one_unknown(scratch, density, pressure, temperature, evaluations, cfg)
        }
        Err(e) => Err(one_unknown_failure(e, evaluations)),
    }
}
