//! Pressure bisection for density-energy cells the Newton iteration gives up on.
//!
//! For a trial pressure, temperature is solved from energy conservation alone;
//! the volume residual at that (P, T) decreases monotonically in P, so a
//! geometric bracket plus bisection finds the equilibrium pressure. The
//! bracket grows from the first pressure near the stalled iterate at which
//! every material can be evaluated, so a Newton start outside some model's
//! domain does not end the search.

use crate::config::PteConfig;
use crate::error::MixResult;
use crate::newton::EnergyTarget;
use crate::scratch::{MixtureSums, PteScratch};
use mx_core::{Real, RootConfig, admissible_start, expand_bracket, newton_bisect};

pub(crate) struct BisectionSolution {
    pub(crate) pressure: Real,
    pub(crate) temperature: Real,
    /// Sums at the solution; the scratch trial iterate matches them
    pub(crate) sums: MixtureSums,
    /// Trial pressures evaluated
    pub(crate) evaluations: usize,
}

/// Temperature at which the mixture at pressure `p` holds energy `sie`.
fn temperature_for_energy(
    scratch: &mut PteScratch<'_>,
    sie: Real,
    p: Real,
    t_hint: Real,
    cfg: &RootConfig,
) -> MixResult<Real> {
    let mut energy_residual = |t: Real| scratch.evaluate(p, t).map(|s| s.energy - sie);
    let t_start = admissible_start(
        &mut energy_residual,
        t_hint,
        2.0,
        (0.0, Real::INFINITY),
        20,
        "PTE temperature",
    )?;
    let bracket = expand_bracket(
        &mut energy_residual,
        t_start,
        2.0,
        (0.0, Real::INFINITY),
        200,
        "PTE temperature",
    )?;
    newton_bisect(
        |t| {
            let s = scratch.evaluate(p, t)?;
            Ok((s.energy - sie, Some(s.denergy_dt)))
        },
        bracket,
        Some(t_start),
        cfg,
        "PTE temperature",
    )
}

pub(crate) fn pressure_bisection(
    scratch: &mut PteScratch<'_>,
    target: &EnergyTarget,
    p_start: Real,
    t_start: Real,
    cfg: &PteConfig,
) -> MixResult<BisectionSolution> {
    let root_cfg = RootConfig {
        max_iterations: cfg.max_bisection_iterations,
        x_tol: 1e-14,
        f_tol: 0.0,
    };
    let mut t_hint = t_start;
    let mut evaluations = 0;

    let mut volume_residual = |p: Real| -> MixResult<Real> {
        evaluations += 1;
        let t = temperature_for_energy(scratch, target.sie, p, t_hint, &root_cfg)?;
        t_hint = t;
        let sums = scratch.evaluate(p, t)?;
        Ok(target.volume_residual(&sums))
    };

    let start = admissible_start(
        &mut volume_residual,
        p_start,
        10.0,
        (0.0, Real::INFINITY),
        40,
        "PTE pressure",
    )?;
    let bracket = expand_bracket(
        &mut volume_residual,
        start,
        4.0,
        (0.0, Real::INFINITY),
        80,
        "PTE pressure",
    )?;
    let pressure = newton_bisect(
        |p| volume_residual(p).map(|r| (r, None)),
        bracket,
        Some(start),
        &root_cfg,
        "PTE pressure",
    )?;

    let temperature = temperature_for_energy(scratch, target.sie, pressure, t_hint, &root_cfg)?;
    let sums = scratch.evaluate(pressure, temperature)?;
    Ok(BisectionSolution {
        pressure,
        temperature,
        sums,
        evaluations,
    })
}
