//! Damped Newton iteration on (P, T) for density-energy input.

use crate::config::PteConfig;
use crate::scratch::{MixtureSums, PteScratch};
use mx_core::Real;
use nalgebra::{Matrix2, Vector2};

/// Cell density and energy the mixture must reproduce.
#[derive(Clone, Copy, Debug)]
pub(crate) struct EnergyTarget {
    pub(crate) density: Real,
    pub(crate) sie: Real,
}

impl EnergyTarget {
    /// Energy residuals are measured against the larger of |e_cell| and the
    /// thermal energy Σ mᵢ cvᵢ T, which stays meaningful when e_cell ≈ 0.
    fn energy_scale(&self, sums: &MixtureSums) -> Real {
        self.sie
            .abs()
            .max(sums.thermal_energy.abs())
            .max(Real::MIN_POSITIVE)
    }

    pub(crate) fn volume_residual(&self, sums: &MixtureSums) -> Real {
        sums.volume * self.density - 1.0
    }

    pub(crate) fn residuals(&self, sums: &MixtureSums) -> (Real, Real) {
        (
            self.volume_residual(sums),
            (sums.energy - self.sie) / self.energy_scale(sums),
        )
    }

    /// Solve the row-scaled 2×2 system J Δ = -r.
    fn newton_step(&self, sums: &MixtureSums, r_vol: Real, r_energy: Real) -> Option<(Real, Real)> {
        let scale = self.energy_scale(sums);
        let jac = Matrix2::new(
            sums.dvolume_dp * self.density,
            sums.dvolume_dt * self.density,
            sums.denergy_dp / scale,
            sums.denergy_dt / scale,
        );
        let step = jac.lu().solve(&Vector2::new(-r_vol, -r_energy))?;
        (step[0].is_finite() && step[1].is_finite()).then_some((step[0], step[1]))
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum NewtonOutcome {
    Converged {
        pressure: Real,
        temperature: Real,
        iterations: usize,
        sums: MixtureSums,
    },
    /// The scratch holds the split at (`pressure`, `temperature`).
    Stalled {
        pressure: Real,
        temperature: Real,
        iterations: usize,
        residual: Real,
        reason: &'static str,
    },
}

/// Largest step fraction that keeps `x` within `[min_fraction·x, (1 + max_relative_step)·x]`.
fn step_bound(x: Real, dx: Real, cfg: &PteConfig) -> Real {
    if dx < 0.0 {
        ((1.0 - cfg.min_fraction) * x / -dx).min(1.0)
    } else if dx > 0.0 {
        (cfg.max_relative_step * x / dx).min(1.0)
    } else {
        1.0
    }
}

/// Backtrack from `alpha_max` until the residual norm drops.
///
/// Trial points outside a model's domain count as rejected. If no trial point
/// decreases the norm, the longest admissible one is taken anyway.
fn line_search(
    scratch: &mut PteScratch<'_>,
    target: &EnergyTarget,
    (p, t): (Real, Real),
    (dp, dt): (Real, Real),
    alpha_max: Real,
    norm: Real,
    cfg: &PteConfig,
) -> Option<(Real, Real, MixtureSums)> {
    let mut alpha = alpha_max;
    let mut admissible = None;
    for _ in 0..=cfg.max_line_search_iters {
        let (p_new, t_new) = (p + alpha * dp, t + alpha * dt);
        if let Ok(sums) = scratch.evaluate(p_new, t_new) {
            let (r_vol, r_energy) = target.residuals(&sums);
            let norm_new = r_vol.hypot(r_energy);
            if norm_new < norm {
                return Some((p_new, t_new, sums));
            }
            if admissible.is_none() && norm_new.is_finite() {
                admissible = Some((p_new, t_new));
            }
        }
        alpha *= cfg.line_search_beta;
    }

    let (p_new, t_new) = admissible?;
    let sums = scratch.evaluate(p_new, t_new).ok()?;
    Some((p_new, t_new, sums))
}

/// Iterate from (`p0`, `t0`) until converged, stalled or capped.
pub(crate) fn solve(
    scratch: &mut PteScratch<'_>,
    target: &EnergyTarget,
    p0: Real,
    t0: Real,
    cfg: &PteConfig,
) -> NewtonOutcome {
    let (mut p, mut t) = (p0, t0);
    let mut sums = match scratch.evaluate(p, t) {
        Ok(sums) => {
            scratch.commit();
            sums
        }
        Err(_) => {
            return NewtonOutcome::Stalled {
                pressure: p,
                temperature: t,
                iterations: 0,
                residual: Real::INFINITY,
                reason: "initial guess outside model domain",
            };
        }
    };

    let mut iterations = 0;
    loop {
        let (r_vol, r_energy) = target.residuals(&sums);
        let norm = r_vol.hypot(r_energy);
        let stalled = move |reason: &'static str| NewtonOutcome::Stalled {
            pressure: p,
            temperature: t,
            iterations,
            residual: r_vol.abs().max(r_energy.abs()),
            reason,
        };

        let Some((dp, dt)) = target.newton_step(&sums, r_vol, r_energy) else {
            return stalled("singular Jacobian");
        };

        // Pressure steps are measured against the stiffer of P and the
        // mixture bulk modulus so that solids near P = 0 can converge.
        let small_residual = r_vol.abs() < cfg.residual_tol && r_energy.abs() < cfg.residual_tol;
        let small_step =
            dp.abs() < cfg.step_tol * p.max(sums.bulk_modulus) && dt.abs() < cfg.step_tol * t;
        if small_residual && small_step {
            return NewtonOutcome::Converged {
                pressure: p,
                temperature: t,
                iterations,
                sums,
            };
        }
        if small_step {
            return stalled("step below tolerance");
        }
        if iterations >= cfg.max_iterations {
            return stalled("iteration cap");
        }

        let alpha_max = step_bound(p, dp, cfg).min(step_bound(t, dt, cfg));
        match line_search(scratch, target, (p, t), (dp, dt), alpha_max, norm, cfg) {
            Some((p_new, t_new, sums_new)) => {
                scratch.commit();
                p = p_new;
                t = t_new;
                sums = sums_new;
            }
            None => return stalled("no admissible step"),
        }
        iterations += 1;
    }
}
