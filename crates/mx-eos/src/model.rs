//! Equation-of-state capability trait and validation helpers.

use crate::error::{EosError, EosResult};
use mx_core::{CoreError, Real, RootConfig, expand_bracket, newton_bisect};
use std::fmt;

/// Relative step used by the finite-difference fallbacks.
pub const FD_REL_STEP: Real = 1e-6;

/// Partial derivatives of pressure and specific internal energy with respect
/// to density and temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateDerivatives {
    /// ∂P/∂ρ at constant T
    pub dp_drho: Real,
    /// ∂P/∂T at constant ρ
    pub dp_dt: Real,
    /// ∂e/∂ρ at constant T
    pub de_drho: Real,
    /// ∂e/∂T at constant ρ (the isochoric specific heat)
    pub de_dt: Real,
}

impl StateDerivatives {
    /// Isothermal bulk modulus ρ·∂P/∂ρ|T.
    pub fn isothermal_bulk_modulus(&self, rho: Real) -> Real {
        rho * self.dp_drho
    }

    /// Isentropic bulk modulus from the thermodynamic identity
    /// `B_s = B_T + T (∂P/∂T|ρ)² / (ρ c_v)`.
    pub fn isentropic_bulk_modulus(&self, rho: Real, t: Real) -> Real {
        self.isothermal_bulk_modulus(rho) + t * self.dp_dt * self.dp_dt / (rho * self.de_dt)
    }

    /// ∂P/∂e at constant ρ, i.e. ρΓ.
    pub fn dpde(&self) -> Real {
        self.dp_dt / self.de_dt
    }
}

/// Capability contract for single-material equations of state.
///
/// Implementations must be thread-safe (Send + Sync) so one registry can be shared
/// by every worker of a batch. All methods take the state by value and never
/// mutate the model.
///
/// Density and temperature are the primary independent pair. The provided
/// methods derive everything else from the required ones; analytic models should
/// override them with closed forms. In particular the default
/// `derivatives_from_density_temperature` uses central finite differences, which
/// is slower and less accurate than an analytic override and makes the
/// equilibrium solver converge more slowly.
pub trait EosModel: Send + Sync + fmt::Debug {
    /// Get the model name (for logging).
    fn name(&self) -> &str;

    /// Pressure from density and temperature.
    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real>;

    /// Specific internal energy from density and temperature.
    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real>;

    /// Temperature from density and specific internal energy.
    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real>;

    /// Isochoric specific heat from density and temperature.
    fn specific_heat_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real>;

    /// Pressure from density and specific internal energy.
    fn pressure_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        let t = self.temperature_from_density_internal_energy(rho, sie)?;
        self.pressure_from_density_temperature(rho, t)
    }

    /// Whether `derivatives_from_density_temperature` is analytic.
    fn has_analytic_derivatives(&self) -> bool {
        false
    }

    /// (ρ, T) partial derivatives of pressure and energy.
    fn derivatives_from_density_temperature(
        &self,
        rho: Real,
        t: Real,
    ) -> EosResult<StateDerivatives> {
        finite_difference_derivatives(self, rho, t)
    }

    /// Grüneisen parameter Γ = (1/ρ) ∂P/∂e|ρ.
    fn gruneisen_param_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        let d = self.derivatives_from_density_temperature(rho, t)?;
        Ok(d.dpde() / rho)
    }

    /// Isentropic bulk modulus.
    fn bulk_modulus_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        let d = self.derivatives_from_density_temperature(rho, t)?;
        Ok(d.isentropic_bulk_modulus(rho, t))
    }

    /// Admissible open density interval.
    fn density_bounds(&self) -> (Real, Real) {
        (0.0, Real::INFINITY)
    }

    /// Density used to start inversions when no guess is available.
    fn reference_density(&self) -> Real {
        1.0
    }

    /// Density and specific internal energy at the given pressure and temperature.
    ///
    /// The default inverts `pressure_from_density_temperature` in density with a
    /// bracketed Newton search started from `rho_guess` (or the reference
    /// density). Fails with `OutOfDomain` when no admissible density reaches `p`.
    fn density_energy_from_pressure_temperature(
        &self,
        p: Real,
        t: Real,
        rho_guess: Option<Real>,
    ) -> EosResult<(Real, Real)> {
        validation::finite(p, "pressure")?;
        validation::temperature(t)?;

        let (rho_min, rho_max) = self.density_bounds();
        let guess = rho_guess.filter(|r| r.is_finite() && *r > rho_min && *r < rho_max);
        let start = guess.unwrap_or_else(|| self.reference_density());
        let factor = if guess.is_some() { 1.25 } else { 4.0 };

        let bracket = expand_bracket(
            |rho| self.pressure_from_density_temperature(rho, t).map(|v| v - p),
            start,
            factor,
            (rho_min, rho_max),
            400,
            "density",
        )
        .map_err(|e| match e {
            EosError::Numeric(CoreError::NotBracketed { .. }) => EosError::OutOfDomain {
                what: "pressure",
                value: p,
            },
            other => other,
        })?;

        let analytic = self.has_analytic_derivatives();
        let cfg = RootConfig {
            max_iterations: 200,
            x_tol: 1e-14,
            f_tol: 0.0,
        };
        let rho = newton_bisect(
            |rho| {
                let value = self.pressure_from_density_temperature(rho, t)? - p;
                let slope = if analytic {
                    self.derivatives_from_density_temperature(rho, t)?.dp_drho
                } else {
                    central_difference(|r| self.pressure_from_density_temperature(r, t), rho)?
                };
                Ok::<_, EosError>((value, Some(slope)))
            },
            bracket,
            Some(start),
            &cfg,
            "density",
        )?;

        let sie = self.internal_energy_from_density_temperature(rho, t)?;
        Ok((rho, sie))
    }
}

fn central_difference<F>(mut f: F, x: Real) -> EosResult<Real>
where
    F: FnMut(Real) -> EosResult<Real>,
{
    let h = FD_REL_STEP * x.abs().max(Real::MIN_POSITIVE);
    let f_plus = f(x + h)?;
    let f_minus = f(x - h)?;
    Ok((f_plus - f_minus) / (2.0 * h))
}

/// Central finite-difference (ρ, T) derivatives for models without analytic ones.
///
/// The specific heat comes from the model directly.
pub fn finite_difference_derivatives<M>(model: &M, rho: Real, t: Real) -> EosResult<StateDerivatives>
where
    M: EosModel + ?Sized,
{
    validation::density(rho)?;
    validation::temperature(t)?;

    let dp_drho = central_difference(|r| model.pressure_from_density_temperature(r, t), rho)?;
    let dp_dt = central_difference(|tt| model.pressure_from_density_temperature(rho, tt), t)?;
    let de_drho =
        central_difference(|r| model.internal_energy_from_density_temperature(r, t), rho)?;
    let de_dt = model.specific_heat_from_density_temperature(rho, t)?;

    Ok(StateDerivatives {
        dp_drho,
        dp_dt,
        de_drho,
        de_dt,
    })
}

/// Validation helpers for model inputs and parameters.
pub(crate) mod validation {
    use super::*;

    /// Ensure density is positive and finite.
    pub fn density(rho: Real) -> EosResult<()> {
        if !rho.is_finite() || rho <= 0.0 {
            return Err(EosError::OutOfDomain {
                what: "density",
                value: rho,
            });
        }
        Ok(())
    }

    /// Ensure temperature is positive and finite.
    pub fn temperature(t: Real) -> EosResult<()> {
        if !t.is_finite() || t <= 0.0 {
            return Err(EosError::OutOfDomain {
                what: "temperature",
                value: t,
            });
        }
        Ok(())
    }

    /// Ensure a state value is finite (energy and pressure may be negative).
    pub fn finite(v: Real, what: &'static str) -> EosResult<()> {
        if !v.is_finite() {
            return Err(EosError::OutOfDomain { what, value: v });
        }
        Ok(())
    }

    /// Ensure a model parameter is positive and finite.
    pub fn positive_param(v: Real, what: &'static str) -> EosResult<()> {
        if !v.is_finite() || v <= 0.0 {
            return Err(EosError::NonPhysical { what });
        }
        Ok(())
    }

    /// Ensure a model parameter is finite.
    pub fn finite_param(v: Real, what: &'static str) -> EosResult<()> {
        if !v.is_finite() {
            return Err(EosError::NonPhysical { what });
        }
        Ok(())
    }
}
