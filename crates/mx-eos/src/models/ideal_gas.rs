//! Calorically perfect ideal gas.
//!
//! ```text
//! P = (γ - 1) ρ e,    e = c_v T
//! ```

use crate::error::EosResult;
use crate::model::{EosModel, StateDerivatives, validation};
use mx_core::Real;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealGas {
    gm1: Real,
    cv: Real,
}

impl IdealGas {
    /// Create an ideal gas from the Grüneisen coefficient γ-1 and specific heat.
    pub fn new(gm1: Real, cv: Real) -> EosResult<Self> {
        validation::positive_param(gm1, "ideal gas gamma - 1 must be positive")?;
        validation::positive_param(cv, "ideal gas cv must be positive")?;
        Ok(Self { gm1, cv })
    }

    pub fn gm1(&self) -> Real {
        self.gm1
    }

    pub fn cv(&self) -> Real {
        self.cv
    }

    /// Specific gas constant R = (γ-1) c_v.
    pub fn gas_constant(&self) -> Real {
        self.gm1 * self.cv
    }
}

impl EosModel for IdealGas {
    fn name(&self) -> &str {
        "IdealGas"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.gm1 * rho * self.cv * t)
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.cv * t)
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        let t = sie / self.cv;
        validation::temperature(t)?;
        Ok(t)
    }

    fn specific_heat_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.cv)
    }

    fn pressure_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        self.temperature_from_density_internal_energy(rho, sie)?;
        Ok(self.gm1 * rho * sie)
    }

    fn has_analytic_derivatives(&self) -> bool {
        true
    }

    fn derivatives_from_density_temperature(
        &self,
        rho: Real,
        t: Real,
    ) -> EosResult<StateDerivatives> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(StateDerivatives {
            dp_drho: self.gm1 * self.cv * t,
            dp_dt: self.gm1 * rho * self.cv,
            de_drho: 0.0,
            de_dt: self.cv,
        })
    }

    fn gruneisen_param_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.gm1)
    }

    fn bulk_modulus_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        Ok((self.gm1 + 1.0) * self.pressure_from_density_temperature(rho, t)?)
    }

    fn density_energy_from_pressure_temperature(
        &self,
        p: Real,
        t: Real,
        _rho_guess: Option<Real>,
    ) -> EosResult<(Real, Real)> {
        validation::temperature(t)?;
        let rho = p / (self.gas_constant() * t);
        validation::density(rho)?;
        Ok((rho, self.cv * t))
    }
}
