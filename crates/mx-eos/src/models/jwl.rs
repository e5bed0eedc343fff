//! Jones-Wilkins-Lee detonation products.
//!
//! ```text
//! P_ref(ρ) = A exp(-R1 ρ0/ρ) + B exp(-R2 ρ0/ρ)
//! E_ref(ρ) = A/(ρ0 R1) exp(-R1 ρ0/ρ) + B/(ρ0 R2) exp(-R2 ρ0/ρ)
//! P(ρ, e)  = P_ref(ρ) + w ρ (e - E_ref(ρ))
//! e(ρ, T)  = E_ref(ρ) + c_v T
//! ```
//!
//! `E_ref' = P_ref / ρ²`, so the reference curve is an isentrope.

use crate::error::EosResult;
use crate::model::{EosModel, StateDerivatives, validation};
use mx_core::Real;

/// JWL parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JwlParams {
    pub a: Real,
    pub b: Real,
    pub r1: Real,
    pub r2: Real,
    pub w: Real,
    pub rho0: Real,
    pub cv: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jwl {
    p: JwlParams,
}

impl Jwl {
    pub fn new(params: JwlParams) -> EosResult<Self> {
        validation::finite_param(params.a, "JWL A must be finite")?;
        validation::finite_param(params.b, "JWL B must be finite")?;
        validation::positive_param(params.r1, "JWL R1 must be positive")?;
        validation::positive_param(params.r2, "JWL R2 must be positive")?;
        validation::positive_param(params.w, "JWL w must be positive")?;
        validation::positive_param(params.rho0, "JWL rho0 must be positive")?;
        validation::positive_param(params.cv, "JWL cv must be positive")?;
        Ok(Self { p: params })
    }

    pub fn params(&self) -> &JwlParams {
        &self.p
    }

    fn exps(&self, rho: Real) -> (Real, Real) {
        let x = self.p.rho0 / rho;
        ((-self.p.r1 * x).exp(), (-self.p.r2 * x).exp())
    }

    fn reference_pressure(&self, rho: Real) -> Real {
        let (e1, e2) = self.exps(rho);
        self.p.a * e1 + self.p.b * e2
    }

    fn reference_energy(&self, rho: Real) -> Real {
        let (e1, e2) = self.exps(rho);
        self.p.a / (self.p.rho0 * self.p.r1) * e1 + self.p.b / (self.p.rho0 * self.p.r2) * e2
    }

    fn reference_pressure_slope(&self, rho: Real) -> Real {
        let (e1, e2) = self.exps(rho);
        (self.p.a * self.p.r1 * e1 + self.p.b * self.p.r2 * e2) * self.p.rho0 / (rho * rho)
    }
}

impl EosModel for Jwl {
    fn name(&self) -> &str {
        "JWL"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.reference_pressure(rho) + self.p.w * rho * self.p.cv * t)
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.reference_energy(rho) + self.p.cv * t)
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::finite(sie, "specific internal energy")?;
        let t = (sie - self.reference_energy(rho)) / self.p.cv;
        validation::temperature(t)?;
        Ok(t)
    }

    fn specific_heat_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.p.cv)
    }

    fn pressure_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        self.temperature_from_density_internal_energy(rho, sie)?;
        Ok(self.reference_pressure(rho) + self.p.w * rho * (sie - self.reference_energy(rho)))
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
            dp_drho: self.reference_pressure_slope(rho) + self.p.w * self.p.cv * t,
            dp_dt: self.p.w * rho * self.p.cv,
            de_drho: self.reference_pressure(rho) / (rho * rho),
            de_dt: self.p.cv,
        })
    }

    fn gruneisen_param_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.p.w)
    }

    fn bulk_modulus_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        // B_s = ρ ∂P/∂ρ|e + w P
        let p = self.pressure_from_density_temperature(rho, t)?;
        let excess = self.p.cv * t;
        let dp_drho_e = self.reference_pressure_slope(rho) + self.p.w * excess
            - self.p.w * self.reference_pressure(rho) / rho;
        Ok(rho * dp_drho_e + self.p.w * p)
    }

    fn reference_density(&self) -> Real {
        self.p.rho0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// PBX-9404-like products in SI
    fn products() -> Jwl {
        Jwl::new(JwlParams {
            a: 8.524e11,
            b: 1.802e10,
            r1: 4.6,
            r2: 1.3,
            w: 0.38,
            rho0: 1840.0,
            cv: 1000.0,
        })
        .unwrap()
    }

    #[test]
    fn energy_and_pressure_paths_agree() {
        let jwl = products();
        let (rho, t) = (1500.0, 2500.0);
        let e = jwl.internal_energy_from_density_temperature(rho, t).unwrap();
        assert_relative_eq!(
            jwl.temperature_from_density_internal_energy(rho, e).unwrap(),
            t,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            jwl.pressure_from_density_internal_energy(rho, e).unwrap(),
            jwl.pressure_from_density_temperature(rho, t).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn analytic_derivatives_match_finite_differences() {
        let jwl = products();
        let analytic = jwl.derivatives_from_density_temperature(1200.0, 3000.0).unwrap();
        let numeric = crate::model::finite_difference_derivatives(&jwl, 1200.0, 3000.0).unwrap();
        assert_relative_eq!(analytic.dp_drho, numeric.dp_drho, max_relative = 1e-6);
        assert_relative_eq!(analytic.dp_dt, numeric.dp_dt, max_relative = 1e-6);
        assert_relative_eq!(analytic.de_drho, numeric.de_drho, max_relative = 1e-6);
    }

    #[test]
    fn bulk_modulus_matches_generic_identity() {
        let jwl = products();
        let (rho, t) = (1700.0, 2000.0);
        let closed = jwl.bulk_modulus_from_density_temperature(rho, t).unwrap();
        let d = jwl.derivatives_from_density_temperature(rho, t).unwrap();
        assert_relative_eq!(closed, d.isentropic_bulk_modulus(rho, t), max_relative = 1e-10);
    }

    #[test]
    fn pressure_temperature_inversion_round_trips() {
        let jwl = products();
        let p = jwl.pressure_from_density_temperature(900.0, 1800.0).unwrap();
        let (rho, _) = jwl
            .density_energy_from_pressure_temperature(p, 1800.0, None)
            .unwrap();
        assert_relative_eq!(rho, 900.0, max_relative = 1e-10);
    }

    #[test]
    fn energy_below_reference_curve_is_rejected() {
        let jwl = products();
        let e_ref = jwl.reference_energy(1840.0);
        assert!(jwl
            .temperature_from_density_internal_energy(1840.0, e_ref - 1.0)
            .is_err());
    }
}
