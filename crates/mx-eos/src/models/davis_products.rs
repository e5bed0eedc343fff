//! Davis detonation products.
//!
//! ```text
//! x      = V/vc = 1/(ρ vc)
//! y      = (x^n + x^-n) / 2
//! F(x)   = 2a / (x^2n + 1)
//! P_s(ρ) = pc y^(a/n) x^-(k+a) (k - 1 + F) / (k - 1 + a)
//! E_s(ρ) = pc vc/(k - 1 + a) y^(a/n) x^-(k-1+a) - E0
//! T_s(ρ) = 2^(-ab/n) pc vc/(c_v (k - 1 + a)) y^(a(1-b)/n) x^-(k-1+a(1-b))
//! Γ(ρ)   = k - 1 + (1 - b) F
//! e(ρ,T) = E_s(ρ) + c_v (T - T_s(ρ))
//! P(ρ,e) = P_s(ρ) + ρΓ(ρ) (e - E_s(ρ))
//! ```
//!
//! `E_s' = P_s / ρ²` and `T_s' = Γ T_s / ρ`, so both reference curves lie on
//! the principal isentrope.

use crate::error::EosResult;
use crate::model::{EosModel, StateDerivatives, validation};
use mx_core::Real;

/// Davis products parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DavisProductsParams {
    pub a: Real,
    pub b: Real,
    pub k: Real,
    pub n: Real,
    /// Specific volume at the CJ-like reference point
    pub vc: Real,
    pub pc: Real,
    pub cv: Real,
    /// Energy offset of the reference isentrope
    pub e0: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DavisProducts {
    p: DavisProductsParams,
}

/// Reference-curve terms at one density.
#[derive(Debug, Clone, Copy)]
struct Isentrope {
    pressure: Real,
    energy: Real,
    temperature: Real,
    gamma: Real,
    /// F / a, kept separate so a = 0 needs no division
    shape: Real,
}

impl DavisProducts {
    pub fn new(params: DavisProductsParams) -> EosResult<Self> {
        validation::finite_param(params.a, "Davis products a must be finite")?;
        validation::finite_param(params.b, "Davis products b must be finite")?;
        validation::finite_param(params.k, "Davis products k must be finite")?;
        validation::positive_param(params.n, "Davis products n must be positive")?;
        validation::positive_param(params.vc, "Davis products vc must be positive")?;
        validation::positive_param(params.pc, "Davis products pc must be positive")?;
        validation::positive_param(params.cv, "Davis products cv must be positive")?;
        validation::finite_param(params.e0, "Davis products E0 must be finite")?;
        validation::positive_param(
            params.k - 1.0 + params.a,
            "Davis products k - 1 + a must be positive",
        )?;
        Ok(Self { p: params })
    }

    pub fn params(&self) -> &DavisProductsParams {
        &self.p
    }

    fn isentrope(&self, rho: Real) -> Isentrope {
        let DavisProductsParams { a, b, k, n, vc, pc, cv, e0 } = self.p;
        let x = 1.0 / (rho * vc);
        let xn = x.powf(n);
        let y = 0.5 * (xn + 1.0 / xn);
        let shape = 2.0 / (xn * xn + 1.0);
        let f = a * shape;
        let kk = k - 1.0 + a;

        let ec = pc * vc / kk;
        let es = ec * y.powf(a / n) / x.powf(kk);
        let tc = 2.0_f64.powf(-a * b / n) * ec / cv;
        Isentrope {
            pressure: es * (k - 1.0 + f) * rho,
            energy: es - e0,
            temperature: tc * y.powf(a * (1.0 - b) / n) / x.powf(k - 1.0 + a * (1.0 - b)),
            gamma: k - 1.0 + (1.0 - b) * f,
            shape,
        }
    }

    fn temperature(&self, s: &Isentrope, sie: Real) -> EosResult<Real> {
        let t = s.temperature + (sie - s.energy) / self.p.cv;
        validation::temperature(t)?;
        Ok(t)
    }
}

impl EosModel for DavisProducts {
    fn name(&self) -> &str {
        "DavisProducts"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let s = self.isentrope(rho);
        Ok(s.pressure + rho * s.gamma * self.p.cv * (t - s.temperature))
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let s = self.isentrope(rho);
        Ok(s.energy + self.p.cv * (t - s.temperature))
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::finite(sie, "specific internal energy")?;
        self.temperature(&self.isentrope(rho), sie)
    }

    fn specific_heat_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.p.cv)
    }

    fn pressure_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::finite(sie, "specific internal energy")?;
        let s = self.isentrope(rho);
        self.temperature(&s, sie)?;
        Ok(s.pressure + rho * s.gamma * (sie - s.energy))
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
        let DavisProductsParams { a, b, k, n, cv, .. } = self.p;
        let s = self.isentrope(rho);
        let f = a * s.shape;
        // ρ dF/dρ
        let rho_df = n * f * (2.0 - s.shape);

        let dps_drho = s.pressure / rho * (f + k + rho_df / (k - 1.0 + f));
        let dts_drho = s.gamma * s.temperature / rho;
        let d_rho_gamma = s.gamma + (1.0 - b) * rho_df;
        Ok(StateDerivatives {
            dp_drho: dps_drho + d_rho_gamma * cv * (t - s.temperature)
                - rho * s.gamma * cv * dts_drho,
            dp_dt: rho * s.gamma * cv,
            de_drho: s.pressure / (rho * rho) - cv * dts_drho,
            de_dt: cv,
        })
    }

    fn gruneisen_param_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.isentrope(rho).gamma)
    }

    fn reference_density(&self) -> Real {
        1.0 / self.p.vc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::finite_difference_derivatives;
    use approx::assert_relative_eq;

    /// PBX-9501-like products in SI
    fn products() -> DavisProducts {
        DavisProducts::new(DavisProductsParams {
            a: 0.798311,
            b: 0.58,
            k: 1.35,
            n: 2.66182,
            vc: 7.5419e-4,
            pc: 3.2e9,
            cv: 1000.0,
            e0: 0.0,
        })
        .unwrap()
    }

    #[test]
    fn energy_and_pressure_paths_agree() {
        let eos = products();
        let (rho, t) = (1500.0, 2500.0);
        let e = eos.internal_energy_from_density_temperature(rho, t).unwrap();
        assert_relative_eq!(
            eos.temperature_from_density_internal_energy(rho, e).unwrap(),
            t,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            eos.pressure_from_density_internal_energy(rho, e).unwrap(),
            eos.pressure_from_density_temperature(rho, t).unwrap(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn reference_curves_lie_on_an_isentrope() {
        let eos = products();
        let rho = 1100.0;
        let h = 1e-4 * rho;
        let (lo, mid, hi) = (eos.isentrope(rho - h), eos.isentrope(rho), eos.isentrope(rho + h));
        let des = (hi.energy - lo.energy) / (2.0 * h);
        let dts = (hi.temperature - lo.temperature) / (2.0 * h);
        assert_relative_eq!(des, mid.pressure / (rho * rho), max_relative = 1e-6);
        assert_relative_eq!(dts, mid.gamma * mid.temperature / rho, max_relative = 1e-6);
    }

    #[test]
    fn analytic_derivatives_match_finite_differences() {
        let eos = products();
        for (rho, t) in [(700.0, 1500.0), (1300.0, 3000.0), (2500.0, 4000.0)] {
            let analytic = eos.derivatives_from_density_temperature(rho, t).unwrap();
            let numeric = finite_difference_derivatives(&eos, rho, t).unwrap();
            assert_relative_eq!(analytic.dp_drho, numeric.dp_drho, max_relative = 1e-5);
            assert_relative_eq!(analytic.dp_dt, numeric.dp_dt, max_relative = 1e-5);
            assert_relative_eq!(analytic.de_drho, numeric.de_drho, max_relative = 1e-5);
            assert_relative_eq!(analytic.de_dt, numeric.de_dt, max_relative = 1e-5);
        }
    }

    #[test]
    fn pressure_temperature_inversion_round_trips() {
        let eos = products();
        let p = eos.pressure_from_density_temperature(900.0, 1800.0).unwrap();
        let (rho, _) = eos
            .density_energy_from_pressure_temperature(p, 1800.0, None)
            .unwrap();
        assert_relative_eq!(rho, 900.0, max_relative = 1e-10);
    }

    #[test]
    fn energy_below_zero_temperature_is_rejected() {
        let eos = products();
        let s = eos.isentrope(1200.0);
        let cold = s.energy - eos.params().cv * s.temperature;
        assert!(eos.temperature_from_density_internal_energy(1200.0, cold - 1.0).is_err());
    }

    #[test]
    fn parameters_are_validated() {
        let mut params = *products().params();
        params.k = 0.1;
        params.a = 0.5;
        assert!(DavisProducts::new(params).is_err());
    }
}
