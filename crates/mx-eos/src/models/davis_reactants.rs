//! Davis unreacted solid explosive.
//!
//! ```text
//! y      = 1 - ρ0/ρ,   u = 4By,   p̂ = ρ0 A² / 4B
//! P_s(ρ) = P0 + p̂ (u + u²/2 + u³/6 + C u⁴/24 + y²/(1-y)⁴)    (y > 0)
//!        = P0 + p̂ (exp(u) - 1)                                (y ≤ 0)
//! E_s(ρ) = e0 + ∫ P_s dV along y
//! T_s(ρ) = T0 exp(-Zy) (1-y)^-(Γ0+Z)                          (y > 0)
//!        = T0 (1-y)^-Γ0                                       (y ≤ 0)
//! Γ(ρ)   = Γ0 + Zy  (y > 0),   Γ0  (y ≤ 0)
//! e(ρ,T) = E_s + c_v0 T_s/(1+α) ((T/T_s)^(1+α) - 1)
//! P(ρ,e) = P_s + ρΓ (e - E_s)
//! ```
//!
//! The specific heat is `c_v0 (T/T_s)^α`. `A` is the ambient sound speed.

use crate::error::{EosError, EosResult};
use crate::model::{EosModel, StateDerivatives, validation};
use mx_core::Real;

/// Davis reactants parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DavisReactantsParams {
    pub rho0: Real,
    pub e0: Real,
    pub p0: Real,
    pub t0: Real,
    pub a: Real,
    pub b: Real,
    pub c: Real,
    pub g0: Real,
    pub z: Real,
    pub alpha: Real,
    pub cv0: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DavisReactants {
    p: DavisReactantsParams,
}

/// Reference-curve terms at one density.
#[derive(Debug, Clone, Copy)]
struct Isentrope {
    pressure: Real,
    energy: Real,
    temperature: Real,
    gamma: Real,
    dpressure_drho: Real,
    dgamma_drho: Real,
}

impl DavisReactants {
    pub fn new(params: DavisReactantsParams) -> EosResult<Self> {
        validation::positive_param(params.rho0, "Davis reactants rho0 must be positive")?;
        validation::finite_param(params.e0, "Davis reactants e0 must be finite")?;
        validation::finite_param(params.p0, "Davis reactants P0 must be finite")?;
        validation::positive_param(params.t0, "Davis reactants T0 must be positive")?;
        validation::positive_param(params.a, "Davis reactants A must be positive")?;
        validation::positive_param(params.b, "Davis reactants B must be positive")?;
        validation::finite_param(params.c, "Davis reactants C must be finite")?;
        validation::positive_param(params.g0, "Davis reactants G0 must be positive")?;
        validation::finite_param(params.z, "Davis reactants Z must be finite")?;
        validation::positive_param(1.0 + params.alpha, "Davis reactants alpha must exceed -1")?;
        validation::positive_param(params.cv0, "Davis reactants Cv0 must be positive")?;
        Ok(Self { p: params })
    }

    pub fn params(&self) -> &DavisReactantsParams {
        &self.p
    }

    fn isentrope(&self, rho: Real) -> Isentrope {
        let DavisReactantsParams { rho0, e0, p0, t0, a, b, c, g0, z, .. } = self.p;
        let y = 1.0 - rho0 / rho;
        let u = 4.0 * b * y;
        let phat = 0.25 * rho0 * a * a / b;
        let dy_drho = (1.0 - y) / rho;

        let (ps, integral, dps_dy, ts, gamma, dgamma_dy) = if y > 0.0 {
            let s = 1.0 - y;
            let poly = u * (1.0 + u * (0.5 + u * (1.0 / 6.0 + u * c / 24.0)));
            let poly_int = u * u * (0.5 + u * (1.0 / 6.0 + u * (1.0 / 24.0 + u * c / 120.0)));
            let dpoly = 1.0 + u * (1.0 + u * (0.5 + u * c / 6.0));
            (
                p0 + phat * (poly + y * y / s.powi(4)),
                p0 * y + phat * (poly_int / (4.0 * b) + y.powi(3) / (3.0 * s.powi(3))),
                phat * (4.0 * b * dpoly + 2.0 * y / s.powi(4) + 4.0 * y * y / s.powi(5)),
                t0 * (-z * y).exp() * s.powf(-(g0 + z)),
                g0 + z * y,
                z,
            )
        } else {
            let eu = u.exp();
            (
                p0 + phat * (eu - 1.0),
                p0 * y + phat * ((eu - 1.0) / (4.0 * b) - y),
                phat * 4.0 * b * eu,
                t0 * (1.0 - y).powf(-g0),
                g0,
                0.0,
            )
        };

        Isentrope {
            pressure: ps,
            energy: e0 + integral / rho0,
            temperature: ts,
            gamma,
            dpressure_drho: dps_dy * dy_drho,
            dgamma_drho: dgamma_dy * dy_drho,
        }
    }

    /// e - E_s at temperature `t`.
    fn thermal_energy(&self, s: &Isentrope, t: Real) -> Real {
        let alpha1 = 1.0 + self.p.alpha;
        self.p.cv0 * s.temperature / alpha1 * ((t / s.temperature).powf(alpha1) - 1.0)
    }

    fn temperature(&self, s: &Isentrope, sie: Real) -> EosResult<Real> {
        let alpha1 = 1.0 + self.p.alpha;
        let base = 1.0 + alpha1 * (sie - s.energy) / (self.p.cv0 * s.temperature);
        if base.is_nan() || base <= 0.0 {
            return Err(EosError::OutOfDomain {
                what: "specific internal energy",
                value: sie,
            });
        }
        let t = s.temperature * base.powf(1.0 / alpha1);
        validation::temperature(t)?;
        Ok(t)
    }
}

impl EosModel for DavisReactants {
    fn name(&self) -> &str {
        "DavisReactants"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let s = self.isentrope(rho);
        Ok(s.pressure + rho * s.gamma * self.thermal_energy(&s, t))
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let s = self.isentrope(rho);
        Ok(s.energy + self.thermal_energy(&s, t))
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::finite(sie, "specific internal energy")?;
        self.temperature(&self.isentrope(rho), sie)
    }

    fn specific_heat_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let s = self.isentrope(rho);
        Ok(self.p.cv0 * (t / s.temperature).powf(self.p.alpha))
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
        let DavisReactantsParams { alpha, cv0, .. } = self.p;
        let s = self.isentrope(rho);
        let tau = t / s.temperature;
        let cv = cv0 * tau.powf(alpha);
        let thermal = self.thermal_energy(&s, t);
        let dts_drho = s.gamma * s.temperature / rho;
        // ∂(e - E_s)/∂ρ at fixed T
        let dthermal_drho = -cv0 * (alpha * tau.powf(1.0 + alpha) + 1.0) / (1.0 + alpha) * dts_drho;
        Ok(StateDerivatives {
            dp_drho: s.dpressure_drho
                + (s.gamma + rho * s.dgamma_drho) * thermal
                + rho * s.gamma * dthermal_drho,
            dp_dt: rho * s.gamma * cv,
            de_drho: s.pressure / (rho * rho) + dthermal_drho,
            de_dt: cv,
        })
    }

    fn gruneisen_param_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.isentrope(rho).gamma)
    }

    fn reference_density(&self) -> Real {
        self.p.rho0
    }
}
