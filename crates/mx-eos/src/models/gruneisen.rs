//! Mie-Grüneisen solid with a cubic Us-up Hugoniot reference curve.
//!
//! ```text
//! η      = 1 - ρ0/ρ
//! P_H(ρ) = P0 + ρ0 C0² η / (1 - s1 η - s2 η² - s3 η³)²     (η ≥ 0)
//!        = P0 + ρ0 C0² η                                   (η < 0)
//! ρΓ(ρ)  = G0 ρ0 + b (ρ - ρ0)                              (ρ ≥ ρ0)
//!        = G0 ρ                                            (ρ < ρ0)
//! e(ρ,T) = c_v (T - T0)
//! P(ρ,e) = P_H(ρ) + ρΓ(ρ) e
//! ```
//!
//! Derivatives fall back to the trait's finite differences.

use crate::error::{EosError, EosResult};
use crate::model::{EosModel, validation};
use mx_core::{Bracket, CoreError, Real, RootConfig, newton_bisect};

/// Mie-Grüneisen parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GruneisenParams {
    pub c0: Real,
    pub s1: Real,
    pub s2: Real,
    pub s3: Real,
    pub g0: Real,
    pub b: Real,
    pub rho0: Real,
    pub t0: Real,
    pub p0: Real,
    pub cv: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gruneisen {
    p: GruneisenParams,
    rho_max: Real,
}

impl Gruneisen {
    pub fn new(params: GruneisenParams) -> EosResult<Self> {
        validation::positive_param(params.c0, "Gruneisen C0 must be positive")?;
        validation::finite_param(params.s1, "Gruneisen s1 must be finite")?;
        validation::finite_param(params.s2, "Gruneisen s2 must be finite")?;
        validation::finite_param(params.s3, "Gruneisen s3 must be finite")?;
        validation::positive_param(params.g0, "Gruneisen G0 must be positive")?;
        validation::finite_param(params.b, "Gruneisen b must be finite")?;
        validation::positive_param(params.rho0, "Gruneisen rho0 must be positive")?;
        validation::positive_param(params.t0, "Gruneisen T0 must be positive")?;
        validation::finite_param(params.p0, "Gruneisen P0 must be finite")?;
        validation::positive_param(params.cv, "Gruneisen cv must be positive")?;

        let rho_max = max_compression_density(&params)?;
        Ok(Self { p: params, rho_max })
    }

    pub fn params(&self) -> &GruneisenParams {
        &self.p
    }

    /// Density at which the Hugoniot denominator vanishes.
    pub fn max_density(&self) -> Real {
        self.rho_max
    }

    fn hugoniot_pressure(&self, rho: Real) -> EosResult<Real> {
        let eta = 1.0 - self.p.rho0 / rho;
        let k = self.p.rho0 * self.p.c0 * self.p.c0;
        if eta < 0.0 {
            return Ok(self.p.p0 + k * eta);
        }
        let denom = hugoniot_denominator(&self.p, eta);
        if denom <= 0.0 {
            return Err(EosError::OutOfDomain {
                what: "density",
                value: rho,
            });
        }
        Ok(self.p.p0 + k * eta / (denom * denom))
    }

    fn rho_gamma(&self, rho: Real) -> Real {
        if rho >= self.p.rho0 {
            self.p.g0 * self.p.rho0 + self.p.b * (rho - self.p.rho0)
        } else {
            self.p.g0 * rho
        }
    }
}

fn hugoniot_denominator(p: &GruneisenParams, eta: Real) -> Real {
    1.0 - eta * (p.s1 + eta * (p.s2 + eta * p.s3))
}

fn max_compression_density(p: &GruneisenParams) -> EosResult<Real> {
    let at_full = hugoniot_denominator(p, 1.0);
    if at_full > 0.0 {
        return Ok(Real::INFINITY);
    }
    // D(0) = 1 > 0 >= D(1): the first zero in (0, 1] bounds compression
    let bracket = Bracket {
        lo: 0.0,
        hi: 1.0,
        f_lo: 1.0,
        f_hi: at_full,
    };
    let eta_max = newton_bisect(
        |eta| {
            let value = hugoniot_denominator(p, eta);
            let slope = -(p.s1 + eta * (2.0 * p.s2 + 3.0 * eta * p.s3));
            Ok::<_, CoreError>((value, Some(slope)))
        },
        bracket,
        None,
        &RootConfig::default(),
        "Gruneisen compression limit",
    )?;
    Ok(p.rho0 / (1.0 - eta_max))
}

impl EosModel for Gruneisen {
    fn name(&self) -> &str {
        "Gruneisen"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        let ph = self.hugoniot_pressure(rho)?;
        Ok(ph + self.rho_gamma(rho) * self.p.cv * (t - self.p.t0))
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::temperature(t)?;
        Ok(self.p.cv * (t - self.p.t0))
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        validation::density(rho)?;
        validation::finite(sie, "specific internal energy")?;
        let t = self.p.t0 + sie / self.p.cv;
        validation::temperature(t)?;
        Ok(t)
    }

    fn specific_heat_from_density_temperature(&self, _rho: Real, _t: Real) -> EosResult<Real> {
        Ok(self.p.cv)
    }

    fn pressure_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        self.temperature_from_density_internal_energy(rho, sie)?;
        Ok(self.hugoniot_pressure(rho)? + self.rho_gamma(rho) * sie)
    }

    fn gruneisen_param_from_density_temperature(&self, rho: Real, _t: Real) -> EosResult<Real> {
        validation::density(rho)?;
        Ok(self.rho_gamma(rho) / rho)
    }

    fn density_bounds(&self) -> (Real, Real) {
        (0.0, self.rho_max)
    }

    fn reference_density(&self) -> Real {
        self.p.rho0
    }
}
