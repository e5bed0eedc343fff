//! Equilibrium properties of the PTE solver on real model mixtures.

use approx::assert_relative_eq;
use mx_core::Real;
use mx_eos::{EosModel, EosResult, Gruneisen, GruneisenParams, IdealGas, Jwl, JwlParams};
use mx_pte::{CellTarget, FallbackPolicy, MixError, PteConfig, PteScratch, single, solve};
use proptest::prelude::*;

fn air() -> IdealGas {
    IdealGas::new(0.4, 717.5).unwrap()
}

fn helium() -> IdealGas {
    IdealGas::new(0.667, 3115.0).unwrap()
}

fn copper() -> Gruneisen {
    Gruneisen::new(GruneisenParams {
        c0: 3940.0,
        s1: 1.489,
        s2: 0.0,
        s3: 0.0,
        g0: 2.02,
        b: 0.47,
        rho0: 8930.0,
        t0: 298.0,
        p0: 0.0,
        cv: 383.0,
    })
    .unwrap()
}

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

fn load<'a>(scratch: &mut PteScratch<'a>, parts: &[(&'a dyn EosModel, Real, Real)]) {
    scratch.clear();
    for &(model, mass, volume) in parts {
        scratch.push(model, mass, volume, 0.0);
    }
}

/// Build (ρ_cell, e_cell) from a known equilibrium.
fn cell_at(parts: &[(&dyn EosModel, Real)], p: Real, t: Real) -> (Real, Real) {
    let mut volume = 0.0;
    let mut energy = 0.0;
    for &(model, mass) in parts {
        let (rho, sie) = model.density_energy_from_pressure_temperature(p, t, None).unwrap();
        volume += mass / rho;
        energy += mass * sie;
    }
    (1.0 / volume, energy)
}

fn assert_conserves(scratch: &PteScratch<'_>, rho_cell: Real, sie_cell: Real) {
    let mut volume = 0.0;
    let mut energy = 0.0;
    for i in 0..scratch.len() {
        let s = scratch.state(i).unwrap();
        if s.active {
            volume += s.mass_fraction / s.density;
            energy += s.mass_fraction * s.sie;
        }
    }
    assert!((volume * rho_cell - 1.0).abs() < 1e-7, "volume residual {}", volume * rho_cell - 1.0);
    assert!(
        (energy - sie_cell).abs() / sie_cell.abs() < 1e-7,
        "energy residual {}",
        (energy - sie_cell) / sie_cell
    );
}

#[test]
fn two_ideal_gases_match_closed_form() {
    let (a, b) = (air(), helium());
    let (rho, sie) = (1.0, 3.0e5);
    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&a, 0.3, 0.5), (&b, 0.7, 0.5)]);

    let sol = solve(
        &mut scratch,
        CellTarget::DensityEnergy { density: rho, sie },
        &PteConfig::default(),
    )
    .unwrap();

    // e = T Σ mᵢcvᵢ and P/T = ρ Σ mᵢRᵢ for ideal gases in equilibrium
    let t = sie / (0.3 * 717.5 + 0.7 * 3115.0);
    let p = rho * t * (0.3 * 0.4 * 717.5 + 0.7 * 0.667 * 3115.0);
    assert_relative_eq!(sol.temperature, t, max_relative = 1e-6);
    assert_relative_eq!(sol.pressure, p, max_relative = 1e-6);

    for (i, model) in [&a, &b].into_iter().enumerate() {
        let s = scratch.state(i).unwrap();
        assert_relative_eq!(
            model.gas_constant() * s.density * sol.temperature,
            sol.pressure,
            max_relative = 1e-6
        );
    }
    assert_conserves(&scratch, rho, sie);
}

#[test]
fn identical_materials_reproduce_the_single_material_state() {
    let jwl = products();
    let (rho, t) = (1500.0, 2500.0);
    let sie = jwl.internal_energy_from_density_temperature(rho, t).unwrap();
    let reference = single::from_density_energy(&jwl, rho, sie).unwrap();

    // Unequal volume guesses force real iterations towards the 50/50 split
    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&jwl, 0.5, 0.3), (&jwl, 0.5, 0.7)]);
    let sol = solve(
        &mut scratch,
        CellTarget::DensityEnergy { density: rho, sie },
        &PteConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(sol.pressure, reference.pressure, max_relative = 1e-6);
    assert_relative_eq!(sol.temperature, reference.temperature, max_relative = 1e-6);
    assert_relative_eq!(scratch.state(0).unwrap().density, rho, max_relative = 1e-6);
}

#[test]
fn gas_and_solid_reach_the_known_equilibrium() {
    let (gas, cu) = (air(), copper());
    let (p, t) = (1.0e8, 800.0);
    let (rho, sie) = cell_at(&[(&gas, 0.2), (&cu, 0.8)], p, t);

    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let sol = solve(
        &mut scratch,
        CellTarget::DensityEnergy { density: rho, sie },
        &PteConfig::default(),
    )
    .unwrap();

    assert_relative_eq!(sol.pressure, p, max_relative = 1e-6);
    assert_relative_eq!(sol.temperature, t, max_relative = 1e-6);
    assert_conserves(&scratch, rho, sie);
}

#[test]
fn converged_state_is_a_fixed_point() {
    let (gas, cu) = (air(), copper());
    let (rho, sie) = cell_at(&[(&gas, 0.4), (&cu, 0.6)], 5.0e7, 650.0);
    let cfg = PteConfig::default();

    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.4, 0.5), (&cu, 0.6, 0.5)]);
    let first = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg).unwrap();

    let split: Vec<_> = (0..2).map(|i| scratch.state(i).unwrap()).collect();
    scratch.clear();
    scratch.push(&gas, 0.4, split[0].volume_fraction(rho), split[0].sie);
    scratch.push(&cu, 0.6, split[1].volume_fraction(rho), split[1].sie);
    let second = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg).unwrap();

    assert!(second.iterations <= 2, "took {} iterations", second.iterations);
    assert_relative_eq!(second.pressure, first.pressure, max_relative = 1e-6);
    assert_relative_eq!(second.temperature, first.temperature, max_relative = 1e-6);
}

#[test]
fn zero_volume_fraction_material_does_not_perturb_equilibrium() {
    let (a, b, cu) = (air(), helium(), copper());
    let (rho, sie) = (0.8, 2.5e5);
    let cfg = PteConfig::default();

    let mut scratch = PteScratch::with_capacity(3);
    load(&mut scratch, &[(&a, 0.3, 0.4), (&b, 0.6, 0.6), (&cu, 0.1, 0.0)]);
    let with = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg).unwrap();
    assert!(!scratch.state(2).unwrap().active);

    load(&mut scratch, &[(&a, 1.0 / 3.0, 0.4), (&b, 2.0 / 3.0, 0.6)]);
    let without = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg).unwrap();

    assert_relative_eq!(with.pressure, without.pressure, max_relative = 1e-9);
    assert_relative_eq!(with.temperature, without.temperature, max_relative = 1e-9);
}

#[test]
fn every_mode_recovers_the_same_equilibrium() {
    let (gas, cu) = (air(), copper());
    let (p, t) = (1.0e8, 800.0);
    let (rho, sie) = cell_at(&[(&gas, 0.2), (&cu, 0.8)], p, t);
    let cfg = PteConfig::default();
    let mut scratch = PteScratch::with_capacity(2);

    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let by_temperature = solve(
        &mut scratch,
        CellTarget::DensityTemperature {
            density: rho,
            temperature: t,
        },
        &cfg,
    )
    .unwrap();
    assert_relative_eq!(by_temperature.pressure, p, max_relative = 1e-6);
    assert_relative_eq!(by_temperature.sie, sie, max_relative = 1e-6);

    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let by_pressure = solve(
        &mut scratch,
        CellTarget::DensityPressure {
            density: rho,
            pressure: p,
        },
        &cfg,
    )
    .unwrap();
    assert_relative_eq!(by_pressure.temperature, t, max_relative = 1e-6);
    assert_relative_eq!(by_pressure.sie, sie, max_relative = 1e-6);

    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let direct = solve(
        &mut scratch,
        CellTarget::PressureTemperature {
            pressure: p,
            temperature: t,
        },
        &cfg,
    )
    .unwrap();
    assert_eq!(direct.iterations, 0);
    assert_relative_eq!(direct.density, rho, max_relative = 1e-9);
    assert_relative_eq!(direct.sie, sie, max_relative = 1e-9);
}

/// Ideal gas that only exists below a maximum density.
#[derive(Debug)]
struct BoundedGas {
    gas: IdealGas,
    rho_max: Real,
}

impl BoundedGas {
    fn check(&self, rho: Real) -> EosResult<()> {
        if rho > self.rho_max {
            return Err(mx_eos::EosError::OutOfDomain {
                what: "density",
                value: rho,
            });
        }
        Ok(())
    }
}

impl EosModel for BoundedGas {
    fn name(&self) -> &str {
        "BoundedGas"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.check(rho)?;
        self.gas.pressure_from_density_temperature(rho, t)
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.check(rho)?;
        self.gas.internal_energy_from_density_temperature(rho, t)
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        self.check(rho)?;
        self.gas.temperature_from_density_internal_energy(rho, sie)
    }

    fn specific_heat_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.gas.specific_heat_from_density_temperature(rho, t)
    }

    fn density_bounds(&self) -> (Real, Real) {
        (0.0, self.rho_max)
    }
}

#[test]
fn unreachable_volume_split_reports_convergence_failure() {
    let gas = air();
    let bounded = BoundedGas {
        gas: air(),
        rho_max: 10.0,
    };
    // Half the mass in a material capped at ρ = 10 needs at least 0.05 m³/kg,
    // more than the whole cell's 0.025 m³/kg.
    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.5, 0.5), (&bounded, 0.5, 0.5)]);
    let err = solve(
        &mut scratch,
        CellTarget::DensityEnergy {
            density: 40.0,
            sie: 2.0e5,
        },
        &PteConfig::default(),
    )
    .unwrap_err();

    match err {
        MixError::PteConvergenceFailure {
            pressure,
            temperature,
            ..
        } => {
            assert!(pressure.is_finite() && pressure > 0.0);
            assert!(temperature.is_finite() && temperature > 0.0);
        }
        other => panic!("expected PteConvergenceFailure, got {other}"),
    }
}

#[test]
fn dilute_solid_converges_from_poor_volume_guesses() {
    let (gas, cu) = (air(), copper());
    let (p, t) = (1.0e5, 300.0);
    let (rho, sie) = cell_at(&[(&gas, 0.999), (&cu, 0.001)], p, t);

    // The true air volume fraction is ~0.9999999; a guess far below it seeds
    // copper at a tiny fraction of its solid density.
    for fv in [0.99, 0.7, 0.5, 0.3] {
        let mut scratch = PteScratch::with_capacity(2);
        load(&mut scratch, &[(&gas, 0.999, fv), (&cu, 0.001, 1.0 - fv)]);
        let sol = solve(
            &mut scratch,
            CellTarget::DensityEnergy { density: rho, sie },
            &PteConfig::default(),
        )
        .unwrap_or_else(|e| panic!("air volume guess {fv}: {e}"));

        assert_relative_eq!(sol.pressure, p, max_relative = 1e-6);
        assert_relative_eq!(sol.temperature, t, max_relative = 1e-6);
        assert_conserves(&scratch, rho, sie);
    }
}

#[test]
fn capped_newton_is_recovered_by_pressure_bisection() {
    let (gas, cu) = (air(), copper());
    let (p, t) = (1.0e8, 800.0);
    let (rho, sie) = cell_at(&[(&gas, 0.2), (&cu, 0.8)], p, t);
    let cfg = PteConfig {
        max_iterations: 1,
        ..PteConfig::default()
    };

    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let sol = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg).unwrap();

    assert!(sol.used_fallback);
    assert!(sol.iterations > 1);
    assert_relative_eq!(sol.pressure, p, max_relative = 1e-6);
    assert_relative_eq!(sol.temperature, t, max_relative = 1e-6);
    assert_conserves(&scratch, rho, sie);
}

#[test]
fn capped_newton_without_fallback_fails() {
    let (gas, cu) = (air(), copper());
    let (rho, sie) = cell_at(&[(&gas, 0.2), (&cu, 0.8)], 1.0e8, 800.0);
    let cfg = PteConfig {
        max_iterations: 1,
        fallback: FallbackPolicy::None,
        ..PteConfig::default()
    };

    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.2, 0.5), (&cu, 0.8, 0.5)]);
    let err = solve(&mut scratch, CellTarget::DensityEnergy { density: rho, sie }, &cfg)
        .unwrap_err();

    match err {
        MixError::PteConvergenceFailure {
            iterations,
            residual,
            pressure,
            ..
        } => {
            assert_eq!(iterations, 1);
            assert!(residual > cfg.residual_tol);
            assert!(pressure.is_finite() && pressure > 0.0);
        }
        other => panic!("expected PteConvergenceFailure, got {other}"),
    }
}

/// Ideal gas whose (P, T) inversion never succeeds.
#[derive(Debug)]
struct NoInversionGas(IdealGas);

impl EosModel for NoInversionGas {
    fn name(&self) -> &str {
        "NoInversionGas"
    }

    fn pressure_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.0.pressure_from_density_temperature(rho, t)
    }

    fn internal_energy_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.0.internal_energy_from_density_temperature(rho, t)
    }

    fn temperature_from_density_internal_energy(&self, rho: Real, sie: Real) -> EosResult<Real> {
        self.0.temperature_from_density_internal_energy(rho, sie)
    }

    fn specific_heat_from_density_temperature(&self, rho: Real, t: Real) -> EosResult<Real> {
        self.0.specific_heat_from_density_temperature(rho, t)
    }

    fn density_energy_from_pressure_temperature(
        &self,
        p: Real,
        _t: Real,
        _rho_guess: Option<Real>,
    ) -> EosResult<(Real, Real)> {
        Err(mx_eos::EosError::OutOfDomain {
            what: "pressure",
            value: p,
        })
    }
}

#[test]
fn failure_without_an_evaluated_iterate_reports_no_state() {
    let gas = air();
    let stuck = NoInversionGas(air());
    let mut scratch = PteScratch::with_capacity(2);
    load(&mut scratch, &[(&gas, 0.5, 0.5), (&stuck, 0.5, 0.5)]);
    let err = solve(
        &mut scratch,
        CellTarget::DensityEnergy {
            density: 1.0,
            sie: 2.0e5,
        },
        &PteConfig::default(),
    )
    .unwrap_err();

    match err {
        MixError::PteConvergenceFailure {
            iterations,
            residual,
            pressure,
            temperature,
        } => {
            assert_eq!(iterations, 0);
            assert!(residual.is_infinite());
            assert!(pressure.is_nan() && temperature.is_nan());
        }
        other => panic!("expected PteConvergenceFailure, got {other}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn converged_mixtures_conserve_volume_and_energy(
        m in 0.05_f64..0.95,
        rho in 0.1_f64..20.0,
        sie in 5.0e4_f64..2.0e6,
        fv in 0.1_f64..0.9,
    ) {
        let (a, b) = (air(), helium());
        let mut scratch = PteScratch::with_capacity(2);
        load(&mut scratch, &[(&a, m, fv), (&b, 1.0 - m, 1.0 - fv)]);
        let sol = solve(
            &mut scratch,
            CellTarget::DensityEnergy { density: rho, sie },
            &PteConfig::default(),
        );
        prop_assert!(sol.is_ok(), "{:?}", sol);
        assert_conserves(&scratch, rho, sie);
    }
}
