//! Capability contract checks run against every shipped model through the registry.
//!
//! Each model must be self-consistent across its entry points: the (ρ, e) and
//! (ρ, T) paths agree, the (P, T) inversion recovers the density, and the
//! derived quantities are physical.

use mx_core::MaterialId;
use mx_eos::{
    DavisProductsParams, DavisReactantsParams, EosModel, GruneisenParams, JwlParams,
    MaterialRegistry,
};
use proptest::prelude::*;

fn id(i: usize) -> MaterialId {
    MaterialId::from_index(i).unwrap()
}

fn registry() -> MaterialRegistry {
    let mut reg = MaterialRegistry::new(5);
    reg.register_ideal_gas(id(0), 0.4, 717.5).unwrap();
    reg.register_jwl(
        id(1),
        JwlParams {
            a: 8.524e11,
            b: 1.802e10,
            r1: 4.6,
            r2: 1.3,
            w: 0.38,
            rho0: 1840.0,
            cv: 1000.0,
        },
    )
    .unwrap();
    reg.register_gruneisen(
        id(2),
        GruneisenParams {
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
        },
    )
    .unwrap();
    reg.register_davis_products(
        id(3),
        DavisProductsParams {
            a: 0.798311,
            b: 0.58,
            k: 1.35,
            n: 2.66182,
            vc: 7.5419e-4,
            pc: 3.2e9,
            cv: 1000.0,
            e0: 0.0,
        },
    )
    .unwrap();
    reg.register_davis_reactants(
        id(4),
        DavisReactantsParams {
            rho0: 1860.0,
            e0: 0.0,
            p0: 0.0,
            t0: 297.0,
            a: 2339.0,
            b: 2.6691,
            c: 0.3,
            g0: 0.8938,
            z: 0.1,
            alpha: 0.4265,
            cv0: 1000.0,
        },
    )
    .unwrap();
    reg
}

/// Density scale per material so the sampled states stay inside each domain.
const DENSITY_SCALE: [f64; 5] = [1.0, 1840.0, 8930.0, 1326.0, 2000.0];

fn check_consistency(model: &dyn EosModel, rho: f64, t: f64) -> Result<(), TestCaseError> {
    let e = model.internal_energy_from_density_temperature(rho, t).unwrap();
    let p_rt = model.pressure_from_density_temperature(rho, t).unwrap();
    let p_re = model.pressure_from_density_internal_energy(rho, e).unwrap();
    let t_back = model.temperature_from_density_internal_energy(rho, e).unwrap();

    prop_assert!((t_back - t).abs() <= 1e-9 * t, "{}: T {} vs {}", model.name(), t_back, t);
    prop_assert!(
        (p_re - p_rt).abs() <= 1e-9 * p_rt.abs().max(1.0),
        "{}: P {} vs {}",
        model.name(),
        p_re,
        p_rt
    );

    let bmod = model.bulk_modulus_from_density_temperature(rho, t).unwrap();
    let cv = model.specific_heat_from_density_temperature(rho, t).unwrap();
    prop_assert!(bmod > 0.0, "{}: bulk modulus {}", model.name(), bmod);
    prop_assert!(cv > 0.0);

    if p_rt > 0.0 {
        let (rho_back, e_back) = model
            .density_energy_from_pressure_temperature(p_rt, t, Some(rho * 1.1))
            .unwrap();
        prop_assert!((rho_back - rho).abs() <= 1e-8 * rho, "{}: rho {} vs {}", model.name(), rho_back, rho);
        prop_assert!((e_back - e).abs() <= 1e-8 * e.abs().max(1.0));
    }
    Ok(())
}

proptest! {
    #[test]
    fn models_are_self_consistent(
        which in 0_usize..5,
        rho_factor in 0.6_f64..1.4_f64,
        t in 300.0_f64..5000.0_f64,
    ) {
        let reg = registry();
        let model = reg.lookup(id(which)).unwrap();
        check_consistency(model, DENSITY_SCALE[which] * rho_factor, t)?;
    }
}

#[test]
fn every_registered_model_is_reachable_by_iteration() {
    let reg = registry();
    let names: Vec<&str> = reg.iter().map(|(_, m)| m.name()).collect();
    assert_eq!(
        names,
        vec!["IdealGas", "JWL", "Gruneisen", "DavisProducts", "DavisReactants"]
    );
}

#[test]
fn analytic_flags_match_models() {
    let reg = registry();
    assert!(reg.lookup(id(0)).unwrap().has_analytic_derivatives());
    assert!(reg.lookup(id(1)).unwrap().has_analytic_derivatives());
    assert!(!reg.lookup(id(2)).unwrap().has_analytic_derivatives());
    assert!(reg.lookup(id(3)).unwrap().has_analytic_derivatives());
    assert!(reg.lookup(id(4)).unwrap().has_analytic_derivatives());
}
