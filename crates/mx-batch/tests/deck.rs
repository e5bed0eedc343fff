//! Deck loading, validation and end-to-end runs.

use approx::assert_relative_eq;
use mx_batch::deck::{self, DeckValidationError, ModelDef};
use mx_batch::{CellStatus, DeckError};
use mx_pte::{FallbackPolicy, InputMode};
use std::path::PathBuf;

const DECK: &str = r#"
name: mixed
mode: density_energy
solver:
  max_iterations: 40
  fallback: none
material_outputs: true
materials:
  - name: air
    model: { type: IdealGas, gm1: 0.4, cv: 717.5 }
  - name: helium
    model: { type: IdealGas, gm1: 0.667, cv: 3115.0 }
cells:
  - spvol: 1.0
    sie: 3.0e5
    materials:
      - { material: air, mass: 0.3, volume: 0.5 }
      - { material: helium, mass: 0.7, volume: 0.5 }
  - spvol: 1.0
    sie: 1.0
  - spvol: 2.0
    sie: 1.0e5
    materials:
      - { material: helium, mass: 1.0, volume: 1.0 }
"#;

fn decks_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../decks")
}

#[test]
fn parses_solver_policy_and_models() {
    let deck = deck::from_yaml_str(DECK).unwrap();
    assert_eq!(deck.mode, InputMode::DensityEnergy);
    assert_eq!(deck.solver.max_iterations, 40);
    assert_eq!(deck.solver.fallback, FallbackPolicy::None);
    // Unset policy fields keep their defaults
    assert_eq!(deck.solver.residual_tol, 1e-8);
    assert_eq!(deck.materials[1].model.kind(), "IdealGas");
    assert_eq!(deck.material_index("helium"), Some(1));
    assert_eq!(deck.cells[1].vol, 1.0);
}

#[test]
fn run_reports_every_cell() {
    let deck = deck::from_yaml_str(DECK).unwrap();
    let run = deck.run(None).unwrap();
    assert!(run.report.is_clean());
    assert_eq!(run.cells.len(), 3);

    let statuses: Vec<_> = run.cells.iter().map(|c| c.status).collect();
    assert_eq!(
        statuses,
        vec![CellStatus::Converged, CellStatus::Empty, CellStatus::Direct]
    );

    let mixed = &run.cells[0];
    assert_eq!(mixed.materials.len(), 2);
    assert_eq!(mixed.materials[0].material, "air");
    assert!(mixed.materials.iter().all(|m| m.bmod.is_some()));
    let t = 3.0e5 / (0.3 * 717.5 + 0.7 * 3115.0);
    assert_relative_eq!(mixed.temp, t, max_relative = 1e-6);

    let json = serde_json::to_value(&run.cells).unwrap();
    assert_eq!(json[0]["status"], "converged");
    assert!(json[1].get("error").is_none());
}

#[test]
fn unknown_material_reference_is_rejected() {
    let text = DECK.replace("material: helium, mass: 1.0", "material: argon, mass: 1.0");
    match deck::from_yaml_str(&text) {
        Err(DeckError::Validation(DeckValidationError::MissingMaterial { name, cell })) => {
            assert_eq!(name, "argon");
            assert_eq!(cell, 2);
        }
        other => panic!("expected a missing material, got {other:?}"),
    }
}

#[test]
fn unknown_solver_field_is_a_parse_error() {
    let text = DECK.replace("max_iterations: 40", "max_iterations: 40\n  damping: 0.5");
    assert!(matches!(deck::from_yaml_str(&text), Err(DeckError::Yaml(_))));
}

#[test]
fn bad_model_parameters_name_the_material() {
    let text = DECK.replace("gm1: 0.667", "gm1: -1.0");
    let deck = deck::from_yaml_str(&text).unwrap();
    match deck.run(None) {
        Err(DeckError::Material { name, .. }) => assert_eq!(name, "helium"),
        other => panic!("expected a material error, got {other:?}"),
    }
}

#[test]
fn yaml_and_json_round_trip() {
    let original = deck::from_yaml_str(DECK).unwrap();
    let dir = std::env::temp_dir().join(format!("mixeos-deck-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let yaml = dir.join("deck.yaml");
    deck::save_yaml(&yaml, &original).unwrap();
    assert_eq!(deck::load(&yaml).unwrap(), original);

    let json = dir.join("deck.json");
    deck::save_json(&json, &original).unwrap();
    assert_eq!(deck::load(&json).unwrap(), original);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn shipped_decks_run_clean() {
    for name in [
        "two_gas.yaml",
        "gas_copper.yaml",
        "pt_products.yaml",
        "davis_explosive.yaml",
    ] {
        let deck = deck::load(&decks_dir().join(name)).unwrap();
        let run = deck.run(Some(2)).unwrap();
        assert!(
            run.report.is_clean(),
            "{name}: {:?}",
            run.report.failures
        );
        for cell in run.cells.iter().filter(|c| c.status != CellStatus::Empty) {
            assert!(cell.press.is_finite() && cell.temp.is_finite(), "{name}: {cell:?}");
        }
    }
}

#[test]
fn gruneisen_defaults_fill_optional_coefficients() {
    let deck = deck::load(&decks_dir().join("gas_copper.yaml")).unwrap();
    match deck.materials[1].model {
        ModelDef::Gruneisen { s2, s3, p0, .. } => {
            assert_eq!((s2, s3, p0), (0.0, 0.0, 0.0));
        }
        ref other => panic!("expected Gruneisen, got {other:?}"),
    }
}

#[test]
fn davis_deck_splits_a_partially_burned_cell() {
    let deck = deck::load(&decks_dir().join("davis_explosive.yaml")).unwrap();
    assert_eq!(deck.materials[0].model.kind(), "DavisReactants");
    assert_eq!(deck.materials[1].model.kind(), "DavisProducts");
    match deck.materials[0].model {
        ModelDef::DavisReactants { e0, p0, .. } => assert_eq!((e0, p0), (0.0, 0.0)),
        ref other => panic!("expected DavisReactants, got {other:?}"),
    }

    let run = deck.run(None).unwrap();
    assert!(run.report.is_clean(), "{:?}", run.report.failures);
    let mixed = &run.cells[0];
    assert_eq!(mixed.status, CellStatus::Converged);
    let total: f64 = mixed.materials.iter().map(|m| m.frac_vol).sum();
    assert_relative_eq!(total, 1.0, max_relative = 1e-12);
    // Products are the less dense phase at this state
    assert!(mixed.materials[1].frac_vol > 0.6);
    assert_eq!(run.cells[1].status, CellStatus::Direct);
}
