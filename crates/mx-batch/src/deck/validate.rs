//! Deck validation logic.

use super::schema::{BatchDeck, CellDef};
use mx_pte::InputMode;
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DeckValidationError {
    #[error("Duplicate material name: {name}")]
    DuplicateMaterial { name: String },

    #[error("Missing reference: material {name} in cell {cell}")]
    MissingMaterial { name: String, cell: usize },

    #[error("Missing input: cell {cell} needs {field} in {mode} mode")]
    MissingInput {
        cell: usize,
        field: &'static str,
        mode: &'static str,
    },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn required_inputs(mode: InputMode) -> [&'static str; 2] {
    match mode {
        InputMode::PressureTemperature => ["press", "temp"],
        InputMode::DensityEnergy => ["spvol", "sie"],
        InputMode::DensityPressure => ["spvol", "press"],
        InputMode::DensityTemperature => ["spvol", "temp"],
    }
}

fn field(cell: &CellDef, name: &str) -> Option<f64> {
    match name {
        "spvol" => cell.spvol,
        "sie" => cell.sie,
        "press" => cell.press,
        "temp" => cell.temp,
        _ => None,
    }
}

/// Structural checks only. Physically inconsistent cells (bad fraction sums,
/// states outside a model's range) are left for the driver to report per cell.
pub fn validate_deck(deck: &BatchDeck) -> Result<(), DeckValidationError> {
    let mut names = HashSet::new();
    for material in &deck.materials {
        if !names.insert(material.name.as_str()) {
            return Err(DeckValidationError::DuplicateMaterial {
                name: material.name.clone(),
            });
        }
    }

    if let Err(what) = deck.solver.validate() {
        return Err(DeckValidationError::InvalidValue {
            field: "solver".to_string(),
            value: format!("{:?}", deck.solver),
            reason: what.to_string(),
        });
    }

    for (index, cell) in deck.cells.iter().enumerate() {
        if cell.materials.is_empty() {
            continue;
        }
        for name in required_inputs(deck.mode) {
            if field(cell, name).is_none() {
                return Err(DeckValidationError::MissingInput {
                    cell: index,
                    field: name,
                    mode: deck.mode.label(),
                });
            }
        }
        if let Some(spvol) = cell.spvol.filter(|v| !v.is_finite()) {
            return Err(DeckValidationError::InvalidValue {
                field: format!("cells[{index}].spvol"),
                value: spvol.to_string(),
                reason: "must be finite".to_string(),
            });
        }
        for fraction in &cell.materials {
            if !names.contains(fraction.material.as_str()) {
                return Err(DeckValidationError::MissingMaterial {
                    name: fraction.material.clone(),
                    cell: index,
                });
            }
        }
    }
    Ok(())
}
