//! Batch decks: materials, cells and solver policy in one YAML or JSON file.

pub mod run;
pub mod schema;
pub mod validate;

pub use run::{CellResult, DeckRun, MaterialResult};
pub use schema::*;
pub use validate::{DeckValidationError, validate_deck};

use mx_pte::MixError;

pub type DeckResult<T> = Result<T, DeckError>;

#[derive(thiserror::Error, Debug)]
pub enum DeckError {
    #[error("Validation error: {0}")]
    Validation(#[from] DeckValidationError),

    #[error("Material {name}: {source}")]
    Material { name: String, source: MixError },

    #[error("Evaluation error: {0}")]
    Mix(#[from] MixError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_yaml_str(content: &str) -> DeckResult<BatchDeck> {
    let deck: BatchDeck = serde_yaml::from_str(content)?;
    validate_deck(&deck)?;
    Ok(deck)
}

pub fn load_yaml(path: &std::path::Path) -> DeckResult<BatchDeck> {
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &std::path::Path, deck: &BatchDeck) -> DeckResult<()> {
    validate_deck(deck)?;
    let content = serde_yaml::to_string(deck)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> DeckResult<BatchDeck> {
    let content = std::fs::read_to_string(path)?;
    let deck: BatchDeck = serde_json::from_str(&content)?;
    validate_deck(&deck)?;
    Ok(deck)
}

pub fn save_json(path: &std::path::Path, deck: &BatchDeck) -> DeckResult<()> {
    validate_deck(deck)?;
    let content = serde_json::to_string_pretty(deck)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a deck, choosing the format from the file extension.
pub fn load(path: &std::path::Path) -> DeckResult<BatchDeck> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        _ => load_yaml(path),
    }
}
