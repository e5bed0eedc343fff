//! Turning a deck into a registry and flat arrays, and collecting results.

use super::schema::BatchDeck;
use super::{DeckError, DeckResult};
use crate::context::EosContext;
use crate::descriptor::{BatchBuffers, CellInit};
use crate::driver::{BatchReport, CellStatus};
use mx_core::Real;
use serde::Serialize;
use std::collections::HashMap;

/// Per-material part of a cell result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MaterialResult {
    pub material: String,
    pub frac_vol: Real,
    pub sie: Real,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmod: Option<Real>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpde: Option<Real>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv: Option<Real>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CellResult {
    pub cell: usize,
    pub status: CellStatus,
    pub press: Real,
    pub temp: Real,
    pub spvol: Real,
    pub sie: Real,
    pub bmod: Real,
    pub dpde: Real,
    pub cv: Real,
    pub pmax: Real,
    pub materials: Vec<MaterialResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of running a deck.
#[derive(Debug, Clone)]
pub struct DeckRun {
    pub report: BatchReport,
    pub cells: Vec<CellResult>,
}

impl BatchDeck {
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Context with every deck material registered and the deck's solver policy.
    pub fn context(&self, threads: Option<usize>) -> DeckResult<EosContext> {
        let nmat = self.materials.len();
        let mut ctx = match threads {
            Some(n) => EosContext::with_threads(nmat, n)?,
            None => EosContext::init(nmat),
        };
        ctx.set_config(self.solver)?;
        for (index, material) in self.materials.iter().enumerate() {
            material.model.register(&mut ctx, index).map_err(|source| DeckError::Material {
                name: material.name.clone(),
                source,
            })?;
        }
        Ok(ctx)
    }

    /// Flat arrays for the deck's cells. Inputs the mode does not use are zero.
    pub fn buffers(&self) -> DeckResult<BatchBuffers> {
        let index: HashMap<&str, usize> = self
            .materials
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.as_str(), i))
            .collect();

        let mut buffers = BatchBuffers::new(self.material_outputs);
        for cell in &self.cells {
            let mut materials = Vec::with_capacity(cell.materials.len());
            for f in &cell.materials {
                let id = index.get(f.material.as_str()).copied().ok_or_else(|| {
                    DeckError::Validation(super::DeckValidationError::MissingMaterial {
                        name: f.material.clone(),
                        cell: buffers.ncell(),
                    })
                })?;
                materials.push((id, f.mass, f.volume, f.sie));
            }
            buffers.push_cell(&CellInit {
                materials,
                spvol: cell.spvol.unwrap_or(0.0),
                sie: cell.sie.unwrap_or(0.0),
                press: cell.press.unwrap_or(0.0),
                temp: cell.temp.unwrap_or(0.0),
                vol: cell.vol,
            });
        }
        Ok(buffers)
    }

    /// Register the materials, evaluate every cell and gather the results.
    pub fn run(&self, threads: Option<usize>) -> DeckResult<DeckRun> {
        let ctx = self.context(threads)?;
        let mut buffers = self.buffers()?;
        let report = ctx.evaluate_mode(self.mode, &mut buffers.batch())?;
        let cells = self.collect(&buffers, &report);
        Ok(DeckRun { report, cells })
    }

    fn collect(&self, buffers: &BatchBuffers, report: &BatchReport) -> Vec<CellResult> {
        let pick = |v: &Option<Vec<Real>>, slot: usize| v.as_ref().and_then(|v| v.get(slot).copied());
        (0..buffers.ncell())
            .map(|cell| {
                let (lo, hi) = (buffers.offsets[cell], buffers.offsets[cell + 1]);
                let materials = (lo..hi)
                    .map(|slot| MaterialResult {
                        material: self
                            .materials
                            .get(buffers.eos_offsets[slot])
                            .map(|m| m.name.clone())
                            .unwrap_or_default(),
                        frac_vol: buffers.frac_vol[slot],
                        sie: buffers.frac_sie[slot],
                        bmod: pick(&buffers.frac_bmod, slot),
                        dpde: pick(&buffers.frac_dpde, slot),
                        cv: pick(&buffers.frac_cv, slot),
                    })
                    .collect();
                CellResult {
                    cell,
                    status: report
                        .statuses
                        .get(cell)
                        .copied()
                        .unwrap_or(CellStatus::Empty),
                    press: buffers.press[cell],
                    temp: buffers.temp[cell],
                    spvol: buffers.spvol[cell],
                    sie: buffers.sie[cell],
                    bmod: buffers.bmod[cell],
                    dpde: buffers.dpde[cell],
                    cv: buffers.cv[cell],
                    pmax: buffers.pmax[cell],
                    materials,
                    error: report.failure(cell).map(|f| f.error.to_string()),
                }
            })
            .collect()
    }
}
