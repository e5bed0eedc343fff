//! Batch driver: closes every cell of a `CellBatch`.
//!
//! Cells are independent. Each rayon worker owns one `WorkerScratch` sized to
//! the widest cell, so the per-cell solve never allocates. Registry and
//! configuration problems abort the call before any cell is touched; anything
//! that goes wrong inside a cell is recorded in the `BatchReport` and the
//! remaining cells proceed.

use crate::descriptor::{CellBatch, CellView};
use mx_core::Real;
use mx_eos::{MaterialRegistry, MaterialState};
use mx_pte::{CellTarget, InputMode, MixError, MixResult, PteConfig, PteScratch, PteSolution};
use mx_pte::{pte, single};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

/// Allowed deviation of a cell's mass or volume fraction sum from one.
pub const FRACTION_TOL: Real = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    /// No materials; nothing written
    Empty,
    /// One material, evaluated directly
    Direct,
    /// Newton converged
    Converged,
    /// Solved by the pressure-bisection fallback
    Recovered,
    /// Fractions rejected; nothing written
    Malformed,
    /// Model domain error or convergence failure; best-effort state written
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CellFailure {
    pub cell: usize,
    pub status: CellStatus,
    pub error: MixError,
}

/// Per-call summary of a batch evaluation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub cells: usize,
    pub empty: usize,
    pub direct: usize,
    pub converged: usize,
    pub recovered: usize,
    pub malformed: usize,
    pub failed: usize,
    /// Newton iterations (or 1-D evaluations) summed over solved cells
    pub total_iterations: usize,
    pub max_iterations: usize,
    pub failures: Vec<CellFailure>,
    /// Status of every cell, by cell index
    pub statuses: Vec<CellStatus>,
}

impl BatchReport {
    /// True when every non-empty cell was solved.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// 0 when clean, otherwise the number of cells left unsolved.
    pub fn status_code(&self) -> usize {
        self.failures.len()
    }

    pub fn failure(&self, cell: usize) -> Option<&CellFailure> {
        self.failures.iter().find(|f| f.cell == cell)
    }

    fn record(&mut self, cell: usize, outcome: CellOutcome) {
        let counter = match outcome.status {
            CellStatus::Empty => &mut self.empty,
            CellStatus::Direct => &mut self.direct,
            CellStatus::Converged => &mut self.converged,
            CellStatus::Recovered => &mut self.recovered,
            CellStatus::Malformed => &mut self.malformed,
            CellStatus::Failed => &mut self.failed,
        };
        *counter += 1;
        self.total_iterations += outcome.iterations;
        self.max_iterations = self.max_iterations.max(outcome.iterations);
        self.statuses.push(outcome.status);
        if let Some(error) = outcome.error {
            self.failures.push(CellFailure {
                cell,
                status: outcome.status,
                error,
            });
        }
    }
}

struct CellOutcome {
    status: CellStatus,
    iterations: usize,
    error: Option<MixError>,
}

impl CellOutcome {
    fn solved(status: CellStatus, iterations: usize) -> Self {
        Self {
            status,
            iterations,
            error: None,
        }
    }

    fn unsolved(status: CellStatus, error: MixError) -> Self {
        Self {
            status,
            iterations: 0,
            error: Some(error),
        }
    }
}

/// Cell-level results written back to the per-cell arrays.
#[derive(Clone, Copy, Debug)]
struct CellState {
    pressure: Real,
    temperature: Real,
    density: Real,
    sie: Real,
    bmod: Real,
    dpde: Real,
    cv: Real,
    pmax: Real,
}

/// Per-worker buffers reused from cell to cell.
struct WorkerScratch<'r> {
    pte: PteScratch<'r>,
    /// Per-material states of the cell being written
    states: Vec<Option<MaterialState>>,
}

impl WorkerScratch<'_> {
    fn with_capacity(width: usize) -> Self {
        Self {
            pte: PteScratch::with_capacity(width),
            states: Vec::with_capacity(width),
        }
    }
}

/// Evaluate every cell of `batch` in `mode`.
///
/// Returns `Err` only for problems that make the whole call meaningless:
/// an invalid configuration, a malformed batch layout or a material id the
/// registry cannot resolve.
pub fn run_batch(
    registry: &MaterialRegistry,
    config: &PteConfig,
    mode: InputMode,
    batch: &mut CellBatch<'_>,
) -> MixResult<BatchReport> {
    config.validate()?;
    batch.validate()?;
    for &id in &batch.layout.eos_offsets[batch.slot_range()] {
        registry.lookup_index(id)?;
    }

    let width = batch.widest_cell();
    let mut views = batch.views()?;
    let outcomes: Vec<CellOutcome> = views
        .par_iter_mut()
        .map_init(
            || WorkerScratch::with_capacity(width),
            |scratch, view| close_cell(view, scratch, registry, config, mode),
        )
        .collect();

    let mut report = BatchReport {
        cells: outcomes.len(),
        statuses: Vec::with_capacity(outcomes.len()),
        ..BatchReport::default()
    };
    for (cell, outcome) in outcomes.into_iter().enumerate() {
        report.record(cell, outcome);
    }

    info!(
        mode = mode.label(),
        cells = report.cells,
        direct = report.direct,
        converged = report.converged,
        recovered = report.recovered,
        failed = report.failed + report.malformed,
        max_iterations = report.max_iterations,
        "batch evaluated"
    );
    Ok(report)
}

fn close_cell<'r>(
    view: &mut CellView<'_>,
    scratch: &mut WorkerScratch<'r>,
    registry: &'r MaterialRegistry,
    cfg: &PteConfig,
    mode: InputMode,
) -> CellOutcome {
    if view.width() == 0 {
        return CellOutcome::solved(CellStatus::Empty, 0);
    }
    if let Err(error) = check_fractions(view, mode) {
        warn!(cell = view.index, %error, "skipping cell");
        return CellOutcome::unsolved(CellStatus::Malformed, error);
    }

    let target = cell_target(view, mode);
    let result = if view.width() == 1 {
        close_single(view, registry, target, mode)
    } else {
        close_mixed(view, scratch, registry, cfg, target, mode)
    };
    result.unwrap_or_else(|error| {
        debug!(cell = view.index, %error, "cell not closed");
        CellOutcome::unsolved(CellStatus::Failed, error)
    })
}

/// Mass fractions must sum to one. Volume fractions must too, except in
/// pressure-temperature mode where volumes are derived and a nonzero volume
/// fraction only marks a material as present.
fn check_fractions(view: &CellView<'_>, mode: InputMode) -> MixResult<()> {
    let mut mass = 0.0;
    let mut volume = 0.0;
    for (&m, &v) in view.frac_mass.iter().zip(view.frac_vol.iter()) {
        if !(m.is_finite() && m >= 0.0 && v.is_finite() && v >= 0.0) {
            return Err(MixError::MalformedBatch {
                what: format!(
                    "cell {} has a negative or non-finite fraction (mass {m}, volume {v})",
                    view.index
                ),
            });
        }
        mass += m;
        volume += v;
    }
    let volume_checked = mode != InputMode::PressureTemperature;
    for (name, sum, checked) in [("mass", mass, true), ("volume", volume, volume_checked)] {
        if checked && (sum - 1.0).abs() > FRACTION_TOL {
            return Err(MixError::MalformedBatch {
                what: format!("{name} fractions of cell {} sum to {sum}", view.index),
            });
        }
    }
    Ok(())
}

fn cell_target(view: &CellView<'_>, mode: InputMode) -> CellTarget {
    let density = 1.0 / *view.spvol;
    match mode {
        InputMode::PressureTemperature => CellTarget::PressureTemperature {
            pressure: *view.press,
            temperature: *view.temp,
        },
        InputMode::DensityEnergy => CellTarget::DensityEnergy {
            density,
            sie: *view.sie,
        },
        InputMode::DensityPressure => CellTarget::DensityPressure {
            density,
            pressure: *view.press,
        },
        InputMode::DensityTemperature => CellTarget::DensityTemperature {
            density,
            temperature: *view.temp,
        },
    }
}

/// Previous temperature in the cell, if it is usable as a starting guess.
fn warm_temperature(view: &CellView<'_>) -> Option<Real> {
    Some(*view.temp).filter(|t| t.is_finite() && *t > 0.0)
}

fn close_single(
    view: &mut CellView<'_>,
    registry: &MaterialRegistry,
    target: CellTarget,
    mode: InputMode,
) -> MixResult<CellOutcome> {
    let model = registry.lookup_index(view.eos[0])?;
    let state = match target {
        CellTarget::DensityEnergy { density, sie } => {
            single::from_density_energy(model, density, sie)?
        }
        CellTarget::DensityPressure { density, pressure } => {
            single::from_density_pressure(model, density, pressure, warm_temperature(view))?
        }
        CellTarget::DensityTemperature {
            density,
            temperature,
        } => single::from_density_temperature(model, density, temperature)?,
        CellTarget::PressureTemperature {
            pressure,
            temperature,
        } => single::from_pressure_temperature(model, pressure, temperature, None)?,
    };

    view.frac_vol[0] = 1.0;
    view.frac_sie[0] = state.sie;
    write_material(view, 0, &state);
    write_cell(
        view,
        mode,
        &CellState {
            pressure: state.pressure,
            temperature: state.temperature,
            density: state.density,
            sie: state.sie,
            bmod: state.bulk_modulus,
            dpde: state.dpde,
            cv: state.cv,
            pmax: state.pressure,
        },
    );
    Ok(CellOutcome::solved(CellStatus::Direct, 0))
}

fn close_mixed<'r>(
    view: &mut CellView<'_>,
    scratch: &mut WorkerScratch<'r>,
    registry: &'r MaterialRegistry,
    cfg: &PteConfig,
    target: CellTarget,
    mode: InputMode,
) -> MixResult<CellOutcome> {
    let WorkerScratch { pte: scratch, states } = scratch;
    scratch.clear();
    for (i, &id) in view.eos.iter().enumerate() {
        let model = registry.lookup_index(id)?;
        scratch.push(model, view.frac_mass[i], view.frac_vol[i], view.frac_sie[i]);
    }

    match pte::solve(scratch, target, cfg) {
        Ok(solution) => {
            write_equilibrium(view, scratch, states, mode, &solution)?;
            let status = if solution.used_fallback {
                CellStatus::Recovered
            } else {
                CellStatus::Converged
            };
            Ok(CellOutcome::solved(status, solution.iterations))
        }
        Err(error) => {
            if let MixError::PteConvergenceFailure {
                pressure,
                temperature,
                ..
            } = error
            {
                write_best_effort(view, scratch, mode, target, pressure, temperature);
            }
            Err(error)
        }
    }
}

/// Write the converged split and the cell aggregates.
///
/// Every material state is evaluated before anything is written, so a model
/// failure leaves the cell as it was given.
fn write_equilibrium(
    view: &mut CellView<'_>,
    scratch: &PteScratch<'_>,
    states: &mut Vec<Option<MaterialState>>,
    mode: InputMode,
    solution: &PteSolution,
) -> MixResult<()> {
    let (p, t, rho_cell) = (solution.pressure, solution.temperature, solution.density);

    states.clear();
    for i in 0..view.width() {
        let (Some(slot), Some(model)) = (scratch.state(i), scratch.model(i)) else {
            states.push(None);
            continue;
        };
        let state = if slot.active {
            Some(single::from_density_temperature(model, slot.density, t)?)
        } else {
            // Absent materials report their state at the cell's (P, T) when
            // the model can reach it.
            single::from_pressure_temperature(model, p, t, None).ok()
        };
        states.push(state);
    }

    let mut bmod = 0.0;
    let mut dpde = 0.0;
    let mut cv = 0.0;
    let mut pmax = Real::NEG_INFINITY;
    for (i, state) in states.iter().enumerate() {
        let Some(slot) = scratch.state(i) else {
            continue;
        };
        if slot.active {
            let fv = slot.volume_fraction(rho_cell);
            view.frac_vol[i] = fv;
            if let Some(state) = state {
                view.frac_sie[i] = state.sie;
                bmod += fv * state.bulk_modulus;
                dpde += fv * state.dpde;
                cv += slot.mass_fraction * state.cv;
                pmax = pmax.max(state.pressure);
                trace!(
                    cell = view.index,
                    material = i,
                    state = %state.summary(),
                    "equilibrium split"
                );
                write_material(view, i, state);
            }
        } else {
            view.frac_vol[i] = 0.0;
            if let Some(state) = state {
                view.frac_sie[i] = state.sie;
                write_material(view, i, state);
            }
        }
    }

    write_cell(
        view,
        mode,
        &CellState {
            pressure: p,
            temperature: t,
            density: rho_cell,
            sie: solution.sie,
            bmod,
            dpde,
            cv,
            pmax,
        },
    );
    Ok(())
}

/// Write whatever the failed solve left behind: the mode's unknowns and the
/// last accepted per-material split. Aggregates are left untouched.
fn write_best_effort(
    view: &mut CellView<'_>,
    scratch: &PteScratch<'_>,
    mode: InputMode,
    target: CellTarget,
    p: Real,
    t: Real,
) {
    if !(p.is_finite() && t.is_finite()) {
        return;
    }
    match mode {
        InputMode::DensityEnergy => {
            *view.press = p;
            *view.temp = t;
        }
        InputMode::DensityPressure => *view.temp = t,
        InputMode::DensityTemperature => *view.press = p,
        InputMode::PressureTemperature => {}
    }

    let mut pmax = Real::NEG_INFINITY;
    for i in 0..view.width() {
        let (Some(slot), Some(model)) = (scratch.state(i), scratch.model(i)) else {
            continue;
        };
        if !(slot.active && slot.density.is_finite() && slot.sie.is_finite()) {
            continue;
        }
        if let Some(rho_cell) = target.density() {
            view.frac_vol[i] = slot.volume_fraction(rho_cell);
        }
        view.frac_sie[i] = slot.sie;
        if let Ok(pi) = model.pressure_from_density_internal_energy(slot.density, slot.sie) {
            pmax = pmax.max(pi);
        }
    }
    if pmax.is_finite() {
        *view.pmax = pmax;
    }
}

fn write_material(view: &mut CellView<'_>, i: usize, state: &MaterialState) {
    if let Some(out) = view.frac_bmod.as_deref_mut() {
        out[i] = state.bulk_modulus;
    }
    if let Some(out) = view.frac_dpde.as_deref_mut() {
        out[i] = state.dpde;
    }
    if let Some(out) = view.frac_cv.as_deref_mut() {
        out[i] = state.cv;
    }
}

/// Write the mode's outputs; inputs are never overwritten.
fn write_cell(view: &mut CellView<'_>, mode: InputMode, state: &CellState) {
    match mode {
        InputMode::PressureTemperature => {
            *view.spvol = 1.0 / state.density;
            *view.sie = state.sie;
        }
        InputMode::DensityEnergy => {
            *view.press = state.pressure;
            *view.temp = state.temperature;
        }
        InputMode::DensityPressure => {
            *view.temp = state.temperature;
            *view.sie = state.sie;
        }
        InputMode::DensityTemperature => {
            *view.press = state.pressure;
            *view.sie = state.sie;
        }
    }
    *view.bmod = state.bmod;
    *view.dpde = state.dpde;
    *view.cv = state.cv;
    *view.pmax = state.pmax;
}
