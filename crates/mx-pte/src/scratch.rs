//! Per-cell working memory for the PTE solver.
//!
//! A `PteScratch` is sized once per worker to the widest cell of a batch and
//! then refilled for every cell, so the iteration loop never allocates. Each
//! slot keeps a committed iterate (the last accepted density/energy split) and
//! a trial iterate written by every evaluation.

use crate::error::{MixError, MixResult};
use crate::single;
use mx_core::Real;
use mx_eos::{EosError, EosModel};

#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot<'a> {
    pub(crate) model: &'a dyn EosModel,
    pub(crate) mass_fraction: Real,
    volume_fraction: Real,
    sie_guess: Real,
    pub(crate) active: bool,
    pub(crate) density: Real,
    pub(crate) sie: Real,
    trial_density: Real,
    trial_sie: Real,
}

/// One material of a cell after a solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotState {
    /// False if the material was excluded for having zero volume fraction
    pub active: bool,
    /// Mass fraction used by the solve (renormalized over active materials)
    pub mass_fraction: Real,
    pub density: Real,
    pub sie: Real,
}

impl SlotState {
    /// Volume fraction of this material in a cell of density `rho_cell`.
    pub fn volume_fraction(&self, rho_cell: Real) -> Real {
        if self.active {
            self.mass_fraction * rho_cell / self.density
        } else {
            0.0
        }
    }
}

/// Mixture sums over the active materials at one (P, T).
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MixtureSums {
    /// Σ mᵢ/ρᵢ
    pub(crate) volume: Real,
    /// Σ mᵢ eᵢ
    pub(crate) energy: Real,
    pub(crate) dvolume_dp: Real,
    pub(crate) dvolume_dt: Real,
    pub(crate) denergy_dp: Real,
    pub(crate) denergy_dt: Real,
    /// Σ mᵢ cvᵢ T
    pub(crate) thermal_energy: Real,
    /// Volume-weighted isothermal bulk modulus
    pub(crate) bulk_modulus: Real,
}

#[derive(Debug, Default)]
pub struct PteScratch<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> PteScratch<'a> {
    pub fn with_capacity(materials: usize) -> Self {
        Self {
            slots: Vec::with_capacity(materials),
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Append one constituent of the current cell.
    ///
    /// `volume_fraction` is both the exclusion flag (exactly zero) and the
    /// source of the initial density guess. `sie_guess` seeds the temperature
    /// guess when it is finite and nonzero.
    pub fn push(
        &mut self,
        model: &'a dyn EosModel,
        mass_fraction: Real,
        volume_fraction: Real,
        sie_guess: Real,
    ) {
        self.slots.push(Slot {
            model,
            mass_fraction,
            volume_fraction,
            sie_guess,
            active: false,
            density: Real::NAN,
            sie: Real::NAN,
            trial_density: Real::NAN,
            trial_sie: Real::NAN,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn state(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(|s| SlotState {
            active: s.active,
            mass_fraction: s.mass_fraction,
            density: s.density,
            sie: s.sie,
        })
    }

    /// Model of the material in slot `index`.
    pub fn model(&self, index: usize) -> Option<&'a dyn EosModel> {
        self.slots.get(index).map(|s| s.model)
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub(crate) fn slots(&self) -> &[Slot<'a>] {
        &self.slots
    }

    pub(crate) fn set_split(&mut self, index: usize, density: Real, sie: Real) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.density = density;
            slot.sie = sie;
        }
    }

    /// Mark active materials, renormalize their mass fractions and seed the
    /// density of each from its volume fraction. A seed outside the model's
    /// density bounds is replaced by its reference density. Returns the active
    /// count.
    pub(crate) fn prepare(&mut self, rho_cell: Option<Real>) -> MixResult<usize> {
        let mut mass = 0.0;
        let mut volume = 0.0;
        for slot in &mut self.slots {
            if !(slot.mass_fraction.is_finite() && slot.mass_fraction >= 0.0)
                || !(slot.volume_fraction.is_finite() && slot.volume_fraction >= 0.0)
            {
                return Err(MixError::MalformedBatch {
                    what: format!(
                        "negative or non-finite fraction (mass {}, volume {})",
                        slot.mass_fraction, slot.volume_fraction
                    ),
                });
            }
            slot.active = slot.volume_fraction > 0.0;
            if slot.active {
                mass += slot.mass_fraction;
                volume += slot.volume_fraction;
            }
        }
        if mass <= 0.0 {
            return Err(MixError::MalformedBatch {
                what: "no mass in materials with nonzero volume fraction".into(),
            });
        }

        let mut active = 0;
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            active += 1;
            slot.mass_fraction /= mass;
            let share = slot.volume_fraction / volume;
            let seed = match rho_cell {
                Some(rho) if slot.mass_fraction > 0.0 => slot.mass_fraction * rho / share,
                Some(rho) => rho,
                None => slot.model.reference_density(),
            };
            let (lo, hi) = slot.model.density_bounds();
            slot.density = if seed > lo && seed < hi {
                seed
            } else {
                slot.model.reference_density()
            };
            slot.sie = slot.sie_guess;
        }
        Ok(active)
    }

    /// Index of the only active material, if there is exactly one.
    pub(crate) fn sole_active(&self) -> Option<usize> {
        let mut found = None;
        for (i, slot) in self.slots.iter().enumerate().filter(|(_, s)| s.active) {
            if found.is_some() {
                return None;
            }
            found = Some(i);
        }
        found
    }

    /// Evaluate every active material at (P, T) into the trial iterate.
    ///
    /// Density inversions are warm started from the committed densities.
    pub(crate) fn evaluate(&mut self, p: Real, t: Real) -> MixResult<MixtureSums> {
        let mut sums = MixtureSums::default();
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let (rho, sie) = slot
                .model
                .density_energy_from_pressure_temperature(p, t, Some(slot.density))?;
            let d = slot.model.derivatives_from_density_temperature(rho, t)?;
            if !(d.dp_drho > 0.0) {
                return Err(EosError::OutOfDomain {
                    what: "isothermal dP/drho",
                    value: d.dp_drho,
                }
                .into());
            }

            // (ρ, T) partials to (P, T) partials
            let drho_dp = 1.0 / d.dp_drho;
            let drho_dt = -d.dp_dt / d.dp_drho;
            let m = slot.mass_fraction;
            let v = m / rho;

            sums.volume += v;
            sums.energy += m * sie;
            sums.dvolume_dp -= v / rho * drho_dp;
            sums.dvolume_dt -= v / rho * drho_dt;
            sums.denergy_dp += m * d.de_drho * drho_dp;
            sums.denergy_dt += m * (d.de_dt + d.de_drho * drho_dt);
            sums.thermal_energy += m * d.de_dt * t;
            sums.bulk_modulus += v * rho * d.dp_drho;

            slot.trial_density = rho;
            slot.trial_sie = sie;
        }
        if sums.volume > 0.0 {
            sums.bulk_modulus /= sums.volume;
        }
        Ok(sums)
    }

    /// Accept the trial iterate of the last evaluation.
    pub(crate) fn commit(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.density = slot.trial_density;
            slot.sie = slot.trial_sie;
        }
    }

    /// Starting (P, T) for a density-energy solve.
    ///
    /// Each active material is evaluated at its seeded density with its own
    /// energy guess (or the cell energy); T is the mass-weighted mean. P is the
    /// first of the volume-weighted mean pressure, the smallest positive
    /// material pressure and a small fraction of the mixture bulk modulus at
    /// which every material can be evaluated.
    pub(crate) fn guess_from_density_energy(&mut self, sie_cell: Real) -> MixResult<(Real, Real)> {
        let mut acc = GuessAccumulator::default();
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            let model = slot.model;
            let rho = slot.density;
            let own = slot.sie_guess;
            let attempt = if own.is_finite() && own != 0.0 {
                model
                    .temperature_from_density_internal_energy(rho, own)
                    .map(|t| (t, own))
                    .or_else(|_| {
                        model
                            .temperature_from_density_internal_energy(rho, sie_cell)
                            .map(|t| (t, sie_cell))
                    })
            } else {
                model
                    .temperature_from_density_internal_energy(rho, sie_cell)
                    .map(|t| (t, sie_cell))
            };
            let (t, sie) = match attempt {
                Ok(v) => v,
                Err(e) => {
                    acc.last_error = Some(e);
                    continue;
                }
            };
            slot.sie = sie;
            acc.add(model, slot.mass_fraction, rho, t, None);
        }
        let t = acc.temperature()?;
        Ok((self.admissible_pressure(&acc, t)?, t))
    }

    /// Starting pressure for a density-temperature solve.
    pub(crate) fn guess_pressure_at(&mut self, t: Real) -> MixResult<Real> {
        let mut acc = GuessAccumulator::default();
        for slot in self.slots.iter().filter(|s| s.active) {
            acc.add(slot.model, slot.mass_fraction, slot.density, t, None);
        }
        self.admissible_pressure(&acc, t)
    }

    /// First pressure candidate of `acc` that every active material reaches at
    /// temperature `t`, or the first candidate if none does.
    fn admissible_pressure(&mut self, acc: &GuessAccumulator, t: Real) -> MixResult<Real> {
        let mut first = None;
        for p in acc.pressure_candidates() {
            if self.evaluate(p, t).is_ok() {
                return Ok(p);
            }
            first.get_or_insert(p);
        }
        first.ok_or_else(|| acc.no_guess())
    }

    /// Starting temperature for a density-pressure solve.
    pub(crate) fn guess_temperature_at(&self, p: Real) -> MixResult<Real> {
        let mut acc = GuessAccumulator::default();
        for slot in self.slots.iter().filter(|s| s.active) {
            match single::temperature_from_density_pressure(slot.model, slot.density, p, None) {
                Ok(t) => acc.add(slot.model, slot.mass_fraction, slot.density, t, Some(p)),
                Err(MixError::OutOfDomain(e)) => acc.last_error = Some(e),
                Err(other) => return Err(other),
            }
        }
        acc.temperature()
    }
}

#[derive(Default)]
struct GuessAccumulator {
    pressure: Real,
    smallest_positive_pressure: Option<Real>,
    bulk_modulus: Real,
    volume: Real,
    temperature: Real,
    mass: Real,
    last_error: Option<EosError>,
}

impl GuessAccumulator {
    fn add(
        &mut self,
        model: &dyn EosModel,
        mass_fraction: Real,
        rho: Real,
        t: Real,
        known_pressure: Option<Real>,
    ) {
        let p = match known_pressure {
            Some(p) => p,
            None => match model.pressure_from_density_temperature(rho, t) {
                Ok(p) => p,
                Err(e) => {
                    self.last_error = Some(e);
                    return;
                }
            },
        };
        if p > 0.0 {
            let smallest = self.smallest_positive_pressure.get_or_insert(p);
            *smallest = smallest.min(p);
        }
        let v = mass_fraction / rho;
        self.pressure += v * p;
        self.volume += v;
        if let Ok(b) = model.bulk_modulus_from_density_temperature(rho, t) {
            self.bulk_modulus += v * b;
        }
        self.temperature += mass_fraction * t;
        self.mass += mass_fraction;
    }

    fn no_guess(&self) -> MixError {
        match &self.last_error {
            Some(e) => e.clone().into(),
            None => MixError::MalformedBatch {
                what: "no material yields an initial guess".into(),
            },
        }
    }

    fn temperature(&self) -> MixResult<Real> {
        if self.mass > 0.0 {
            Ok(self.temperature / self.mass)
        } else {
            Err(self.no_guess())
        }
    }

    /// Starting pressures in order of preference, all positive.
    fn pressure_candidates(&self) -> impl Iterator<Item = Real> {
        let (mean, stiffness) = if self.volume > 0.0 {
            (
                self.pressure / self.volume,
                1e-3 * self.bulk_modulus / self.volume,
            )
        } else {
            (Real::NAN, Real::NAN)
        };
        [Some(mean), self.smallest_positive_pressure, Some(stiffness)]
            .into_iter()
            .flatten()
            .filter(|p| p.is_finite() && *p > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mx_eos::IdealGas;

    #[test]
    fn prepare_excludes_zero_volume_and_renormalizes() {
        let a = IdealGas::new(0.4, 717.5).unwrap();
        let b = IdealGas::new(0.67, 3115.0).unwrap();
        let mut scratch = PteScratch::with_capacity(3);
        scratch.push(&a, 0.3, 0.5, 0.0);
        scratch.push(&b, 0.6, 0.5, 0.0);
        scratch.push(&a, 0.1, 0.0, 0.0);

        assert_eq!(scratch.prepare(Some(2.0)).unwrap(), 2);
        let s0 = scratch.state(0).unwrap();
        assert!(s0.active);
        assert_relative_eq!(s0.mass_fraction, 1.0 / 3.0, max_relative = 1e-14);
        assert_relative_eq!(s0.density, (1.0 / 3.0) * 2.0 / 0.5, max_relative = 1e-14);
        assert!(!scratch.state(2).unwrap().active);
        assert_eq!(scratch.active_count(), 2);
        assert_eq!(scratch.sole_active(), None);
    }

    #[test]
    fn prepare_rejects_negative_fractions() {
        let a = IdealGas::new(0.4, 717.5).unwrap();
        let mut scratch = PteScratch::with_capacity(2);
        scratch.push(&a, 1.2, 1.0, 0.0);
        scratch.push(&a, -0.2, 0.0, 0.0);
        assert!(matches!(
            scratch.prepare(Some(1.0)),
            Err(MixError::MalformedBatch { .. })
        ));
    }

    #[test]
    fn evaluate_writes_trial_until_commit() {
        let a = IdealGas::new(0.4, 717.5).unwrap();
        let mut scratch = PteScratch::with_capacity(1);
        scratch.push(&a, 1.0, 1.0, 0.0);
        scratch.prepare(Some(1.0)).unwrap();

        let sums = scratch.evaluate(1.0e5, 300.0).unwrap();
        let rho = 1.0e5 / (0.4 * 717.5 * 300.0);
        assert_relative_eq!(sums.volume, 1.0 / rho, max_relative = 1e-12);
        assert_relative_eq!(sums.bulk_modulus, 1.0e5, max_relative = 1e-12);
        assert_eq!(scratch.state(0).unwrap().density, 1.0);

        scratch.commit();
        assert_relative_eq!(scratch.state(0).unwrap().density, rho, max_relative = 1e-12);
    }
}
