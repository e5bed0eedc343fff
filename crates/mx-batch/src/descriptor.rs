//! Flat-array batch boundary.
//!
//! Per-material arrays hold one element per (cell, material slot) pair,
//! concatenated cell by cell: cell `c` owns slots `offsets[c]..offsets[c + 1]`.
//! Per-cell arrays hold logical cell `c` at index `c * cell_dim`.
//!
//! The driver never indexes the flat arrays directly. `CellBatch::views`
//! splits them into one disjoint `CellView` per cell, which is what the
//! parallel workers receive.

use mx_core::Real;
use mx_pte::{MixError, MixResult};

/// Sizing and material lookup for a batch.
#[derive(Clone, Copy, Debug)]
pub struct BatchLayout<'a> {
    pub ncell: usize,
    /// Stride between consecutive cells in the per-cell arrays (≥ 1)
    pub cell_dim: usize,
    /// CSR offsets into the per-material arrays, length `ncell + 1`
    pub offsets: &'a [usize],
    /// Registry index of the material in each per-material slot
    pub eos_offsets: &'a [usize],
}

/// Per-cell arrays. Which ones are inputs depends on the input mode.
#[derive(Debug)]
pub struct CellArrays<'a> {
    pub press: &'a mut [Real],
    pub pmax: &'a mut [Real],
    /// Cell volume; never written
    pub vol: &'a [Real],
    pub spvol: &'a mut [Real],
    pub sie: &'a mut [Real],
    pub temp: &'a mut [Real],
    pub bmod: &'a mut [Real],
    pub dpde: &'a mut [Real],
    pub cv: &'a mut [Real],
}

/// Per-material arrays. The optional ones are written only when supplied.
#[derive(Debug)]
pub struct MaterialArrays<'a> {
    pub frac_mass: &'a [Real],
    /// Volume fraction guess on input, equilibrium fraction on output
    pub frac_vol: &'a mut [Real],
    /// Energy guess on input, equilibrium energy on output
    pub frac_sie: &'a mut [Real],
    pub frac_bmod: Option<&'a mut [Real]>,
    pub frac_dpde: Option<&'a mut [Real]>,
    pub frac_cv: Option<&'a mut [Real]>,
}

#[derive(Debug)]
pub struct CellBatch<'a> {
    pub layout: BatchLayout<'a>,
    pub cells: CellArrays<'a>,
    pub materials: MaterialArrays<'a>,
}

/// Mutable window onto one cell of a batch.
#[derive(Debug)]
pub(crate) struct CellView<'b> {
    pub(crate) index: usize,
    pub(crate) eos: &'b [usize],
    pub(crate) frac_mass: &'b [Real],
    pub(crate) frac_vol: &'b mut [Real],
    pub(crate) frac_sie: &'b mut [Real],
    pub(crate) frac_bmod: Option<&'b mut [Real]>,
    pub(crate) frac_dpde: Option<&'b mut [Real]>,
    pub(crate) frac_cv: Option<&'b mut [Real]>,
    pub(crate) press: &'b mut Real,
    pub(crate) pmax: &'b mut Real,
    pub(crate) spvol: &'b mut Real,
    pub(crate) sie: &'b mut Real,
    pub(crate) temp: &'b mut Real,
    pub(crate) bmod: &'b mut Real,
    pub(crate) dpde: &'b mut Real,
    pub(crate) cv: &'b mut Real,
}

impl CellView<'_> {
    pub(crate) fn width(&self) -> usize {
        self.eos.len()
    }
}

fn malformed(what: impl Into<String>) -> MixError {
    MixError::MalformedBatch { what: what.into() }
}

fn take_front<'b>(rest: &mut &'b mut [Real], n: usize) -> &'b mut [Real] {
    let (head, tail) = std::mem::take(rest).split_at_mut(n);
    *rest = tail;
    head
}

fn take_front_opt<'b>(rest: &mut Option<&'b mut [Real]>, n: usize) -> Option<&'b mut [Real]> {
    rest.as_mut().map(|r| take_front(r, n))
}

/// First element of every `stride`-sized chunk.
fn strided(data: &mut [Real], stride: usize) -> impl Iterator<Item = &mut Real> {
    data.chunks_mut(stride).filter_map(|chunk| chunk.first_mut())
}

impl CellBatch<'_> {
    pub fn ncell(&self) -> usize {
        self.layout.ncell
    }

    /// Range of per-material slots covered by the batch.
    ///
    /// Only meaningful after `validate` succeeds.
    pub fn slot_range(&self) -> std::ops::Range<usize> {
        let BatchLayout { ncell, offsets, .. } = self.layout;
        match (offsets.first(), offsets.get(ncell)) {
            (Some(&start), Some(&end)) if ncell > 0 => start..end,
            _ => 0..0,
        }
    }

    /// Number of materials in the widest cell.
    pub fn widest_cell(&self) -> usize {
        let BatchLayout { ncell, offsets, .. } = self.layout;
        offsets
            .get(..=ncell)
            .map(|o| o.windows(2).map(|w| w[1].saturating_sub(w[0])).max().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Check the structural shape of the batch.
    ///
    /// Fraction sums are checked per cell by the driver, not here.
    pub fn validate(&self) -> MixResult<()> {
        let BatchLayout {
            ncell,
            cell_dim,
            offsets,
            eos_offsets,
        } = self.layout;

        if cell_dim == 0 {
            return Err(malformed("cell_dim must be at least 1"));
        }
        if offsets.len() < ncell + 1 {
            return Err(malformed(format!(
                "offsets has {} entries, need ncell + 1 = {}",
                offsets.len(),
                ncell + 1
            )));
        }
        if let Some(c) = offsets[..=ncell].windows(2).position(|w| w[1] < w[0]) {
            return Err(malformed(format!(
                "offsets decrease at cell {c} ({} > {})",
                offsets[c],
                offsets[c + 1]
            )));
        }
        if ncell == 0 {
            return Ok(());
        }

        let end = offsets[ncell];
        let per_material = [
            ("eos_offsets", Some(eos_offsets.len())),
            ("frac_mass", Some(self.materials.frac_mass.len())),
            ("frac_vol", Some(self.materials.frac_vol.len())),
            ("frac_sie", Some(self.materials.frac_sie.len())),
            ("frac_bmod", self.materials.frac_bmod.as_deref().map(<[Real]>::len)),
            ("frac_dpde", self.materials.frac_dpde.as_deref().map(<[Real]>::len)),
            ("frac_cv", self.materials.frac_cv.as_deref().map(<[Real]>::len)),
        ];
        for (name, len) in per_material {
            if let Some(len) = len.filter(|&len| len < end) {
                return Err(malformed(format!("{name} has {len} entries, need {end}")));
            }
        }

        let needed = (ncell - 1) * cell_dim + 1;
        let per_cell = [
            ("press", self.cells.press.len()),
            ("pmax", self.cells.pmax.len()),
            ("vol", self.cells.vol.len()),
            ("spvol", self.cells.spvol.len()),
            ("sie", self.cells.sie.len()),
            ("temp", self.cells.temp.len()),
            ("bmod", self.cells.bmod.len()),
            ("dpde", self.cells.dpde.len()),
            ("cv", self.cells.cv.len()),
        ];
        for (name, len) in per_cell {
            if len < needed {
                return Err(malformed(format!("{name} has {len} entries, need {needed}")));
            }
        }
        Ok(())
    }

    /// Split the batch into one disjoint view per cell.
    pub(crate) fn views(&mut self) -> MixResult<Vec<CellView<'_>>> {
        self.validate()?;
        let BatchLayout {
            ncell,
            cell_dim,
            offsets,
            eos_offsets,
        } = self.layout;
        if ncell == 0 {
            return Ok(Vec::new());
        }

        let slots = self.slot_range();
        let frac_mass: &[Real] = self.materials.frac_mass;
        let mut frac_vol = &mut self.materials.frac_vol[slots.clone()];
        let mut frac_sie = &mut self.materials.frac_sie[slots.clone()];
        let mut frac_bmod = self.materials.frac_bmod.as_deref_mut().map(|s| &mut s[slots.clone()]);
        let mut frac_dpde = self.materials.frac_dpde.as_deref_mut().map(|s| &mut s[slots.clone()]);
        let mut frac_cv = self.materials.frac_cv.as_deref_mut().map(|s| &mut s[slots.clone()]);

        let mut press = strided(self.cells.press, cell_dim);
        let mut pmax = strided(self.cells.pmax, cell_dim);
        let mut spvol = strided(self.cells.spvol, cell_dim);
        let mut sie = strided(self.cells.sie, cell_dim);
        let mut temp = strided(self.cells.temp, cell_dim);
        let mut bmod = strided(self.cells.bmod, cell_dim);
        let mut dpde = strided(self.cells.dpde, cell_dim);
        let mut cv = strided(self.cells.cv, cell_dim);

        let mut views = Vec::with_capacity(ncell);
        for index in 0..ncell {
            let (lo, hi) = (offsets[index], offsets[index + 1]);
            let width = hi - lo;
            let (
                Some(press),
                Some(pmax),
                Some(spvol),
                Some(sie),
                Some(temp),
                Some(bmod),
                Some(dpde),
                Some(cv),
            ) = (
                press.next(),
                pmax.next(),
                spvol.next(),
                sie.next(),
                temp.next(),
                bmod.next(),
                dpde.next(),
                cv.next(),
            )
            else {
                return Err(malformed(format!("per-cell arrays end before cell {index}")));
            };
            views.push(CellView {
                index,
                eos: &eos_offsets[lo..hi],
                frac_mass: &frac_mass[lo..hi],
                frac_vol: take_front(&mut frac_vol, width),
                frac_sie: take_front(&mut frac_sie, width),
                frac_bmod: take_front_opt(&mut frac_bmod, width),
                frac_dpde: take_front_opt(&mut frac_dpde, width),
                frac_cv: take_front_opt(&mut frac_cv, width),
                press,
                pmax,
                spvol,
                sie,
                temp,
                bmod,
                dpde,
                cv,
            });
        }
        Ok(views)
    }
}

/// Owned storage for a batch, for callers that do not already hold the
/// flat arrays (the deck loader and tests).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchBuffers {
    pub cell_dim: usize,
    pub offsets: Vec<usize>,
    pub eos_offsets: Vec<usize>,
    pub frac_mass: Vec<Real>,
    pub frac_vol: Vec<Real>,
    pub frac_sie: Vec<Real>,
    pub frac_bmod: Option<Vec<Real>>,
    pub frac_dpde: Option<Vec<Real>>,
    pub frac_cv: Option<Vec<Real>>,
    pub press: Vec<Real>,
    pub pmax: Vec<Real>,
    pub vol: Vec<Real>,
    pub spvol: Vec<Real>,
    pub sie: Vec<Real>,
    pub temp: Vec<Real>,
    pub bmod: Vec<Real>,
    pub dpde: Vec<Real>,
    pub cv: Vec<Real>,
}

/// Initial state of one cell for `BatchBuffers::push_cell`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellInit {
    /// (registry index, mass fraction, volume fraction, energy guess)
    pub materials: Vec<(usize, Real, Real, Real)>,
    pub spvol: Real,
    pub sie: Real,
    pub press: Real,
    pub temp: Real,
    pub vol: Real,
}

impl BatchBuffers {
    /// Empty buffers with stride 1 and, when `optional` is set, the
    /// optional per-material arrays allocated.
    pub fn new(optional: bool) -> Self {
        Self {
            cell_dim: 1,
            offsets: vec![0],
            frac_bmod: optional.then(Vec::new),
            frac_dpde: optional.then(Vec::new),
            frac_cv: optional.then(Vec::new),
            ..Self::default()
        }
    }

    pub fn ncell(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Append one cell with stride-1 per-cell storage.
    pub fn push_cell(&mut self, cell: &CellInit) {
        for &(id, mass, vol, sie) in &cell.materials {
            self.eos_offsets.push(id);
            self.frac_mass.push(mass);
            self.frac_vol.push(vol);
            self.frac_sie.push(sie);
            for opt in [&mut self.frac_bmod, &mut self.frac_dpde, &mut self.frac_cv] {
                if let Some(v) = opt {
                    v.push(0.0);
                }
            }
        }
        self.offsets.push(self.eos_offsets.len());
        self.press.push(cell.press);
        self.pmax.push(0.0);
        self.vol.push(cell.vol);
        self.spvol.push(cell.spvol);
        self.sie.push(cell.sie);
        self.temp.push(cell.temp);
        self.bmod.push(0.0);
        self.dpde.push(0.0);
        self.cv.push(0.0);
    }

    /// Borrow the buffers as a batch.
    pub fn batch(&mut self) -> CellBatch<'_> {
        CellBatch {
            layout: BatchLayout {
                ncell: self.offsets.len().saturating_sub(1),
                cell_dim: self.cell_dim,
                offsets: &self.offsets,
                eos_offsets: &self.eos_offsets,
            },
            cells: CellArrays {
                press: &mut self.press,
                pmax: &mut self.pmax,
                vol: &self.vol,
                spvol: &mut self.spvol,
                sie: &mut self.sie,
                temp: &mut self.temp,
                bmod: &mut self.bmod,
                dpde: &mut self.dpde,
                cv: &mut self.cv,
            },
            materials: MaterialArrays {
                frac_mass: &self.frac_mass,
                frac_vol: &mut self.frac_vol,
                frac_sie: &mut self.frac_sie,
                frac_bmod: self.frac_bmod.as_deref_mut(),
                frac_dpde: self.frac_dpde.as_deref_mut(),
                frac_cv: self.frac_cv.as_deref_mut(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cells() -> BatchBuffers {
        let mut buf = BatchBuffers::new(false);
        buf.push_cell(&CellInit {
            materials: vec![(0, 1.0, 1.0, 1.0)],
            spvol: 1.0,
            ..CellInit::default()
        });
        buf.push_cell(&CellInit {
            materials: vec![(0, 0.5, 0.5, 1.0), (1, 0.5, 0.5, 2.0)],
            spvol: 2.0,
            ..CellInit::default()
        });
        buf
    }

    #[test]
    fn views_are_split_per_cell() {
        let mut buf = two_cells();
        let mut batch = buf.batch();
        assert_eq!(batch.widest_cell(), 2);
        assert_eq!(batch.slot_range(), 0..3);

        let views = batch.views().unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].width(), 1);
        assert_eq!(views[1].eos, &[0, 1]);
        assert_eq!(views[1].frac_sie, &[1.0, 2.0]);
        assert_eq!(*views[1].spvol, 2.0);
        assert!(views[1].frac_bmod.is_none());
    }

    #[test]
    fn strided_cells_skip_padding() {
        let mut buf = two_cells();
        buf.cell_dim = 3;
        buf.spvol = vec![1.0, -1.0, -1.0, 2.0];
        for v in [
            &mut buf.press,
            &mut buf.pmax,
            &mut buf.vol,
            &mut buf.sie,
            &mut buf.temp,
            &mut buf.bmod,
            &mut buf.dpde,
            &mut buf.cv,
        ] {
            v.resize(4, 0.0);
        }
        let mut batch = buf.batch();
        let views = batch.views().unwrap();
        assert_eq!(*views[0].spvol, 1.0);
        assert_eq!(*views[1].spvol, 2.0);
    }

    #[test]
    fn rejects_zero_stride() {
        let mut buf = two_cells();
        buf.cell_dim = 0;
        assert!(matches!(
            buf.batch().validate(),
            Err(MixError::MalformedBatch { .. })
        ));
    }

    #[test]
    fn rejects_decreasing_offsets() {
        let mut buf = two_cells();
        buf.offsets = vec![0, 2, 1];
        let err = buf.batch().validate().unwrap_err();
        assert!(err.to_string().contains("offsets decrease"));
    }

    #[test]
    fn rejects_short_arrays() {
        let mut buf = two_cells();
        buf.frac_sie.pop();
        let err = buf.batch().validate().unwrap_err();
        assert!(err.to_string().contains("frac_sie"));

        let mut buf = two_cells();
        buf.temp.pop();
        let err = buf.batch().validate().unwrap_err();
        assert!(err.to_string().contains("temp"));
    }

    #[test]
    fn empty_batch_is_valid() {
        let mut buf = BatchBuffers::new(true);
        let mut batch = buf.batch();
        assert!(batch.validate().is_ok());
        assert!(batch.views().unwrap().is_empty());
        assert_eq!(batch.widest_cell(), 0);
    }
}
