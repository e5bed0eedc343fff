use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier for a material slot in a registry.
///
/// - `u32` keeps per-material index arrays small
/// - `NonZero` enables `Option<MaterialId>` to be niche-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(NonZeroU32);

impl MaterialId {
    /// Create an id from a 0-based index by storing index+1.
    ///
    /// Returns `None` when the index does not fit.
    pub fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(Self)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaterialId({})", self.index())
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            let id = MaterialId::from_index(i).unwrap();
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn id_rejects_unrepresentable_index() {
        assert!(MaterialId::from_index(u32::MAX as usize).is_none());
        assert!(MaterialId::from_index(usize::MAX).is_none());
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<MaterialId>(),
            core::mem::size_of::<Option<MaterialId>>()
        );
    }
}
