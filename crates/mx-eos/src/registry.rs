//! Material registry: material id → shared EOS model.
//!
//! The registry is built once (single writer), then shared immutably by every
//! worker of a batch. Mutation needs `&mut self`, evaluation only `&self`, so
//! the borrow checker enforces the build-then-read discipline without locks.

use crate::error::{EosError, EosResult};
use crate::model::EosModel;
use crate::models::{
    DavisProducts, DavisProductsParams, DavisReactants, DavisReactantsParams, Gruneisen,
    GruneisenParams, IdealGas, Jwl, JwlParams,
};
use mx_core::{MaterialId, Real};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MaterialRegistry {
    models: Vec<Option<Arc<dyn EosModel>>>,
}

impl MaterialRegistry {
    /// Create an empty registry with room for `nmat` materials.
    pub fn new(nmat: usize) -> Self {
        Self {
            models: vec![None; nmat],
        }
    }

    /// Number of material slots.
    pub fn nmat(&self) -> usize {
        self.models.len()
    }

    /// Number of slots holding a model.
    pub fn registered_count(&self) -> usize {
        self.models.iter().filter(|m| m.is_some()).count()
    }

    fn check_id(&self, id: MaterialId) -> EosResult<usize> {
        let index = id.index();
        if index >= self.models.len() {
            return Err(EosError::InvalidMaterialId {
                id: index,
                nmat: self.models.len(),
            });
        }
        Ok(index)
    }

    /// Insert or replace the model for `id`; returns the previous model.
    pub fn register(
        &mut self,
        id: MaterialId,
        model: Arc<dyn EosModel>,
    ) -> EosResult<Option<Arc<dyn EosModel>>> {
        let index = self.check_id(id)?;
        debug!(material = index, model = model.name(), "registering EOS model");
        Ok(self.models[index].replace(model))
    }

    pub fn register_ideal_gas(&mut self, id: MaterialId, gm1: Real, cv: Real) -> EosResult<()> {
        self.check_id(id)?;
        self.register(id, Arc::new(IdealGas::new(gm1, cv)?))?;
        Ok(())
    }

    pub fn register_jwl(&mut self, id: MaterialId, params: JwlParams) -> EosResult<()> {
        self.check_id(id)?;
        self.register(id, Arc::new(Jwl::new(params)?))?;
        Ok(())
    }

    pub fn register_gruneisen(&mut self, id: MaterialId, params: GruneisenParams) -> EosResult<()> {
        self.check_id(id)?;
        self.register(id, Arc::new(Gruneisen::new(params)?))?;
        Ok(())
    }

    pub fn register_davis_products(
        &mut self,
        id: MaterialId,
        params: DavisProductsParams,
    ) -> EosResult<()> {
        self.check_id(id)?;
        self.register(id, Arc::new(DavisProducts::new(params)?))?;
        Ok(())
    }

    pub fn register_davis_reactants(
        &mut self,
        id: MaterialId,
        params: DavisReactantsParams,
    ) -> EosResult<()> {
        self.check_id(id)?;
        self.register(id, Arc::new(DavisReactants::new(params)?))?;
        Ok(())
    }

    /// Borrow the model for `id`.
    pub fn lookup(&self, id: MaterialId) -> EosResult<&dyn EosModel> {
        let index = self.check_id(id)?;
        self.models[index]
            .as_deref()
            .ok_or(EosError::UnknownMaterial { id: index })
    }

    /// Borrow the model for a raw 0-based index from a flat batch array.
    pub fn lookup_index(&self, index: usize) -> EosResult<&dyn EosModel> {
        let id = MaterialId::from_index(index).ok_or(EosError::InvalidMaterialId {
            id: index,
            nmat: self.models.len(),
        })?;
        self.lookup(id)
    }

    /// Iterate over registered materials.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &dyn EosModel)> + '_ {
        self.models.iter().enumerate().filter_map(|(i, m)| {
            let id = MaterialId::from_index(i)?;
            m.as_deref().map(|model| (id, model))
        })
    }

    /// Release every registered model. Returns how many were released.
    ///
    /// The registry keeps its capacity and can be repopulated.
    pub fn finalize(&mut self) -> usize {
        let released = self.models.iter_mut().filter_map(Option::take).count();
        debug!(released, "released EOS models");
        released
    }
}
