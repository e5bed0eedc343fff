//! The init/evaluate/finalize bracket around a material registry.

use crate::descriptor::CellBatch;
use crate::driver::{BatchReport, run_batch};
use mx_core::{MaterialId, Real};
use mx_eos::{
    DavisProductsParams, DavisReactantsParams, EosModel, GruneisenParams, JwlParams,
    MaterialRegistry, MaterialState,
};
use mx_pte::{InputMode, MixError, MixResult, PteConfig, single};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the registry, the solver policy and, optionally, a worker pool.
///
/// Without a pool, batches run on rayon's global pool. Several contexts can
/// coexist and can share one pool.
#[derive(Debug)]
pub struct EosContext {
    registry: MaterialRegistry,
    config: PteConfig,
    pool: Option<Arc<ThreadPool>>,
}

fn material_id(index: usize, nmat: usize) -> MixResult<MaterialId> {
    MaterialId::from_index(index).ok_or(MixError::InvalidMaterialId { id: index, nmat })
}

impl EosContext {
    /// Context with room for `nmat` materials and the default solver policy.
    pub fn init(nmat: usize) -> Self {
        debug!(nmat, "initializing EOS context");
        Self {
            registry: MaterialRegistry::new(nmat),
            config: PteConfig::default(),
            pool: None,
        }
    }

    /// Context with a dedicated pool of `threads` workers.
    pub fn with_threads(nmat: usize, threads: usize) -> MixResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mixeos-{i}"))
            .build()
            .map_err(|_| MixError::InvalidConfig {
                what: "could not build worker pool",
            })?;
        Ok(Self::with_pool(nmat, Arc::new(pool)))
    }

    /// Context that runs batches on an existing pool.
    pub fn with_pool(nmat: usize, pool: Arc<ThreadPool>) -> Self {
        Self {
            pool: Some(pool),
            ..Self::init(nmat)
        }
    }

    pub fn registry(&self) -> &MaterialRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PteConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PteConfig) -> MixResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn pool(&self) -> Option<&Arc<ThreadPool>> {
        self.pool.as_ref()
    }

    /// Worker count batches will use.
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |p| p.current_num_threads())
    }

    pub fn register(&mut self, index: usize, model: Arc<dyn EosModel>) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        self.registry.register(id, model)?;
        Ok(())
    }

    pub fn register_ideal_gas(&mut self, index: usize, gm1: Real, cv: Real) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        Ok(self.registry.register_ideal_gas(id, gm1, cv)?)
    }

    pub fn register_jwl(&mut self, index: usize, params: JwlParams) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        Ok(self.registry.register_jwl(id, params)?)
    }

    pub fn register_gruneisen(&mut self, index: usize, params: GruneisenParams) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        Ok(self.registry.register_gruneisen(id, params)?)
    }

    pub fn register_davis_products(
        &mut self,
        index: usize,
        params: DavisProductsParams,
    ) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        Ok(self.registry.register_davis_products(id, params)?)
    }

    pub fn register_davis_reactants(
        &mut self,
        index: usize,
        params: DavisReactantsParams,
    ) -> MixResult<()> {
        let id = material_id(index, self.registry.nmat())?;
        Ok(self.registry.register_davis_reactants(id, params)?)
    }

    /// State of material `index` alone at its reference density and `temperature`.
    pub fn reference_state(&self, index: usize, temperature: Real) -> MixResult<MaterialState> {
        let model = self.registry.lookup_index(index)?;
        single::from_density_temperature(model, model.reference_density(), temperature)
    }

    /// Evaluate a batch with the integer mode selector of the flat boundary
    /// (-1 P-T, 0 ρ-e, 1 ρ-P, 2 ρ-T).
    pub fn evaluate(&self, input_int: i32, batch: &mut CellBatch<'_>) -> MixResult<BatchReport> {
        self.evaluate_mode(InputMode::from_input_int(input_int)?, batch)
    }

    pub fn evaluate_mode(
        &self,
        mode: InputMode,
        batch: &mut CellBatch<'_>,
    ) -> MixResult<BatchReport> {
        match &self.pool {
            Some(pool) => pool.install(|| run_batch(&self.registry, &self.config, mode, batch)),
            None => run_batch(&self.registry, &self.config, mode, batch),
        }
    }

    /// Release every registered model, and the pool too when `own_pool` is
    /// set. Returns the number of models released.
    ///
    /// The context stays usable: models can be registered again.
    pub fn finalize(&mut self, own_pool: bool) -> usize {
        let released = self.registry.finalize();
        let dropped_pool = own_pool && self.pool.take().is_some();
        info!(released, dropped_pool, "finalized EOS context");
        released
    }
}
