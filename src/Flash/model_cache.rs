//! Cache of built flash solvers and of flash results.
//!
//! The cache is an ordinary value: create one and pass it to whoever needs it. Solvers are
//! keyed by the ordered compound names and the serialized model configuration, results by
//! the solver key plus the exact bit patterns of the specification and the feed. The
//! result cache holds at most `result_capacity` entries and evicts the oldest first.
use super::flash_api::{FlashError, FlashResult, FlashSpec};
use super::flash_solver::FlashSolver;
use crate::Thermodynamics::compound::Mixture;
use crate::Thermodynamics::thermo_model::ThermoModel;
use crate::settings::FlashSettings;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    /// compound names in mixture order
    pub compounds: Vec<String>,
    /// JSON of the model configuration and the flash settings
    pub model: String,
}

impl ModelKey {
    pub fn new(
        mixture: &Mixture,
        model: &ThermoModel,
        settings: &FlashSettings,
    ) -> Result<Self, FlashError> {
        let model = serde_json::to_string(&(model, settings))
            .map_err(|e| FlashError::Serialization(e.to_string()))?;
        Ok(Self {
            compounds: mixture.names().to_vec(),
            model,
        })
    }
}

type SolverSlot = Arc<Mutex<Option<Arc<FlashSolver>>>>;
type ResultKey = (ModelKey, (&'static str, u64, u64), Vec<u64>);

/// a poisoned lock only means another thread panicked; the maps stay consistent
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub const DEFAULT_RESULT_CAPACITY: usize = 4096;

/// results in insertion order
#[derive(Debug, Default)]
struct ResultStore {
    map: HashMap<ResultKey, Arc<FlashResult>>,
    order: VecDeque<ResultKey>,
}

impl ResultStore {
    fn insert(&mut self, key: ResultKey, result: Arc<FlashResult>, capacity: usize) -> Arc<FlashResult> {
        if let Some(existing) = self.map.get(&key) {
            return existing.clone();
        }
        while self.map.len() >= capacity.max(1) {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.map.insert(key, result.clone());
        result
    }
}

#[derive(Debug)]
pub struct ModelCache {
    solvers: Mutex<HashMap<ModelKey, SolverSlot>>,
    results: Mutex<ResultStore>,
    result_capacity: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::with_result_capacity(DEFAULT_RESULT_CAPACITY)
    }
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result_capacity(result_capacity: usize) -> Self {
        Self {
            solvers: Mutex::new(HashMap::new()),
            results: Mutex::new(ResultStore::default()),
            result_capacity,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// The solver for this mixture and configuration, built on first request. Concurrent
    /// requests for the same key build it once; a failed build is not remembered.
    pub fn get_or_build(
        &self,
        mixture: Arc<Mixture>,
        model: ThermoModel,
        settings: FlashSettings,
    ) -> Result<Arc<FlashSolver>, FlashError> {
        let key = ModelKey::new(&mixture, &model, &settings)?;
        let slot = lock(&self.solvers).entry(key.clone()).or_default().clone();
        let mut slot = lock(&slot);
        if let Some(solver) = slot.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(solver.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("building flash solver for {:?}", key.compounds);
        let solver = Arc::new(FlashSolver::new(mixture, model, settings)?);
        *slot = Some(solver.clone());
        Ok(solver)
    }

    /// Flash through the result cache. Identical requests return the same `Arc`.
    pub fn flash_cached(
        &self,
        solver: &FlashSolver,
        spec: FlashSpec,
        z: &[f64],
    ) -> Result<Arc<FlashResult>, FlashError> {
        let key = (
            solver.key().clone(),
            spec.key_bits(),
            z.iter().map(|zi| zi.to_bits()).collect::<Vec<u64>>(),
        );
        if let Some(result) = lock(&self.results).map.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(result.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = Arc::new(solver.flash(spec, z)?);
        Ok(lock(&self.results).insert(key, result, self.result_capacity))
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// number of cached solvers
    pub fn len(&self) -> usize {
        lock(&self.solvers)
            .values()
            .filter(|slot| lock(slot).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cached_results(&self) -> usize {
        lock(&self.results).map.len()
    }

    pub fn result_capacity(&self) -> usize {
        self.result_capacity
    }

    pub fn clear(&self) {
        lock(&self.solvers).clear();
        let mut results = lock(&self.results);
        results.map.clear();
        results.order.clear();
    }
}
