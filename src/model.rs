//! Model state machine: `{NotFitted -> Fitting -> Fitted}` plus byte-exact
//! persistence (`bincode` + a trailing `crc32fast` checksum).

use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::Hyperparams;
use crate::encoding::EncodingTable;
use crate::ensemble::{self, Ensemble};
use crate::error::{FeatureEngineError, FeatureEngineResult, ModelError};
use crate::feature::{self, FeatureMatrix};
use crate::index_manager::IndexManager;
use crate::loss;
use crate::matchmaker::Matchmaker;
use crate::placeholder::{Placeholder, ROOT};
use crate::schema::validator::{self, SchemaError};
use crate::schema::{DataFrame, Role, Schema, TableRegistry};
use crate::tree::{self, Candidate};
use crate::value::Num;
use crate::worker_pool::WorkerPool;

/// Lifecycle state of a [`Model`]. A `Fitted` model is immutable; re-fitting
/// produces a new `Model` rather than mutating one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    NotFitted,
    Fitting,
    Fitted,
}

/// The persisted artifact: the encoding table, the join graph, the schemas it
/// was fit against, the hyperparameters, and (once fitted) the ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    state: ModelState,
    placeholder: Placeholder,
    population_schema: Schema,
    peripheral_schemas: HashMap<String, Schema>,
    encoding: EncodingTable,
    hyperparams: Hyperparams,
    ensemble: Option<Ensemble>,
}

impl Model {
    #[must_use]
    pub fn state(&self) -> ModelState {
        self.state
    }

    #[must_use]
    pub fn hyperparams(&self) -> &Hyperparams {
        &self.hyperparams
    }

    #[must_use]
    pub fn population_schema(&self) -> &Schema {
        &self.population_schema
    }

    #[must_use]
    pub fn peripheral_schemas(&self) -> &HashMap<String, Schema> {
        &self.peripheral_schemas
    }

    /// Fits a new model over `population`/`peripherals` joined via
    /// `placeholder`'s direct children, producing an immutable `Fitted`
    /// artifact. Subfeature (nested) placeholder levels are not walked here —
    /// see [`tree`]'s module doc for the scoping this shares with
    /// candidate-set construction.
    /// `pool` runs the split search for every tree across its workers and
    /// doubles as the cancellation handle: a caller that calls
    /// `pool.cancel()` from another thread while `fit` is running on the
    /// calling thread causes the next round boundary to abort with
    /// [`FeatureEngineError::Worker`]`(`[`crate::worker_pool::WorkerError::Canceled`]`)`
    /// rather than returning a partially fitted model.
    pub fn fit(
        population: &DataFrame,
        peripherals: &HashMap<String, DataFrame>,
        placeholder: Placeholder,
        encoding: EncodingTable,
        hyperparams: Hyperparams,
        pool: &WorkerPool,
    ) -> FeatureEngineResult<Self> {
        validator::validate_has_target(population)?;
        validator::validate_join_keys_encoded(population)?;
        loss::by_name(&hyperparams.loss)?;

        let registry = build_registry(peripherals);
        let candidates = build_all_candidates(population, &registry, &placeholder, &hyperparams)?;

        let target = population
            .schema()
            .columns_with_role(Role::Target)
            .into_iter()
            .next()
            .and_then(|name| population.column(name))
            .ok_or(SchemaError::MissingTarget)?;
        let y: Vec<Num> = (0..population.nrows()).map(|r| target.get_num(r)).collect();

        let loss_fn = loss::by_name(&hyperparams.loss)?;
        let mut rng = StdRng::seed_from_u64(hyperparams.seed);
        let ensemble = ensemble::fit(&candidates, &y, loss_fn.as_ref(), &hyperparams, pool, &mut rng)?;

        let peripheral_schemas = peripherals
            .iter()
            .map(|(name, df)| (name.clone(), df.schema().clone()))
            .collect();

        Ok(Model {
            state: ModelState::Fitted,
            placeholder,
            population_schema: population.schema().clone(),
            peripheral_schemas,
            encoding,
            hyperparams,
            ensemble: Some(ensemble),
        })
    }

    /// Applies this fitted model to new data, returning one column per tree.
    /// `pool` parallelizes the evaluation across its workers (C10/C11).
    pub fn transform(
        &self,
        population: &DataFrame,
        peripherals: &HashMap<String, DataFrame>,
        pool: &WorkerPool,
    ) -> FeatureEngineResult<FeatureMatrix> {
        if self.state != ModelState::Fitted {
            return Err(ModelError::NotFitted.into());
        }
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotFitted)?;

        let registry = build_registry(peripherals);
        let candidates = build_all_candidates(population, &registry, &self.placeholder, &self.hyperparams)?;
        Ok(feature::transform_parallel(pool, ensemble, &candidates, population.nrows()))
    }

    /// Serializes this model with `bincode`, appending a trailing
    /// `crc32fast` checksum of the encoded bytes so [`Model::from_bytes`] can
    /// detect truncation/corruption before attempting to decode.
    pub fn to_bytes(&self) -> FeatureEngineResult<Vec<u8>> {
        let mut bytes =
            bincode::serialize(self).map_err(|e| ModelError::Codec(e.to_string()))?;
        let checksum = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());
        Ok(bytes)
    }

    /// Deserializes a model previously written by [`Model::to_bytes`],
    /// verifying the trailing checksum before decoding the payload.
    pub fn from_bytes(bytes: &[u8]) -> FeatureEngineResult<Self> {
        if bytes.len() < 4 {
            return Err(ModelError::ChecksumMismatch.into());
        }
        let (payload, checksum_bytes) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes(checksum_bytes.try_into().expect("4-byte slice"));
        if crc32fast::hash(payload) != expected {
            return Err(ModelError::ChecksumMismatch.into());
        }
        bincode::deserialize(payload).map_err(|e| ModelError::Codec(e.to_string()).into())
    }
}

fn build_registry(peripherals: &HashMap<String, DataFrame>) -> TableRegistry {
    let mut registry = TableRegistry::new();
    for frame in peripherals.values() {
        registry.register(frame.clone());
    }
    registry
}

/// Builds the combined candidate set across every peripheral directly
/// attached to the placeholder root, each aligned against `population`'s
/// rows via a fresh [`IndexManager`]/[`Matchmaker`] pass.
fn build_all_candidates(
    population: &DataFrame,
    registry: &TableRegistry,
    placeholder: &Placeholder,
    hyperparams: &Hyperparams,
) -> Result<Vec<Candidate>, FeatureEngineError> {
    let index_manager = IndexManager::new();
    let mut candidates = Vec::new();
    for &child in placeholder.children(ROOT) {
        let node = placeholder.node(child);
        let peripheral = registry.require(&node.table_name)?;
        let matchmaker = Matchmaker::new(population, peripheral, node, &index_manager, hyperparams.use_timestamps);
        let weights = vec![1.0; population.nrows()];
        let matches = matchmaker.make_matches(&weights);

        let mut matches_per_row = vec![Vec::new(); population.nrows()];
        for m in matches {
            matches_per_row[m.population_row].push(m.peripheral_row);
        }
        let timestamps = node.time_stamp.as_ref().and_then(|ts| peripheral.column(&ts.right_ts));
        candidates.extend(tree::build_candidates(peripheral, &matches_per_row, hyperparams, timestamps));
    }
    Ok(candidates)
}
