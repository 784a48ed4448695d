//! # relfeat
//!
//! An automated relational feature engineering engine: given a population
//! table, a set of peripheral tables, a join graph describing how they
//! relate, and a target column, it learns a collection of numeric features
//! derived from the peripherals and applies them to new data.
//!
//! Each feature is a composition of a *condition* (which peripheral rows
//! count for a given population row) and an *aggregation* (how those rows
//! collapse to one scalar). Feature discovery is driven by gradient
//! boosting: relational decision trees are fit sequentially against the
//! residuals of a loss function, and the splits they find become the
//! learned feature set.
//!
//! ## Module map
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`value`] | Scalar type aliases (`Num`, `Cat`, `Word`) and null conventions |
//! | [`column`] | Immutable typed column storage and row-index views |
//! | [`encoding`] | Model-scoped string ↔ categorical-id encoding |
//! | [`schema`] | `DataFrame`/`Schema`/`Role` and the table registry |
//! | [`placeholder`] | The join graph: population root plus peripheral nodes |
//! | [`bloom_filter`] | Fast-negative prefilter for join-key lookups |
//! | [`join_index`] | Hash index from join key to peripheral row numbers |
//! | [`index_manager`] | Caches one join-key index per (table, key-columns) pair |
//! | [`matchmaker`] | Produces population-to-peripheral row matches |
//! | [`binning`] | Candidate-split search (numerical/categorical/discrete/word) |
//! | [`aggregation`] | Aggregation family (sum, avg, count, trend, EWMA, ...) |
//! | [`loss`] | Second-order boosting loss functions |
//! | [`tree`] | Relational decision tree: candidate extraction and fitting |
//! | [`ensemble`] | Gradient-boosting driver composing trees |
//! | [`worker_pool`] | SPMD worker pool with barrier/checkpoint/reduce |
//! | [`feature`] | Feature container producing a dense matrix from a fitted ensemble |
//! | [`score`] | Regression/classification scoring |
//! | [`model`] | The `fit`/`transform` state machine and persistence |
//! | [`config`] | `RuntimeConfig` (process-wide) and `Hyperparams` (per-fit) |
//! | [`error`] | Unified error taxonomy at the API boundary |

pub mod aggregation;
pub mod binning;
pub mod bloom_filter;
pub mod column;
pub mod config;
pub mod encoding;
pub mod ensemble;
pub mod error;
pub mod feature;
pub mod index_manager;
pub mod join_index;
pub mod loss;
pub mod matchmaker;
pub mod model;
pub mod placeholder;
pub mod schema;
pub mod score;
pub mod tree;
pub mod value;
pub mod worker_pool;

pub use column::Column;
pub use config::{Hyperparams, RuntimeConfig};
pub use encoding::{EncodeMode, Encoding};
pub use ensemble::Ensemble;
pub use error::{FeatureEngineError, FeatureEngineResult};
pub use feature::FeatureMatrix;
pub use model::{Model, ModelState};
pub use placeholder::{NodeId, Placeholder, Relationship, ROOT};
pub use schema::{DataFrame, Role, Schema};
pub use score::{score, Scores};
pub use value::{Cat, Num, Word};
pub use worker_pool::{Communicator, WorkerPool};
