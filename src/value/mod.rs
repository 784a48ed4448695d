//! # Value Type System
//!
//! Core scalar types used throughout the engine: `Num` (64-bit float, the only
//! numerical representation), `Cat` (32-bit encoded categorical id, negative =
//! null), `Word` (32-bit tokenized text id, negative = null) and `Timestamp`
//! (floating-point seconds since an implementation-defined epoch).
//!
//! These are type aliases rather than a wrapper enum: a `Column` already knows
//! its own shape (see [`crate::column`]), so there is never a need to tag an
//! individual scalar with a runtime type the way a heterogeneous `Tuple` would.
//!
//! ## Null conventions
//!
//! - Numeric (`Num`): null is `NaN`; test with [`is_null_num`].
//! - Categorical (`Cat`) and text (`Word`): null is any negative value; test
//!   with [`is_null_cat`].

use serde::{Deserialize, Serialize};

/// A 64-bit floating point numerical value. Null is represented as `NaN`.
pub type Num = f64;

/// A 32-bit encoded categorical id. Negative values are null/unknown.
pub type Cat = i32;

/// A 32-bit tokenized word id. Negative values are null/unknown.
pub type Word = i32;

/// Floating point seconds since an implementation-defined epoch.
pub type Timestamp = f64;

/// Sentinel returned by [`crate::encoding::Encoding::encode`] in lookup-only
/// mode for a string that was never seen during fit.
pub const NULL_CAT: Cat = -1;

/// Checks whether a numerical value is null (`NaN`).
#[inline]
#[must_use]
pub fn is_null_num(v: Num) -> bool {
    v.is_nan()
}

/// Checks whether a categorical or word value is null (negative).
#[inline]
#[must_use]
pub fn is_null_cat(v: Cat) -> bool {
    v < 0
}

/// The logical type of a column, independent of its storage shape.
/// Mirrors the role classification in [`crate::schema::Role`] but describes
/// the *value* domain rather than the column's purpose in a `DataFrame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit float (`Num`).
    Numerical,
    /// 32-bit encoded category (`Cat`).
    Categorical,
    /// Integer-valued numerical (`Num` that is always integral); distinguished
    /// from `Numerical` only so discrete binning can use ordered prefixes.
    Discrete,
    /// Floating point seconds (`Timestamp`).
    TimeStamp,
    /// Sequence of word ids per row.
    Text,
}

impl DataType {
    /// True if this type is ordered by `<` in a way that a numerical or
    /// discrete binner can use directly (as opposed to an unordered set of
    /// categories).
    #[must_use]
    pub fn is_ordered(self) -> bool {
        matches!(
            self,
            DataType::Numerical | DataType::Discrete | DataType::TimeStamp
        )
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Numerical => "numerical",
            DataType::Categorical => "categorical",
            DataType::Discrete => "discrete",
            DataType::TimeStamp => "time_stamp",
            DataType::Text => "text",
        };
        write!(f, "{s}")
    }
}
