//! Immutable typed columns and row-index projections (C1).
//!
//! A [`Column`] is an ordered sequence of values of one shape, plus a name and
//! a unit label. Columns are immutable after construction — there is no write
//! path outside [`Column::from_floats`]/[`Column::from_cats`]/[`Column::from_text`].
//! A [`ColumnView`] presents a column under a permutation/projection of row
//! indices so an algorithm can treat a subsample or a join-ordered view
//! without copying the underlying storage.

use std::sync::Arc;

use crate::value::{Cat, Num, Word};

/// Backing storage shared by [`ColumnData`] implementors. Kept as a trait
/// object so an alternative backing (e.g. a memory-mapped file) can be
/// substituted behind the same read-only contract; this crate only
/// constructs the in-memory `Vec`-backed shapes below.
pub trait ColumnData: Send + Sync + std::fmt::Debug {
    /// Number of rows.
    fn len(&self) -> usize;

    /// True if there are no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense column of 64-bit floats. Null is `NaN`.
#[derive(Debug, Clone)]
pub struct DenseFloat(pub Vec<Num>);

impl ColumnData for DenseFloat {
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Dense column of encoded categorical or discrete integers. Null is any
/// negative value.
#[derive(Debug, Clone)]
pub struct DenseInt(pub Vec<Cat>);

impl ColumnData for DenseInt {
    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Text column: one word-id sequence per row, stored as a flat buffer plus
/// per-row offsets (`offsets[i]..offsets[i+1]` is row `i`'s slice). A row with
/// `offsets[i] == offsets[i+1]` has no words (distinct from a null row, which
/// this shape does not represent — absence of a join key elsewhere already
/// covers "this population row has no text to match against").
#[derive(Debug, Clone)]
pub struct TextWords {
    pub words: Vec<Word>,
    pub offsets: Vec<u32>,
}

impl ColumnData for TextWords {
    fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }
}

/// The concrete shape of one column's data.
#[derive(Debug, Clone)]
pub enum ColumnShape {
    Float(DenseFloat),
    Int(DenseInt),
    Text(TextWords),
}

impl ColumnShape {
    fn len(&self) -> usize {
        match self {
            ColumnShape::Float(c) => c.len(),
            ColumnShape::Int(c) => c.len(),
            ColumnShape::Text(c) => c.len(),
        }
    }
}

/// A named, immutable, typed column. Cheaply cloneable — the shared storage
/// is wrapped in `Arc` so a `DataFrame` and any `ColumnView`s derived from it
/// can share the same backing without copying.
#[derive(Debug, Clone)]
pub struct Column {
    name: Arc<str>,
    unit: Arc<str>,
    shape: Arc<ColumnShape>,
}

impl Column {
    #[must_use]
    pub fn from_floats(name: impl Into<String>, unit: impl Into<String>, values: Vec<Num>) -> Self {
        Column {
            name: Arc::from(name.into()),
            unit: Arc::from(unit.into()),
            shape: Arc::new(ColumnShape::Float(DenseFloat(values))),
        }
    }

    #[must_use]
    pub fn from_cats(name: impl Into<String>, unit: impl Into<String>, values: Vec<Cat>) -> Self {
        Column {
            name: Arc::from(name.into()),
            unit: Arc::from(unit.into()),
            shape: Arc::new(ColumnShape::Int(DenseInt(values))),
        }
    }

    #[must_use]
    pub fn from_text(
        name: impl Into<String>,
        unit: impl Into<String>,
        words: Vec<Word>,
        offsets: Vec<u32>,
    ) -> Self {
        Column {
            name: Arc::from(name.into()),
            unit: Arc::from(unit.into()),
            shape: Arc::new(ColumnShape::Text(TextWords { words, offsets })),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn shape(&self) -> &ColumnShape {
        &self.shape
    }

    /// Reads row `i` as a `Num`, or `NaN` if the column is not float-shaped
    /// or the row is out of range. Used by numerical/timestamp binners.
    #[must_use]
    pub fn get_num(&self, i: usize) -> Num {
        match &*self.shape {
            ColumnShape::Float(c) => c.0.get(i).copied().unwrap_or(f64::NAN),
            ColumnShape::Int(c) => c
                .0
                .get(i)
                .copied()
                .filter(|v| *v >= 0)
                .map(f64::from)
                .unwrap_or(f64::NAN),
            ColumnShape::Text(_) => f64::NAN,
        }
    }

    /// Reads row `i` as a `Cat`, or the null sentinel (-1) if out of range or
    /// not int-shaped.
    #[must_use]
    pub fn get_cat(&self, i: usize) -> Cat {
        match &*self.shape {
            ColumnShape::Int(c) => c.0.get(i).copied().unwrap_or(-1),
            _ => -1,
        }
    }

    /// Reads row `i`'s text words, or an empty slice if out of range or not
    /// text-shaped.
    #[must_use]
    pub fn get_words(&self, i: usize) -> &[Word] {
        match &*self.shape {
            ColumnShape::Text(c) => {
                let Some(&start) = c.offsets.get(i) else {
                    return &[];
                };
                let Some(&end) = c.offsets.get(i + 1) else {
                    return &[];
                };
                &c.words[start as usize..end as usize]
            }
            _ => &[],
        }
    }
}

/// A column presented through a row-index projection: logical row `i` maps to
/// underlying row `idx[i]`. Used to view a subsample or a reordered slice of a
/// `Column` without copying its storage.
#[derive(Debug, Clone)]
pub struct ColumnView {
    column: Column,
    idx: Arc<[usize]>,
}

impl ColumnView {
    #[must_use]
    pub fn new(column: Column, idx: Arc<[usize]>) -> Self {
        ColumnView { column, idx }
    }

    /// An identity view over the whole column (no projection).
    #[must_use]
    pub fn identity(column: Column) -> Self {
        let idx: Arc<[usize]> = (0..column.len()).collect::<Vec<_>>().into();
        ColumnView { column, idx }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.idx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idx.is_empty()
    }

    #[must_use]
    pub fn underlying_row(&self, logical_row: usize) -> usize {
        self.idx[logical_row]
    }

    #[must_use]
    pub fn get_num(&self, logical_row: usize) -> Num {
        self.column.get_num(self.idx[logical_row])
    }

    #[must_use]
    pub fn get_cat(&self, logical_row: usize) -> Cat {
        self.column.get_cat(self.idx[logical_row])
    }

    #[must_use]
    pub fn get_words(&self, logical_row: usize) -> &[Word] {
        self.column.get_words(self.idx[logical_row])
    }

    #[must_use]
    pub fn column(&self) -> &Column {
        &self.column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_float_round_trips() {
        let c = Column::from_floats("v", "usd", vec![1.0, 2.0, f64::NAN]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.get_num(0), 1.0);
        assert!(c.get_num(2).is_nan());
        assert!(c.get_num(99).is_nan());
    }

    #[test]
    fn dense_int_null_is_negative() {
        let c = Column::from_cats("id", "", vec![1, -1, 3]);
        assert_eq!(c.get_cat(0), 1);
        assert_eq!(c.get_cat(1), -1);
        assert_eq!(c.get_cat(99), -1);
    }

    #[test]
    fn text_words_offsets() {
        let c = Column::from_text("body", "", vec![10, 11, 20], vec![0, 2, 2, 3]);
        assert_eq!(c.get_words(0), &[10, 11]);
        assert_eq!(c.get_words(1), &[] as &[i32]);
        assert_eq!(c.get_words(2), &[20]);
    }

    #[test]
    fn view_projects_rows() {
        let c = Column::from_floats("v", "", vec![10.0, 20.0, 30.0]);
        let idx: Arc<[usize]> = vec![2, 0].into();
        let v = ColumnView::new(c, idx);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get_num(0), 30.0);
        assert_eq!(v.get_num(1), 10.0);
    }
}
