//! Categorical (dictionary-encoded) behaviors.
//!
//! Two categorical columns compare by the category each row points at, so
//! columns with differently ordered category tables still compare equal where
//! their values agree.

use crate::core::Handler;

use super::BuiltinGroup;

/// A dictionary-encoded column: per-row indices into `categories`.
///
/// A negative or out-of-range index is a missing value.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalView<'a> {
	pub index: &'a [i64],
	pub categories: &'a [&'a str],
}

impl<'a> CategoricalView<'a> {
	pub fn new(index: &'a [i64], categories: &'a [&'a str]) -> Self {
		Self { index, categories }
	}

	pub fn len(&self) -> usize {
		self.index.len()
	}

	pub fn is_empty(&self) -> bool {
		self.index.is_empty()
	}

	/// The category value at `row`, or `None` if the row is missing.
	pub fn value(&self, row: usize) -> Option<&'a str> {
		let slot = usize::try_from(*self.index.get(row)?).ok()?;
		self.categories.get(slot).copied()
	}
}

/// Element-wise comparison of two categorical columns.
pub type CategoricalCompare = fn(CategoricalView<'_>, CategoricalView<'_>) -> Vec<bool>;

/// Missing values compare unequal to everything, themselves included.
fn compare(left: CategoricalView<'_>, right: CategoricalView<'_>, want: bool) -> Vec<bool> {
	(0..left.len().min(right.len()))
		.map(|row| match (left.value(row), right.value(row)) {
			(Some(a), Some(b)) => (a == b) == want,
			_ => !want,
		})
		.collect()
}

pub fn categorical_equal(left: CategoricalView<'_>, right: CategoricalView<'_>) -> Vec<bool> {
	compare(left, right, true)
}

pub fn categorical_not_equal(left: CategoricalView<'_>, right: CategoricalView<'_>) -> Vec<bool> {
	compare(left, right, false)
}

fn entries() -> Vec<(&'static str, Handler)> {
	vec![
		("__typestr__(categorical)", Handler::label("categorical")),
		(
			"equal(*categorical, *categorical)",
			Handler::callable("categorical.equal", categorical_equal as CategoricalCompare),
		),
		(
			"not_equal(*categorical, *categorical)",
			Handler::callable("categorical.not_equal", categorical_not_equal as CategoricalCompare),
		),
	]
}

inventory::submit! {
	BuiltinGroup { name: "categorical", entries }
}
