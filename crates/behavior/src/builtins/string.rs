//! Text behaviors: display names, element-wise comparison and broadcasting.

use crate::core::{Handler, Operand};

use super::BuiltinGroup;

/// Element-wise comparison of two string columns.
pub type StrCompare = fn(&[&str], &[&str]) -> Vec<bool>;

/// Element-wise comparison of two byte-string columns.
pub type BytesCompare = fn(&[&[u8]], &[&[u8]]) -> Vec<bool>;

/// Signature of `__broadcast__` handlers.
pub type BroadcastHook = fn(&Operand) -> BroadcastRule;

/// How the broadcaster treats a tagged list node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastRule {
	/// The node is a single value; never broadcast into its items.
	Atomic,
	/// Broadcast into the node's items like any other list.
	Elementwise,
}

/// Compares pairwise; a length mismatch compares the common prefix.
fn pairwise<T: PartialEq + ?Sized>(left: &[&T], right: &[&T], want: bool) -> Vec<bool> {
	left.iter().zip(right).map(|(a, b)| (a == b) == want).collect()
}

pub fn str_equal(left: &[&str], right: &[&str]) -> Vec<bool> {
	pairwise(left, right, true)
}

pub fn str_not_equal(left: &[&str], right: &[&str]) -> Vec<bool> {
	pairwise(left, right, false)
}

pub fn bytes_equal(left: &[&[u8]], right: &[&[u8]]) -> Vec<bool> {
	pairwise(left, right, true)
}

pub fn bytes_not_equal(left: &[&[u8]], right: &[&[u8]]) -> Vec<bool> {
	pairwise(left, right, false)
}

/// Text lists are values, not containers.
pub fn atomic(_: &Operand) -> BroadcastRule {
	BroadcastRule::Atomic
}

fn entries() -> Vec<(&'static str, Handler)> {
	vec![
		("__typestr__(string)", Handler::label("string")),
		("__typestr__(bytestring)", Handler::label("bytes")),
		("__typestr__(char)", Handler::label("char")),
		("__typestr__(byte)", Handler::label("byte")),
		("equal(string, string)", Handler::callable("string.equal", str_equal as StrCompare)),
		("not_equal(string, string)", Handler::callable("string.not_equal", str_not_equal as StrCompare)),
		("equal(bytestring, bytestring)", Handler::callable("bytestring.equal", bytes_equal as BytesCompare)),
		("not_equal(bytestring, bytestring)", Handler::callable("bytestring.not_equal", bytes_not_equal as BytesCompare)),
		("__broadcast__(*string)", Handler::callable("string.broadcast", atomic as BroadcastHook)),
		("__broadcast__(*bytestring)", Handler::callable("bytestring.broadcast", atomic as BroadcastHook)),
	]
}

inventory::submit! {
	BuiltinGroup { name: "string", entries }
}
