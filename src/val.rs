use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scalar value as held by the store.
///
/// This is the currency between the schema layer and the [`crate::store`]
/// collaborator: attribute values travel as `Value`s in both directions and
/// are converted to and from GraphQL values at the resolver boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	Datetime(DateTime<Utc>),
	Uuid(Uuid),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// The canonical string form, as used by stringly-typed filter equality.
	pub fn to_raw_string(&self) -> String {
		match self {
			Value::Null => String::new(),
			Value::Bool(b) => b.to_string(),
			Value::Int(i) => i.to_string(),
			Value::Float(f) => f.to_string(),
			Value::String(s) => s.clone(),
			Value::Datetime(d) => d.to_rfc3339(),
			Value::Uuid(u) => u.to_string(),
		}
	}

	fn variant_rank(&self) -> u8 {
		match self {
			Value::Null => 0,
			Value::Bool(_) => 1,
			Value::Int(_) | Value::Float(_) => 2,
			Value::String(_) => 3,
			Value::Datetime(_) => 4,
			Value::Uuid(_) => 5,
		}
	}

	/// Total ordering used by the store when sorting fetched objects.
	///
	/// Values are grouped by variant with nulls first, numbers compare
	/// numerically across `Int`/`Float`, everything else compares within its
	/// own variant.
	pub fn cmp_sort(&self, other: &Value) -> Ordering {
		match (self, other) {
			(Value::Bool(a), Value::Bool(b)) => a.cmp(b),
			(Value::Int(a), Value::Int(b)) => a.cmp(b),
			(Value::Float(a), Value::Float(b)) => a.total_cmp(b),
			(Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b),
			(Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)),
			(Value::String(a), Value::String(b)) => a.cmp(b),
			(Value::Datetime(a), Value::Datetime(b)) => a.cmp(b),
			(Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
			(a, b) => a.variant_rank().cmp(&b.variant_rank()),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_raw_string())
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(value: DateTime<Utc>) -> Self {
		Value::Datetime(value)
	}
}

impl From<Uuid> for Value {
	fn from(value: Uuid) -> Self {
		Value::Uuid(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sort_order_groups_numbers() {
		let mut vals = vec![Value::Float(2.5), Value::Int(3), Value::Int(1), Value::Null];
		vals.sort_by(|a, b| a.cmp_sort(b));
		assert_eq!(
			vals,
			vec![Value::Null, Value::Int(1), Value::Float(2.5), Value::Int(3)]
		);
	}

	#[test]
	fn raw_string_forms() {
		assert_eq!(Value::Int(42).to_raw_string(), "42");
		assert_eq!(Value::Bool(true).to_raw_string(), "true");
		assert_eq!(Value::String("x".into()).to_raw_string(), "x");
	}
}
