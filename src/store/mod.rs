//! The persistence collaborator contract.
//!
//! The schema layer never talks to storage directly; it goes through these
//! traits. Each resolved request runs against one [`Transaction`], and
//! multi-step mutations call [`Transaction::save`] exactly once after all of
//! their writes.

#[cfg(feature = "store-mem")]
pub mod mem;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::val::Value;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("unknown entity: {0}")]
	UnknownEntity(String),
	#[error("unknown relationship: {entity}.{relationship}")]
	UnknownRelationship {
		entity: String,
		relationship: String,
	},
	#[error("no `{entity}` object with id {id}")]
	MissingObject {
		entity: String,
		id: i64,
	},
	#[error("cannot sort `{entity}` by unknown field `{field}`")]
	UnknownSortField {
		entity: String,
		field: String,
	},
	#[error("store error: {0}")]
	Internal(String),
}

/// A snapshot of one stored object's scalar attributes.
///
/// Relationship traversal always goes back through the [`Transaction`]; the
/// snapshot only carries what a `SELECT *` would.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
	pub entity: String,
	pub id: i64,
	pub values: BTreeMap<String, Value>,
}

impl Record {
	pub fn value(&self, field: &str) -> Value {
		self.values.get(field).cloned().unwrap_or(Value::Null)
	}
}

/// One signed sort token: `field` ascending, or descending when `desc`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
	pub field: String,
	pub desc: bool,
}

impl SortKey {
	pub fn asc(field: impl Into<String>) -> Self {
		SortKey {
			field: field.into(),
			desc: false,
		}
	}

	pub fn desc(field: impl Into<String>) -> Self {
		SortKey {
			field: field.into(),
			desc: true,
		}
	}
}

/// A query condition, built by the schema layer's filter helper and handed
/// to the store unchanged. The store owns the matching semantics:
/// [`Predicate::Prefix`] is the equivalent of `LOWER(field) LIKE 'token%'`
/// and [`Predicate::WordPrefix`] of `LOWER(field) LIKE '% token%'`.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
	/// Stringly-typed equality against the canonical form of the value.
	Eq {
		field: String,
		value: String,
	},
	IdEq(i64),
	IdIn(Vec<i64>),
	/// The related object's id equals `id`.
	RelEq {
		rel: String,
		id: i64,
	},
	/// The related set contains any of `ids`.
	RelIn {
		rel: String,
		ids: Vec<i64>,
	},
	Prefix {
		field: String,
		token: String,
	},
	WordPrefix {
		field: String,
		token: String,
	},
	All(Vec<Predicate>),
	Any(Vec<Predicate>),
}

/// Arguments to a paged fetch.
#[derive(Clone, Debug, Default)]
pub struct FetchOpts {
	pub limit: Option<u64>,
	pub offset: Option<u64>,
	pub sort: Vec<SortKey>,
	pub cond: Option<Predicate>,
}

#[async_trait]
pub trait Datastore: Send + Sync + 'static {
	/// Opens a transaction; reads see committed state plus this
	/// transaction's own staged writes.
	async fn transaction(&self) -> Result<Arc<dyn Transaction>, StoreError>;
}

#[async_trait]
pub trait Transaction: Send + Sync {
	async fn get_objects(&self, entity: &str, opts: &FetchOpts) -> Result<Vec<Record>, StoreError>;

	async fn get_objects_count(
		&self,
		entity: &str,
		cond: Option<&Predicate>,
	) -> Result<u64, StoreError>;

	async fn get_object_with_id(&self, entity: &str, id: i64)
	-> Result<Option<Record>, StoreError>;

	/// Single-match lookup; the first object satisfying `cond` in id order.
	async fn get_object_with_filter(
		&self,
		entity: &str,
		cond: &Predicate,
	) -> Result<Option<Record>, StoreError>;

	/// Instantiates a new object with the given attribute values. The object
	/// has an id immediately but stays pending until [`Transaction::save`].
	async fn create(
		&self,
		entity: &str,
		values: BTreeMap<String, Value>,
	) -> Result<Record, StoreError>;

	/// Merges attribute values into an existing object; fails with
	/// [`StoreError::MissingObject`] when the id does not exist.
	async fn set_attributes(
		&self,
		entity: &str,
		id: i64,
		values: BTreeMap<String, Value>,
	) -> Result<(), StoreError>;

	async fn get_related_one(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
	) -> Result<Option<Record>, StoreError>;

	async fn get_related_many(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
	) -> Result<Vec<Record>, StoreError>;

	async fn add_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		targets: &[i64],
	) -> Result<(), StoreError>;

	async fn remove_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		targets: &[i64],
	) -> Result<(), StoreError>;

	/// Sets a to-one link; `None` clears it.
	async fn set_related(
		&self,
		entity: &str,
		id: i64,
		rel: &str,
		target: Option<i64>,
	) -> Result<(), StoreError>;

	/// Marks an object deleted and drops every link referencing it.
	async fn delete_object(&self, entity: &str, id: i64) -> Result<(), StoreError>;

	/// Commits all staged writes.
	async fn save(&self) -> Result<(), StoreError>;
}
