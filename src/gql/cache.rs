use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic::{Schema, Type, TypeRef};
use tokio::sync::RwLock;

use crate::model::Model;
use crate::store::Datastore;

use super::error::{internal_error, schema_error, GqlError};
use super::schema::generate_schema;

/// Registry of generated type definitions for one schema build.
///
/// Constructed at the build entry point and threaded through every builder.
/// Each cache key maps to a registered type name, so re-requesting a key
/// yields the same named descriptor. A key may be declared before its
/// definition is filled in, which lets a cyclic entity graph (Company
/// referencing Person referencing Company) terminate: the in-progress type
/// is already present under its name when the recursion comes back around.
#[derive(Default)]
pub(crate) struct TypeCache {
	names: BTreeMap<String, String>,
	types: BTreeMap<String, Type>,
}

impl TypeCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<TypeRef> {
		self.names.get(key).map(TypeRef::named)
	}

	/// Reserves `key` under the given type name before the definition
	/// exists. First writer wins; declaring a key twice is a build bug.
	pub fn declare(
		&mut self,
		key: impl Into<String>,
		name: impl Into<String>,
	) -> Result<TypeRef, GqlError> {
		let key = key.into();
		let name = name.into();
		if self.names.contains_key(&key) {
			return Err(internal_error(format!("type cache key `{key}` declared twice")));
		}
		self.names.insert(key, name.clone());
		Ok(TypeRef::named(name))
	}

	/// Completes a declared type. Duplicate definitions are fatal since the
	/// schema representation forbids two types with one name.
	pub fn define(&mut self, ty: Type) -> Result<(), GqlError> {
		let name = type_name(&ty).to_owned();
		if self.types.contains_key(&name) {
			return Err(schema_error(format!("duplicate generated type `{name}`")));
		}
		self.types.insert(name, ty);
		Ok(())
	}

	/// Declare-and-define in one step, for types built without recursion.
	pub fn register(
		&mut self,
		key: impl Into<String>,
		ty: Type,
	) -> Result<TypeRef, GqlError> {
		let ty_ref = self.declare(key, type_name(&ty))?;
		self.define(ty)?;
		Ok(ty_ref)
	}

	pub fn into_types(self) -> Vec<Type> {
		self.types.into_values().collect()
	}
}

fn type_name(ty: &Type) -> &str {
	match ty {
		Type::Scalar(t) => t.type_name(),
		Type::Object(t) => t.type_name(),
		Type::InputObject(t) => t.type_name(),
		Type::Enum(t) => t.type_name(),
		Type::Interface(t) => t.type_name(),
		Type::Union(t) => t.type_name(),
		Type::Subscription(t) => t.type_name(),
		Type::Upload => "Upload",
	}
}

/// Process-wide memoization of the finished schema.
///
/// The model is static after load, so the schema is generated at most once
/// per cache; later calls observe and reuse the existing entry.
pub struct SchemaCache {
	store: Arc<dyn Datastore>,
	model: Arc<Model>,
	inner: RwLock<Option<Schema>>,
}

impl SchemaCache {
	pub fn new(store: Arc<dyn Datastore>, model: Arc<Model>) -> Self {
		SchemaCache {
			store,
			model,
			inner: RwLock::new(None),
		}
	}

	pub async fn get_schema(&self) -> Result<Schema, GqlError> {
		{
			let guard = self.inner.read().await;
			if let Some(schema) = guard.as_ref() {
				return Ok(schema.clone());
			}
		}

		let mut guard = self.inner.write().await;
		if let Some(schema) = guard.as_ref() {
			return Ok(schema.clone());
		}
		let schema = generate_schema(&self.store, &self.model)?;
		*guard = Some(schema.clone());
		Ok(schema)
	}
}
