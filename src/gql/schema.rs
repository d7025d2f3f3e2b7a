//! Schema assembly: wires every per-entity query and mutation field into one
//! executable schema object.

use std::sync::Arc;

use async_graphql::dynamic::{Object, Scalar, Schema, Type};
use tracing::trace;

use crate::model::Model;
use crate::store::Datastore;

use super::attributes::DATE_SCALAR;
use super::cache::TypeCache;
use super::entities::process_entities;
use super::error::{schema_error, GqlError};
use super::mutations::process_mutations;

/// Generates the full query/mutation schema for a model.
///
/// Build failures (unknown attribute types, duplicate generated type names)
/// are fatal and should abort startup; the returned schema is handed to the
/// executor together with the store the resolvers were bound to.
pub fn generate_schema(
	store: &Arc<dyn Datastore>,
	model: &Arc<Model>,
) -> Result<Schema, GqlError> {
	model.validate()?;
	if model.entities.is_empty() {
		return Err(schema_error("no entities found in model"));
	}

	trace!(entities = model.entities.len(), "generating schema");

	let mut cache = TypeCache::new();
	let query = process_entities(model, store, Object::new("Query"), &mut cache)?;
	let mutation = process_mutations(model, store, Object::new("Mutation"), &mut cache)?;

	let mut schema =
		Schema::build("Query", Some("Mutation"), None).register(query).register(mutation);
	for ty in cache.into_types() {
		trace!("adding type: {ty:?}");
		schema = schema.register(ty);
	}
	schema = schema
		.register(Type::Scalar(Scalar::new(DATE_SCALAR).description("ISO-8601 encoded datetime")));

	schema
		.finish()
		.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}
