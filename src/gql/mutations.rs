//! Per-entity mutation synthesis: create, update and delete fields plus the
//! relationship-write procedure they share.
//!
//! Each mutation runs its steps strictly in order against one transaction:
//! base write, then relationship writes, then commit. A failed base write
//! aborts before any relationship write; a failed relationship write does
//! not roll back the base object (fail-fast, the store decides atomicity).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{Field, FieldFuture, InputObject, InputValue, Object, Type, TypeRef};
use async_graphql::{Name, Value as GqlValue};
use tracing::trace;

use crate::model::{Entity, Model, Relationship};
use crate::store::{Datastore, FetchOpts, Predicate, Record};
use crate::val::Value;

use super::attributes::{attr_type, gql_to_store_value, optional_attr_type};
use super::cache::TypeCache;
use super::error::{internal_error, not_found, resolver_error, GqlError};
use super::utils::{as_i64, as_object, field_val_erase_owned, GQLTx};

pub(crate) fn create_input_name(entity: &str) -> String {
	format!("_create_{entity}")
}

pub(crate) fn update_input_name(entity: &str) -> String {
	format!("_update_{entity}")
}

macro_rules! id_input {
	() => {
		InputValue::new("id", TypeRef::named_nn(TypeRef::INT))
	};
}

/// Adds create/update/delete fields for every entity to the root mutation
/// object, registering the input types through the cache.
pub(crate) fn process_mutations(
	model: &Arc<Model>,
	store: &Arc<dyn Datastore>,
	mut mutation: Object,
	cache: &mut TypeCache,
) -> Result<Object, GqlError> {
	for entity in model.entities.values() {
		register_input_types(entity, cache)?;
		mutation = mutation
			.field(create_field(entity, store))
			.field(update_field(entity, store))
			.field(delete_field(entity, store));
	}
	Ok(mutation)
}

fn register_input_types(entity: &Entity, cache: &mut TypeCache) -> Result<(), GqlError> {
	let mut create = InputObject::new(create_input_name(&entity.name));
	let mut update = InputObject::new(update_input_name(&entity.name));
	for attr in &entity.attributes {
		create = create.field(InputValue::new(&attr.name, attr_type(entity, attr, cache)?));
		update = update.field(InputValue::new(&attr.name, optional_attr_type(entity, attr, cache)?));
	}
	for rel in &entity.relationships {
		// writable link, plain and optional in both shapes
		let ty = if rel.to_many {
			TypeRef::named_nn_list(TypeRef::INT)
		} else {
			TypeRef::named(TypeRef::INT)
		};
		create = create.field(InputValue::new(rel.id_field(), ty.clone()));
		update = update.field(InputValue::new(rel.id_field(), ty));
	}
	cache.register(format!("{}_create", entity.name), Type::InputObject(create))?;
	cache.register(format!("{}_update", entity.name), Type::InputObject(update))?;
	Ok(())
}

/// Splits a mutation input into converted attribute values and pending
/// relationship writes, keyed by the `{name}_id` convention.
fn split_input(
	entity: &Entity,
	input: &IndexMap<Name, GqlValue>,
) -> Result<(BTreeMap<String, Value>, Vec<(Relationship, GqlValue)>), GqlError> {
	let mut values = BTreeMap::new();
	for attr in &entity.attributes {
		if let Some(val) = input.get(attr.name.as_str()) {
			if attr.required && matches!(val, GqlValue::Null) {
				return Err(resolver_error(format!(
					"required attribute `{}` cannot be set to null",
					attr.name
				)));
			}
			values.insert(attr.name.clone(), gql_to_store_value(val, attr)?);
		}
	}
	let mut writes = Vec::new();
	for rel in &entity.relationships {
		if let Some(val) = input.get(rel.id_field().as_str()) {
			writes.push((rel.clone(), val.clone()));
		}
	}
	Ok((values, writes))
}

/// The relationship-write procedure.
///
/// To-many is a full replace: every currently linked member is removed
/// before any new member is added, then the new id list is resolved through
/// a filtered fetch and linked (unknown ids drop out of the fetch). To-one
/// resolves the single id and fails with `NotFound` when it does not exist;
/// `null` clears the link.
async fn write_relationship(
	gtx: &GQLTx,
	record: &Record,
	rel: &Relationship,
	val: &GqlValue,
) -> Result<(), GqlError> {
	let tx = gtx.inner();
	if rel.to_many {
		let current = tx.get_related_many(&record.entity, record.id, &rel.name).await?;
		let current_ids: Vec<i64> = current.into_iter().map(|r| r.id).collect();
		tx.remove_related(&record.entity, record.id, &rel.name, &current_ids).await?;

		let ids = match val {
			GqlValue::Null => Vec::new(),
			GqlValue::List(list) => list
				.iter()
				.map(as_i64)
				.collect::<Option<Vec<i64>>>()
				.ok_or_else(|| {
					resolver_error(format!("`{}` must be a list of ids", rel.id_field()))
				})?,
			_ => return Err(resolver_error(format!("`{}` must be a list of ids", rel.id_field()))),
		};
		if !ids.is_empty() {
			let resolved = tx
				.get_objects(
					&rel.destination,
					&FetchOpts {
						cond: Some(Predicate::IdIn(ids)),
						..Default::default()
					},
				)
				.await?;
			let resolved_ids: Vec<i64> = resolved.into_iter().map(|r| r.id).collect();
			tx.add_related(&record.entity, record.id, &rel.name, &resolved_ids).await?;
		}
		return Ok(());
	}

	match val {
		GqlValue::Null => tx.set_related(&record.entity, record.id, &rel.name, None).await?,
		GqlValue::Number(_) => {
			let id = as_i64(val)
				.ok_or_else(|| resolver_error(format!("`{}` must be an id", rel.id_field())))?;
			let target = tx
				.get_object_with_id(&rel.destination, id)
				.await?
				.ok_or_else(|| not_found(&rel.destination, id))?;
			tx.set_related(&record.entity, record.id, &rel.name, Some(target.id)).await?;
		}
		_ => return Err(resolver_error(format!("`{}` must be an id", rel.id_field()))),
	}
	Ok(())
}

fn create_field(entity: &Entity, store: &Arc<dyn Datastore>) -> Field {
	let ent = entity.clone();
	let store = store.clone();
	Field::new(
		format!("create{}", entity.name),
		TypeRef::named_nn(&entity.name),
		move |ctx| {
			let ent = ent.clone();
			let store = store.clone();
			FieldFuture::new(async move {
				let gtx = GQLTx::new(&store).await?;

				let args = ctx.args.as_index_map();
				let input = args
					.get("input")
					.and_then(as_object)
					.ok_or_else(|| internal_error("schema validation failed: no input"))?;
				trace!("creating `{}` from input: {input:?}", ent.name);

				let (values, writes) = split_input(&ent, input)?;
				let record = gtx.inner().create(&ent.name, values).await?;
				for (rel, val) in &writes {
					write_relationship(&gtx, &record, rel, val).await?;
				}
				gtx.inner().save().await?;

				Ok(Some(field_val_erase_owned((gtx, record))))
			})
		},
	)
	.description(format!("Creates a `{}` and links its relationships", entity.name))
	.argument(InputValue::new("input", TypeRef::named_nn(create_input_name(&entity.name))))
}

fn update_field(entity: &Entity, store: &Arc<dyn Datastore>) -> Field {
	let ent = entity.clone();
	let store = store.clone();
	Field::new(
		format!("update{}", entity.name),
		TypeRef::named_nn(&entity.name),
		move |ctx| {
			let ent = ent.clone();
			let store = store.clone();
			FieldFuture::new(async move {
				let gtx = GQLTx::new(&store).await?;

				let args = ctx.args.as_index_map();
				let id = args
					.get("id")
					.and_then(as_i64)
					.ok_or_else(|| internal_error("schema validation failed: no id"))?;
				let input = args
					.get("input")
					.and_then(as_object)
					.ok_or_else(|| internal_error("schema validation failed: no input"))?;

				let record = gtx
					.inner()
					.get_object_with_id(&ent.name, id)
					.await?
					.ok_or_else(|| not_found(&ent.name, id))?;

				let (values, writes) = split_input(&ent, input)?;
				if !values.is_empty() {
					gtx.inner().set_attributes(&ent.name, id, values).await?;
				}
				for (rel, val) in &writes {
					write_relationship(&gtx, &record, rel, val).await?;
				}
				gtx.inner().save().await?;

				let updated = gtx
					.inner()
					.get_object_with_id(&ent.name, id)
					.await?
					.ok_or_else(|| internal_error("updated object vanished"))?;
				Ok(Some(field_val_erase_owned((gtx, updated))))
			})
		},
	)
	.description(format!("Updates a `{}` by id; absent input fields keep their value", entity.name))
	.argument(id_input!())
	.argument(InputValue::new("input", TypeRef::named_nn(update_input_name(&entity.name))))
}

fn delete_field(entity: &Entity, store: &Arc<dyn Datastore>) -> Field {
	let ent = entity.clone();
	let store = store.clone();
	Field::new(
		format!("delete{}", entity.name),
		TypeRef::named_nn(&entity.name),
		move |ctx| {
			let ent = ent.clone();
			let store = store.clone();
			FieldFuture::new(async move {
				let gtx = GQLTx::new(&store).await?;

				let args = ctx.args.as_index_map();
				let id = args
					.get("id")
					.and_then(as_i64)
					.ok_or_else(|| internal_error("schema validation failed: no id"))?;

				let record = gtx
					.inner()
					.get_object_with_id(&ent.name, id)
					.await?
					.ok_or_else(|| not_found(&ent.name, id))?;

				gtx.inner().delete_object(&ent.name, id).await?;
				gtx.inner().save().await?;

				// the pre-delete snapshot, handed back for confirmation
				Ok(Some(field_val_erase_owned((gtx, record))))
			})
		},
	)
	.description(format!("Deletes a `{}` by id and returns its last state", entity.name))
	.argument(id_input!())
}
