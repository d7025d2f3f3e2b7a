//! Per-entity type and query synthesis: the generated object type, the
//! filter/sort/page companion types, and the list / single-item queries.

use std::sync::Arc;

use async_graphql::dynamic::{
	Enum, Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Type,
	TypeRef,
};
use async_graphql::Value as GqlValue;
use tracing::trace;

use crate::model::{Attribute, Entity, Model, Relationship};
use crate::store::{Datastore, FetchOpts, Predicate};

use super::attributes::{attr_type, enum_member, store_value_to_gql_value};
use super::cache::TypeCache;
use super::error::{internal_error, resolver_error, GqlError};
use super::filter::{sort_from_args, where_from_args};
use super::utils::{
	as_i64, as_list, as_object, field_val_erase_owned, ErasedPage, ErasedRecord, GQLTx,
};

pub(crate) fn filter_type_name(entity: &str) -> String {
	format!("_filter_{entity}")
}

pub(crate) fn sort_type_name(entity: &str) -> String {
	format!("_sort_{entity}")
}

pub(crate) fn page_type_name(entity: &str) -> String {
	format!("_page_{entity}")
}

macro_rules! limit_input {
	() => {
		InputValue::new("limit", TypeRef::named(TypeRef::INT))
	};
}

macro_rules! offset_input {
	() => {
		InputValue::new("offset", TypeRef::named(TypeRef::INT))
	};
}

/// Adds the list and single-item queries for every entity to the root query
/// object, registering all generated companion types through the cache.
pub(crate) fn process_entities(
	model: &Arc<Model>,
	store: &Arc<dyn Datastore>,
	mut query: Object,
	cache: &mut TypeCache,
) -> Result<Object, GqlError> {
	for entity in model.entities.values() {
		trace!("adding entity: {}", entity.name);
		ensure_object_type(model, entity, cache)?;
		register_filter_type(entity, cache)?;
		register_sort_type(entity, cache)?;
		register_page_type(entity, cache)?;

		query = query
			.field(list_query_field(entity, store))
			.field(single_query_field(entity, store));
	}
	Ok(query)
}

/// Registers the object type for `entity` (and, transitively, every entity
/// reachable through its relationships). The cache key is declared before
/// the fields are built, so a relationship cycle finds the in-progress type
/// under its name instead of recursing forever.
pub(crate) fn ensure_object_type(
	model: &Arc<Model>,
	entity: &Entity,
	cache: &mut TypeCache,
) -> Result<TypeRef, GqlError> {
	let key = format!("{}_obj", entity.name);
	if let Some(ty) = cache.get(&key) {
		return Ok(ty);
	}
	let ty_ref = cache.declare(key, &entity.name)?;

	let mut obj = Object::new(&entity.name).field(Field::new(
		"id",
		TypeRef::named_nn(TypeRef::INT),
		|ctx| {
			FieldFuture::new(async move {
				let (_, record) = parent_record(&ctx)?;
				Ok(Some(FieldValue::value(GqlValue::Number(record.id.into()))))
			})
		},
	));

	for attr in &entity.attributes {
		let ty = attr_type(entity, attr, cache)?;
		obj = obj.field(Field::new(&attr.name, ty, make_attr_resolver(attr.clone())));
	}

	for rel in &entity.relationships {
		let obj_ty = if rel.to_many {
			TypeRef::named_nn_list_nn(&rel.destination)
		} else {
			TypeRef::named(&rel.destination)
		};
		let id_ty = if rel.to_many {
			TypeRef::named_nn_list_nn(TypeRef::INT)
		} else {
			TypeRef::named(TypeRef::INT)
		};
		obj = obj
			.field(Field::new(&rel.name, obj_ty, make_rel_resolver(rel.clone(), false)))
			.field(Field::new(rel.id_field(), id_ty, make_rel_resolver(rel.clone(), true)));
	}

	cache.define(Type::Object(obj))?;

	for rel in &entity.relationships {
		let dest = model
			.get(&rel.destination)
			.ok_or_else(|| internal_error(format!("unvalidated destination `{}`", rel.destination)))?;
		ensure_object_type(model, dest, cache)?;
	}

	Ok(ty_ref)
}

fn register_filter_type(entity: &Entity, cache: &mut TypeCache) -> Result<(), GqlError> {
	let mut filter = InputObject::new(filter_type_name(&entity.name))
		.description(format!(
			"Generated from `{}`; attribute equality, relationship ids and free-text `q`",
			entity.name
		))
		.field(InputValue::new("q", TypeRef::named(TypeRef::STRING)));
	for attr in &entity.attributes {
		filter = filter.field(InputValue::new(&attr.name, TypeRef::named(TypeRef::STRING)));
	}
	for rel in &entity.relationships {
		let ty = if rel.to_many {
			TypeRef::named_nn_list(TypeRef::INT)
		} else {
			TypeRef::named(TypeRef::INT)
		};
		filter = filter.field(InputValue::new(rel.id_field(), ty));
	}
	cache.register(format!("{}_filter", entity.name), Type::InputObject(filter))?;
	Ok(())
}

fn register_sort_type(entity: &Entity, cache: &mut TypeCache) -> Result<(), GqlError> {
	let mut sort = Enum::new(sort_type_name(&entity.name))
		.description(format!("Generated from `{}`; the fields a query can be sorted by", entity.name))
		.item("ID")
		.item("ID_DESC");
	for attr in &entity.attributes {
		let member = enum_member(&attr.name);
		sort = sort.item(member.clone()).item(format!("{member}_DESC"));
	}
	cache.register(format!("{}_sort", entity.name), Type::Enum(sort))?;
	Ok(())
}

fn register_page_type(entity: &Entity, cache: &mut TypeCache) -> Result<(), GqlError> {
	let page = Object::new(page_type_name(&entity.name))
		.field(Field::new(
			"items",
			TypeRef::named_nn_list_nn(&entity.name),
			|ctx| {
				FieldFuture::new(async move {
					let (gtx, entity, opts) = parent_page(&ctx)?;
					let records = gtx.inner().get_objects(entity, opts).await?;
					let list: Vec<FieldValue> = records
						.into_iter()
						.map(|r| field_val_erase_owned((gtx.clone(), r)))
						.collect();
					Ok(Some(FieldValue::list(list)))
				})
			},
		))
		.field(Field::new("count", TypeRef::named_nn(TypeRef::INT), |ctx| {
			FieldFuture::new(async move {
				let (gtx, entity, opts) = parent_page(&ctx)?;
				let count = gtx.inner().get_objects_count(entity, opts.cond.as_ref()).await?;
				Ok(Some(FieldValue::value(GqlValue::Number(count.into()))))
			})
		}));
	cache.register(format!("{}_page", entity.name), Type::Object(page))?;
	Ok(())
}

fn list_query_field(entity: &Entity, store: &Arc<dyn Datastore>) -> Field {
	let ent = entity.clone();
	let store = store.clone();
	Field::new(
		format!("get{}", entity.plural_name()),
		TypeRef::named_nn(page_type_name(&entity.name)),
		move |ctx| {
			let ent = ent.clone();
			let store = store.clone();
			FieldFuture::new(async move {
				let gtx = GQLTx::new(&store).await?;

				let args = ctx.args.as_index_map();
				trace!("received list request with args: {args:?}");

				let offset = args.get("offset").and_then(as_i64).unwrap_or(0);
				let limit = args.get("limit").and_then(as_i64).unwrap_or(10);
				if offset < 0 || limit < 0 {
					return Err(resolver_error("offset and limit must not be negative").into());
				}
				let sort = sort_from_args(&ent, args.get("sort").and_then(as_list))?;
				let cond = where_from_args(&ent, args.get("filter").and_then(as_object))?;

				let opts = FetchOpts {
					limit: Some(limit as u64),
					offset: Some(offset as u64),
					sort,
					cond,
				};
				trace!("parsed fetch opts: {opts:?}");

				let page: ErasedPage = (gtx, ent.name.clone(), opts);
				Ok(Some(FieldValue::owned_any(page)))
			})
		},
	)
	.description(format!(
		"Generated from `{}`; fetches a filtered, sorted page of objects with its total count",
		entity.name
	))
	.argument(offset_input!())
	.argument(limit_input!())
	.argument(InputValue::new("sort", TypeRef::named_nn_list(sort_type_name(&entity.name))))
	.argument(InputValue::new("filter", TypeRef::named(filter_type_name(&entity.name))))
}

fn single_query_field(entity: &Entity, store: &Arc<dyn Datastore>) -> Field {
	let ent = entity.clone();
	let store = store.clone();
	Field::new(format!("get{}", entity.name), TypeRef::named(&entity.name), move |ctx| {
		let ent = ent.clone();
		let store = store.clone();
		FieldFuture::new(async move {
			let gtx = GQLTx::new(&store).await?;

			let args = ctx.args.as_index_map();
			if let Some(id) = args.get("id").and_then(as_i64) {
				return match gtx.inner().get_object_with_id(&ent.name, id).await? {
					Some(record) => Ok(Some(field_val_erase_owned((gtx, record)))),
					None => Ok(None),
				};
			}
			if let Some(filter) = args.get("filter").and_then(as_object) {
				let cond = where_from_args(&ent, Some(filter))?
					.unwrap_or(Predicate::All(Vec::new()));
				return match gtx.inner().get_object_with_filter(&ent.name, &cond).await? {
					Some(record) => Ok(Some(field_val_erase_owned((gtx, record)))),
					None => Ok(None),
				};
			}
			Err(resolver_error(format!("get{} requires `id` or `filter`", ent.name)).into())
		})
	})
	.description(format!(
		"Generated from `{}`; fetches a single object by id or by filter",
		entity.name
	))
	.argument(InputValue::new("id", TypeRef::named(TypeRef::INT)))
	.argument(InputValue::new("filter", TypeRef::named(filter_type_name(&entity.name))))
}

fn parent_record<'a>(
	ctx: &'a ResolverContext<'_>,
) -> Result<&'a ErasedRecord, async_graphql::Error> {
	ctx.parent_value
		.downcast_ref::<ErasedRecord>()
		.ok_or_else(|| internal_error("failed to downcast parent record").into())
}

fn parent_page<'a>(
	ctx: &'a ResolverContext<'_>,
) -> Result<&'a ErasedPage, async_graphql::Error> {
	ctx.parent_value
		.downcast_ref::<ErasedPage>()
		.ok_or_else(|| internal_error("failed to downcast parent page").into())
}

fn make_attr_resolver(
	attr: Attribute,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let attr = attr.clone();
		FieldFuture::new(async move {
			let (_, record) = parent_record(&ctx)?;
			let val = record.value(&attr.name);
			if val.is_null() {
				return Ok(None);
			}
			Ok(Some(FieldValue::value(store_value_to_gql_value(val, &attr)?)))
		})
	}
}

/// Resolver for both shapes of a relationship field: the object traversal
/// and, with `id_only`, the foreign-key projection.
fn make_rel_resolver(
	rel: Relationship,
	id_only: bool,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let rel = rel.clone();
		FieldFuture::new(async move {
			let (gtx, record) = parent_record(&ctx)?;

			if rel.to_many {
				let related =
					gtx.inner().get_related_many(&record.entity, record.id, &rel.name).await?;
				if id_only {
					let ids = related.into_iter().map(|r| GqlValue::Number(r.id.into())).collect();
					return Ok(Some(FieldValue::value(GqlValue::List(ids))));
				}
				let list: Vec<FieldValue> = related
					.into_iter()
					.map(|r| field_val_erase_owned((gtx.clone(), r)))
					.collect();
				return Ok(Some(FieldValue::list(list)));
			}

			match gtx.inner().get_related_one(&record.entity, record.id, &rel.name).await? {
				Some(related) => {
					if id_only {
						Ok(Some(FieldValue::value(GqlValue::Number(related.id.into()))))
					} else {
						Ok(Some(field_val_erase_owned((gtx.clone(), related))))
					}
				}
				None => Ok(None),
			}
		})
	}
}
