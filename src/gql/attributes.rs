//! Attribute mapping: semantic type tokens to GraphQL types, and value
//! conversion in both directions at the resolver boundary.

use async_graphql::dynamic::{Enum, Type, TypeRef};
use async_graphql::{Name, Value as GqlValue};
use chrono::{DateTime, Utc};
use serde_json::Number;
use uuid::Uuid;

use crate::model::{Attribute, Entity};
use crate::val::Value;

use super::cache::TypeCache;
use super::error::{internal_error, resolver_error, type_error, GqlError};
use super::utils::{as_i64, as_string};

/// Name of the custom scalar dates are carried as (ISO-8601 strings).
pub const DATE_SCALAR: &str = "Date";

pub(crate) fn enum_member(value: &str) -> String {
	value.to_uppercase()
}

fn attr_cache_key(entity: &Entity, attr: &Attribute) -> String {
	format!("{}_attr_{}", entity.name, attr.name)
}

/// Resolves an attribute to its scalar or enum type via the fixed table.
///
/// Enum attributes synthesize a fresh enum type on first request; the type
/// cache guarantees later requests for the same attribute return the already
/// registered descriptor, since the schema forbids redefining a name.
pub(crate) fn attr_type(
	entity: &Entity,
	attr: &Attribute,
	cache: &mut TypeCache,
) -> Result<TypeRef, GqlError> {
	let ty = base_attr_type(entity, attr, cache)?;
	Ok(if attr.required {
		TypeRef::NonNull(Box::new(ty))
	} else {
		ty
	})
}

/// Like [`attr_type`] but always nullable, for the update-input shape where
/// every field is optional.
pub(crate) fn optional_attr_type(
	entity: &Entity,
	attr: &Attribute,
	cache: &mut TypeCache,
) -> Result<TypeRef, GqlError> {
	base_attr_type(entity, attr, cache)
}

fn base_attr_type(
	entity: &Entity,
	attr: &Attribute,
	cache: &mut TypeCache,
) -> Result<TypeRef, GqlError> {
	let ty = match attr.kind.as_str() {
		"string" | "text" => TypeRef::named(TypeRef::STRING),
		"int" | "integer" => TypeRef::named(TypeRef::INT),
		"float" | "decimal" => TypeRef::named(TypeRef::FLOAT),
		"bool" | "boolean" => TypeRef::named(TypeRef::BOOLEAN),
		"date" => TypeRef::named(DATE_SCALAR),
		"uuid" => TypeRef::named(TypeRef::ID),
		"enum" => {
			let key = attr_cache_key(entity, attr);
			match cache.get(&key) {
				Some(ty) => ty,
				None => {
					let mut tmp = Enum::new(format!("_enum_{}_{}", entity.name, attr.name));
					for value in &attr.values {
						tmp = tmp.item(enum_member(value));
					}
					cache.register(key, Type::Enum(tmp))?
				}
			}
		}
		kind => {
			return Err(GqlError::UnknownAttributeType {
				entity: entity.name.clone(),
				attribute: attr.name.clone(),
				kind: kind.to_owned(),
			});
		}
	};
	Ok(ty)
}

/// Converts a GraphQL input value into the store representation for one
/// attribute. Enum members map back to their original declared string.
pub(crate) fn gql_to_store_value(val: &GqlValue, attr: &Attribute) -> Result<Value, GqlError> {
	if matches!(val, GqlValue::Null) {
		return Ok(Value::Null);
	}
	let out = match attr.kind.as_str() {
		"string" | "text" => Value::String(as_string(val).ok_or(type_error(&attr.kind, val))?),
		"int" | "integer" => Value::Int(as_i64(val).ok_or(type_error(&attr.kind, val))?),
		"float" | "decimal" => match val {
			GqlValue::Number(n) => {
				if let Some(f) = n.as_f64() {
					Value::Float(f)
				} else {
					return Err(type_error(&attr.kind, val));
				}
			}
			_ => return Err(type_error(&attr.kind, val)),
		},
		"bool" | "boolean" => match val {
			GqlValue::Boolean(b) => Value::Bool(*b),
			_ => return Err(type_error(&attr.kind, val)),
		},
		"date" => match val {
			GqlValue::String(s) => match DateTime::parse_from_rfc3339(s) {
				Ok(d) => Value::Datetime(d.with_timezone(&Utc)),
				Err(_) => return Err(type_error(&attr.kind, val)),
			},
			_ => return Err(type_error(&attr.kind, val)),
		},
		"uuid" => match val {
			GqlValue::String(s) => match s.parse::<Uuid>() {
				Ok(u) => Value::Uuid(u),
				Err(_) => return Err(type_error(&attr.kind, val)),
			},
			_ => return Err(type_error(&attr.kind, val)),
		},
		"enum" => {
			let token = match val {
				GqlValue::Enum(n) => n.as_str().to_owned(),
				GqlValue::String(s) => s.clone(),
				_ => return Err(type_error(&attr.kind, val)),
			};
			let original = attr
				.values
				.iter()
				.find(|v| enum_member(v) == token)
				.ok_or(type_error(&attr.kind, val))?;
			Value::String(original.clone())
		}
		kind => {
			// build-time mapping already rejected unknown kinds
			return Err(internal_error(format!(
				"unmapped attribute kind `{kind}` reached a resolver"
			)));
		}
	};
	Ok(out)
}

/// Converts a stored value into its GraphQL form for one attribute.
pub(crate) fn store_value_to_gql_value(value: Value, attr: &Attribute) -> Result<GqlValue, GqlError> {
	let out = match value {
		Value::Null => GqlValue::Null,
		Value::Bool(b) => GqlValue::Boolean(b),
		Value::Int(i) => GqlValue::Number(i.into()),
		Value::Float(f) => GqlValue::Number(
			Number::from_f64(f).ok_or(resolver_error("non-finite float (not supported in json)"))?,
		),
		Value::String(s) => {
			if attr.kind == "enum" {
				GqlValue::Enum(Name::new(enum_member(&s)))
			} else {
				GqlValue::String(s)
			}
		}
		Value::Datetime(d) => GqlValue::String(d.to_rfc3339()),
		Value::Uuid(u) => GqlValue::String(u.to_string()),
	};
	Ok(out)
}
