//! Translation of generic filter/sort arguments into store predicates.

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::{Name, Value as GqlValue};

use crate::model::Entity;
use crate::store::{Predicate, SortKey};

use super::error::{resolver_error, GqlError};
use super::utils::{as_i64, as_string};

/// Builds the store predicate for one `filter` argument, or `None` when the
/// argument is absent.
///
/// Structured constraints (attribute equality, relationship ids) are ANDed
/// together; the free-text `q` is split into whitespace tokens, each token
/// becoming an OR-group of prefix / word-prefix matches over every
/// string/text attribute, and the per-token groups ANDed with the rest.
pub(crate) fn where_from_args(
	entity: &Entity,
	args: Option<&IndexMap<Name, GqlValue>>,
) -> Result<Option<Predicate>, GqlError> {
	let Some(args) = args else {
		return Ok(None);
	};

	let mut parts: Vec<Predicate> = Vec::new();

	for attr in &entity.attributes {
		let Some(val) = args.get(attr.name.as_str()) else {
			continue;
		};
		if matches!(val, GqlValue::Null) {
			continue;
		}
		let value = as_string(val)
			.ok_or_else(|| resolver_error(format!("filter field `{}` must be a string", attr.name)))?;
		parts.push(Predicate::Eq {
			field: attr.name.clone(),
			value,
		});
	}

	for rel in &entity.relationships {
		let field = rel.id_field();
		let Some(val) = args.get(field.as_str()) else {
			continue;
		};
		match val {
			GqlValue::Null => {}
			GqlValue::Number(_) => parts.push(Predicate::RelEq {
				rel: rel.name.clone(),
				id: as_i64(val)
					.ok_or_else(|| resolver_error(format!("filter field `{field}` must be an integer")))?,
			}),
			GqlValue::List(list) => {
				let ids = list
					.iter()
					.map(as_i64)
					.collect::<Option<Vec<i64>>>()
					.ok_or_else(|| {
						resolver_error(format!("filter field `{field}` must be a list of integers"))
					})?;
				parts.push(Predicate::RelIn {
					rel: rel.name.clone(),
					ids,
				});
			}
			_ => {
				return Err(resolver_error(format!(
					"filter field `{field}` must be an id or list of ids"
				)));
			}
		}
	}

	if let Some(q) = args.get("q").and_then(as_string) {
		// empty tokens from runs of whitespace are skipped
		for token in q.split_whitespace() {
			let token = token.to_lowercase();
			let group = entity
				.attributes
				.iter()
				.filter(|a| a.is_searchable())
				.flat_map(|a| {
					[
						Predicate::Prefix {
							field: a.name.clone(),
							token: token.clone(),
						},
						Predicate::WordPrefix {
							field: a.name.clone(),
							token: token.clone(),
						},
					]
				})
				.collect();
			parts.push(Predicate::Any(group));
		}
	}

	Ok(match parts.len() {
		0 => None,
		1 => parts.pop(),
		_ => Some(Predicate::All(parts)),
	})
}

/// Decodes a list of sort-enum values into store sort keys.
///
/// Member names are the upper-cased attribute names with a `_DESC` suffix for
/// descending order; an unrecognized name passes through lower-cased so the
/// store reports it as an unknown sort field.
pub(crate) fn sort_from_args(
	entity: &Entity,
	values: Option<&Vec<GqlValue>>,
) -> Result<Vec<SortKey>, GqlError> {
	let Some(values) = values else {
		return Ok(vec![SortKey::asc("id")]);
	};
	let mut keys = Vec::with_capacity(values.len());
	for val in values {
		let token = match val {
			GqlValue::Enum(n) => n.as_str().to_owned(),
			GqlValue::String(s) => s.clone(),
			v => return Err(resolver_error(format!("invalid sort value: {v}"))),
		};
		let (base, desc) = match token.strip_suffix("_DESC") {
			Some(base) => (base, true),
			None => (token.as_str(), false),
		};
		let field = if base == "ID" {
			"id".to_owned()
		} else {
			entity
				.attributes
				.iter()
				.find(|a| a.name.to_uppercase() == base)
				.map(|a| a.name.clone())
				.unwrap_or_else(|| base.to_lowercase())
		};
		keys.push(SortKey {
			field,
			desc,
		});
	}
	if keys.is_empty() {
		keys.push(SortKey::asc("id"));
	}
	Ok(keys)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{Attribute, Relationship};

	fn entity() -> Entity {
		Entity::new("Person")
			.attribute(Attribute::new("firstname", "string"))
			.attribute(Attribute::new("age", "int"))
			.relationship(Relationship::to_one("company", "Company"))
	}

	fn args(pairs: Vec<(&str, GqlValue)>) -> IndexMap<Name, GqlValue> {
		pairs.into_iter().map(|(k, v)| (Name::new(k), v)).collect()
	}

	#[test]
	fn absent_filter_is_none() {
		assert_eq!(where_from_args(&entity(), None).unwrap(), None);
	}

	#[test]
	fn attribute_equality_and_relationship_id() {
		let args = args(vec![
			("firstname", GqlValue::String("jane".into())),
			("company_id", GqlValue::Number(3.into())),
		]);
		let cond = where_from_args(&entity(), Some(&args)).unwrap().unwrap();
		assert_eq!(
			cond,
			Predicate::All(vec![
				Predicate::Eq {
					field: "firstname".into(),
					value: "jane".into()
				},
				Predicate::RelEq {
					rel: "company".into(),
					id: 3
				},
			])
		);
	}

	#[test]
	fn free_text_builds_or_groups_over_searchable_attributes() {
		let args = args(vec![("q", GqlValue::String("two  words".into()))]);
		let cond = where_from_args(&entity(), Some(&args)).unwrap().unwrap();
		// only `firstname` is searchable; `age` is not string/text
		let Predicate::All(groups) = cond else {
			panic!("expected All of per-token groups");
		};
		assert_eq!(groups.len(), 2);
		assert_eq!(
			groups[0],
			Predicate::Any(vec![
				Predicate::Prefix {
					field: "firstname".into(),
					token: "two".into()
				},
				Predicate::WordPrefix {
					field: "firstname".into(),
					token: "two".into()
				},
			])
		);
	}

	#[test]
	fn sort_tokens_decode() {
		let values = vec![
			GqlValue::Enum(Name::new("FIRSTNAME_DESC")),
			GqlValue::Enum(Name::new("ID")),
		];
		let keys = sort_from_args(&entity(), Some(&values)).unwrap();
		assert_eq!(keys, vec![SortKey::desc("firstname"), SortKey::asc("id")]);
	}

	#[test]
	fn sort_defaults_to_id_ascending() {
		assert_eq!(sort_from_args(&entity(), None).unwrap(), vec![SortKey::asc("id")]);
	}
}
