//! The declarative entity-relationship model a schema is generated from.
//!
//! A [`Model`] is loaded once (programmatically or through serde) and is
//! immutable afterwards; the schema layer shares it as an `Arc<Model>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gql::error::{GqlError, schema_error};

/// Reserved primary-key field present on every generated object type.
pub const ID_FIELD: &str = "id";

/// The full entity-relationship model, keyed by entity name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model {
	pub entities: BTreeMap<String, Entity>,
}

/// A named record type, analogous to a table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
	pub name: String,
	/// Plural form used for generated field names; defaults to `{name}s`.
	#[serde(default)]
	pub plural: Option<String>,
	#[serde(default)]
	pub attributes: Vec<Attribute>,
	#[serde(default)]
	pub relationships: Vec<Relationship>,
}

/// A scalar-valued field on an entity.
///
/// `kind` is a semantic type token (`string`, `text`, `int`, `integer`,
/// `float`, `decimal`, `bool`, `boolean`, `date`, `uuid`, `enum`) resolved
/// against a fixed table at schema-build time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attribute {
	pub name: String,
	pub kind: String,
	#[serde(default)]
	pub required: bool,
	/// Allowed values, ordered; only meaningful for `kind = "enum"`.
	#[serde(default)]
	pub values: Vec<String>,
}

/// A typed link to another entity.
///
/// The destination is referenced by name rather than owned, since the
/// relationship graph between entities is generally cyclic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
	pub name: String,
	#[serde(default)]
	pub to_many: bool,
	pub destination: String,
	/// Name of the mirror relationship on the destination entity, if any.
	/// The store keeps both directions of a link in sync when set.
	#[serde(default)]
	pub inverse: Option<String>,
}

impl Model {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entity(&mut self, entity: Entity) -> &mut Self {
		self.entities.insert(entity.name.clone(), entity);
		self
	}

	pub fn get(&self, name: &str) -> Option<&Entity> {
		self.entities.get(name)
	}

	/// Checks the model invariants; fatal at load time.
	pub fn validate(&self) -> Result<(), GqlError> {
		for entity in self.entities.values() {
			let mut seen = Vec::with_capacity(entity.attributes.len() + entity.relationships.len());
			for attr in &entity.attributes {
				if attr.name == ID_FIELD {
					return Err(schema_error(format!(
						"entity `{}` declares reserved attribute name `id`",
						entity.name
					)));
				}
				if seen.contains(&attr.name.as_str()) {
					return Err(schema_error(format!(
						"entity `{}` declares `{}` more than once",
						entity.name, attr.name
					)));
				}
				seen.push(&attr.name);
				if attr.kind == "enum" && attr.values.is_empty() {
					return Err(schema_error(format!(
						"enum attribute `{}.{}` has no allowed values",
						entity.name, attr.name
					)));
				}
			}
			for rel in &entity.relationships {
				if rel.name == ID_FIELD {
					return Err(schema_error(format!(
						"entity `{}` declares reserved relationship name `id`",
						entity.name
					)));
				}
				if seen.contains(&rel.name.as_str()) {
					return Err(schema_error(format!(
						"entity `{}` declares `{}` more than once",
						entity.name, rel.name
					)));
				}
				seen.push(&rel.name);
				let Some(dest) = self.entities.get(&rel.destination) else {
					return Err(schema_error(format!(
						"relationship `{}.{}` targets unknown entity `{}`",
						entity.name, rel.name, rel.destination
					)));
				};
				if let Some(inv) = &rel.inverse {
					if !dest.relationships.iter().any(|r| &r.name == inv) {
						return Err(schema_error(format!(
							"relationship `{}.{}` declares inverse `{}` missing on `{}`",
							entity.name, rel.name, inv, dest.name
						)));
					}
				}
			}
		}
		Ok(())
	}
}

impl Entity {
	pub fn new(name: impl Into<String>) -> Self {
		Entity {
			name: name.into(),
			plural: None,
			attributes: Vec::new(),
			relationships: Vec::new(),
		}
	}

	pub fn plural(mut self, plural: impl Into<String>) -> Self {
		self.plural = Some(plural.into());
		self
	}

	pub fn attribute(mut self, attribute: Attribute) -> Self {
		self.attributes.push(attribute);
		self
	}

	pub fn relationship(mut self, relationship: Relationship) -> Self {
		self.relationships.push(relationship);
		self
	}

	/// Plural name used by the generated list query and mutations.
	pub fn plural_name(&self) -> String {
		match &self.plural {
			Some(p) => p.clone(),
			None => format!("{}s", self.name),
		}
	}

	pub fn attr(&self, name: &str) -> Option<&Attribute> {
		self.attributes.iter().find(|a| a.name == name)
	}

	pub fn rel(&self, name: &str) -> Option<&Relationship> {
		self.relationships.iter().find(|r| r.name == name)
	}
}

impl Attribute {
	pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
		Attribute {
			name: name.into(),
			kind: kind.into(),
			required: false,
			values: Vec::new(),
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	pub fn enumeration(
		name: impl Into<String>,
		values: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Attribute {
			name: name.into(),
			kind: "enum".to_owned(),
			required: false,
			values: values.into_iter().map(Into::into).collect(),
		}
	}

	/// Whether the free-text search considers this attribute.
	pub fn is_searchable(&self) -> bool {
		matches!(self.kind.as_str(), "string" | "text")
	}
}

impl Relationship {
	pub fn to_one(name: impl Into<String>, destination: impl Into<String>) -> Self {
		Relationship {
			name: name.into(),
			to_many: false,
			destination: destination.into(),
			inverse: None,
		}
	}

	pub fn to_many(name: impl Into<String>, destination: impl Into<String>) -> Self {
		Relationship {
			name: name.into(),
			to_many: true,
			destination: destination.into(),
			inverse: None,
		}
	}

	pub fn inverse(mut self, inverse: impl Into<String>) -> Self {
		self.inverse = Some(inverse.into());
		self
	}

	/// Name of the generated foreign-key projection field.
	pub fn id_field(&self) -> String {
		format!("{}_id", self.name)
	}
}
