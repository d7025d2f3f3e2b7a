//! modelgraph generates a GraphQL query/mutation schema from a declarative
//! entity-relationship model, binding every generated field to CRUD
//! operations against a backing object store.
//!
//! The model describes entities with typed attributes and relationships; the
//! generated schema carries, per entity, a paginated/sorted/filtered list
//! query, a single-item query, create/update/delete mutations with
//! relationship-write semantics, and both object-traversal and foreign-key
//! projection fields for every relationship.
//!
//! ```no_run
//! # async fn demo() -> Result<(), modelgraph::GqlError> {
//! use std::sync::Arc;
//! use modelgraph::model::{Attribute, Entity, Model, Relationship};
//! use modelgraph::store::mem::MemStore;
//! use modelgraph::store::Datastore;
//! use modelgraph::SchemaCache;
//!
//! let mut model = Model::new();
//! model.entity(
//!     Entity::new("Company")
//!         .plural("Companies")
//!         .attribute(Attribute::new("name", "string").required())
//!         .relationship(Relationship::to_many("employees", "Person").inverse("company")),
//! );
//! model.entity(
//!     Entity::new("Person")
//!         .plural("People")
//!         .attribute(Attribute::new("firstname", "string"))
//!         .relationship(Relationship::to_one("company", "Company").inverse("employees")),
//! );
//! let model = Arc::new(model);
//!
//! let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
//! let schema = SchemaCache::new(store, model).get_schema().await?;
//! let response = schema.execute(r#"{ getCompanies { count } }"#).await;
//! # Ok(())
//! # }
//! ```

pub mod gql;
pub mod model;
pub mod store;
pub mod val;

pub use gql::{generate_schema, GqlError, SchemaCache};
pub use model::Model;
pub use val::Value;
