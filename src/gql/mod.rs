//! GraphQL schema synthesis from the entity-relationship model.

mod attributes;
pub mod cache;
mod entities;
pub mod error;
mod filter;
mod mutations;
pub mod schema;
mod utils;

pub use attributes::DATE_SCALAR;
pub use cache::SchemaCache;
pub use error::GqlError;
pub use schema::generate_schema;
pub use utils::GQLTx;
