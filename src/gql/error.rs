use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GqlError {
	#[error("Store error: {0}")]
	StoreError(#[from] StoreError),
	#[error("Unknown attribute type `{kind}` on `{entity}.{attribute}`")]
	UnknownAttributeType {
		entity: String,
		attribute: String,
		kind: String,
	},
	#[error("`{entity}` with id {id} not found")]
	NotFound {
		entity: String,
		id: i64,
	},
	#[error("Error generating schema: {0}")]
	SchemaError(String),
	#[error("Error resolving request: {0}")]
	ResolverError(String),
	#[error("Internal Error: {0}")]
	InternalError(String),
	#[error("Error converting value: {val} to type: {target}")]
	TypeError {
		target: String,
		val: async_graphql::Value,
	},
}

pub fn schema_error(msg: impl Into<String>) -> GqlError {
	GqlError::SchemaError(msg.into())
}

pub fn resolver_error(msg: impl Into<String>) -> GqlError {
	GqlError::ResolverError(msg.into())
}

pub fn internal_error(msg: impl Into<String>) -> GqlError {
	let msg = msg.into();
	error!("{}", msg);
	GqlError::InternalError(msg)
}

pub fn type_error(target: impl Into<String>, val: &async_graphql::Value) -> GqlError {
	GqlError::TypeError {
		target: target.into(),
		val: val.to_owned(),
	}
}

pub fn not_found(entity: impl Into<String>, id: i64) -> GqlError {
	GqlError::NotFound {
		entity: entity.into(),
		id,
	}
}
