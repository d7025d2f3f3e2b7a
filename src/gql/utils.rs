use std::sync::Arc;

use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::FieldValue;
use async_graphql::{Name, Value as GqlValue};

use crate::store::{Datastore, FetchOpts, Record, Transaction};

use super::error::GqlError;

// Argument accessors; only the shapes the generated resolvers consume.

pub(crate) fn as_i64(val: &GqlValue) -> Option<i64> {
	match val {
		GqlValue::Number(n) => n.as_i64(),
		_ => None,
	}
}

pub(crate) fn as_string(val: &GqlValue) -> Option<String> {
	match val {
		GqlValue::String(s) => Some(s.clone()),
		_ => None,
	}
}

pub(crate) fn as_list(val: &GqlValue) -> Option<&Vec<GqlValue>> {
	match val {
		GqlValue::List(vals) => Some(vals),
		_ => None,
	}
}

pub(crate) fn as_object(val: &GqlValue) -> Option<&IndexMap<Name, GqlValue>> {
	match val {
		GqlValue::Object(obj) => Some(obj),
		_ => None,
	}
}

/// The store transaction a resolver tree runs against.
///
/// Root resolvers open one; nested field resolvers pick it up from the
/// erased parent value so a whole query observes one consistent view.
#[derive(Clone)]
pub struct GQLTx {
	tx: Arc<dyn Transaction>,
}

impl GQLTx {
	pub async fn new(store: &Arc<dyn Datastore>) -> Result<Self, GqlError> {
		let tx = store.transaction().await?;
		Ok(GQLTx {
			tx,
		})
	}

	pub fn inner(&self) -> &dyn Transaction {
		self.tx.as_ref()
	}
}

/// A resolved object travelling down the field tree as an erased parent
/// value: the transaction it was read in plus its attribute snapshot.
pub type ErasedRecord = (GQLTx, Record);

/// A pending list query travelling into the `items`/`count` fields, which
/// resolve lazily and independently.
pub type ErasedPage = (GQLTx, String, FetchOpts);

pub fn field_val_erase_owned(ty: ErasedRecord) -> FieldValue<'static> {
	FieldValue::owned_any(ty)
}
