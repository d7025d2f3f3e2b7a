#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use modelgraph::model::{Attribute, Entity, Model, Relationship};
use modelgraph::store::mem::MemStore;
use modelgraph::store::Datastore;
use modelgraph::Value;

pub fn company_person_model() -> Arc<Model> {
	let mut model = Model::new();
	model.entity(
		Entity::new("Company")
			.plural("Companies")
			.attribute(Attribute::new("name", "string").required())
			.relationship(Relationship::to_many("employees", "Person").inverse("company")),
	);
	model.entity(
		Entity::new("Person")
			.plural("People")
			.attribute(Attribute::new("firstname", "string"))
			.attribute(Attribute::new("lastname", "string"))
			.relationship(Relationship::to_one("company", "Company").inverse("employees")),
	);
	Arc::new(model)
}

pub fn setup() -> (Schema, Arc<dyn Datastore>) {
	let model = company_person_model();
	let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
	let schema = modelgraph::generate_schema(&store, &model).unwrap();
	(schema, store)
}

pub fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
	pairs.iter().map(|(k, v)| ((*k).to_owned(), Value::String((*v).to_owned()))).collect()
}

/// Seeds three companies and two unlinked people.
pub async fn seed(store: &Arc<dyn Datastore>) {
	let tx = store.transaction().await.unwrap();
	tx.create("Company", attrs(&[("name", "test")])).await.unwrap();
	tx.create("Company", attrs(&[("name", "test2")])).await.unwrap();
	tx.create("Company", attrs(&[("name", "test3")])).await.unwrap();
	tx.create("Person", attrs(&[("firstname", "john"), ("lastname", "Doe")])).await.unwrap();
	tx.create("Person", attrs(&[("firstname", "Jane"), ("lastname", "Siri")])).await.unwrap();
	tx.save().await.unwrap();
}

/// Executes a query that must succeed and returns its data as JSON.
pub async fn exec(schema: &Schema, query: &str) -> serde_json::Value {
	let resp = schema.execute(query).await;
	assert!(resp.errors.is_empty(), "query failed: {:?}", resp.errors);
	resp.data.into_json().unwrap()
}

/// Executes a query that must fail and returns the first error message.
pub async fn exec_err(schema: &Schema, query: &str) -> String {
	let resp = schema.execute(query).await;
	assert!(!resp.errors.is_empty(), "expected errors, got: {:?}", resp.data);
	resp.errors[0].message.clone()
}
