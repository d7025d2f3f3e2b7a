mod common;

mod schema_generation {
	use std::sync::Arc;

	use modelgraph::model::{Attribute, Entity, Model, Relationship};
	use modelgraph::store::mem::MemStore;
	use modelgraph::store::Datastore;
	use modelgraph::{GqlError, SchemaCache};
	use test_log::test;

	use super::common;

	#[test(tokio::test)]
	async fn generated_types_are_present_in_sdl() {
		let (schema, _) = common::setup();
		let sdl = schema.sdl();

		assert!(sdl.contains("type Company"), "sdl: {sdl}");
		assert!(sdl.contains("type _page_Company"), "sdl: {sdl}");
		assert!(sdl.contains("input _filter_Company"), "sdl: {sdl}");
		assert!(sdl.contains("enum _sort_Company"), "sdl: {sdl}");
		assert!(sdl.contains("input _create_Person"), "sdl: {sdl}");
		assert!(sdl.contains("input _update_Person"), "sdl: {sdl}");
		assert!(sdl.contains("scalar Date"), "sdl: {sdl}");
		// both relationship shapes: traversal and foreign-key projection
		assert!(sdl.contains("employees_id"), "sdl: {sdl}");
		assert!(sdl.contains("company_id"), "sdl: {sdl}");
	}

	#[test(tokio::test)]
	async fn sort_enum_members_cover_attributes() {
		let (schema, _) = common::setup();
		let sdl = schema.sdl();
		for member in ["ID", "ID_DESC", "FIRSTNAME", "FIRSTNAME_DESC", "LASTNAME_DESC"] {
			assert!(sdl.contains(member), "missing sort member {member}; sdl: {sdl}");
		}
	}

	#[test(tokio::test)]
	async fn schema_cache_memoizes_across_builds() {
		let model = common::company_person_model();
		let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
		let cache = SchemaCache::new(store, model);

		let first = cache.get_schema().await.unwrap();
		let second = cache.get_schema().await.unwrap();
		assert_eq!(first.sdl(), second.sdl());
	}

	#[test(tokio::test)]
	async fn enum_attribute_synthesizes_uppercased_members() {
		let mut model = Model::new();
		model.entity(
			Entity::new("Ticket")
				.attribute(Attribute::enumeration("state", ["open", "closed"]).required()),
		);
		let model = Arc::new(model);
		let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
		let schema = modelgraph::generate_schema(&store, &model).unwrap();
		let sdl = schema.sdl();
		assert!(sdl.contains("enum _enum_Ticket_state"), "sdl: {sdl}");
		assert!(sdl.contains("OPEN"), "sdl: {sdl}");
		assert!(sdl.contains("CLOSED"), "sdl: {sdl}");
	}

	#[test(tokio::test)]
	async fn self_referential_entity_builds() {
		let mut model = Model::new();
		model.entity(
			Entity::new("Person")
				.plural("People")
				.attribute(Attribute::new("name", "string"))
				.relationship(Relationship::to_one("manager", "Person"))
				.relationship(Relationship::to_many("reports", "Person")),
		);
		let model = Arc::new(model);
		let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
		modelgraph::generate_schema(&store, &model).unwrap();
	}

	#[test(tokio::test)]
	async fn unknown_attribute_type_aborts_the_build() {
		let mut model = Model::new();
		model.entity(Entity::new("Thing").attribute(Attribute::new("blob", "binary")));
		let model = Arc::new(model);
		let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
		let err = modelgraph::generate_schema(&store, &model).unwrap_err();
		assert!(matches!(err, GqlError::UnknownAttributeType { .. }), "got: {err:?}");
	}

	#[test(tokio::test)]
	async fn empty_model_is_rejected() {
		let model = Arc::new(Model::new());
		let store: Arc<dyn Datastore> = Arc::new(MemStore::new(model.clone()));
		assert!(modelgraph::generate_schema(&store, &model).is_err());
	}
}
