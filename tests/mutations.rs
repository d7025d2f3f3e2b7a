mod common;

mod mutations {
	use serde_json::json;
	use test_log::test;

	use super::common;

	#[test(tokio::test)]
	async fn create_then_query_round_trips() {
		let (schema, _store) = common::setup();

		let data = common::exec(
			&schema,
			r#"mutation { createCompany(input: {name: "Company A"}) { id name } }"#,
		)
		.await;
		let id = data["createCompany"]["id"].as_i64().unwrap();
		assert_eq!(data["createCompany"]["name"], json!("Company A"));

		let data =
			common::exec(&schema, &format!(r#"{{ getCompany(id: {id}) {{ name }} }}"#)).await;
		assert_eq!(data, json!({"getCompany": {"name": "Company A"}}));
	}

	#[test(tokio::test)]
	async fn create_with_company_id_links_both_directions() {
		let (schema, _store) = common::setup();

		let data = common::exec(
			&schema,
			r#"mutation { createCompany(input: {name: "Company A"}) { id } }"#,
		)
		.await;
		let company_id = data["createCompany"]["id"].as_i64().unwrap();

		let data = common::exec(
			&schema,
			&format!(
				r#"mutation {{ createPerson(input: {{firstname: "FN", company_id: {company_id}}}) {{ id company_id }} }}"#
			),
		)
		.await;
		assert_eq!(data["createPerson"]["company_id"], json!(company_id));

		let data = common::exec(
			&schema,
			&format!(r#"{{ getCompany(id: {company_id}) {{ employees {{ firstname }} }} }}"#),
		)
		.await;
		assert_eq!(data, json!({"getCompany": {"employees": [{"firstname": "FN"}]}}));
	}

	#[test(tokio::test)]
	async fn create_linking_nonexistent_id_fails_with_not_found() {
		let (schema, _store) = common::setup();

		let err = common::exec_err(
			&schema,
			r#"mutation { createPerson(input: {firstname: "FN", company_id: 99}) { id } }"#,
		)
		.await;
		assert!(err.contains("not found"), "got: {err}");

		// the transaction was never committed, so the base object is gone too
		let data = common::exec(&schema, r#"{ getPeople { count } }"#).await;
		assert_eq!(data, json!({"getPeople": {"count": 0}}));
	}

	#[test(tokio::test)]
	async fn update_cannot_null_a_required_attribute() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let err = common::exec_err(
			&schema,
			r#"mutation { updateCompany(id: 1, input: {name: null}) { id } }"#,
		)
		.await;
		assert!(err.contains("required"), "got: {err}");

		// the record still reads back intact through its non-null field
		let data = common::exec(&schema, r#"{ getCompany(id: 1) { name } }"#).await;
		assert_eq!(data, json!({"getCompany": {"name": "test"}}));
	}

	#[test(tokio::test)]
	async fn update_changes_only_present_fields() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data = common::exec(
			&schema,
			r#"mutation { updatePerson(id: 1, input: {lastname: "Smith"}) { firstname lastname } }"#,
		)
		.await;
		assert_eq!(
			data,
			json!({"updatePerson": {"firstname": "john", "lastname": "Smith"}})
		);
	}

	#[test(tokio::test)]
	async fn update_nonexistent_id_fails_with_not_found() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let err = common::exec_err(
			&schema,
			r#"mutation { updateCompany(id: 99, input: {name: "x"}) { id } }"#,
		)
		.await;
		assert!(err.contains("not found"), "got: {err}");
	}

	#[test(tokio::test)]
	async fn update_can_relink_and_clear_a_to_one() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		common::exec(
			&schema,
			r#"mutation { updatePerson(id: 1, input: {company_id: 2}) { id } }"#,
		)
		.await;
		let data = common::exec(&schema, r#"{ getPerson(id: 1) { company_id } }"#).await;
		assert_eq!(data, json!({"getPerson": {"company_id": 2}}));

		common::exec(
			&schema,
			r#"mutation { updatePerson(id: 1, input: {company_id: null}) { id } }"#,
		)
		.await;
		let data = common::exec(&schema, r#"{ getPerson(id: 1) { company_id } }"#).await;
		assert_eq!(data, json!({"getPerson": {"company_id": null}}));
	}

	#[test(tokio::test)]
	async fn to_many_write_is_a_full_replace() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		common::exec(
			&schema,
			r#"mutation { updateCompany(id: 1, input: {employees_id: [1, 2]}) { id } }"#,
		)
		.await;
		let data = common::exec(&schema, r#"{ getCompany(id: 1) { employees_id } }"#).await;
		assert_eq!(data, json!({"getCompany": {"employees_id": [1, 2]}}));

		common::exec(
			&schema,
			r#"mutation { updateCompany(id: 1, input: {employees_id: [2]}) { id } }"#,
		)
		.await;
		let data = common::exec(&schema, r#"{ getCompany(id: 1) { employees_id } }"#).await;
		assert_eq!(data, json!({"getCompany": {"employees_id": [2]}}));
	}

	#[test(tokio::test)]
	async fn emptying_a_to_many_twice_is_idempotent() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		for _ in 0..2 {
			common::exec(
				&schema,
				r#"mutation { updateCompany(id: 1, input: {employees_id: []}) { id } }"#,
			)
			.await;
			let data = common::exec(&schema, r#"{ getCompany(id: 1) { employees_id } }"#).await;
			assert_eq!(data, json!({"getCompany": {"employees_id": []}}));
		}
	}

	#[test(tokio::test)]
	async fn delete_returns_the_last_snapshot() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data =
			common::exec(&schema, r#"mutation { deleteCompany(id: 2) { id name } }"#).await;
		assert_eq!(data, json!({"deleteCompany": {"id": 2, "name": "test2"}}));

		let data = common::exec(&schema, r#"{ getCompany(id: 2) { id } }"#).await;
		assert_eq!(data, json!({"getCompany": null}));
	}

	#[test(tokio::test)]
	async fn delete_nonexistent_id_fails_with_not_found() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let err = common::exec_err(&schema, r#"mutation { deleteCompany(id: 99) { id } }"#).await;
		assert!(err.contains("not found"), "got: {err}");
	}
}
