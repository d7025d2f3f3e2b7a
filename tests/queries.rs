mod common;

mod queries {
	use serde_json::json;
	use test_log::test;

	use super::common;

	#[test(tokio::test)]
	async fn list_query_returns_items_and_count() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data = common::exec(&schema, r#"{ getCompanies { items { name } count } }"#).await;
		assert_eq!(
			data,
			json!({
				"getCompanies": {
					"items": [{"name": "test"}, {"name": "test2"}, {"name": "test3"}],
					"count": 3
				}
			})
		);
	}

	#[test(tokio::test)]
	async fn default_page_is_offset_zero_limit_ten() {
		let (schema, store) = common::setup();
		{
			let tx = store.transaction().await.unwrap();
			for i in 0..15 {
				let name = format!("c{i:02}");
				tx.create("Company", common::attrs(&[("name", name.as_str())]))
					.await
					.unwrap();
			}
			tx.save().await.unwrap();
		}

		let data = common::exec(&schema, r#"{ getCompanies { items { id } count } }"#).await;
		let page = &data["getCompanies"];
		assert_eq!(page["items"].as_array().unwrap().len(), 10);
		assert_eq!(page["count"], json!(15));
		assert_eq!(page["items"][0]["id"], json!(1));

		let data =
			common::exec(&schema, r#"{ getCompanies(offset: 10) { items { id } } }"#).await;
		let items = data["getCompanies"]["items"].as_array().unwrap();
		assert_eq!(items.len(), 5);
		assert_eq!(items[0]["id"], json!(11));
	}

	#[test(tokio::test)]
	async fn sort_id_desc_exactly_reverses() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let asc =
			common::exec(&schema, r#"{ getCompanies(sort: [ID]) { items { id } } }"#).await;
		let desc =
			common::exec(&schema, r#"{ getCompanies(sort: [ID_DESC]) { items { id } } }"#).await;

		let mut asc_ids = asc["getCompanies"]["items"].as_array().unwrap().clone();
		let desc_ids = desc["getCompanies"]["items"].as_array().unwrap().clone();
		asc_ids.reverse();
		assert_eq!(asc_ids, desc_ids);
	}

	#[test(tokio::test)]
	async fn sort_by_attribute() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data = common::exec(
			&schema,
			r#"{ getPeople(sort: [FIRSTNAME]) { items { firstname } } }"#,
		)
		.await;
		assert_eq!(
			data["getPeople"]["items"],
			json!([{"firstname": "Jane"}, {"firstname": "john"}])
		);
	}

	#[test(tokio::test)]
	async fn single_query_by_id() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data = common::exec(&schema, r#"{ getCompany(id: 2) { id name } }"#).await;
		assert_eq!(data, json!({"getCompany": {"id": 2, "name": "test2"}}));
	}

	#[test(tokio::test)]
	async fn single_query_by_filter() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data =
			common::exec(&schema, r#"{ getCompany(filter: {name: "test3"}) { id } }"#).await;
		assert_eq!(data, json!({"getCompany": {"id": 3}}));
	}

	#[test(tokio::test)]
	async fn single_query_miss_is_null_not_an_error() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data = common::exec(&schema, r#"{ getCompany(id: 99) { id } }"#).await;
		assert_eq!(data, json!({"getCompany": null}));
	}

	#[test(tokio::test)]
	async fn absent_to_one_target_yields_null_id() {
		let (schema, store) = common::setup();
		common::seed(&store).await;

		let data =
			common::exec(&schema, r#"{ getPerson(id: 1) { company { id } company_id } }"#).await;
		assert_eq!(data, json!({"getPerson": {"company": null, "company_id": null}}));
	}
}
