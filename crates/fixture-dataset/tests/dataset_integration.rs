//! End-to-end tests for declaring, building, and aggregating datasets.

use std::io::Write;
use std::sync::Arc;

use fixture_dataset::prelude::*;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::NamedTempFile;

#[fixture]
fn category() -> Arc<DataSetDef> {
	DataSetDef::builder("CategoryData")
		.storage("Category")
		.row("cars", |r| r.set("name", "cars"))
		.row("free_stuff", |r| r.set("name", "get free stuff"))
		.build()
}

#[fixture]
fn product(category: Arc<DataSetDef>) -> Arc<DataSetDef> {
	let cars = category.row_ref("cars").unwrap().value("name").unwrap();
	DataSetDef::builder("ProductData")
		.storage("Product")
		.row("truck", |r| r.set("name", "truck").set("category", cars))
		.build()
}

#[rstest]
fn test_product_resolves_category(product: Arc<DataSetDef>) {
	let dataset = DataSet::new(&product).unwrap();

	assert_eq!(dataset.attr("truck").unwrap().attr("category").unwrap(), &json!("cars"));

	let category = dataset.refs().dataset("CategoryData").unwrap();
	let rows: Vec<_> = category
		.iter()
		.map(|(key, row)| (key.to_string(), row.to_json()))
		.collect();
	assert_eq!(
		rows,
		vec![
			("cars".to_string(), json!({"name": "cars"})),
			("free_stuff".to_string(), json!({"name": "get free stuff"})),
		]
	);
}

#[rstest]
fn test_superset_of_product_iterates_product_only(product: Arc<DataSetDef>) {
	let superset = SuperSet::from_defs(&[product]).unwrap();

	let names: Vec<&str> = superset.iter().map(|d| d.name()).collect();
	assert_eq!(names, vec!["ProductData"]);
	let category = superset.get_item("CategoryData").unwrap();
	assert_eq!(category.storage(), Some("Category"));
}

#[rstest]
fn test_superset_dedups_direct_and_referenced(category: Arc<DataSetDef>, product: Arc<DataSetDef>) {
	let mut ctx = BuildContext::new(None);
	let product = ctx.instance(&product).unwrap();
	let category = ctx.instance(&category).unwrap();

	let mut superset = SuperSet::new();
	superset.add(&category);
	superset.add(&product);
	superset.add(&category);

	let names: Vec<&str> = superset.iter().map(|d| d.name()).collect();
	assert_eq!(names, vec!["CategoryData", "ProductData"]);
}

#[rstest]
fn test_merged_superset_reads_every_row(product: Arc<DataSetDef>) {
	let merged = MergedSuperSet::from_defs(&[product]).unwrap();

	assert_eq!(merged.attr("truck").unwrap().attr("name").unwrap(), &json!("truck"));
	assert_eq!(merged.attr("free_stuff").unwrap().attr("name").unwrap(), &json!("get free stuff"));
}

#[rstest]
fn test_document_file_matches_builder(product: Arc<DataSetDef>) {
	let mut file = NamedTempFile::with_suffix(".json").unwrap();
	write!(
		file,
		r#"{{"datasets": [
			{{"name": "CategoryData", "meta": {{"storage": "Category"}},
			  "rows": {{"cars": {{"name": "cars"}}, "free_stuff": {{"name": "get free stuff"}}}}}},
			{{"name": "ProductData", "meta": {{"storage": "Product"}},
			  "rows": {{"truck": {{"name": "truck", "category": {{"$ref": "CategoryData.cars.name"}}}}}}}}
		]}}"#
	)
	.unwrap();

	let document = DocumentParser::new().parse_file(file.path()).unwrap();
	let mut registry = DataSetRegistry::new();
	document.resolve(&mut registry).unwrap();

	let from_document = DataSet::new(registry.get("ProductData").unwrap()).unwrap();
	let from_builder = DataSet::new(&product).unwrap();

	fn rows(dataset: &DataSet) -> Vec<serde_json::Value> {
		dataset.iter().map(|(_, row)| row.to_json()).collect()
	}
	assert_eq!(rows(&from_document), rows(&from_builder));
	assert_eq!(from_document.storage(), from_builder.storage());
}

#[rstest]
fn test_dataset_without_rows_is_rejected() {
	let def = DataSetDef::builder("EmptyData").storage("Nothing").build();
	let error = DataSet::new(&def).unwrap_err();
	assert!(matches!(error, DataSetError::EmptyDataSet(_)));
	assert!(error.to_string().contains("cannot create an empty DataSet"));
}
