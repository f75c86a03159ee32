//! Integration tests for pivot mode and custom aggregation.

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_grid::prelude::*;

fn medal(country: &str, year: i64, gold: i64) -> Record {
    Record::new()
        .with("country", country)
        .with("year", year)
        .with("gold", gold)
}

fn medals() -> Vec<Record> {
    vec![
        medal("US", 2008, 1),
        medal("US", 2012, 2),
        medal("FR", 2012, 3),
    ]
}

fn pivot_model() -> ClientSideRowModel {
    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_group_columns(["country"])
            .with_pivot_columns(["year"]),
        [ColumnDef::new("gold").with_agg_func(AggFunc::Sum)],
    )
    .unwrap();
    model.set_row_data(medals()).unwrap();
    model
}

fn value(model: &ClientSideRowModel, id: &str, col: &str) -> CellValue {
    model
        .get_row_node(id)
        .and_then(|n| n.agg_data())
        .map(|a| a.value(col))
        .unwrap_or_default()
}

#[test]
fn test_pivot_mode_generates_columns() {
    let mut model = pivot_model();
    assert!(model.pivot_result_columns().is_empty());

    let announced = Arc::new(Mutex::new(Vec::new()));
    let sink = announced.clone();
    model
        .signals()
        .pivot_columns_changed
        .connect(move |ids: &Vec<String>| sink.lock().push(ids.clone()));

    model.set_pivot_mode(true);
    let ids: Vec<&str> = model
        .pivot_result_columns()
        .iter()
        .map(|c| c.col_id.as_str())
        .collect();
    assert_eq!(ids, vec!["pivot_2008_gold", "pivot_2012_gold"]);
    assert_eq!(
        *announced.lock(),
        vec![vec!["pivot_2008_gold".to_string(), "pivot_2012_gold".to_string()]]
    );

    assert_eq!(value(&model, "row-group-country-US", "pivot_2008_gold"), CellValue::Float(1.0));
    assert_eq!(value(&model, "row-group-country-US", "pivot_2012_gold"), CellValue::Float(2.0));
    assert_eq!(value(&model, "row-group-country-FR", "pivot_2008_gold"), CellValue::Null);
    assert_eq!(value(&model, "row-group-country-FR", "pivot_2012_gold"), CellValue::Float(3.0));
    // Plain totals are kept next to the pivot columns.
    assert_eq!(value(&model, "row-group-country-US", "gold"), CellValue::Float(3.0));
}

#[test]
fn test_pivot_mode_hides_leaves() {
    let mut model = pivot_model();
    model.set_pivot_mode(true);
    model.expand_or_collapse_all(true);
    assert_eq!(model.displayed_row_count(), 2);
    assert!(model.displayed_rows().all(|n| n.is_group()));

    model.set_pivot_mode(false);
    assert!(model.pivot_result_columns().is_empty());
    assert_eq!(model.displayed_row_count(), 5);
}

#[test]
fn test_filter_narrows_pivot_keys() {
    let mut model = pivot_model();
    model.set_pivot_mode(true);
    model.set_column_filter(
        "year",
        Some(ColumnFilter::condition(FilterCondition::new(
            FilterOperator::Equals,
            2012,
        ))),
    );
    let ids: Vec<String> = model
        .pivot_result_columns()
        .iter()
        .map(|c| c.col_id.clone())
        .collect();
    assert_eq!(ids, vec!["pivot_2012_gold"]);
}

#[test]
fn test_transaction_adds_pivot_column() {
    let mut model = pivot_model();
    model.set_pivot_mode(true);
    model.apply_transaction(Transaction::new().with_add(medal("FR", 2016, 4)));

    assert_eq!(model.pivot_result_columns().len(), 3);
    assert_eq!(value(&model, "row-group-country-FR", "pivot_2016_gold"), CellValue::Float(4.0));
    assert_eq!(value(&model, "row-group-country-US", "pivot_2016_gold"), CellValue::Null);
}

#[test]
fn test_named_agg_func() {
    let mut model = ClientSideRowModel::new(
        GridOptions::new().with_group_columns(["country"]),
        [ColumnDef::new("gold").with_agg_func(AggFunc::from_name("range"))],
    )
    .unwrap();
    model.set_row_data(medals()).unwrap();
    // Unregistered names produce no value.
    assert_eq!(value(&model, "row-group-country-US", "gold"), CellValue::Null);

    model.register_agg_func("range", |values| {
        let numbers: Vec<f64> = values.iter().filter_map(CellValue::as_f64).collect();
        match (
            numbers.iter().copied().reduce(f64::min),
            numbers.iter().copied().reduce(f64::max),
        ) {
            (Some(lo), Some(hi)) => CellValue::Float(hi - lo),
            _ => CellValue::Null,
        }
    });
    assert_eq!(value(&model, "row-group-country-US", "gold"), CellValue::Float(1.0));
    assert_eq!(value(&model, "row-group-country-FR", "gold"), CellValue::Float(0.0));
}

#[test]
fn test_changing_agg_func() {
    let mut model = pivot_model();
    model
        .set_column_agg_func("gold", Some(AggFunc::Avg))
        .unwrap();
    assert_eq!(value(&model, "row-group-country-US", "gold"), CellValue::Float(1.5));

    model.set_column_agg_func("gold", None).unwrap();
    assert!(model.get_row_node("row-group-country-US").unwrap().agg_data().is_none());

    let err = model.set_column_agg_func("silver", Some(AggFunc::Sum)).unwrap_err();
    assert!(matches!(err, GridError::UnknownColumn { .. }));
}
