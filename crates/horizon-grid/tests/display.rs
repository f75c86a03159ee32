//! Integration tests for display options: footers, quick filter, null
//! groups, selection and the viewport interface.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_grid::prelude::*;
use horizon_grid::row_model::{FilterJoin, NodeKind, NullGroupPolicy};
use horizon_grid_core::TreeFormatOptions;

fn person(id: i64, team: Option<&str>, name: &str, score: i64) -> Record {
    let record = Record::new()
        .with("id", id)
        .with("name", name)
        .with("score", score);
    match team {
        Some(team) => record.with("team", team),
        None => record,
    }
}

fn people() -> Vec<Record> {
    vec![
        person(1, Some("red"), "Alice Smith", 3),
        person(2, Some("red"), "Bob Jones", 5),
        person(3, Some("blue"), "Carol Smith", 7),
        person(4, None, "Dan Brown", 1),
    ]
}

fn model_with(settings: GridSettings) -> ClientSideRowModel {
    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_settings(settings)
            .with_group_columns(["team"])
            .with_row_id(|r| r.value("id").to_key_string()),
        [
            ColumnDef::new("name"),
            ColumnDef::new("score").with_agg_func(AggFunc::Sum),
        ],
    )
    .unwrap();
    model.set_row_data(people()).unwrap();
    model
}

fn displayed_ids(model: &ClientSideRowModel) -> Vec<String> {
    model.displayed_rows().map(|n| n.id().to_string()).collect()
}

#[test]
fn test_null_keys_get_their_own_group() {
    let model = model_with(GridSettings::default());
    assert_eq!(
        displayed_ids(&model),
        vec!["row-group-team-red", "row-group-team-blue", "row-group-team-"]
    );
    let null_group = model.get_row_node("row-group-team-").unwrap();
    assert_eq!(null_group.group_key(), Some(&CellValue::Null));
    assert_eq!(null_group.leaf_count(), 1);
}

#[test]
fn test_null_keys_can_stay_ungrouped() {
    let model = model_with(GridSettings {
        null_group_policy: NullGroupPolicy::Skip,
        ..GridSettings::default()
    });
    assert_eq!(
        displayed_ids(&model),
        vec!["row-group-team-red", "row-group-team-blue", "4"]
    );
    assert_eq!(model.get_row_node("4").unwrap().level(), 0);
}

#[test]
fn test_group_and_total_footers() {
    let mut model = model_with(GridSettings {
        group_include_footer: true,
        group_include_total_footer: true,
        ..GridSettings::default()
    });
    model.set_expanded("row-group-team-red", true).unwrap();

    assert_eq!(
        displayed_ids(&model),
        vec![
            "row-group-team-red",
            "1",
            "2",
            "rowGroupFooter_row-group-team-red",
            "row-group-team-blue",
            "row-group-team-",
            "rowGroupFooter_ROOT_NODE_ID",
        ]
    );

    let footer = model
        .get_row_node("rowGroupFooter_row-group-team-red")
        .unwrap();
    assert_eq!(footer.kind(), NodeKind::Footer);
    assert!(footer.is_footer());
    assert_eq!(footer.agg_data().unwrap().value("score"), CellValue::Float(8.0));

    let total = model.get_row_node("rowGroupFooter_ROOT_NODE_ID").unwrap();
    assert_eq!(total.agg_data().unwrap().value("score"), CellValue::Float(16.0));

    // Footers follow the aggregates after a transaction.
    model.apply_transaction(Transaction::new().with_add(person(5, Some("red"), "Eve", 2)));
    let footer = model
        .get_row_node("rowGroupFooter_row-group-team-red")
        .unwrap();
    assert_eq!(footer.agg_data().unwrap().value("score"), CellValue::Float(10.0));
}

#[test]
fn test_single_child_groups_are_removed() {
    let model = model_with(GridSettings {
        group_remove_single_children: true,
        ..GridSettings::default()
    });
    assert_eq!(
        displayed_ids(&model),
        vec!["row-group-team-red", "3", "4"]
    );
}

#[test]
fn test_quick_filter_matches_every_word() {
    let mut model = model_with(GridSettings {
        group_default_expanded: -1,
        ..GridSettings::default()
    });
    model.set_quick_filter("smith");
    assert_eq!(
        displayed_ids(&model),
        vec!["row-group-team-red", "1", "row-group-team-blue", "3"]
    );

    model.set_quick_filter("SMITH carol");
    assert_eq!(displayed_ids(&model), vec!["row-group-team-blue", "3"]);
    assert!(model.is_any_filter_present());

    model.set_quick_filter("   ");
    assert!(model.quick_filter().is_none());
    assert!(!model.is_any_filter_present());
    assert_eq!(model.displayed_row_count(), 7);
}

#[test]
fn test_external_filter() {
    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_row_id(|r| r.value("id").to_key_string())
            .with_external_filter(|node| {
                node.data()
                    .and_then(|d| d.value("score").as_f64())
                    .is_some_and(|s| s >= 5.0)
            }),
        [],
    )
    .unwrap();
    model.set_row_data(people()).unwrap();
    assert_eq!(displayed_ids(&model), vec!["2", "3"]);
}

#[test]
fn test_selection_survives_regroup() {
    let mut model = model_with(GridSettings::default());
    model.set_selected("3", true).unwrap();
    model.set_selected("1", true).unwrap();

    model.set_group_columns(Vec::<String>::new());
    let selected: Vec<&str> = model.selected_nodes().into_iter().map(RowNode::id).collect();
    assert_eq!(selected, vec!["1", "3"]);
    assert_eq!(displayed_ids(&model), vec!["1", "2", "3", "4"]);

    model.clear_selection();
    assert!(model.selected_nodes().is_empty());
    assert!(model.set_selected("99", true).is_err());
}

#[test]
fn test_expanded_signal_per_changed_group() {
    let mut model = model_with(GridSettings::default());
    model.set_expanded("row-group-team-red", true).unwrap();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = changes.clone();
    model.signals().expanded_changed.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    model.expand_or_collapse_all(true);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
    model.expand_or_collapse_all(true);
    assert_eq!(changes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_viewport_through_trait_object() {
    let mut model = model_with(GridSettings::default());
    model.expand_or_collapse_all(true);

    let view: &dyn RowModel = &model;
    assert_eq!(view.displayed_row_count(), 7);
    assert_eq!(view.total_height(), 175.0);
    assert_eq!(view.rows_in_viewport(30.0, 80.0), 1..4);
    assert_eq!(
        view.displayed_row_at_index(1).map(RowNode::id),
        Some("1")
    );
    assert!(view.displayed_row_at_index(7).is_none());
}

#[test]
fn test_settings_from_json() {
    let settings = GridSettings::from_json(
        r#"{"groupDefaultExpanded": -1, "rowHeight": 20, "groupIncludeTotalFooter": true}"#,
    )
    .unwrap();
    let model = model_with(settings);
    assert_eq!(model.displayed_row_count(), 8);
    assert_eq!(model.total_height(), 160.0);
}

#[test]
fn test_format_tree_dump() {
    let mut model = model_with(GridSettings::default());
    model.set_expanded("row-group-team-blue", true).unwrap();
    let dump = model.format_tree(&TreeFormatOptions::minimal());
    assert!(dump.contains("team: red (2)"));
    assert!(dump.contains("team: blue (1)"));
    assert!(dump.starts_with("Rows (4 after filter"));
}

#[test]
fn test_group_level_filter_matches_group_keys() {
    let mut model = model_with(GridSettings {
        group_default_expanded: -1,
        group_level_filter: true,
        ..GridSettings::default()
    });
    model.set_quick_filter("red");
    assert_eq!(displayed_ids(&model), vec!["row-group-team-red", "1", "2"]);

    let mut model = model_with(GridSettings {
        group_default_expanded: -1,
        ..GridSettings::default()
    });
    model.set_quick_filter("red");
    assert_eq!(model.displayed_row_count(), 0);
}

#[test]
fn test_column_filters_joined_with_or() {
    let name_filter =
        || ColumnFilter::condition(FilterCondition::new(FilterOperator::Contains, "smith"));
    let score_filter =
        || ColumnFilter::condition(FilterCondition::new(FilterOperator::GreaterThan, 4));

    let mut model = model_with(GridSettings::default());
    model.set_group_columns(Vec::<String>::new());
    model.set_column_filter("name", Some(name_filter()));
    model.set_column_filter("score", Some(score_filter()));
    assert_eq!(displayed_ids(&model), vec!["3"]);

    model.set_settings(GridSettings {
        column_filter_join: FilterJoin::Or,
        ..GridSettings::default()
    });
    assert_eq!(displayed_ids(&model), vec!["1", "2", "3"]);
}

#[test]
fn test_group_keys_of_different_kinds_stay_apart() {
    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_group_columns(["g"])
            .with_row_id(|r| r.value("id").to_key_string()),
        [ColumnDef::new("v").with_agg_func(AggFunc::Sum)],
    )
    .unwrap();
    model
        .set_row_data(vec![
            Record::new().with("id", 1).with("g", 1).with("v", 1),
            Record::new().with("id", 2).with("g", "1").with("v", 2),
            Record::new().with("id", 3).with("g", CellValue::Null).with("v", 3),
            Record::new().with("id", 4).with("g", "").with("v", 4),
        ])
        .unwrap();

    assert_eq!(model.displayed_row_count(), 4);
    let sum = |id: &str| model.get_row_node(id).unwrap().agg_data().unwrap().value("v");
    assert_eq!(sum("row-group-g-1"), CellValue::Float(1.0));
    assert_eq!(sum("row-group-g-~s1"), CellValue::Float(2.0));
    assert_eq!(sum("row-group-g-"), CellValue::Float(3.0));
    assert_eq!(sum("row-group-g-~s"), CellValue::Float(4.0));
}

#[test]
fn test_group_ids_unique_with_separator_keys() {
    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_settings(GridSettings {
                group_default_expanded: -1,
                ..GridSettings::default()
            })
            .with_group_columns(["a", "b"])
            .with_row_id(|r| r.value("id").to_key_string()),
        [],
    )
    .unwrap();
    model
        .set_row_data(vec![
            Record::new().with("id", 1).with("a", "x").with("b", "y"),
            Record::new().with("id", 2).with("a", "x-b-y").with("b", "z"),
        ])
        .unwrap();

    let mut ids = Vec::new();
    model.for_each_node(|node| ids.push(node.id().to_string()));
    let mut distinct = ids.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(ids.len(), 6);
    assert_eq!(distinct.len(), 6);

    model.set_expanded("row-group-a-x-b-y", false).unwrap();
    assert_eq!(
        displayed_ids(&model),
        vec![
            "row-group-a-x",
            "row-group-a-x-b-y",
            "row-group-a-x~-b~-y",
            "row-group-a-x~-b~-y-b-z",
            "2",
        ]
    );
}

#[test]
fn test_reserved_record_ids_are_rejected() {
    let mut model = model_with(GridSettings::default());
    let err = model
        .set_row_data(vec![person(1, Some("red"), "Alice", 1).with("id", "filler-a")])
        .unwrap_err();
    assert!(matches!(err, GridError::ReservedRowId { .. }));
    // The previous data is untouched.
    assert_eq!(model.get_row_node("row-group-team-red").unwrap().leaf_count(), 2);
}
