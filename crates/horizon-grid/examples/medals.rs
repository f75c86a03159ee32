//! Grouping, sorting and transactions on a small medal table.
//!
//! Prints the row tree after each step. Set `RUST_LOG` to see the pipeline
//! logs, e.g. `RUST_LOG=horizon_grid=debug`.
//!
//! Run with: cargo run -p horizon-grid --example medals

use horizon_grid::prelude::*;
use horizon_grid_core::TreeFormatOptions;
use tracing_subscriber::EnvFilter;

fn medal(id: i64, country: &str, sport: &str, gold: i64) -> Record {
    Record::new()
        .with("id", id)
        .with("country", country)
        .with("sport", sport)
        .with("gold", gold)
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut model = ClientSideRowModel::new(
        GridOptions::new()
            .with_group_columns(["country", "sport"])
            .with_row_id(|r| r.value("id").to_key_string()),
        [ColumnDef::new("gold").with_agg_func(AggFunc::Sum)],
    )
    .expect("valid options");

    model.signals().warning.connect(|warning| {
        println!("warning: {warning}");
    });

    model
        .set_row_data(vec![
            medal(1, "US", "Swimming", 4),
            medal(2, "US", "Athletics", 2),
            medal(3, "FR", "Fencing", 3),
            medal(4, "US", "Swimming", 1),
            medal(5, "GB", "Cycling", 5),
        ])
        .expect("unique row ids");
    model.expand_or_collapse_all(true);

    let options = TreeFormatOptions {
        show_aggregates: true,
        ..TreeFormatOptions::default()
    };
    println!("{}", model.format_tree(&options));

    model.set_sort_model(SortModel::new().with(SortDescriptor::desc("gold")));
    println!("Sorted by gold:");
    println!("{}", model.format_tree(&options));

    model.apply_transaction(
        Transaction::new()
            .with_update(medal(3, "FR", "Fencing", 9))
            .with_remove(medal(99, "XX", "None", 0)),
    );
    println!("After transaction:");
    println!("{}", model.format_tree(&options));

    for index in 0..model.displayed_row_count() {
        if let (Some(row), Some(bounds)) = (model.displayed_row_at_index(index), model.row_bounds(index)) {
            println!("{index:>2} {:>6.1}px {}", bounds.top, row.id());
        }
    }
}
