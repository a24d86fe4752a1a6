//! End-to-end walkthrough of the table engine.
//!
//! Boots a staff table backed by a file store, applies filters and sorting,
//! pages through the visible window, reshapes the column layout, saves the
//! view state and then restores it on a second boot.
//!
//! Run with:
//!   cargo run --example table_demo

use anyhow::Result;
use chrono::{TimeZone, Utc};
use tablekit::{
    ColumnDefinition, ColumnType, FileStore, FilterSpec, PageSize, Record, RowData, SortKey,
    TableEngine, VisibleWindow,
};

fn columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "ID", ColumnType::Number).width(50),
        ColumnDefinition::new("name", "Name", ColumnType::Text).width(160),
        ColumnDefinition::new("status", "Status", ColumnType::Enum)
            .enum_values(["Active", "Inactive"]),
        ColumnDefinition::new("salary", "Salary", ColumnType::Number),
        ColumnDefinition::new("joined", "Joined", ColumnType::Date).width(140),
    ]
}

fn rows() -> Vec<Record> {
    let day = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
    vec![
        Record::new()
            .with("id", 1i64)
            .with("name", "Alice Carter")
            .with("status", "Active")
            .with("salary", 95_000i64)
            .with("joined", day(2020, 1, 15)),
        Record::new()
            .with("id", 2i64)
            .with("name", "Bob Martin")
            .with("status", "Inactive")
            .with("salary", 43_000i64)
            .with("joined", day(2021, 6, 1)),
        Record::new()
            .with("id", 3i64)
            .with("name", "Carol Danvers")
            .with("status", "Active")
            .with("salary", 88_000i64)
            .with("joined", day(2019, 3, 20)),
        Record::new()
            .with("id", 4i64)
            .with("name", "Dave Lee")
            .with("status", "Active")
            .with("salary", "n/a")
            .with("joined", day(2022, 11, 5)),
        Record::new()
            .with("id", 5i64)
            .with("name", "Erin Cole")
            .with("status", "Inactive")
            .with("salary", 52_000i64),
        Record::new()
            .with("id", 6i64)
            .with("name", "Frank Wright")
            .with("status", "Active")
            .with("salary", 67_000i64)
            .with("joined", day(2023, 2, 10)),
        Record::new()
            .with("id", 7i64)
            .with("name", "Grace Hopper")
            .with("status", "Active")
            .with("salary", 120_000i64)
            .with("joined", day(2018, 7, 30)),
    ]
}

fn print_window(engine: &TableEngine<FileStore>, window: &VisibleWindow<'_, Record>) {
    let visible = engine.visible_columns();
    let header: Vec<String> = visible
        .iter()
        .map(|def| format!("{:<16}", def.title))
        .collect();
    println!("  {}", header.join(" "));

    for row in &window.rows {
        let cells: Vec<String> = visible
            .iter()
            .map(|def| {
                let text = row.cell(&def.id).map(|c| c.render()).unwrap_or_default();
                format!("{:<16}", text)
            })
            .collect();
        println!("  {}", cells.join(" "));
    }
    println!(
        "  page {}/{} | {} of {} rows after filters\n",
        window.page_index + 1,
        window.page_count.max(1),
        window.total_filtered,
        window.total_rows,
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== TableKit Demo ===\n");

    let data_dir = tempfile::tempdir()?;
    let settings_path = data_dir.path().join("view-settings.bin");
    let rows = rows();

    println!("1) Boot #1: defaults");
    let store = FileStore::open(&settings_path)?;
    let mut engine = TableEngine::open("staff", columns(), store)?;
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("2) Filter to active staff earning at least 60k, highest salary first");
    engine.set_filter("status", Some(FilterSpec::enum_selection(["Active"])))?;
    engine.set_filter("salary", Some(FilterSpec::number_range(Some(60_000.0), None)))?;
    engine.set_sort_keys(vec![SortKey::desc("salary")])?;
    let chips: Vec<String> = engine
        .filters()
        .filters()
        .iter()
        .map(|(column, spec)| format!("[{}: {}]", column, spec))
        .collect();
    println!("  active filters: {}", chips.join(" "));
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("3) Page through two rows at a time");
    engine.set_page_size(PageSize::rows(2).expect("page size"));
    let window = engine.refresh(&rows);
    print_window(&engine, &window);
    engine.next_page();
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("4) Reshape the layout: status first, hide the join date");
    engine.set_order("status", 0)?;
    engine.set_visible("joined", false)?;
    engine.set_width("name", 220)?;
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("5) Filter choices offered for the status popup");
    println!("  {:?}\n", engine.unique_values(&rows, "status")?);

    println!(
        "6) Save the view state (unsaved changes: {})",
        engine.has_unsaved_changes()
    );
    engine.save()?;
    println!("  saved, unsaved changes: {}\n", engine.has_unsaved_changes());
    drop(engine);

    println!("7) Boot #2: the saved view comes back");
    let store = FileStore::open(&settings_path)?;
    let mut engine = TableEngine::open("staff", columns(), store)?;
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("8) Clear filters and the saved state");
    engine.clear_filters();
    engine.clear_saved_state()?;
    let window = engine.refresh(&rows);
    print_window(&engine, &window);

    println!("Done.");
    Ok(())
}
