// ============================================================================
// Integration Tests for the table engine pipeline
// ============================================================================
//
// These tests drive the engine the way a renderer would: mutate column,
// filter, sort and page state, then read the refreshed visible window.
//
// Test Coverage:
// - Per-column filters AND-composed across types
// - Text match modes and case folding
// - Stable type-aware sorting with non-coercing values last
// - Pagination windows and page clamping after filter changes
// - Column visibility and ordering in the rendered layout
// - Enum choice lists from declared domains and live rows
//
// ============================================================================

use chrono::{TimeZone, Utc};
use tablekit::{
    CellValue, ColumnDefinition, ColumnType, FilterSpec, MemoryStore, PageSize, Record,
    RowData, SortKey, TableEngine, TextMatchMode,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn people_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "ID", ColumnType::Number),
        ColumnDefinition::new("name", "Name", ColumnType::Text),
        ColumnDefinition::new("status", "Status", ColumnType::Enum)
            .enum_values(["Active", "Inactive"]),
    ]
}

fn people_rows() -> Vec<Record> {
    vec![
        Record::new().with("id", 1i64).with("name", "John Doe").with("status", "Active"),
        Record::new().with("id", 2i64).with("name", "Jane Smith").with("status", "Inactive"),
    ]
}

fn people_engine() -> TableEngine<MemoryStore> {
    TableEngine::open("people", people_columns(), MemoryStore::new()).unwrap()
}

fn staff_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "ID", ColumnType::Number).width(60),
        ColumnDefinition::new("name", "Name", ColumnType::Text).width(180),
        ColumnDefinition::new("status", "Status", ColumnType::Enum)
            .enum_values(["Active", "Inactive"]),
        ColumnDefinition::new("salary", "Salary", ColumnType::Number),
        ColumnDefinition::new("remote", "Remote", ColumnType::Bool),
        ColumnDefinition::new("joined", "Joined", ColumnType::Date),
    ]
}

fn staff_rows() -> Vec<Record> {
    let day = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();
    vec![
        Record::new()
            .with("id", 1i64)
            .with("name", "Alice Carter")
            .with("status", "Active")
            .with("salary", 95_000i64)
            .with("remote", true)
            .with("joined", day(2020, 1, 15)),
        Record::new()
            .with("id", 2i64)
            .with("name", "bob martin")
            .with("status", "Inactive")
            .with("salary", 43_000i64)
            .with("remote", false)
            .with("joined", day(2021, 6, 1)),
        Record::new()
            .with("id", 3i64)
            .with("name", "Carol Danvers")
            .with("status", "Active")
            .with("salary", 88_000i64)
            .with("remote", true)
            .with("joined", day(2019, 3, 20)),
        Record::new()
            .with("id", 4i64)
            .with("name", "dave lee")
            .with("status", "Active")
            .with("salary", "n/a")
            .with("remote", false)
            .with("joined", day(2022, 11, 5)),
        Record::new()
            .with("id", 5i64)
            .with("name", "Erin Cole")
            .with("status", "Inactive")
            .with("salary", 52_000i64)
            .with("remote", true),
        Record::new()
            .with("id", 6i64)
            .with("name", "Frank Wright")
            .with("status", "Active")
            .with("salary", 67_000i64)
            .with("remote", false)
            .with("joined", day(2023, 2, 10)),
        Record::new()
            .with("id", 7i64)
            .with("name", "grace hopper")
            .with("status", "Active")
            .with("salary", 120_000i64)
            .with("remote", true)
            .with("joined", day(2018, 7, 30)),
        Record::new()
            .with("id", 8i64)
            .with("status", "Inactive")
            .with("remote", false)
            .with("joined", day(2024, 1, 1)),
    ]
}

fn staff_engine() -> TableEngine<MemoryStore> {
    TableEngine::open("staff", staff_columns(), MemoryStore::new()).unwrap()
}

fn visible_ids(window: &tablekit::VisibleWindow<'_, Record>) -> Vec<i64> {
    window
        .rows
        .iter()
        .map(|row| match row.cell("id") {
            Some(CellValue::Integer(i)) => *i,
            _ => 0,
        })
        .collect()
}

fn page_size(n: usize) -> PageSize {
    PageSize::rows(n).unwrap()
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_enum_filter_narrows_to_selected_members() {
    let mut engine = people_engine();
    engine
        .set_filter("status", Some(FilterSpec::enum_selection(["Active"])))
        .unwrap();

    let rows = people_rows();
    let window = engine.refresh(&rows);
    assert_eq!(visible_ids(&window), [1]);
    assert_eq!(window.total_rows, 2);
    assert_eq!(window.total_filtered, 1);
}

#[test]
fn test_filters_compose_with_and_semantics() {
    let mut engine = staff_engine();
    engine
        .set_filter("status", Some(FilterSpec::enum_selection(["Active"])))
        .unwrap();
    engine
        .set_filter("salary", Some(FilterSpec::number_range(Some(50_000.0), None)))
        .unwrap();
    engine
        .set_filter("remote", Some(FilterSpec::bool_equals(true)))
        .unwrap();

    let rows = staff_rows();
    let window = engine.refresh(&rows);
    // Active AND salary >= 50k AND remote: Alice, Carol, Grace.
    assert_eq!(visible_ids(&window), [1, 3, 7]);
}

#[test]
fn test_text_modes_against_live_rows() {
    let rows = staff_rows();
    let mut engine = staff_engine();

    engine
        .set_filter("name", Some(FilterSpec::text(TextMatchMode::StartsWith, "c")))
        .unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [3]);

    engine
        .set_filter("name", Some(FilterSpec::text(TextMatchMode::EndsWith, "er")))
        .unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [1, 7]);

    engine
        .set_filter("name", Some(FilterSpec::text(TextMatchMode::NotContains, "e")))
        .unwrap();
    // Row 8 has no name cell at all, so it cannot match either.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [2, 6]);

    engine
        .set_filter("name", Some(FilterSpec::text(TextMatchMode::Equals, "DAVE LEE")))
        .unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [4]);
}

#[test]
fn test_case_sensitive_text_filter_override() {
    let rows = staff_rows();
    let mut engine = staff_engine();

    engine
        .set_filter("name", Some(FilterSpec::contains("CARTER")))
        .unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [1]);

    engine
        .set_filter("name", Some(FilterSpec::contains("CARTER").case_sensitive()))
        .unwrap();
    assert!(engine.refresh(&rows).is_empty());
}

#[test]
fn test_number_filter_excludes_rows_without_a_number() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine
        .set_filter("salary", Some(FilterSpec::number_range(Some(40_000.0), Some(90_000.0))))
        .unwrap();

    // dave's "n/a" and row 8's missing salary drop out of an active range.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [2, 3, 5, 6]);
}

#[test]
fn test_clear_filters_restores_every_row() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine
        .set_filter("status", Some(FilterSpec::enum_selection(["Active"])))
        .unwrap();
    engine
        .set_filter("remote", Some(FilterSpec::bool_equals(false)))
        .unwrap();
    assert_eq!(engine.refresh(&rows).total_filtered, 2);

    engine.clear_filters();
    let window = engine.refresh(&rows);
    assert_eq!(window.total_filtered, 8);
    assert_eq!(visible_ids(&window), [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn test_enum_select_none_matches_nothing() {
    let rows = people_rows();
    let mut engine = people_engine();
    engine
        .set_filter("status", Some(FilterSpec::enum_selection(Vec::<String>::new())))
        .unwrap();

    let window = engine.refresh(&rows);
    assert!(window.is_empty());
    assert_eq!(window.page_count, 0);
    assert_eq!(window.page_index, 0);
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_sorting_filtered_output() {
    let mut engine = people_engine();
    engine
        .set_filter("status", Some(FilterSpec::enum_selection(["Active"])))
        .unwrap();
    engine.set_sort_keys(vec![SortKey::desc("name")]).unwrap();

    let rows = people_rows();
    // Only row 1 survives the filter, so the sort has nothing to reorder.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [1]);
}

#[test]
fn test_numeric_sort_keeps_unparseable_last_both_ways() {
    let rows = staff_rows();
    let mut engine = staff_engine();

    engine.set_sort_keys(vec![SortKey::desc("salary")]).unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 1, 3, 6, 5, 2, 4, 8]);

    engine.set_sort_keys(vec![SortKey::asc("salary")]).unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [2, 5, 6, 3, 1, 7, 4, 8]);
}

#[test]
fn test_text_sort_folds_case() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine.set_sort_keys(vec![SortKey::asc("name")]).unwrap();

    // alice, bob, carol, dave, erin, frank, grace; the nameless row last.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [1, 2, 3, 4, 5, 6, 7, 8]);

    engine.set_sort_keys(vec![SortKey::desc("name")]).unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 6, 5, 4, 3, 2, 1, 8]);
}

#[test]
fn test_date_sort_with_missing_dates_last() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine.set_sort_keys(vec![SortKey::asc("joined")]).unwrap();

    // Erin (id 5) has no joined date and stays last even ascending.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 3, 1, 2, 4, 6, 8, 5]);
}

#[test]
fn test_multi_key_sort_breaks_ties() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine
        .set_sort_keys(vec![SortKey::asc("status"), SortKey::desc("id")])
        .unwrap();

    // Active ids descending, then Inactive ids descending.
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 6, 4, 3, 1, 8, 5, 2]);
}

#[test]
fn test_toggle_sort_cycle_returns_to_input_order() {
    let rows = staff_rows();
    let mut engine = staff_engine();

    engine.toggle_sort("salary").unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [2, 5, 6, 3, 1, 7, 4, 8]);

    engine.toggle_sort("salary").unwrap();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 1, 3, 6, 5, 2, 4, 8]);

    engine.toggle_sort("salary").unwrap();
    assert!(engine.sort_keys().is_empty());
    assert_eq!(visible_ids(&engine.refresh(&rows)), [1, 2, 3, 4, 5, 6, 7, 8]);
}

// ============================================================================
// Pagination
// ============================================================================

#[test]
fn test_second_page_of_sorted_rows() {
    let mut engine = people_engine();
    engine.set_sort_keys(vec![SortKey::asc("id")]).unwrap();
    engine.set_page_size(page_size(1));
    engine.set_page(1);

    let rows = people_rows();
    let window = engine.refresh(&rows);
    assert_eq!(visible_ids(&window), [2]);
    assert_eq!(window.page_index, 1);
    assert_eq!(window.page_count, 2);
}

#[test]
fn test_filter_shrink_clamps_page_index() {
    let mut engine = people_engine();
    engine.set_sort_keys(vec![SortKey::asc("id")]).unwrap();
    engine.set_page_size(page_size(1));
    engine.set_page(1);

    let rows = people_rows();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [2]);

    engine
        .set_filter("status", Some(FilterSpec::enum_selection(["Active"])))
        .unwrap();
    let window = engine.refresh(&rows);
    assert_eq!(window.page_index, 0);
    assert_eq!(visible_ids(&window), [1]);
}

#[test]
fn test_page_navigation_saturates_at_edges() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine.set_page_size(page_size(3));

    engine.prev_page();
    assert_eq!(engine.refresh(&rows).page_index, 0);

    engine.next_page();
    engine.next_page();
    assert_eq!(visible_ids(&engine.refresh(&rows)), [7, 8]);

    // Walking past the last page clamps back onto it.
    engine.next_page();
    let window = engine.refresh(&rows);
    assert_eq!(window.page_index, 2);
    assert_eq!(visible_ids(&window), [7, 8]);
}

#[test]
fn test_page_size_all_shows_everything() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine.set_page_size(PageSize::All);

    let window = engine.refresh(&rows);
    assert_eq!(window.len(), 8);
    assert_eq!(window.page_count, 1);
}

#[test]
fn test_changing_page_size_returns_to_first_page() {
    let rows = staff_rows();
    let mut engine = staff_engine();
    engine.set_page_size(page_size(2));
    engine.set_page(3);
    assert_eq!(engine.refresh(&rows).page_index, 3);

    engine.set_page_size(page_size(5));
    let window = engine.refresh(&rows);
    assert_eq!(window.page_index, 0);
    assert_eq!(visible_ids(&window), [1, 2, 3, 4, 5]);
}

// ============================================================================
// Columns and choice lists
// ============================================================================

#[test]
fn test_visible_columns_follow_order_and_visibility() {
    let mut engine = staff_engine();
    engine.set_order("status", 0).unwrap();
    engine.set_visible("joined", false).unwrap();
    engine.set_visible("remote", false).unwrap();

    let visible: Vec<&str> = engine
        .visible_columns()
        .iter()
        .map(|def| def.id.as_str())
        .collect();
    assert_eq!(visible, ["status", "id", "name", "salary"]);
}

#[test]
fn test_unique_values_for_filter_popups() {
    let rows = staff_rows();
    let engine = staff_engine();

    // Declared enum domain comes back verbatim.
    assert_eq!(
        engine.unique_values(&rows, "status").unwrap(),
        ["Active", "Inactive"]
    );

    // Undeclared columns scan the rows; absent cells render empty.
    let names = engine.unique_values(&rows, "name").unwrap();
    assert_eq!(names.len(), 8);
    assert_eq!(names[0], "");
    assert!(names.contains(&"grace hopper".to_string()));
}
