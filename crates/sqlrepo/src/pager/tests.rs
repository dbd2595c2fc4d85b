use super::*;
use crate::adapter::AdapterRegistry;

fn page2() -> Pager {
    Pager::new("orders", 2, 10)
        .unwrap()
        .filter("status = 'open'")
        .order_by("id")
}

#[test]
fn rejects_invalid_page_requests() {
    assert!(Pager::new("t", 0, 10).unwrap_err().is_configuration());
    assert!(Pager::new("t", 1, 0).unwrap_err().is_configuration());
}

#[test]
fn window_bounds() {
    let p = page2();
    assert_eq!(p.min_row(), 10);
    assert_eq!(p.max_row(), 20);
}

#[test]
fn blank_filter_normalizes() {
    let p = Pager::new("orders", 1, 5).unwrap().filter("   ");
    assert_eq!(p.filter_text(), "(1=1)");
    assert_eq!(
        p.to_sql(true, DatabaseType::MySql),
        "SELECT COUNT(*) AS total FROM orders WHERE (1=1)"
    );
}

#[test]
fn count_sql_is_dialect_independent() {
    let p = page2();
    let expected = "SELECT COUNT(*) AS total FROM orders WHERE status = 'open'";
    for ty in DatabaseType::ALL {
        assert_eq!(p.to_sql(true, ty), expected);
    }
}

#[test]
fn only_statements_containing_from_are_wrapped() {
    let table = Pager::new("orders", 1, 5).unwrap();
    assert_eq!(table.source(), "orders");

    let select = Pager::new("select id, total FROM orders o", 1, 5).unwrap();
    assert_eq!(select.source(), "(select id, total FROM orders o) AA");
}

#[test]
fn sql_server_uses_row_number_between() {
    let sql = page2().to_sql(false, DatabaseType::SqlServer);
    assert_eq!(
        sql,
        "WITH paging AS (SELECT ROW_NUMBER() OVER (ORDER BY id) AS rownumber, * FROM orders \
         WHERE status = 'open') SELECT * FROM paging WHERE rownumber BETWEEN 11 AND 20"
    );
}

#[test]
fn sql_server_without_sort_still_orders() {
    let sql = Pager::new("orders", 1, 5)
        .unwrap()
        .to_sql(false, DatabaseType::SqlServer);
    assert!(sql.contains("OVER (ORDER BY (SELECT NULL))"));
}

#[test]
fn oracle_keeps_order_by_innermost() {
    let sql = page2().to_sql(false, DatabaseType::Oracle);
    assert_eq!(
        sql,
        "SELECT b.* FROM (SELECT a.*, ROWNUM AS rowIndex FROM (SELECT * FROM orders \
         WHERE status = 'open' ORDER BY id) a) b WHERE b.rowIndex > 10 AND b.rowIndex <= 20"
    );
}

#[test]
fn mysql_and_sqlite_share_limit_form() {
    let p = page2().fields("id, total");
    let expected = "SELECT id, total FROM orders WHERE status = 'open' ORDER BY id LIMIT 10,10";
    assert_eq!(p.to_sql(false, DatabaseType::MySql), expected);
    assert_eq!(p.to_sql(false, DatabaseType::Sqlite), expected);
}

#[test]
fn postgres_uses_limit_offset() {
    assert_eq!(
        page2().to_sql(false, DatabaseType::PostgreSql),
        "SELECT * FROM orders WHERE status = 'open' ORDER BY id LIMIT 10 OFFSET 10"
    );
}

#[test]
fn page_sql_goes_through_adapter() {
    let registry = AdapterRegistry::with_defaults();
    let adapter = registry.get(DatabaseType::Sqlite).unwrap();
    let (count, data) = page2().page_sql(adapter.as_ref()).unwrap();
    assert!(count.starts_with("SELECT COUNT(*) AS total"));
    assert!(data.ends_with("LIMIT 10,10"));
}

#[test]
fn page_param_page_count() {
    let mut p = PageParam::new(1, 10);
    p.record_count = 25;
    assert_eq!(p.page_count(), 3);
}
