use super::*;
use crate::adapter::{MySqlAdapter, OracleAdapter, PostgresAdapter, SqliteAdapter};
use crate::metadata::{ColumnKind, EntityDescriptor, FieldDescriptor};
use crate::value::FromValue;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq)]
struct Invoice {
    id: i64,
    number: String,
    total: f64,
}

const INVOICE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor {
        field: "id",
        column: "id",
        kind: ColumnKind::Key,
    },
    FieldDescriptor {
        field: "number",
        column: "number",
        kind: ColumnKind::Writable,
    },
    FieldDescriptor {
        field: "total",
        column: "total",
        kind: ColumnKind::Writable,
    },
];

static INVOICE: EntityDescriptor = EntityDescriptor {
    type_name: "Invoice",
    table: None,
    fields: INVOICE_FIELDS,
};

impl FromRow for Invoice {
    fn from_row(row: &Row) -> RepoResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            number: row.try_get("number")?,
            total: row.try_get("total")?,
        })
    }
}

impl ToParams for Invoice {
    fn to_params(&self) -> Params {
        Params::new()
            .with("id", self.id)
            .with("number", self.number.as_str())
            .with("total", self.total)
    }
}

impl Entity for Invoice {
    fn descriptor() -> &'static EntityDescriptor {
        &INVOICE
    }

    fn set_column(&mut self, column: &str, value: Value) -> RepoResult<bool> {
        if column.eq_ignore_ascii_case("id") {
            self.id = i64::from_value(value)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Records statements and replays canned result sets in order.
#[derive(Default)]
struct Scripted {
    affected: u64,
    responses: Mutex<VecDeque<Vec<Vec<Row>>>>,
    log: Mutex<Vec<String>>,
}

impl Scripted {
    fn with_responses(responses: impl IntoIterator<Item = Vec<Vec<Row>>>) -> Self {
        Self {
            affected: 1,
            responses: Mutex::new(responses.into_iter().collect()),
            log: Mutex::default(),
        }
    }

    fn record(&self, cmd: &Command<'_>) {
        self.log.lock().unwrap().push(cmd.sql.to_string());
    }

    fn next(&self) -> Vec<Vec<Row>> {
        self.responses.lock().unwrap().pop_front().unwrap_or_default()
    }

    fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl QueryExecutor for Scripted {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    async fn execute(&self, cmd: Command<'_>) -> RepoResult<u64> {
        self.record(&cmd);
        Ok(self.affected)
    }

    async fn query(&self, cmd: Command<'_>) -> RepoResult<Vec<Row>> {
        self.record(&cmd);
        Ok(self.next().into_iter().next().unwrap_or_default())
    }

    async fn query_multiple(&self, cmd: Command<'_>) -> RepoResult<Vec<Vec<Row>>> {
        self.record(&cmd);
        Ok(self.next())
    }
}

fn id_row(id: Value) -> Row {
    Row::from_pairs([("id", id)])
}

fn invoice() -> Invoice {
    Invoice {
        id: 0,
        number: "INV-1".into(),
        total: 12.5,
    }
}

#[tokio::test]
async fn returning_insert_writes_key_back() {
    let exec = Scripted::with_responses([vec![vec![id_row(Value::I64(41))]]]);
    let repo = Repository::new(&exec, Arc::new(PostgresAdapter));

    let mut inv = invoice();
    assert_eq!(repo.insert(&mut inv).await.unwrap(), 41);
    assert_eq!(inv.id, 41);

    let log = exec.statements();
    assert_eq!(log.len(), 1);
    assert!(log[0].starts_with("INSERT INTO invoices"));
    assert!(log[0].ends_with("RETURNING \"id\""));
}

#[tokio::test]
async fn follow_up_query_recovers_key() {
    let exec = Scripted::with_responses([vec![vec![id_row(Value::I64(7))]]]);
    let repo = Repository::new(&exec, Arc::new(MySqlAdapter));

    let mut inv = invoice();
    assert_eq!(repo.insert(&mut inv).await.unwrap(), 7);
    assert_eq!(inv.id, 7);
    assert_eq!(exec.statements()[1], "SELECT LAST_INSERT_ID() id");
}

#[tokio::test]
async fn trailing_select_with_null_key_returns_zero() {
    let exec = Scripted::with_responses([vec![vec![id_row(Value::Null)]]]);
    let repo = Repository::new(&exec, Arc::new(SqliteAdapter));

    let mut inv = invoice();
    assert_eq!(repo.insert(&mut inv).await.unwrap(), 0);
    assert_eq!(inv.id, 0);
}

#[tokio::test]
async fn oracle_insert_reports_affected_rows() {
    let exec = Scripted::with_responses([]);
    let repo = Repository::new(&exec, Arc::new(OracleAdapter));

    let mut inv = invoice();
    assert_eq!(repo.insert(&mut inv).await.unwrap(), 1);
    assert_eq!(inv.id, 0);
    assert!(exec.statements()[0].contains(":number"));
}

#[tokio::test]
async fn clean_tracked_entity_is_not_updated() {
    let exec = Scripted::with_responses([]);
    let repo = Repository::new(&exec, Arc::new(SqliteAdapter));

    let mut tracked = Tracked::loaded(Invoice { id: 3, ..invoice() });
    assert!(!repo.update_tracked(&tracked).await.unwrap());
    assert!(exec.statements().is_empty());

    tracked.set(|i| i.total = 20.0);
    assert!(repo.update_tracked(&tracked).await.unwrap());
    let log = exec.statements();
    assert_eq!(log.len(), 1);
    assert!(log[0].starts_with("UPDATE invoices SET"));
}

#[tokio::test]
async fn get_page_fills_record_count() {
    let count = vec![vec![Row::from_pairs([("total", Value::I64(25))])]];
    let data = vec![vec![Row::from_pairs([
        ("id", Value::I64(11)),
        ("number", Value::Text("INV-11".into())),
        ("total", Value::F64(1.0)),
    ])]];
    let exec = Scripted::with_responses([count, data]);
    let repo = Repository::new(&exec, Arc::new(SqliteAdapter));

    let mut page = PageParam::new(2, 10).sort("id");
    let items: Vec<Invoice> = repo
        .get_page("invoices", "*", "", &mut page)
        .await
        .unwrap();
    assert_eq!(page.record_count, 25);
    assert_eq!(page.page_count(), 3);
    assert_eq!(items[0].id, 11);

    let log = exec.statements();
    assert!(log[0].contains("(1=1)"));
    assert!(log[1].ends_with("LIMIT 10,10"));
}

#[tokio::test]
async fn query_page_needs_two_result_sets() {
    let exec = Scripted::with_responses([vec![vec![Row::from_pairs([("n", Value::I64(1))])]]]);
    let repo = Repository::new(&exec, Arc::new(SqliteAdapter));
    let err = repo
        .query_page::<Invoice>("SELECT COUNT(*) FROM invoices", &())
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Query(_)));
}

#[tokio::test]
async fn oracle_pages_with_rownum() {
    let exec = Scripted::with_responses([vec![vec![Row::from_pairs([("total", Value::Null)])]]]);
    let repo = Repository::new(&exec, Arc::new(OracleAdapter));
    let mut page = PageParam::new(1, 5);
    let items: Vec<Invoice> = repo.get_page("invoices", "*", "", &mut page).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(page.record_count, 0);
    assert!(exec.statements()[1].contains("ROWNUM"));
}
