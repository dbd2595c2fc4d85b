//! Runs against a live PostgreSQL when `DATABASE_URL` is set; skipped otherwise.

#![cfg(all(feature = "postgres", feature = "derive"))]

use rust_decimal::Decimal;
use sqlrepo::{ConnectionFactory, DatabaseConfig, DatabaseType, Entity, PageParam, Repository, Value, params};

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "sqlrepo_live_notes")]
struct Note {
    #[orm(key)]
    id: i64,
    title: String,
    price: Decimal,
    #[orm(computed)]
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok()
}

#[tokio::test]
async fn crud_and_paging_round_trip() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let config = DatabaseConfig::new(DatabaseType::PostgreSql, url);
    let repo = Repository::from_config(&config, &ConnectionFactory::with_defaults()).unwrap();

    repo.execute("DROP TABLE IF EXISTS sqlrepo_live_notes", &()).await.unwrap();
    repo.execute(
        "CREATE TABLE sqlrepo_live_notes (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            price NUMERIC(10, 2) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        &(),
    )
    .await
    .unwrap();

    for n in 1..=12 {
        let mut note = Note {
            title: format!("note {n}"),
            price: Decimal::new(n * 125, 2),
            ..Note::default()
        };
        let id = repo.insert(&mut note).await.unwrap();
        assert_eq!(note.id, id);
    }

    let mut page = PageParam::new(2, 5).sort("id");
    let notes: Vec<Note> = repo
        .get_page("sqlrepo_live_notes", "*", "", &mut page)
        .await
        .unwrap();
    assert_eq!(page.record_count, 12);
    assert_eq!(notes.first().map(|n| n.id), Some(6));
    assert!(notes.iter().all(|n| n.created_at.is_some()));
    assert_eq!(notes[0].price, Decimal::new(750, 2));

    let total = repo
        .execute_scalar("SELECT SUM(price) FROM sqlrepo_live_notes WHERE price > @min", &params! { "min" => 10 })
        .await
        .unwrap();
    assert_eq!(total, Value::Decimal(Decimal::new(5250, 2)));

    let renamed = repo
        .update_partial::<Note>(&params! { "title" => "first" }, Some(&params! { "id" => 1 }), false)
        .await
        .unwrap();
    assert!(renamed);

    assert!(repo.delete_all::<Note>().await.unwrap());
    repo.execute("DROP TABLE sqlrepo_live_notes", &()).await.unwrap();
}
