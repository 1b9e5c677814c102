//! Live integration tests for carwatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/carwatch-db/`).

use carwatch_core::{ExtractedListing, RunSummary};
use carwatch_db::{
    complete_scrape_run, create_scrape_run, fail_scrape_run, get_listing_by_url, get_scrape_run,
    list_scrape_runs, start_scrape_run, upsert_listing, DbError,
};

const URL: &str = "https://auto.ria.com/uk/auto_volkswagen_passat_35512345.html";

fn full_listing() -> ExtractedListing {
    ExtractedListing {
        title: Some("Volkswagen Passat 2015".to_string()),
        price_usd: Some(12_500),
        odometer: Some(180_000),
        username: Some("Олександр".to_string()),
        phone_number: Some(380_931_234_567),
        image_url: Some("https://cdn.riastatic.com/photos/auto/photo/1.jpg".to_string()),
        images_count: Some(14),
        car_number: Some("AA 1234 BB".to_string()),
        car_vin: Some("WVWZZZ3CZFE000001".to_string()),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_listing_inserts_new_row(pool: sqlx::PgPool) {
    let id = upsert_listing(&pool, URL, &full_listing()).await.unwrap();
    assert!(id > 0);

    let row = get_listing_by_url(&pool, URL).await.unwrap().unwrap();
    assert_eq!(row.id, id);
    assert_eq!(row.phone_number, Some(380_931_234_567));
    assert_eq!(ExtractedListing::from(row), full_listing());
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_listing_overwrites_all_fields_on_conflict(pool: sqlx::PgPool) {
    let first_id = upsert_listing(&pool, URL, &full_listing()).await.unwrap();
    let first = get_listing_by_url(&pool, URL).await.unwrap().unwrap();

    let sparse = ExtractedListing {
        title: Some("Volkswagen Passat 2015 (updated)".to_string()),
        ..ExtractedListing::default()
    };
    let second_id = upsert_listing(&pool, URL, &sparse).await.unwrap();
    assert_eq!(first_id, second_id, "upsert must keep one row per URL");

    let row = get_listing_by_url(&pool, URL).await.unwrap().unwrap();
    assert_eq!(row.title.as_deref(), Some("Volkswagen Passat 2015 (updated)"));
    assert!(row.phone_number.is_none());
    assert!(row.price_usd.is_none());
    assert_eq!(row.datetime_found, first.datetime_found);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM car_listings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_listing_by_url_returns_none_for_unknown_url(pool: sqlx::PgPool) {
    let row = get_listing_by_url(&pool, "https://auto.ria.com/uk/auto_missing_1.html")
        .await
        .unwrap();
    assert!(row.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn scrape_run_lifecycle_records_summary(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "cli").await.unwrap();
    assert_eq!(run.status, "queued");

    start_scrape_run(&pool, run.id).await.unwrap();
    let summary = RunSummary {
        with_phone: 4,
        without_phone: 2,
        errors: 1,
    };
    complete_scrape_run(&pool, run.id, &summary).await.unwrap();

    let row = get_scrape_run(&pool, run.id).await.unwrap();
    assert_eq!(row.status, "succeeded");
    assert_eq!((row.with_phone, row.without_phone, row.errors), (4, 2, 1));
    assert!(row.started_at.is_some());
    assert!(row.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn start_scrape_run_twice_is_rejected(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "scheduler").await.unwrap();
    start_scrape_run(&pool, run.id).await.unwrap();

    let err = start_scrape_run(&pool, run.id).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidRunTransition {
            expected_status: "queued",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn fail_scrape_run_stores_message(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "cli").await.unwrap();
    start_scrape_run(&pool, run.id).await.unwrap();
    fail_scrape_run(&pool, run.id, "discovery failed").await.unwrap();

    let runs = list_scrape_runs(&pool, 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "failed");
    assert_eq!(runs[0].error_message.as_deref(), Some("discovery failed"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn get_scrape_run_missing_is_not_found(pool: sqlx::PgPool) {
    let err = get_scrape_run(&pool, 9_999).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn migrations_already_applied_report_zero(pool: sqlx::PgPool) {
    carwatch_db::ping(&pool).await.unwrap();
    assert_eq!(carwatch_db::run_migrations(&pool).await.unwrap(), 0);
}
