//! Database operations for `car_listings`.

use carwatch_core::ExtractedListing;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `car_listings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub price_usd: Option<i32>,
    pub odometer: Option<i32>,
    pub username: Option<String>,
    pub phone_number: Option<i64>,
    pub image_url: Option<String>,
    pub images_count: Option<i32>,
    pub car_number: Option<String>,
    pub car_vin: Option<String>,
    /// Set on first insert and never touched by later upserts.
    pub datetime_found: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ListingRow> for ExtractedListing {
    fn from(row: ListingRow) -> Self {
        Self {
            title: row.title,
            price_usd: row.price_usd,
            odometer: row.odometer,
            username: row.username,
            phone_number: row.phone_number,
            image_url: row.image_url,
            images_count: row.images_count,
            car_number: row.car_number,
            car_vin: row.car_vin,
        }
    }
}

/// Upserts a listing keyed by its URL.
///
/// A conflicting URL overwrites every extracted field, including ones that
/// are now absent, so the row always mirrors the latest extraction.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_listing(
    pool: &PgPool,
    url: &str,
    listing: &ExtractedListing,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO car_listings \
             (url, title, price_usd, odometer, username, phone_number, \
              image_url, images_count, car_number, car_vin) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (url) DO UPDATE SET \
             title        = EXCLUDED.title, \
             price_usd    = EXCLUDED.price_usd, \
             odometer     = EXCLUDED.odometer, \
             username     = EXCLUDED.username, \
             phone_number = EXCLUDED.phone_number, \
             image_url    = EXCLUDED.image_url, \
             images_count = EXCLUDED.images_count, \
             car_number   = EXCLUDED.car_number, \
             car_vin      = EXCLUDED.car_vin, \
             updated_at   = NOW() \
         RETURNING id",
    )
    .bind(url)
    .bind(&listing.title)
    .bind(listing.price_usd)
    .bind(listing.odometer)
    .bind(&listing.username)
    .bind(listing.phone_number)
    .bind(&listing.image_url)
    .bind(listing.images_count)
    .bind(&listing.car_number)
    .bind(&listing.car_vin)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches a listing by URL, if one has been stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_listing_by_url(pool: &PgPool, url: &str) -> Result<Option<ListingRow>, DbError> {
    let row = sqlx::query_as::<_, ListingRow>(
        "SELECT id, url, title, price_usd, odometer, username, phone_number, \
                image_url, images_count, car_number, car_vin, datetime_found, updated_at \
         FROM car_listings \
         WHERE url = $1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
