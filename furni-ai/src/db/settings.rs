//! Settings database operations
//!
//! Key-value accessors for the settings table.

use sqlx::{Pool, Sqlite};
use furni_common::{Error, Result};

const FLOWISE_URL_KEY: &str = "flowise_api_url";

/// Flowise prediction endpoint stored in the database, if any
pub async fn get_flowise_url(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, FLOWISE_URL_KEY).await
}

pub async fn set_flowise_url(db: &Pool<Sqlite>, url: String) -> Result<()> {
    set_setting(db, FLOWISE_URL_KEY, url).await
}

/// Generic setting getter
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (upsert)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_flowise_url_round_trip() {
        let (pool, _dir) = test_pool().await;
        assert_eq!(get_flowise_url(&pool).await.unwrap(), None);

        set_flowise_url(&pool, "http://flowise.local/api/v1/prediction/a".into()).await.unwrap();
        set_flowise_url(&pool, "http://flowise.local/api/v1/prediction/b".into()).await.unwrap();
        assert_eq!(
            get_flowise_url(&pool).await.unwrap().as_deref(),
            Some("http://flowise.local/api/v1/prediction/b")
        );
    }
}
