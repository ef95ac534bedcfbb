use std::marker::PhantomData;

use anyhow::Context;
use serde_json::{json, Value};
use tokio_postgres::{Client, NoTls, Row};

use crate::api::{Filter, Where};
use crate::resource_store::{
    apply_patch, prepare_replacement, validate_resource, Resource, ResourceStore, StoreError,
};

/// One table per collection, records kept as JSONB next to their id
pub struct PostgresResourceStore<T> {
    client: Client,
    _resource: PhantomData<fn() -> T>,
}

#[derive(Debug, Clone)]
pub struct PostgresResourceStoreConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl<T: Resource> PostgresResourceStore<T> {
    pub async fn init(config: &PostgresResourceStoreConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!(
            "Connecting {} store to postgres at {}",
            T::COLLECTION,
            config.hostname
        );
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(&format!(
                "
        CREATE TABLE IF NOT EXISTS {table} (
            seq             BIGSERIAL,
            id              TEXT PRIMARY KEY,
            params          JSONB NOT NULL
            )
        ",
                table = T::COLLECTION
            ))
            .await
            .with_context(|| format!("Failed to setup {} table", T::COLLECTION))?;

        for field in T::UNIQUE_FIELDS {
            client
                .batch_execute(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {table}_{field}_key ON {table} ((params->>'{field}'))",
                    table = T::COLLECTION,
                ))
                .await
                .with_context(|| format!("Failed to setup unique {} index", field))?;
        }

        Ok(Self {
            client,
            _resource: PhantomData,
        })
    }

    fn record_from_row(row: &Row) -> Result<T, StoreError> {
        let params: Value = row.try_get(0)?;
        Ok(serde_json::from_value(params)?)
    }

    fn where_json(where_clause: Option<&Where>) -> Value {
        Value::Object(where_clause.cloned().unwrap_or_default())
    }
}

/// How many times a patch is applied over a freshly read record before giving up
const UPDATE_ATTEMPTS: usize = 10;

fn to_sql_bound(value: Option<u64>) -> Option<i64> {
    value.map(|v| i64::try_from(v).unwrap_or(i64::MAX))
}

#[async_trait::async_trait]
impl<T: Resource> ResourceStore<T> for PostgresResourceStore<T> {
    async fn create(&self, item: T) -> Result<T, StoreError> {
        validate_resource(&item)?;
        let statement = format!(
            "INSERT INTO {} (id, params) VALUES ($1, $2)",
            T::COLLECTION
        );
        self.client
            .execute(&statement, &[&item.id(), &json!(item)])
            .await?;
        Ok(item)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let statement = format!(
            "SELECT params FROM {} WHERE params @> $1 ORDER BY seq LIMIT $2 OFFSET $3",
            T::COLLECTION
        );
        let limit = to_sql_bound(filter.limit);
        let offset = to_sql_bound(filter.skip).unwrap_or_default();
        let rows = self
            .client
            .query(
                &statement,
                &[
                    &Self::where_json(filter.where_clause.as_ref()),
                    &limit,
                    &offset,
                ],
            )
            .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<T, StoreError> {
        let statement = format!("SELECT params FROM {} WHERE id = $1", T::COLLECTION);
        let rows = self.client.query(&statement, &[&id]).await?;
        let row = rows.first().ok_or_else(|| StoreError::not_found::<T>(id))?;
        Self::record_from_row(row)
    }

    async fn count(&self, where_clause: Option<&Where>) -> Result<u64, StoreError> {
        let statement = format!(
            "SELECT COUNT(*) FROM {} WHERE params @> $1",
            T::COLLECTION
        );
        let row = self
            .client
            .query_one(&statement, &[&Self::where_json(where_clause)])
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn update_by_id(&self, id: &str, patch: Value) -> Result<T, StoreError> {
        let select = format!("SELECT params FROM {} WHERE id = $1", T::COLLECTION);
        // Writes only over the params that were read, a concurrent change forces a re-read
        let swap = format!(
            "UPDATE {} SET params = $1 WHERE id = $2 AND params = $3 RETURNING id",
            T::COLLECTION
        );
        for _ in 0..UPDATE_ATTEMPTS {
            let rows = self.client.query(&select, &[&id]).await?;
            let row = rows.first().ok_or_else(|| StoreError::not_found::<T>(id))?;
            let stored: Value = row.try_get(0)?;
            let current: T = serde_json::from_value(stored.clone())?;
            let updated = apply_patch(&current, patch.clone())?;

            let swapped = self
                .client
                .query(&swap, &[&json!(updated), &id, &stored])
                .await?;
            if !swapped.is_empty() {
                return Ok(updated);
            }
            tracing::debug!("{} {} changed while patching, retrying", T::NAME, id);
        }
        Err(StoreError::Conflict(format!(
            "{} {} kept changing while being patched",
            T::NAME,
            id
        )))
    }

    async fn replace_by_id(&self, id: &str, item: T) -> Result<T, StoreError> {
        let item = prepare_replacement(id, item)?;
        self.replace_stored(id, &item).await?;
        Ok(item)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let statement = format!("DELETE FROM {} WHERE id = $1 RETURNING id", T::COLLECTION);
        let rows = self.client.query(&statement, &[&id]).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found::<T>(id));
        }
        Ok(())
    }
}

impl<T: Resource> PostgresResourceStore<T> {
    async fn replace_stored(&self, id: &str, item: &T) -> Result<(), StoreError> {
        let statement = format!(
            "UPDATE {} SET params = $1 WHERE id = $2 RETURNING id",
            T::COLLECTION
        );
        let rows = self.client.query(&statement, &[&json!(item), &id]).await?;
        if rows.is_empty() {
            return Err(StoreError::not_found::<T>(id));
        }
        Ok(())
    }
}
