pub use in_memory_resource_store::InMemoryResourceStore;
pub use postgres_resource_store::{PostgresResourceStore, PostgresResourceStoreConfig};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_postgres::error::SqlState;

use crate::api::{Filter, ResourceId, Where};

mod in_memory_resource_store;
mod postgres_resource_store;

/// Name of the identity field every resource serializes
pub const ID_FIELD: &str = "id";

/// An entity owned by exactly one resource store, keyed by an opaque string id
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, used both as URL segment and table name
    const COLLECTION: &'static str;
    /// Human readable entity name used in messages
    const NAME: &'static str;
    /// Top level JSON fields that, besides the id, must be unique within the collection
    const UNIQUE_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn set_id(&mut self, id: ResourceId);

    /// Entity specific checks, the id is checked by [`validate_resource`]
    fn validate(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub fn validate_resource<T: Resource>(item: &T) -> Result<(), StoreError> {
    if item.id().trim().is_empty() {
        return Err(StoreError::Invalid(format!("{} id must not be empty", T::NAME)));
    }
    item.validate()
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::Invalid(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: ResourceId },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store responded with status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to deserialize record: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

impl StoreError {
    pub fn not_found<T: Resource>(id: &str) -> Self {
        StoreError::NotFound {
            kind: T::NAME,
            id: id.to_string(),
        }
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_error) if db_error.code() == &SqlState::UNIQUE_VIOLATION => {
                StoreError::Conflict(db_error.message().to_string())
            }
            _ => StoreError::DatabaseFailure(err),
        }
    }
}

/// Narrow CRUD interface of a resource store.
/// Implemented by the storage adapters behind each service and by the HTTP client used to reach them
#[async_trait::async_trait]
pub trait ResourceStore<T: Resource>: Send + Sync {
    /// Adds a record, fails with Conflict if the id or a unique field is already taken
    async fn create(&self, item: T) -> Result<T, StoreError>;
    /// Lists records matching the filter, in insertion order
    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError>;
    /// Retrieves a single record, fails with NotFound if absent
    async fn find_by_id(&self, id: &str) -> Result<T, StoreError>;
    /// Counts records matching the where clause
    async fn count(&self, where_clause: Option<&Where>) -> Result<u64, StoreError>;
    /// Applies a JSON merge patch to the record and returns the result.
    /// The id can not be changed by a patch
    async fn update_by_id(&self, id: &str, patch: serde_json::Value) -> Result<T, StoreError>;
    /// Replaces the whole record, keeping its id
    async fn replace_by_id(&self, id: &str, item: T) -> Result<T, StoreError>;
    /// Removes the record, fails with NotFound if absent
    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;
}

/// Merges `patch` into the JSON form of `current` and validates the outcome
pub(crate) fn apply_patch<T: Resource>(
    current: &T,
    mut patch: serde_json::Value,
) -> Result<T, StoreError> {
    let Some(patch_fields) = patch.as_object_mut() else {
        return Err(StoreError::Invalid("patch must be a JSON object".to_string()));
    };
    patch_fields.remove(ID_FIELD);

    let mut merged = serde_json::to_value(current)?;
    json_patch::merge(&mut merged, &patch);
    let updated: T = serde_json::from_value(merged)
        .map_err(|err| StoreError::Invalid(format!("patched {} is invalid: {}", T::NAME, err)))?;
    validate_resource(&updated)?;
    Ok(updated)
}

/// Makes the body of a replace carry the id from the path
pub(crate) fn prepare_replacement<T: Resource>(id: &str, mut item: T) -> Result<T, StoreError> {
    if item.id().is_empty() {
        item.set_id(id.to_string());
    } else if item.id() != id {
        return Err(StoreError::Invalid(format!(
            "{} id {} does not match {}",
            T::NAME,
            item.id(),
            id
        )));
    }
    validate_resource(&item)?;
    Ok(item)
}
