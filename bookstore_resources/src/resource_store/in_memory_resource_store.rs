use serde_json::Value;

use crate::api::{matches_where, Filter, Where};
use crate::resource_store::{
    apply_patch, prepare_replacement, validate_resource, Resource, ResourceStore, StoreError,
};

/// Keeps records in insertion order behind a single lock
pub struct InMemoryResourceStore<T> {
    records: parking_lot::RwLock<Vec<T>>,
}

impl<T> Default for InMemoryResourceStore<T> {
    fn default() -> Self {
        Self {
            records: Default::default(),
        }
    }
}

impl<T: Resource> InMemoryResourceStore<T> {
    /// Store pre-filled with records, useful to seed fixtures
    pub fn with_records(records: impl IntoIterator<Item = T>) -> Self {
        Self {
            records: parking_lot::RwLock::new(records.into_iter().collect()),
        }
    }

    fn position(records: &[T], id: &str) -> Option<usize> {
        records.iter().position(|record| record.id() == id)
    }

    /// Checks `candidate` against every record except the one at `skip_index`
    fn ensure_unique(
        records: &[T],
        candidate: &T,
        skip_index: Option<usize>,
    ) -> Result<(), StoreError> {
        if T::UNIQUE_FIELDS.is_empty() {
            return Ok(());
        }
        let candidate_json = serde_json::to_value(candidate)?;
        for (index, record) in records.iter().enumerate() {
            if Some(index) == skip_index {
                continue;
            }
            let record_json = serde_json::to_value(record)?;
            for field in T::UNIQUE_FIELDS {
                let taken = candidate_json
                    .get(field)
                    .filter(|value| !value.is_null())
                    .is_some_and(|value| record_json.get(field) == Some(value));
                if taken {
                    return Err(StoreError::Conflict(format!(
                        "{} with this {} already exists",
                        T::NAME,
                        field
                    )));
                }
            }
        }
        Ok(())
    }

    fn matching(records: &[T], where_clause: Option<&Where>) -> Result<Vec<T>, StoreError> {
        let mut result = vec![];
        for record in records {
            let json: Value = serde_json::to_value(record)?;
            if matches_where(where_clause, &json) {
                result.push(record.clone());
            }
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl<T: Resource> ResourceStore<T> for InMemoryResourceStore<T> {
    async fn create(&self, item: T) -> Result<T, StoreError> {
        validate_resource(&item)?;
        let mut records = self.records.write();
        if Self::position(&records, item.id()).is_some() {
            return Err(StoreError::Conflict(format!(
                "{} {} already exists",
                T::NAME,
                item.id()
            )));
        }
        Self::ensure_unique(&records, &item, None)?;
        records.push(item.clone());
        Ok(item)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let records = self.records.read();
        let skip = filter.skip.unwrap_or_default() as usize;
        let limit = filter.limit.map(|limit| limit as usize).unwrap_or(usize::MAX);
        Ok(Self::matching(&records, filter.where_clause.as_ref())?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<T, StoreError> {
        self.records
            .read()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found::<T>(id))
    }

    async fn count(&self, where_clause: Option<&Where>) -> Result<u64, StoreError> {
        let records = self.records.read();
        Ok(Self::matching(&records, where_clause)?.len() as u64)
    }

    async fn update_by_id(&self, id: &str, patch: Value) -> Result<T, StoreError> {
        let mut records = self.records.write();
        let index = Self::position(&records, id).ok_or_else(|| StoreError::not_found::<T>(id))?;
        let updated = apply_patch(&records[index], patch)?;
        Self::ensure_unique(&records, &updated, Some(index))?;
        records[index] = updated.clone();
        Ok(updated)
    }

    async fn replace_by_id(&self, id: &str, item: T) -> Result<T, StoreError> {
        let item = prepare_replacement(id, item)?;
        let mut records = self.records.write();
        let index = Self::position(&records, id).ok_or_else(|| StoreError::not_found::<T>(id))?;
        Self::ensure_unique(&records, &item, Some(index))?;
        records[index] = item.clone();
        Ok(item)
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let index = Self::position(&records, id).ok_or_else(|| StoreError::not_found::<T>(id))?;
        records.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod in_memory_resource_store_tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::api::{Author, Book, Filter, Where};
    use crate::resource_store::{InMemoryResourceStore, Resource, ResourceStore, StoreError};

    fn author(id: &str, name: &str) -> Author {
        Author {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    /// Tests if create and find_by_id work correctly
    async fn test_create_author_and_get_it() {
        let store = InMemoryResourceStore::<Author>::default();

        let not_found = store.find_by_id("missing").await;
        assert!(matches!(not_found, Err(StoreError::NotFound { .. })));

        let created = store
            .create(author("a1", "Ursula"))
            .await
            .expect("Failed to create author");
        assert_eq!(created, author("a1", "Ursula"));

        let fetched = store.find_by_id("a1").await.expect("Failed to get author");
        assert_eq!(fetched, author("a1", "Ursula"));

        let duplicate = store.create(author("a1", "Someone else")).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let invalid = store.create(author("", "No id")).await;
        assert!(matches!(invalid, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    /// Tests that find keeps insertion order and honours where, skip and limit
    async fn test_find_with_filter() {
        let store = InMemoryResourceStore::with_records(vec![
            author("c", "Same"),
            author("a", "Other"),
            author("b", "Same"),
        ]);

        let all = store
            .find(&Filter::default())
            .await
            .expect("Failed to list authors");
        let ids: Vec<_> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let mut clause = Where::new();
        clause.insert("name".to_string(), json!("Same"));
        let same = store
            .find(&Filter::with_where(clause.clone()))
            .await
            .expect("Failed to filter authors");
        assert_eq!(same, vec![author("c", "Same"), author("b", "Same")]);

        let page = store
            .find(&Filter {
                where_clause: None,
                limit: Some(1),
                skip: Some(1),
            })
            .await
            .expect("Failed to page authors");
        assert_eq!(page, vec![author("a", "Other")]);

        assert_eq!(store.count(None).await.expect("Failed to count"), 3);
        assert_eq!(
            store.count(Some(&clause)).await.expect("Failed to count"),
            2
        );
    }

    #[tokio::test]
    /// Tests patch, replace and delete semantics
    async fn test_update_replace_and_delete_book() {
        let book = Book {
            id: "b1".to_string(),
            title: "Dune".to_string(),
            isbn: "isbn".to_string(),
            price: 10.0,
            publish_date: "1965".to_string(),
            author_id: "a1".to_string(),
            category_id: "c1".to_string(),
        };
        let store = InMemoryResourceStore::with_records(vec![book.clone()]);

        let missing = store.update_by_id("nope", json!({"title": "x"})).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));

        let patched = store
            .update_by_id("b1", json!({"title": "Dune Messiah", "id": "hijacked"}))
            .await
            .expect("Failed to patch");
        assert_eq!(patched.id, "b1");
        assert_eq!(patched.title, "Dune Messiah");
        assert_eq!(patched.isbn, "isbn");

        let bad_patch = store.update_by_id("b1", json!({"price": "free"})).await;
        assert!(matches!(bad_patch, Err(StoreError::Invalid(_))));
        let not_object = store.update_by_id("b1", json!(["title"])).await;
        assert!(matches!(not_object, Err(StoreError::Invalid(_))));

        let replacement = Book {
            id: String::new(),
            title: "Children of Dune".to_string(),
            ..book.clone()
        };
        let replaced = store
            .replace_by_id("b1", replacement)
            .await
            .expect("Failed to replace");
        assert_eq!(replaced.id, "b1");
        assert_eq!(
            store.find_by_id("b1").await.expect("Failed to get").title,
            "Children of Dune"
        );

        let mismatched = Book {
            id: "b2".to_string(),
            ..book.clone()
        };
        assert!(matches!(
            store.replace_by_id("b1", mismatched).await,
            Err(StoreError::Invalid(_))
        ));

        store.delete_by_id("b1").await.expect("Failed to delete");
        assert!(matches!(
            store.delete_by_id("b1").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Account {
        id: String,
        login: String,
    }

    impl Resource for Account {
        const COLLECTION: &'static str = "accounts";
        const NAME: &'static str = "Account";
        const UNIQUE_FIELDS: &'static [&'static str] = &["login"];

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    #[tokio::test]
    /// Tests that unique fields are enforced on create and on patch
    async fn test_unique_fields() {
        let store = InMemoryResourceStore::<Account>::default();
        store
            .create(Account {
                id: "1".to_string(),
                login: "alice".to_string(),
            })
            .await
            .expect("Failed to create");
        store
            .create(Account {
                id: "2".to_string(),
                login: "bob".to_string(),
            })
            .await
            .expect("Failed to create");

        let taken = store
            .create(Account {
                id: "3".to_string(),
                login: "alice".to_string(),
            })
            .await;
        assert!(matches!(taken, Err(StoreError::Conflict(_))));

        let renamed_to_taken = store.update_by_id("2", json!({"login": "alice"})).await;
        assert!(matches!(renamed_to_taken, Err(StoreError::Conflict(_))));

        // Re-saving the same value is not a conflict with itself
        store
            .update_by_id("1", json!({"login": "alice"}))
            .await
            .expect("Failed to patch with unchanged login");
    }
}
