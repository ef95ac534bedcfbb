use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join, join_all};

use bookstore_resources::api::{Author, Book, Category, Filter};
use bookstore_resources::resource_store::{Resource, ResourceStore};

use crate::api::{
    BookView, EntityRef, Enrichment, EnrichmentFailure, FailedLookup, AUTHOR_NOT_AVAILABLE,
    CATEGORY_NOT_AVAILABLE,
};
use crate::error::{store_failure, GatewayError};

/// Composes book views out of the books, authors and categories stores.
/// Nothing is cached, every view re-fetches its author and category
pub struct BookAggregator {
    books: Arc<dyn ResourceStore<Book>>,
    authors: Arc<dyn ResourceStore<Author>>,
    categories: Arc<dyn ResourceStore<Category>>,
    lookup_timeout: Duration,
}

impl BookAggregator {
    pub fn new(
        books: Arc<dyn ResourceStore<Book>>,
        authors: Arc<dyn ResourceStore<Author>>,
        categories: Arc<dyn ResourceStore<Category>>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            books,
            authors,
            categories,
            lookup_timeout,
        }
    }

    /// Fails only when the book itself can not be fetched.
    /// Failed author or category lookups yield a degraded view
    pub async fn get_book_view(&self, id: &str) -> Result<BookView, GatewayError> {
        let book = self
            .books
            .find_by_id(id)
            .await
            .map_err(|err| store_failure(&format!("Get book {}", id), err))?;
        Ok(self.enrich(book).await)
    }

    /// Views are returned in the order the books store listed the books
    pub async fn list_book_views(&self, filter: &Filter) -> Result<Vec<BookView>, GatewayError> {
        let books = self
            .books
            .find(filter)
            .await
            .map_err(|err| store_failure("List books", err))?;
        Ok(join_all(books.into_iter().map(|book| self.enrich(book))).await)
    }

    async fn enrich(&self, book: Book) -> BookView {
        let (author, category) = join(
            lookup(self.authors.as_ref(), &book.author_id, self.lookup_timeout),
            lookup(self.categories.as_ref(), &book.category_id, self.lookup_timeout),
        )
        .await;

        let author_id = book.author_id.clone();
        let category_id = book.category_id.clone();
        let (author, author_failure) =
            resolve(author, author_id, AUTHOR_NOT_AVAILABLE, |author: Author| author.name);
        let (category, category_failure) = resolve(
            category,
            category_id,
            CATEGORY_NOT_AVAILABLE,
            |category: Category| category.name,
        );

        let mut view = BookView::new(book, author, category);
        view.error = match (&author_failure, &category_failure) {
            (None, None) => None,
            (Some(_), None) => Some("Failed to fetch author details"),
            (None, Some(_)) => Some("Failed to fetch category details"),
            (Some(_), Some(_)) => Some("Failed to fetch author and category details"),
        }
        .map(|message| EnrichmentFailure {
            message: message.to_string(),
            author: author_failure,
            category: category_failure,
        });
        view
    }
}

/// Fetches a referenced record within `limit`, reporting why it could not be fetched
async fn lookup<T: Resource>(
    store: &dyn ResourceStore<T>,
    id: &str,
    limit: Duration,
) -> Result<T, String> {
    match tokio::time::timeout(limit, store.find_by_id(id)).await {
        Ok(Ok(record)) => Ok(record),
        Ok(Err(err)) => {
            tracing::warn!("{} {} lookup failed: {}", T::NAME, id, err);
            Err(err.to_string())
        }
        Err(_) => {
            tracing::warn!(
                "{} {} lookup timed out after {} ms",
                T::NAME,
                id,
                limit.as_millis()
            );
            Err(format!("Timed out after {} ms", limit.as_millis()))
        }
    }
}

fn resolve<T>(
    result: Result<T, String>,
    id: String,
    sentinel: &str,
    name_of: impl FnOnce(T) -> String,
) -> (Enrichment, Option<FailedLookup>) {
    match result {
        Ok(record) => (
            Enrichment::Resolved(EntityRef {
                id,
                name: name_of(record),
            }),
            None,
        ),
        Err(reason) => (
            Enrichment::Unavailable(sentinel.to_string()),
            Some(FailedLookup { id, reason }),
        ),
    }
}

#[cfg(test)]
mod aggregation_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bookstore_resources::api::{Author, Book, Category, Filter, Where};
    use bookstore_resources::resource_store::{
        InMemoryResourceStore, Resource, ResourceStore, StoreError,
    };

    use crate::aggregation::BookAggregator;
    use crate::api::{EntityRef, Enrichment, AUTHOR_NOT_AVAILABLE, CATEGORY_NOT_AVAILABLE};
    use crate::error::ErrorKind;

    fn book(id: &str, author_id: &str, category_id: &str) -> Book {
        Book {
            id: id.to_string(),
            title: format!("Title of {}", id),
            isbn: format!("isbn-{}", id),
            price: 12.5,
            publish_date: "2020-01-01".to_string(),
            author_id: author_id.to_string(),
            category_id: category_id.to_string(),
        }
    }

    fn author(id: &str, name: &str) -> Author {
        Author {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn aggregator(books: Vec<Book>) -> BookAggregator {
        BookAggregator::new(
            Arc::new(InMemoryResourceStore::with_records(books)),
            Arc::new(InMemoryResourceStore::with_records([author("a1", "X")])),
            Arc::new(InMemoryResourceStore::with_records([category("c1", "Y")])),
            Duration::from_secs(1),
        )
    }

    /// Authors store that never answers in time
    struct StalledAuthors;

    #[async_trait::async_trait]
    impl ResourceStore<Author> for StalledAuthors {
        async fn create(&self, item: Author) -> Result<Author, StoreError> {
            Ok(item)
        }

        async fn find(&self, _filter: &Filter) -> Result<Vec<Author>, StoreError> {
            Ok(vec![])
        }

        async fn find_by_id(&self, id: &str) -> Result<Author, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(author(id, "too late"))
        }

        async fn count(&self, _where_clause: Option<&Where>) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn update_by_id(
            &self,
            id: &str,
            _patch: serde_json::Value,
        ) -> Result<Author, StoreError> {
            Err(StoreError::not_found::<Author>(id))
        }

        async fn replace_by_id(&self, id: &str, _item: Author) -> Result<Author, StoreError> {
            Err(StoreError::not_found::<Author>(id))
        }

        async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
            Err(StoreError::not_found::<Author>(id))
        }
    }

    /// Answers `find_by_id` after a per id delay
    struct DelayedStore<T> {
        inner: InMemoryResourceStore<T>,
        delays: HashMap<String, Duration>,
    }

    impl<T: Resource> DelayedStore<T> {
        fn new(records: Vec<T>, delays: &[(&str, u64)]) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryResourceStore::with_records(records),
                delays: delays
                    .iter()
                    .map(|(id, millis)| (id.to_string(), Duration::from_millis(*millis)))
                    .collect(),
            })
        }
    }

    #[async_trait::async_trait]
    impl<T: Resource> ResourceStore<T> for DelayedStore<T> {
        async fn create(&self, item: T) -> Result<T, StoreError> {
            self.inner.create(item).await
        }

        async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
            self.inner.find(filter).await
        }

        async fn find_by_id(&self, id: &str) -> Result<T, StoreError> {
            if let Some(delay) = self.delays.get(id) {
                tokio::time::sleep(*delay).await;
            }
            self.inner.find_by_id(id).await
        }

        async fn count(&self, where_clause: Option<&Where>) -> Result<u64, StoreError> {
            self.inner.count(where_clause).await
        }

        async fn update_by_id(&self, id: &str, patch: serde_json::Value) -> Result<T, StoreError> {
            self.inner.update_by_id(id, patch).await
        }

        async fn replace_by_id(&self, id: &str, item: T) -> Result<T, StoreError> {
            self.inner.replace_by_id(id, item).await
        }

        async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
            self.inner.delete_by_id(id).await
        }
    }

    #[tokio::test]
    async fn test_book_view_resolves_author_and_category() {
        let aggregator = aggregator(vec![book("b1", "a1", "c1")]);

        let view = aggregator.get_book_view("b1").await.unwrap();

        let source = book("b1", "a1", "c1");
        assert_eq!(view.id, source.id);
        assert_eq!(view.title, source.title);
        assert_eq!(view.isbn, source.isbn);
        assert_eq!(view.price, source.price);
        assert_eq!(view.publish_date, source.publish_date);
        assert_eq!(
            view.author,
            Enrichment::Resolved(EntityRef {
                id: "a1".to_string(),
                name: "X".to_string()
            })
        );
        assert_eq!(
            view.category,
            Enrichment::Resolved(EntityRef {
                id: "c1".to_string(),
                name: "Y".to_string()
            })
        );
        assert!(!view.is_degraded());
    }

    #[tokio::test]
    async fn test_missing_book_is_not_found() {
        let aggregator = aggregator(vec![book("b1", "a1", "c1")]);

        let err = aggregator.get_book_view("b2").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_single_view_with_dangling_category_is_degraded() {
        let aggregator = aggregator(vec![book("b1", "a1", "gone")]);

        let view = aggregator.get_book_view("b1").await.unwrap();

        assert!(matches!(view.author, Enrichment::Resolved(_)));
        assert_eq!(
            view.category,
            Enrichment::Unavailable(CATEGORY_NOT_AVAILABLE.to_string())
        );
        let failure = view.error.unwrap();
        assert!(failure.author.is_none());
        assert_eq!(failure.category.unwrap().id, "gone");
    }

    #[tokio::test]
    async fn test_list_keeps_order_and_degrades_only_broken_entries() {
        let aggregator = aggregator(vec![
            book("b3", "a1", "c1"),
            book("b1", "missing", "c1"),
            book("b2", "a1", "c1"),
        ]);

        let views = aggregator.list_book_views(&Filter::default()).await.unwrap();

        let ids: Vec<_> = views.iter().map(|view| view.id.as_str()).collect();
        assert_eq!(ids, vec!["b3", "b1", "b2"]);
        assert!(!views[0].is_degraded());
        assert!(!views[2].is_degraded());

        let degraded = &views[1];
        assert_eq!(
            degraded.author,
            Enrichment::Unavailable(AUTHOR_NOT_AVAILABLE.to_string())
        );
        assert!(matches!(degraded.category, Enrichment::Resolved(_)));
        assert_eq!(degraded.title, "Title of b1");
        let failure = degraded.error.as_ref().unwrap();
        assert_eq!(failure.author.as_ref().unwrap().id, "missing");
        assert!(failure.category.is_none());
    }

    #[tokio::test]
    async fn test_empty_book_list() {
        let aggregator = aggregator(vec![]);

        let views = aggregator.list_book_views(&Filter::default()).await.unwrap();

        assert!(views.is_empty());
    }

    #[tokio::test]
    async fn test_slow_lookup_times_out_into_degraded_entry() {
        let aggregator = BookAggregator::new(
            Arc::new(InMemoryResourceStore::with_records([book("b1", "a1", "c1")])),
            Arc::new(StalledAuthors),
            Arc::new(InMemoryResourceStore::with_records([category("c1", "Y")])),
            Duration::from_millis(50),
        );

        let views = aggregator.list_book_views(&Filter::default()).await.unwrap();

        assert_eq!(views.len(), 1);
        let failure = views[0].error.as_ref().unwrap();
        assert!(failure.author.as_ref().unwrap().reason.contains("Timed out"));
        assert!(matches!(views[0].category, Enrichment::Resolved(_)));
    }

    #[tokio::test]
    async fn test_author_and_category_lookups_overlap() {
        let aggregator = BookAggregator::new(
            Arc::new(InMemoryResourceStore::with_records([book("b1", "a1", "c1")])),
            DelayedStore::new(vec![author("a1", "X")], &[("a1", 300)]),
            DelayedStore::new(vec![category("c1", "Y")], &[("c1", 300)]),
            Duration::from_secs(2),
        );

        let started = Instant::now();
        let view = aggregator.get_book_view("b1").await.unwrap();
        let elapsed = started.elapsed();

        assert!(!view.is_degraded());
        assert!(elapsed < Duration::from_millis(550), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_entries_finishing_out_of_order_keep_their_position() {
        // The first book has the slowest lookups, the last one the fastest
        let aggregator = BookAggregator::new(
            Arc::new(InMemoryResourceStore::with_records([
                book("b1", "a1", "c1"),
                book("b2", "a2", "c2"),
                book("b3", "a3", "c3"),
            ])),
            DelayedStore::new(
                vec![author("a1", "X1"), author("a2", "X2"), author("a3", "X3")],
                &[("a1", 400), ("a2", 200), ("a3", 50)],
            ),
            DelayedStore::new(
                vec![category("c1", "Y1"), category("c2", "Y2"), category("c3", "Y3")],
                &[("c1", 400), ("c2", 200), ("c3", 50)],
            ),
            Duration::from_secs(2),
        );

        let started = Instant::now();
        let views = aggregator.list_book_views(&Filter::default()).await.unwrap();
        let elapsed = started.elapsed();

        let ids: Vec<_> = views.iter().map(|view| view.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "b3"]);
        let authors: Vec<_> = views
            .iter()
            .map(|view| match &view.author {
                Enrichment::Resolved(author) => author.name.as_str(),
                Enrichment::Unavailable(sentinel) => sentinel.as_str(),
            })
            .collect();
        assert_eq!(authors, vec!["X1", "X2", "X3"]);
        // Sequential lookups would take 1300 ms
        assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);
    }
}
