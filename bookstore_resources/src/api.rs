use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::resource_store::{require_non_empty, Resource, StoreError};

pub type ResourceId = String;

/// JSON object whose fields must all be present, with equal values, in a matching record
pub type Where = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Flat book record as kept by the books store.
/// `author_id` and `category_id` are references by convention only, nothing checks they resolve
pub struct Book {
    pub id: ResourceId,
    pub title: String,
    pub isbn: String,
    pub price: f64,
    /// Opaque date string, never parsed
    pub publish_date: String,
    pub author_id: ResourceId,
    pub category_id: ResourceId,
}

impl Resource for Author {
    const COLLECTION: &'static str = "authors";
    const NAME: &'static str = "Author";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        require_non_empty("name", &self.name)
    }
}

impl Resource for Category {
    const COLLECTION: &'static str = "categories";
    const NAME: &'static str = "Category";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        require_non_empty("name", &self.name)
    }
}

impl Resource for Book {
    const COLLECTION: &'static str = "books";
    const NAME: &'static str = "Book";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: ResourceId) {
        self.id = id;
    }

    fn validate(&self) -> Result<(), StoreError> {
        require_non_empty("title", &self.title)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(StoreError::Invalid(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
/// Selection applied by `find`, serialized as `?filter=<json>`
pub struct Filter {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<Where>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl Filter {
    pub fn with_where(where_clause: Where) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Self::default()
        }
    }
}

/// Returns true if `record` contains every field of `where_clause`,
/// with the same meaning as the JSONB `@>` operator
pub fn matches_where(where_clause: Option<&Where>, record: &Value) -> bool {
    let Some(where_clause) = where_clause else {
        return true;
    };
    where_clause.iter().all(|(field, expected)| {
        record
            .get(field)
            .is_some_and(|value| json_contains(value, expected))
    })
}

/// Objects contain their sub-objects, arrays contain every element of a sub-array
/// in any order, scalars only contain equal scalars
pub fn json_contains(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Object(value), Value::Object(expected)) => expected.iter().all(|(key, item)| {
            value
                .get(key)
                .is_some_and(|present| json_contains(present, item))
        }),
        (Value::Array(values), Value::Array(expected)) => expected
            .iter()
            .all(|item| values.iter().any(|present| json_contains(present, item))),
        (Value::Number(value), Value::Number(expected)) => value.as_f64() == expected.as_f64(),
        (value, expected) => value == expected,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindQuery {
    pub filter: Option<String>,
}

impl FindQuery {
    pub fn parse(&self) -> Result<Filter, StoreError> {
        match self.filter.as_deref() {
            None | Some("") => Ok(Filter::default()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|err| StoreError::Invalid(format!("Malformed filter: {}", err))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountQuery {
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

impl CountQuery {
    pub fn parse(&self) -> Result<Option<Where>, StoreError> {
        match self.where_clause.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|err| StoreError::Invalid(format!("Malformed where clause: {}", err))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Body of every non-2xx response returned by the services
pub struct ErrorBody {
    pub message: String,
}
