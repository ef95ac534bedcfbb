use std::marker::PhantomData;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Response, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use reqwest_tracing::TracingMiddleware;

use crate::api::{CountResponse, ErrorBody, Filter, Where};
use crate::resource_store::{Resource, ResourceStore, StoreError};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Total time allowed for a single request, retries excluded
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sent as `Authorization: Bearer <token>` on every request when set
    pub bearer_token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            bearer_token: None,
        }
    }
}

/// Builds the middleware stack shared by every service client
pub fn build_http_client(settings: &ClientSettings) -> anyhow::Result<ClientWithMiddleware> {
    let mut default_headers = HeaderMap::new();
    if let Some(token) = &settings.bearer_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("Bearer token is not a valid header value")?;
        value.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, value);
    }

    let reqwest_client = reqwest::Client::builder()
        .timeout(settings.timeout)
        .default_headers(default_headers)
        .build()
        .context("Failed to build reqwest client")?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(settings.max_retries);

    Ok(ClientBuilder::new(reqwest_client)
        // Insert the tracing middleware
        .with(TracingMiddleware::default())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Parses the base url of a service. Paths are later appended with [`join_segments`]
pub fn parse_base_url(url: &str) -> anyhow::Result<Url> {
    let base = Url::parse(url).with_context(|| format!("Invalid service url {}", url))?;
    if base.cannot_be_a_base() {
        bail!("Service url {} can not carry a path", url);
    }
    Ok(base)
}

/// Appends path segments to `base`, percent-encoding each of them.
/// A `/` or `?` inside a segment never changes which resource is addressed
pub fn join_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Classifies a non-success status returned by a store.
/// `subject` names the resource the request was about, used for not found errors
pub fn error_from_status(
    status: StatusCode,
    message: String,
    kind: &'static str,
    subject: Option<&str>,
) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound {
            kind,
            id: subject.unwrap_or_default().to_string(),
        },
        StatusCode::CONFLICT => StoreError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Invalid(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            StoreError::Unavailable(message)
        }
        status => StoreError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

/// Reads the error body of a failed response and classifies it
pub async fn error_from_response(
    response: Response,
    kind: &'static str,
    subject: Option<&str>,
) -> StoreError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
    };
    error_from_status(status, message, kind, subject)
}

pub fn transport_error(err: reqwest_middleware::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

pub fn decode_error(err: reqwest::Error) -> StoreError {
    StoreError::Other(format!("Failed to decode response: {}", err))
}

/// HTTP client of the service owning the `T` collection
pub struct ResourceClient<T> {
    base: Url,
    client: ClientWithMiddleware,
    _resource: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceClient<T> {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Self::with_settings(url, &ClientSettings::default())
    }

    pub fn with_settings(url: &str, settings: &ClientSettings) -> anyhow::Result<Self> {
        Ok(Self {
            base: parse_base_url(url)?,
            client: build_http_client(settings)?,
            _resource: PhantomData,
        })
    }

    fn collection_url(&self) -> Url {
        join_segments(&self.base, &[T::COLLECTION])
    }

    fn item_url(&self, id: &str) -> Url {
        join_segments(&self.base, &[T::COLLECTION, id])
    }

    async fn read_record<R: serde::de::DeserializeOwned>(
        response: Response,
        subject: Option<&str>,
    ) -> Result<R, StoreError> {
        if response.status().is_success() {
            response.json().await.map_err(decode_error)
        } else {
            Err(error_from_response(response, T::NAME, subject).await)
        }
    }
}

#[async_trait::async_trait]
impl<T: Resource> ResourceStore<T> for ResourceClient<T> {
    /// Calls POST /{collection}
    async fn create(&self, item: T) -> Result<T, StoreError> {
        let response = self
            .client
            .post(self.collection_url())
            .json(&item)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_record(response, Some(item.id())).await
    }

    /// Calls GET /{collection}?filter=<json>
    async fn find(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        let mut request = self.client.get(self.collection_url());
        if *filter != Filter::default() {
            request = request.query(&[("filter", serde_json::to_string(filter)?)]);
        }
        let response = request.send().await.map_err(transport_error)?;
        Self::read_record(response, None).await
    }

    /// Calls GET /{collection}/{id}
    async fn find_by_id(&self, id: &str) -> Result<T, StoreError> {
        let response = self
            .client
            .get(self.item_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_record(response, Some(id)).await
    }

    /// Calls GET /{collection}/count?where=<json>
    async fn count(&self, where_clause: Option<&Where>) -> Result<u64, StoreError> {
        let mut request = self
            .client
            .get(join_segments(&self.base, &[T::COLLECTION, "count"]));
        if let Some(where_clause) = where_clause {
            request = request.query(&[("where", serde_json::to_string(where_clause)?)]);
        }
        let response = request.send().await.map_err(transport_error)?;
        let count: CountResponse = Self::read_record(response, None).await?;
        Ok(count.count)
    }

    /// Calls PATCH /{collection}/{id}
    async fn update_by_id(&self, id: &str, patch: serde_json::Value) -> Result<T, StoreError> {
        let response = self
            .client
            .patch(self.item_url(id))
            .json(&patch)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_record(response, Some(id)).await
    }

    /// Calls PUT /{collection}/{id}
    async fn replace_by_id(&self, id: &str, item: T) -> Result<T, StoreError> {
        let response = self
            .client
            .put(self.item_url(id))
            .json(&item)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_record(response, Some(id)).await
    }

    /// Calls DELETE /{collection}/{id}
    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.item_url(id))
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response, T::NAME, Some(id)).await)
        }
    }
}
