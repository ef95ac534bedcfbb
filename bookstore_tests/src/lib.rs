//! Helpers for system tests run against a deployed gateway and its services.
//! Enable with `--features system_tests`

use anyhow::Context;
use rand::distributions::Alphanumeric;
use rand::Rng;

use bookstore_gateway::api::BookView;
use bookstore_resources::client::ClientSettings;

pub fn gateway_url() -> String {
    std::env::var("GATEWAY_URL").unwrap_or("http://127.0.0.1:3000".to_string())
}

/// Random suffix keeping ids and usernames of parallel runs apart
pub fn unique(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix)
}

pub fn authorized(token: &str) -> ClientSettings {
    ClientSettings {
        bearer_token: Some(token.to_string()),
        ..ClientSettings::default()
    }
}

/// Fetches `GET /books/{id}` from the gateway
pub async fn get_book_view(token: &str, id: &str) -> anyhow::Result<BookView> {
    let response = reqwest::Client::new()
        .get(format!("{}/books/{}", gateway_url(), id))
        .bearer_auth(token)
        .send()
        .await
        .context("Failed to get book view")?
        .error_for_status()?;
    Ok(response.json().await?)
}

/// Fetches `GET /books` from the gateway, restricted to the given ids
pub async fn list_book_views(token: &str, ids: &[&str]) -> anyhow::Result<Vec<BookView>> {
    let response = reqwest::Client::new()
        .get(format!("{}/books", gateway_url()))
        .bearer_auth(token)
        .send()
        .await
        .context("Failed to list book views")?
        .error_for_status()?;
    let views: Vec<BookView> = response.json().await?;
    Ok(views
        .into_iter()
        .filter(|view| ids.contains(&view.id.as_str()))
        .collect())
}
