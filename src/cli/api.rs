//! `bb api`: raw authenticated requests.

use std::io::Read;
use std::sync::Arc;

use reqwest::Method;

use super::ApiArgs;
use crate::auth::{FileCredentialStore, OAuthRefresher};
use crate::client::{ApiClient, ApiRequest, ContentType, Payload, RequestBody};
use crate::config::{Config, HttpSettings};
use crate::error::{BbError, Result};

/// Handle `bb api <path>`.
pub async fn handle_api(args: &ApiArgs) -> Result<()> {
    let request = build_request(args, std::io::stdin())?;
    let settings = HttpSettings::from_env();
    let config = Config::load_default()?;
    let refresher = OAuthRefresher::new().with_client(settings.build_client()?);
    let mut client = ApiClient::from_store(
        &settings,
        &config,
        Arc::new(FileCredentialStore::new_default()),
        Arc::new(refresher),
    )?;

    let payload = client.call(&request).await?;
    let rendered = render(payload);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn build_request(args: &ApiArgs, stdin: impl Read) -> Result<ApiRequest> {
    let method = Method::from_bytes(args.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| BbError::InvalidArgument(format!("invalid HTTP method '{}'", args.method)))?;

    let body = match (&args.json, args.form.is_empty()) {
        (Some(json), _) if json == "-" => Some(RequestBody::from_reader(stdin, ContentType::Json)?),
        (Some(json), _) => Some(RequestBody::json(json.clone())),
        (None, false) => Some(RequestBody::form(&parse_form(&args.form)?)?),
        (None, true) => None,
    };

    Ok(ApiRequest::builder()
        .method(method)
        .url(args.path.clone())
        .maybe_body(body)
        .build())
}

fn parse_form(fields: &[String]) -> Result<Vec<(String, String)>> {
    fields
        .iter()
        .map(|field| match field.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(BbError::InvalidArgument(format!(
                "invalid form field '{field}': expected key=value"
            ))),
        })
        .collect()
}

/// Pretty-print JSON bodies; anything else is shown as text.
fn render(payload: Payload) -> String {
    let bytes = payload.into_bytes();
    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}
