use std::io::Read;

use bon::Builder;
use reqwest::Method;
use strum::{AsRefStr, Display};

use crate::error::{BbError, Result};

/// Content types the API accepts for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ContentType {
    #[strum(serialize = "application/json")]
    Json,
    #[strum(serialize = "application/x-www-form-urlencoded")]
    Form,
}

/// A fully buffered request body.
///
/// The bytes are owned so every attempt of a request sends the same payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    bytes: Vec<u8>,
    content_type: ContentType,
}

impl RequestBody {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: ContentType) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self::new(body.into(), ContentType::Json)
    }

    /// Serialize `value` as the JSON body.
    pub fn json_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_vec(value)?, ContentType::Json))
    }

    /// Form-encode `pairs` in order.
    pub fn form<K, V>(pairs: &[(K, V)]) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = reqwest::Url::parse_with_params(
            "http://localhost/",
            pairs.iter().map(|(k, v)| (k.as_ref(), v.as_ref())),
        )
        .map_err(|err| BbError::InvalidArgument(format!("cannot encode form body: {err}")))?;
        Ok(Self::new(url.query().unwrap_or_default(), ContentType::Form))
    }

    /// Drain `reader` completely into memory.
    pub fn from_reader(mut reader: impl Read, content_type: ContentType) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::new(bytes, content_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

/// One logical API call: verb, target and optional body.
///
/// `url` is either absolute or relative to the API base.
///
/// # Example
/// ```
/// use bitbucket_cli::client::{ApiRequest, RequestBody};
/// use reqwest::Method;
///
/// let request = ApiRequest::builder()
///     .method(Method::POST)
///     .url("/repositories/acme/widgets/pullrequests")
///     .body(RequestBody::json(r#"{"title":"Fix"}"#))
///     .build();
/// assert_eq!(request.method, Method::POST);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ApiRequest {
    pub method: Method,
    #[builder(into)]
    pub url: String,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::builder().method(Method::GET).url(url).build()
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::builder().method(Method::DELETE).url(url).build()
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self::builder()
            .method(Method::POST)
            .url(url)
            .body(body)
            .build()
    }

    pub fn put(url: impl Into<String>, body: RequestBody) -> Self {
        Self::builder()
            .method(Method::PUT)
            .url(url)
            .body(body)
            .build()
    }
}
