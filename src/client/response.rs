use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{BbError, Result};

/// Raw outcome of an HTTP attempt: status and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Classify the final response.
    ///
    /// Status >= 400 becomes [`BbError::Api`] carrying the raw body text.
    /// 204 becomes [`Payload::NoContent`] without looking at the body.
    pub fn into_payload(self) -> Result<Payload> {
        if self.status >= 400 {
            return Err(BbError::api(self.status, self.text()));
        }
        if self.status == 204 {
            return Ok(Payload::NoContent);
        }
        Ok(Payload::Body(self.body))
    }
}

/// Successful response content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    NoContent,
    Body(Vec<u8>),
}

impl Payload {
    pub fn is_no_content(&self) -> bool {
        matches!(self, Self::NoContent)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::NoContent => Vec::new(),
            Self::Body(bytes) => bytes,
        }
    }

    /// Decode the body as JSON; `None` for no content.
    pub fn json<T: DeserializeOwned>(self) -> Result<Option<T>> {
        match self {
            Self::NoContent => Ok(None),
            Self::Body(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Decode the body as JSON, treating no content as an empty (invalid) document.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_slice(&self.into_bytes())?)
    }
}

/// Standard paginated envelope returned by list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub pagelen: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
}
