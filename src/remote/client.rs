//! Status and envelope handling shared by every remote adapter.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::transport::{HttpRequest, Method, Transport};
use crate::repository::{RepositoryError, Result};

/// A user-scoped handle on the remote service.
///
/// Every path is prefixed with `/{user}`. Anything but status 200 becomes
/// [`RepositoryError::TransportFailure`]; nothing is retried.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
    user: String,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>, user: impl Into<String>) -> Self {
        Self {
            transport,
            user: user.into(),
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("/{}/{}", urlencoding::encode(&self.user), suffix)
    }

    async fn execute(
        &self,
        method: Method,
        suffix: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let request = HttpRequest {
            method,
            path: self.path(suffix),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body,
        };
        let path = request.path.clone();

        let response = self.transport.send(request).await?;
        tracing::debug!("{} {} -> {}", method, path, response.status);

        if response.status != 200 {
            return Err(RepositoryError::TransportFailure {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.body)
    }

    /// GET and decode the body as `T`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        suffix: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let body = self.execute(Method::Get, suffix, query, None).await?;
        decode(&body)
    }

    /// POST, ignoring the response body.
    pub async fn post(
        &self,
        suffix: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        self.execute(Method::Post, suffix, query, body).await?;
        Ok(())
    }

    /// POST and decode the body as `T`.
    pub async fn post_for<T: DeserializeOwned>(
        &self,
        suffix: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let body = self.execute(Method::Post, suffix, &[], Some(body)).await?;
        decode(&body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| RepositoryError::SchemaMismatch(e.to_string()))
}

/// Serializes a wire value into a request body.
pub(crate) fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| RepositoryError::SchemaMismatch(e.to_string()))
}
