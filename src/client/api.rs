use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::error::ClientError;
use crate::error::ErrorResponse;
use crate::models::{DeleteResponse, NewTodoRequest, Todo, UpdateTodoRequest};

/// The four todo operations as seen from a client.
#[async_trait]
pub trait TodoApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, ClientError>;
    async fn create(&self, title: &str) -> Result<Todo, ClientError>;
    async fn update(&self, id: &str, req: &UpdateTodoRequest) -> Result<Todo, ClientError>;
    async fn delete(&self, id: &str) -> Result<DeleteResponse, ClientError>;
}

pub struct HttpTodoApi {
    client: Client,
    base_url: Url,
}

impl HttpTodoApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Network(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    /// `<base>/api/todos[/<id>]`, with the id percent-encoded as one segment.
    fn todos_url(&self, id: Option<&str>) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().extend(["api", "todos"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        let url = self.todos_url(None)?;
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(network)?;
        read_json(response).await
    }

    async fn create(&self, title: &str) -> Result<Todo, ClientError> {
        let url = self.todos_url(None)?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&NewTodoRequest::with_title(title))
            .send()
            .await
            .map_err(network)?;
        read_json(response).await
    }

    async fn update(&self, id: &str, req: &UpdateTodoRequest) -> Result<Todo, ClientError> {
        let url = self.todos_url(Some(id))?;
        debug!("PUT {}", url);
        let response = self
            .client
            .put(url)
            .json(req)
            .send()
            .await
            .map_err(network)?;
        read_json(response).await
    }

    async fn delete(&self, id: &str) -> Result<DeleteResponse, ClientError> {
        let url = self.todos_url(Some(id))?;
        debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await.map_err(network)?;
        read_json(response).await
    }
}

fn network(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::NOT_FOUND => ClientError::NotFound,
        _ => ClientError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
