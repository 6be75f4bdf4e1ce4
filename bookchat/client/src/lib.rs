// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The client component of the Bookchat service.
//!
//! A [`BookchatClient`] sends queries and mutations over HTTP and subscriptions over a
//! WebSocket, and keeps the results of successful queries in a local cache.

mod cache;
mod transport;

use std::num::NonZeroUsize;

use bookchat::{Author, Book, Chat};
use futures::StreamExt as _;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use crate::{
    cache::{CachedTransport, DEFAULT_CACHE_SIZE},
    transport::{
        operation_type, HttpTransport, OperationType, ResponseStream, SplitTransport, Transport,
        WebSocketTransport,
    },
};

/// A GraphQL request, as sent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub variables: Value,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Value::Null,
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }
}

/// Standard GraphQL response envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

/// An error reported by the server inside a response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Tungstenite(#[from] Box<async_tungstenite::tungstenite::Error>),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Invalid GraphQL document: {0}")]
    Parse(#[from] async_graphql::parser::Error),
    #[error("Operation {0:?} not found in the document")]
    UnknownOperation(Option<String>),
    #[error("Request failed with status {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("WebSocket protocol violation: {0}")]
    Protocol(String),
    #[error("GraphQL errors: {0:?}")]
    GraphQl(Vec<GraphQlError>),
    #[error("No data returned for field `{0}`")]
    MissingData(&'static str),
    #[error("The transport closed without a response")]
    NoResponse,
}

impl From<async_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: async_tungstenite::tungstenite::Error) -> Self {
        Box::new(error).into()
    }
}

pub enum Protocol {
    Http,
    WebSocket,
}

/// Where to find the service, and how much to cache.
#[derive(clap::Args, Debug, Clone)]
pub struct ClientConfig {
    /// The port of the Bookchat service.
    #[arg(long, default_value = "4000")]
    pub service_port: u16,
    /// The address of the Bookchat service.
    #[arg(long, default_value = "localhost")]
    pub service_address: String,
    /// Use SSL/TLS.
    #[arg(long)]
    pub tls: bool,
    /// The number of query responses to keep in the local cache.
    #[arg(long, default_value_t = DEFAULT_CACHE_SIZE)]
    pub cache_size: NonZeroUsize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_port: 4000,
            service_address: "localhost".to_string(),
            tls: false,
            cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn with_protocol(&self, protocol: Protocol) -> String {
        let tls = if self.tls { "s" } else { "" };
        let (protocol, suffix) = match protocol {
            Protocol::Http => ("http", "/"),
            Protocol::WebSocket => ("ws", "/ws"),
        };
        format!(
            "{}{}://{}:{}{}",
            protocol, tls, self.service_address, self.service_port, suffix
        )
    }

    pub fn websocket(&self) -> String {
        self.with_protocol(Protocol::WebSocket)
    }

    pub fn http(&self) -> String {
        self.with_protocol(Protocol::Http)
    }
}

/// A client of the Bookchat service.
pub struct BookchatClient<T = CachedTransport<SplitTransport>> {
    transport: T,
}

impl BookchatClient {
    /// Creates a client sending requests through a cached split transport.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = SplitTransport::new(
            HttpTransport::new(config.http())?,
            WebSocketTransport::new(config.websocket()),
        );
        Ok(Self::with_transport(CachedTransport::new(
            transport,
            config.cache_size,
        )))
    }
}

impl<T: Transport> BookchatClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a request and returns its first response.
    pub async fn execute(&self, request: GraphQlRequest) -> Result<GraphQlResponse, ClientError> {
        self.transport
            .request(request)
            .await?
            .next()
            .await
            .ok_or(ClientError::NoResponse)?
    }

    /// Sends a request and returns all the responses it produces.
    pub async fn subscribe(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError> {
        self.transport.request(request).await
    }

    pub async fn books(&self) -> Result<Vec<Book>, ClientError> {
        let request = GraphQlRequest::new("query { books { title author } }");
        self.fetch_field(request, "books").await
    }

    pub async fn authors(&self) -> Result<Vec<Author>, ClientError> {
        let request = GraphQlRequest::new("query { authors { name books { title author } } }");
        self.fetch_field(request, "authors").await
    }

    pub async fn chat(&self) -> Result<Chat, ClientError> {
        let request = GraphQlRequest::new("query { chat { id from content createdAt } }");
        self.fetch_field(request, "chat").await
    }

    /// Creates a chat. Without `content`, the field is left out of the selection and
    /// the returned chat has no content.
    pub async fn create_chat(
        &self,
        content: Option<&str>,
        from: Option<&str>,
    ) -> Result<Chat, ClientError> {
        let selection = if content.is_some() {
            "id from content createdAt"
        } else {
            "id from createdAt"
        };
        let query = format!(
            "mutation CreateChat($content: String, $from: String) {{ \
                createChat(content: $content, from: $from) {{ {selection} }} \
            }}"
        );
        let request = GraphQlRequest::new(query)
            .with_operation_name("CreateChat")
            .with_variables(json!({ "content": content, "from": from }));
        self.fetch_field(request, "createChat").await
    }

    async fn fetch_field<R: DeserializeOwned>(
        &self,
        request: GraphQlRequest,
        field: &'static str,
    ) -> Result<R, ClientError> {
        let mut response = self.execute(request).await?;
        if !response.errors.is_empty() {
            return Err(ClientError::GraphQl(response.errors));
        }
        let value = response
            .data
            .get_mut(field)
            .map(Value::take)
            .filter(|value| !value.is_null())
            .ok_or(ClientError::MissingData(field))?;
        Ok(serde_json::from_value(value)?)
    }
}
