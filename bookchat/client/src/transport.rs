// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transports carrying GraphQL requests to the service.

use std::time::Duration;

pub use async_graphql::parser::types::OperationType;
use async_graphql::parser::{parse_query, types::DocumentOperations};
use async_trait::async_trait;
use async_tungstenite::{
    tokio::connect_async,
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue, Message},
};
use futures::{stream::BoxStream, Sink, SinkExt as _, Stream, StreamExt as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ClientError, GraphQlError, GraphQlRequest, GraphQlResponse};

/// The responses to one request, in order.
pub type ResponseStream = BoxStream<'static, Result<GraphQlResponse, ClientError>>;

/// Something that can carry a GraphQL request to a server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError>;
}

/// Returns whether the request is a query, a mutation or a subscription.
///
/// The operation is the one named by the request, or the only one in the document.
pub fn operation_type(request: &GraphQlRequest) -> Result<OperationType, ClientError> {
    let document = parse_query(&request.query)?;
    let operation = match (document.operations, &request.operation_name) {
        (DocumentOperations::Single(operation), _) => operation,
        (DocumentOperations::Multiple(mut operations), Some(name)) => operations
            .remove(name.as_str())
            .ok_or_else(|| ClientError::UnknownOperation(Some(name.clone())))?,
        (DocumentOperations::Multiple(_), None) => {
            return Err(ClientError::UnknownOperation(None))
        }
    };
    Ok(operation.node.ty)
}

/// Sends each request as a single HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn post(&self, request: &GraphQlRequest) -> Result<GraphQlResponse, ClientError> {
        let response = self.client.post(&self.url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("Could not get response text: {error}"));
            return Err(ClientError::HttpStatus { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError> {
        let response = self.post(&request).await?;
        Ok(futures::stream::iter([Ok(response)]).boxed())
    }
}

/// The WebSocket sub-protocol spoken by [`WebSocketTransport`].
const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

/// Each connection carries a single operation, so the ID is constant.
const OPERATION_ID: &str = "1";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    ConnectionInit {},
    Subscribe {
        id: String,
        payload: GraphQlRequest,
    },
    Pong {},
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck {},
    Ping {},
    Pong {},
    Next {
        id: String,
        payload: GraphQlResponse,
    },
    Error {
        id: String,
        payload: Vec<GraphQlError>,
    },
    Complete {
        id: String,
    },
}

async fn send_message<S>(sink: &mut S, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(serde_json::to_string(message)?))
        .await?;
    Ok(())
}

/// Returns the next protocol message, or `None` once the connection is closed.
async fn next_message<S>(stream: &mut S) -> Result<Option<ServerMessage>, ClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message? {
            Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

/// Runs each request on its own WebSocket connection, using the
/// `graphql-transport-ws` protocol.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn request(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError> {
        let mut client_request = self.url.as_str().into_client_request()?;
        client_request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(GRAPHQL_TRANSPORT_WS),
        );
        let (connection, _) = connect_async(client_request).await?;
        let (mut sink, mut stream) = connection.split();

        send_message(&mut sink, &ClientMessage::ConnectionInit {}).await?;
        loop {
            match next_message(&mut stream).await? {
                Some(ServerMessage::ConnectionAck {}) => break,
                Some(ServerMessage::Ping {}) => {
                    send_message(&mut sink, &ClientMessage::Pong {}).await?
                }
                Some(message) => {
                    return Err(ClientError::Protocol(format!(
                        "expected connection_ack, received {message:?}"
                    )))
                }
                None => {
                    return Err(ClientError::Protocol(
                        "connection closed before acknowledgement".to_string(),
                    ))
                }
            }
        }

        let subscribe = ClientMessage::Subscribe {
            id: OPERATION_ID.to_string(),
            payload: request,
        };
        send_message(&mut sink, &subscribe).await?;

        let responses = futures::stream::unfold(Some((sink, stream)), |state| async move {
            let (mut sink, mut stream) = state?;
            loop {
                match next_message(&mut stream).await {
                    Ok(Some(ServerMessage::Next { id, payload })) if id == OPERATION_ID => {
                        return Some((Ok(payload), Some((sink, stream))));
                    }
                    Ok(Some(ServerMessage::Error { id, payload })) if id == OPERATION_ID => {
                        let response = GraphQlResponse {
                            data: Value::Null,
                            errors: payload,
                        };
                        return Some((Ok(response), None));
                    }
                    Ok(Some(ServerMessage::Complete { id })) if id == OPERATION_ID => {
                        if let Err(error) = sink.close().await {
                            debug!("error closing WebSocket: {}", error);
                        }
                        return None;
                    }
                    Ok(Some(ServerMessage::Ping {})) => {
                        if let Err(error) = send_message(&mut sink, &ClientMessage::Pong {}).await
                        {
                            return Some((Err(error), None));
                        }
                    }
                    Ok(Some(message)) => warn!("ignoring unexpected message {:?}", message),
                    Ok(None) => return None,
                    Err(error) => return Some((Err(error), None)),
                }
            }
        });
        Ok(responses.boxed())
    }
}

/// Routes subscriptions to one transport and everything else to another.
pub struct SplitTransport<H = HttpTransport, W = WebSocketTransport> {
    http: H,
    websocket: W,
}

impl<H, W> SplitTransport<H, W> {
    pub fn new(http: H, websocket: W) -> Self {
        Self { http, websocket }
    }
}

#[async_trait]
impl<H, W> Transport for SplitTransport<H, W>
where
    H: Transport,
    W: Transport,
{
    async fn request(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError> {
        match operation_type(&request)? {
            OperationType::Subscription => self.websocket.request(request).await,
            OperationType::Query | OperationType::Mutation => self.http.request(request).await,
        }
    }
}
