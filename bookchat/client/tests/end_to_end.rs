// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;

use assert_matches::assert_matches;
use bookchat::{Book, Catalog, Chat};
use bookchat_client::{
    BookchatClient, ClientConfig, ClientError, GraphQlRequest, Transport as _, WebSocketTransport,
};
use bookchat_server::{BookchatService, ServiceConfig};
use futures::StreamExt as _;
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

struct TestServer {
    address: SocketAddr,
    cancellation_token: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let service = BookchatService::new(ServiceConfig::default(), Catalog::new());
        let cancellation_token = CancellationToken::new();
        let handle = tokio::spawn(service.serve(listener, cancellation_token.clone()));
        Self {
            address,
            cancellation_token,
            handle,
        }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig {
            service_address: "127.0.0.1".to_string(),
            service_port: self.address.port(),
            ..ClientConfig::default()
        }
    }

    async fn stop(self) {
        self.cancellation_token.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

#[test_log::test(tokio::test)]
async fn test_queries_over_http() {
    let server = TestServer::start().await;
    let client = BookchatClient::new(&server.config()).unwrap();

    let books = client.books().await.unwrap();
    assert_eq!(
        books,
        vec![
            Book::new("Harry Potter and the Chamber of Secrets", "J.K. Rowling"),
            Book::new("Jurassic Park", "Michael Crichton"),
        ]
    );

    let authors = client.authors().await.unwrap();
    assert_eq!(authors.len(), 2);
    assert!(authors.iter().all(|author| author.books.len() == 2));
    assert_eq!(authors, Catalog::new().authors());

    let chat = client.chat().await.unwrap();
    assert_eq!(&chat, Catalog::new().chat());

    // The second round is answered from the cache.
    assert_eq!(client.transport().len().await, 3);
    assert_eq!(client.books().await.unwrap(), books);
    assert_eq!(client.transport().len().await, 3);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_create_chat_over_http() {
    let server = TestServer::start().await;
    let client = BookchatClient::new(&server.config()).unwrap();

    let chat = client.create_chat(Some("hi"), None).await.unwrap();
    assert_eq!(
        chat,
        Chat {
            id: "2".to_string(),
            from: "well".to_string(),
            content: Some("hi".to_string()),
            created_at: "14/07/2020T02:00".to_string(),
        }
    );

    let chat = client.create_chat(None, Some("Bob")).await.unwrap();
    assert_eq!(chat, Chat::created(None, Some("Bob".to_string())));

    // Mutations are never cached.
    assert!(client.transport().is_empty().await);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_missing_content_is_a_graphql_error() {
    let server = TestServer::start().await;
    let client = BookchatClient::new(&server.config()).unwrap();

    let request = GraphQlRequest::new(
        "mutation { createChat(from: \"Bob\") { id from content createdAt } }",
    );
    let response = client.execute(request).await.unwrap();
    assert_eq!(response.data, json!({"createChat": null}));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "Chat has no content");

    let request = GraphQlRequest::new("{ nothing }");
    assert_matches!(
        client.execute(request).await,
        Ok(response) if !response.errors.is_empty()
    );

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_operations_over_websocket() {
    let server = TestServer::start().await;
    let transport = WebSocketTransport::new(server.config().websocket());

    let mut responses = transport
        .request(GraphQlRequest::new("{ chat { id from } }"))
        .await
        .unwrap();
    let response = responses.next().await.unwrap().unwrap();
    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(response.data, json!({"chat": {"id": "1", "from": "K"}}));
    assert!(responses.next().await.is_none());

    let mut responses = transport
        .request(GraphQlRequest::new(
            "mutation { createChat(content: \"ws\") { from content } }",
        ))
        .await
        .unwrap();
    let response = responses.next().await.unwrap().unwrap();
    assert_eq!(
        response.data,
        json!({"createChat": {"from": "well", "content": "ws"}})
    );

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_subscriptions_are_routed_to_the_websocket() {
    let server = TestServer::start().await;
    let client = BookchatClient::new(&server.config()).unwrap();

    // The schema has no subscription root, so the server rejects the operation.
    let result = client
        .execute(GraphQlRequest::new("subscription { chat { id } }"))
        .await;
    match result {
        Ok(response) => assert!(!response.errors.is_empty()),
        Err(error) => assert_matches!(error, ClientError::Protocol(_) | ClientError::NoResponse),
    }

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_unreachable_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig {
        service_address: "127.0.0.1".to_string(),
        service_port: port,
        ..ClientConfig::default()
    };
    let client = BookchatClient::new(&config).unwrap();
    assert_matches!(client.books().await, Err(ClientError::Reqwest(_)));
}
