// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The server component of the Bookchat service.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::Context as _;
use async_graphql::{EmptySubscription, Object, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{Extension, Router};
use bookchat::{Author, Book, Catalog, Chat};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;


/// The port the service listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 4000;

/// The GraphQL schema of the service.
pub type BookchatSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Returns an HTML response constructing the GraphiQL web page for the given URI.
pub(crate) async fn graphiql(uri: axum::http::Uri) -> impl axum::response::IntoResponse {
    axum::response::Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint(uri.path())
            .subscription_endpoint("/ws")
            .finish(),
    )
}

/// The root GraphQL query type.
pub struct QueryRoot {
    catalog: Arc<Catalog>,
}

/// The root GraphQL mutation type.
pub struct MutationRoot;

#[Object(name = "Query")]
impl QueryRoot {
    /// Returns every book in the catalog.
    async fn books(&self) -> Option<Vec<Option<&Book>>> {
        Some(self.catalog.books().iter().map(Some).collect())
    }

    /// Returns every author, with their books.
    async fn authors(&self) -> Option<Vec<Option<&Author>>> {
        Some(self.catalog.authors().iter().map(Some).collect())
    }

    /// Returns the current chat.
    async fn chat(&self) -> Option<&Chat> {
        Some(self.catalog.chat())
    }
}

#[Object(name = "Mutation")]
impl MutationRoot {
    /// Creates a chat message. Nothing is stored: the same ID and timestamp are
    /// returned on every call.
    async fn create_chat(&self, content: Option<String>, from: Option<String>) -> Option<Chat> {
        Some(Chat::created(content, from))
    }
}

/// Builds the schema answering from the given catalog.
pub fn schema(catalog: Arc<Catalog>) -> BookchatSchema {
    Schema::build(QueryRoot { catalog }, MutationRoot, EmptySubscription).finish()
}

/// Where the service listens.
#[derive(Clone, Copy, Debug)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl ServiceConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// A GraphQL interface to the book catalog and chats.
#[derive(Clone)]
pub struct BookchatService {
    config: ServiceConfig,
    schema: BookchatSchema,
}

impl BookchatService {
    /// Creates a new instance of the service.
    pub fn new(config: ServiceConfig, catalog: Catalog) -> Self {
        Self {
            config,
            schema: schema(Arc::new(catalog)),
        }
    }

    pub fn schema(&self) -> &BookchatSchema {
        &self.schema
    }

    /// Returns the HTTP routes of the service.
    pub fn router(&self) -> Router {
        let index_handler = axum::routing::get(graphiql).post(Self::index_handler);

        Router::new()
            .route("/", index_handler)
            .route("/ready", axum::routing::get(|| async { "ready!" }))
            .route_service("/ws", GraphQLSubscription::new(self.schema.clone()))
            .layer(Extension(self.schema.clone()))
            .layer(CorsLayer::permissive())
    }

    /// Binds the configured address and runs the service until cancelled.
    #[tracing::instrument(name = "BookchatService::run", skip_all, fields(port = self.config.port))]
    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;
        self.serve(listener, cancellation_token).await
    }

    /// Runs the service on an already bound listener until cancelled.
    pub async fn serve(
        self,
        listener: TcpListener,
        cancellation_token: CancellationToken,
    ) -> anyhow::Result<()> {
        let address = listener.local_addr()?;
        let url = ready_url(address);
        info!("GraphiQL IDE: {url}");
        println!("🚀  Server ready at {url}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(cancellation_token.cancelled_owned())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Executes a GraphQL query and generates a response for our `Schema`.
    async fn index_handler(
        schema: Extension<BookchatSchema>,
        request: GraphQLRequest,
    ) -> GraphQLResponse {
        schema.execute(request.into_inner()).await.into()
    }
}

/// Returns the URL clients should use to reach a service bound to `address`.
pub fn ready_url(address: SocketAddr) -> String {
    if address.ip().is_unspecified() || address.ip().is_loopback() {
        format!("http://localhost:{}/", address.port())
    } else {
        format!("http://{address}/")
    }
}
