// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A local cache of query responses.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use futures::StreamExt as _;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    transport::{operation_type, OperationType, ResponseStream, Transport},
    ClientError, GraphQlRequest, GraphQlResponse,
};

/// The default number of cached responses.
pub const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(size) => size,
    None => panic!("Default cache size is larger than zero"),
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    operation_name: Option<String>,
    variables: String,
}

impl CacheKey {
    fn new(request: &GraphQlRequest) -> Result<Self, ClientError> {
        Ok(Self {
            query: request.query.clone(),
            operation_name: request.operation_name.clone(),
            variables: serde_json::to_string(&request.variables)?,
        })
    }
}

/// Wraps a transport and remembers the responses to queries.
///
/// Mutations and subscriptions always go through. Responses carrying errors are
/// not remembered.
pub struct CachedTransport<T> {
    inner: T,
    cache: Mutex<LruCache<CacheKey, GraphQlResponse>>,
}

impl<T> CachedTransport<T> {
    pub fn new(inner: T, size: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(size)),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Returns the number of cached responses.
    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }

    /// Forgets every cached response.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }
}

#[async_trait]
impl<T: Transport> Transport for CachedTransport<T> {
    async fn request(&self, request: GraphQlRequest) -> Result<ResponseStream, ClientError> {
        if operation_type(&request)? != OperationType::Query {
            return self.inner.request(request).await;
        }

        let key = CacheKey::new(&request)?;
        if let Some(response) = self.cache.lock().await.get(&key).cloned() {
            debug!("cache hit for query {:?}", key.query);
            return Ok(futures::stream::iter([Ok(response)]).boxed());
        }

        let response = self
            .inner
            .request(request)
            .await?
            .next()
            .await
            .ok_or(ClientError::NoResponse)??;
        if response.errors.is_empty() {
            self.cache.lock().await.put(key, response.clone());
        }
        Ok(futures::stream::iter([Ok(response)]).boxed())
    }
}
