// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! GraphQL bindings for the record types.
//!
//! The field nullability follows the published schema rather than the Rust types:
//! book and author fields are nullable, chat fields are not.

use async_graphql::{Error, Object, ID};

use crate::{Author, Book, Chat};

#[Object]
impl Book {
    async fn title(&self) -> Option<&str> {
        Some(&self.title)
    }

    async fn author(&self) -> Option<&str> {
        Some(&self.author)
    }
}

#[Object]
impl Author {
    async fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    async fn books(&self) -> Option<Vec<Option<&Book>>> {
        Some(self.books.iter().map(Some).collect())
    }
}

#[Object]
impl Chat {
    async fn id(&self) -> ID {
        ID(self.id.clone())
    }

    async fn from(&self) -> &str {
        &self.from
    }

    /// Fails for a created chat without content, since the field is non-null.
    async fn content(&self) -> Result<&str, Error> {
        self.content
            .as_deref()
            .ok_or_else(|| Error::new("Chat has no content"))
    }

    async fn created_at(&self) -> &str {
        &self.created_at
    }
}
