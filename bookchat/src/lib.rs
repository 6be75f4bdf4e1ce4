// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Common definitions for the Bookchat service.

The records exchanged between the server and its clients, and the fixed catalog
the server answers queries from.
*/

mod catalog;
#[cfg(feature = "async-graphql")]
mod graphql;

use serde::{Deserialize, Serialize};

pub use crate::catalog::Catalog;

/// The ID given to every chat returned by the `createChat` mutation.
pub const CREATED_CHAT_ID: &str = "2";
/// The creation time given to every chat returned by the `createChat` mutation.
pub const CREATED_CHAT_TIMESTAMP: &str = "14/07/2020T02:00";
/// The sender used by `createChat` when none is provided.
pub const DEFAULT_SENDER: &str = "well";

/// A book, identified only by its contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
        }
    }
}

/// An author together with their books, embedded by value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub books: Vec<Book>,
}

/// A chat message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub from: String,
    /// `None` only for chats created without content.
    pub content: Option<String>,
    pub created_at: String,
}

impl Chat {
    /// Builds the chat returned by the `createChat` mutation.
    ///
    /// The ID and timestamp are fixed. A missing sender is replaced by
    /// [`DEFAULT_SENDER`] and the content is passed through as is. Nothing is stored.
    pub fn created(content: Option<String>, from: Option<String>) -> Self {
        Self {
            id: CREATED_CHAT_ID.to_string(),
            from: from.unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            content,
            created_at: CREATED_CHAT_TIMESTAMP.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn created_chat_defaults_the_sender() {
        let chat = Chat::created(Some("hi".to_string()), None);
        assert_eq!(
            chat,
            Chat {
                id: "2".to_string(),
                from: "well".to_string(),
                content: Some("hi".to_string()),
                created_at: "14/07/2020T02:00".to_string(),
            }
        );
    }

    #[test]
    fn created_chat_keeps_missing_content() {
        let chat = Chat::created(None, Some("Bob".to_string()));
        assert_eq!(chat.id, "2");
        assert_eq!(chat.from, "Bob");
        assert_eq!(chat.content, None);
        assert_eq!(chat.created_at, "14/07/2020T02:00");
    }

    #[test]
    fn created_chat_ignores_repetition() {
        let first = Chat::created(Some("a".to_string()), Some("x".to_string()));
        let second = Chat::created(Some("a".to_string()), Some("x".to_string()));
        assert_eq!(first, second);
    }

    #[test]
    fn chat_uses_camel_case_on_the_wire() {
        let chat = Chat::created(None, Some("Bob".to_string()));
        assert_eq!(
            serde_json::to_value(&chat).unwrap(),
            json!({
                "id": "2",
                "from": "Bob",
                "content": null,
                "createdAt": "14/07/2020T02:00",
            })
        );
    }
}
