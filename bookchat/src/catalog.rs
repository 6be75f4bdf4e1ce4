// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{Author, Book, Chat};

/// The fixed records served by the query root.
///
/// A catalog is built once when the service starts and never changes afterwards.
/// The author list is kept independently of the book list: the two share some
/// titles but neither is derived from the other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    books: Vec<Book>,
    authors: Vec<Author>,
    chat: Chat,
}

impl Default for Catalog {
    fn default() -> Self {
        let books = vec![
            Book::new("Harry Potter and the Chamber of Secrets", "J.K. Rowling"),
            Book::new("Jurassic Park", "Michael Crichton"),
        ];
        let authors = vec![
            Author {
                name: "J.K. Rowling".to_string(),
                books: vec![
                    Book::new("Harry Potter and the Chamber of Secrets", "J.K. Rowling"),
                    Book::new("Harry Potter 2", "J.K. Rowling"),
                ],
            },
            Author {
                name: "Michael Crichton".to_string(),
                books: vec![
                    Book::new("Jurassic Park1", "Michael Crichton"),
                    Book::new("Jurassic Park2", "Michael Crichton"),
                ],
            },
        ];
        let chat = Chat {
            id: "1".to_string(),
            from: "K".to_string(),
            content: Some("deneme".to_string()),
            created_at: "14/07/2020T01:19".to_string(),
        };
        Self {
            books,
            authors,
            chat,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the books, always in the same order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Returns the authors, always in the same order.
    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    /// Returns the current chat.
    pub fn chat(&self) -> &Chat {
        &self.chat
    }
}
