//! Catalogue book records.
//!
//! A [`Book`] carries a denormalised `available` flag mirroring "no active
//! loan exists for this book". Only the loan engine and the reconciler flip the
//! flag; catalogue curation edits title and author through [`BookDraft`], which
//! has no availability field at all.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by the book constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    EmptyTitle,
    EmptyAuthor,
}

impl fmt::Display for BookValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::EmptyAuthor => write!(f, "author must not be empty"),
        }
    }
}

impl std::error::Error for BookValidationError {}

/// Store-assigned book identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BookId(u64);

impl BookId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BookId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

macro_rules! required_text {
    ($(#[$meta:meta])* $name:ident, $error:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the value, trimming surrounding whitespace.
            pub fn new(value: impl AsRef<str>) -> Result<Self, BookValidationError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(BookValidationError::$error);
                }
                Ok(Self(trimmed.to_owned()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = BookValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

required_text!(
    /// Book title; trimmed and non-empty.
    BookTitle,
    EmptyTitle
);

required_text!(
    /// Book author; trimmed and non-empty.
    BookAuthor,
    EmptyAuthor
);

/// Curated fields of a book, used for inserts and detail edits.
///
/// # Examples
/// ```
/// use lending::domain::BookDraft;
///
/// let draft = BookDraft::try_from_strings("Moon", "A. Author").unwrap();
/// assert_eq!(draft.title().as_ref(), "Moon");
/// assert!(BookDraft::try_from_strings("  ", "A. Author").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    title: BookTitle,
    author: BookAuthor,
}

impl BookDraft {
    /// Build a draft from validated parts.
    pub fn new(title: BookTitle, author: BookAuthor) -> Self {
        Self { title, author }
    }

    /// Fallible constructor from raw strings.
    pub fn try_from_strings(
        title: impl AsRef<str>,
        author: impl AsRef<str>,
    ) -> Result<Self, BookValidationError> {
        Ok(Self::new(BookTitle::new(title)?, BookAuthor::new(author)?))
    }

    /// Title to store.
    pub fn title(&self) -> &BookTitle {
        &self.title
    }

    /// Author to store.
    pub fn author(&self) -> &BookAuthor {
        &self.author
    }
}

/// Catalogue book with its cached availability flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    id: BookId,
    title: BookTitle,
    author: BookAuthor,
    available: bool,
}

impl Book {
    /// Assemble a book record as read from the catalogue store.
    pub fn new(id: BookId, draft: BookDraft, available: bool) -> Self {
        let BookDraft { title, author } = draft;
        Self {
            id,
            title,
            author,
            available,
        }
    }

    /// Store-assigned identifier.
    pub fn id(&self) -> BookId {
        self.id
    }

    /// Current title.
    pub fn title(&self) -> &BookTitle {
        &self.title
    }

    /// Current author.
    pub fn author(&self) -> &BookAuthor {
        &self.author
    }

    /// Cached "no active loan" flag.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Copy with replaced title and author; availability is untouched.
    pub fn with_details(&self, draft: &BookDraft) -> Self {
        Self {
            id: self.id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            available: self.available,
        }
    }

    /// Copy with a new availability flag.
    pub fn with_availability(&self, available: bool) -> Self {
        Self {
            available,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("", "Author", BookValidationError::EmptyTitle)]
    #[case("   ", "Author", BookValidationError::EmptyTitle)]
    #[case("Moon", "", BookValidationError::EmptyAuthor)]
    #[case("Moon", "\t", BookValidationError::EmptyAuthor)]
    fn drafts_require_title_and_author(
        #[case] title: &str,
        #[case] author: &str,
        #[case] expected: BookValidationError,
    ) {
        let err = BookDraft::try_from_strings(title, author).expect_err("invalid draft");
        assert_eq!(err, expected);
    }

    #[rstest]
    fn drafts_trim_whitespace() {
        let draft = BookDraft::try_from_strings("  Moon ", " Author  ").expect("valid draft");
        assert_eq!(draft.title().as_ref(), "Moon");
        assert_eq!(draft.author().as_ref(), "Author");
    }

    #[rstest]
    fn with_details_keeps_availability() {
        let draft = BookDraft::try_from_strings("Moon", "Author").expect("valid draft");
        let book = Book::new(BookId::new(1), draft, false);
        let edited = book.with_details(
            &BookDraft::try_from_strings("Moon II", "Author").expect("valid draft"),
        );
        assert_eq!(edited.title().as_ref(), "Moon II");
        assert!(!edited.is_available());
        assert_eq!(edited.id(), book.id());
    }

    #[rstest]
    fn book_serialises_in_camel_case() {
        let draft = BookDraft::try_from_strings("Moon", "Author").expect("valid draft");
        let book = Book::new(BookId::new(7), draft, true);
        let value = serde_json::to_value(&book).expect("book serialises");
        assert_eq!(
            value,
            json!({"id": 7, "title": "Moon", "author": "Author", "available": true})
        );
    }

    #[rstest]
    fn title_deserialisation_validates() {
        let result = serde_json::from_value::<BookTitle>(json!("  "));
        assert!(result.is_err());
    }
}
