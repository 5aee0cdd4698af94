//! Source item model.
//!
//! A source item is one piece of translatable Braze content. Each item maps
//! to exactly one Transifex resource, keyed by the slug derived from its id.

use serde::{Deserialize, Serialize};

/// Maximum length of a Transifex resource slug.
pub const MAX_SLUG_LEN: usize = 50;

/// The kinds of Braze content that carry translatable text.
///
/// Variant order is the sync order: email templates first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    EmailTemplate,
    ContentBlock,
}

impl ContentKind {
    /// All kinds, in sync order.
    pub const ALL: [Self; 2] = [Self::EmailTemplate, Self::ContentBlock];

    /// Human-readable plural label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EmailTemplate => "email templates",
            Self::ContentBlock => "content blocks",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmailTemplate => write!(f, "email_template"),
            Self::ContentBlock => write!(f, "content_block"),
        }
    }
}

/// Ordered field-name → text mapping for one item.
///
/// Only non-blank text is ever stored, so every entry is translatable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFields(Vec<(String, String)>);

impl SourceFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, ignoring blank text. A repeated name replaces the
    /// earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = text;
        } else {
            self.0.push((name, text));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, t)| (n.as_str(), t.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (name, text) in iter {
            fields.insert(name, text);
        }
        fields
    }
}

/// A unit of translatable content fetched from Braze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub kind: ContentKind,
    /// Braze-assigned identifier. Never empty.
    pub id: String,
    /// Display name, used as the Transifex resource name.
    pub name: String,
    pub fields: SourceFields,
}

impl SourceItem {
    /// Build an item, rejecting an empty id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `id` is blank.
    pub fn new(
        kind: ContentKind,
        id: impl Into<String>,
        name: impl Into<String>,
        fields: SourceFields,
    ) -> crate::Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(crate::Error::Validation(format!(
                "{kind} is missing its id"
            )));
        }
        Ok(Self {
            kind,
            id,
            name: name.into(),
            fields,
        })
    }

    /// The Transifex slug for this item.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.id)
    }

    /// Short label for logs and collision messages, e.g. `content_block 'Footer' (ab12)`.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} '{}' ({})", self.kind, self.name, self.id)
    }
}

/// Sanitize an identifier into a Transifex resource slug.
///
/// Lowercases, replaces every character outside `[a-z0-9_-]` with `-`, and
/// truncates to [`MAX_SLUG_LEN`]. Applying it to its own output is a no-op.
#[must_use]
pub fn slugify(id: &str) -> String {
    id.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_SLUG_LEN)
        .collect()
}
