//! Per-kind description of the Braze endpoints and fields.

use serde_json::Value;

use crate::model::{ContentKind, SourceFields};

/// Where a content kind lives in the Braze API and which fields carry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSchema {
    pub kind: ContentKind,
    pub list_path: &'static str,
    pub info_path: &'static str,
    /// Array key holding the entries of a list page.
    pub array_key: &'static str,
    /// Identifier key in list entries, also the info query parameter.
    pub id_key: &'static str,
    pub name_key: &'static str,
    /// Translatable fields, in upload order.
    pub fields: &'static [&'static str],
}

pub const EMAIL_TEMPLATE: KindSchema = KindSchema {
    kind: ContentKind::EmailTemplate,
    list_path: "/templates/email/list",
    info_path: "/templates/email/info",
    array_key: "templates",
    id_key: "email_template_id",
    name_key: "template_name",
    fields: &["subject", "preheader", "body"],
};

pub const CONTENT_BLOCK: KindSchema = KindSchema {
    kind: ContentKind::ContentBlock,
    list_path: "/content_blocks/list",
    info_path: "/content_blocks/info",
    array_key: "content_blocks",
    id_key: "content_block_id",
    name_key: "name",
    fields: &["content"],
};

impl KindSchema {
    #[must_use]
    pub const fn for_kind(kind: ContentKind) -> &'static Self {
        match kind {
            ContentKind::EmailTemplate => &EMAIL_TEMPLATE,
            ContentKind::ContentBlock => &CONTENT_BLOCK,
        }
    }

    /// Entries of one list page; an absent key reads as an empty page.
    #[must_use]
    pub fn entries<'v>(&self, page: &'v Value) -> &'v [Value] {
        page[self.array_key].as_array().map_or(&[][..], Vec::as_slice)
    }

    /// The entry's id, trimmed. Numeric ids are accepted as text.
    #[must_use]
    pub fn id_of(&self, entry: &Value) -> Option<String> {
        let id = match &entry[self.id_key] {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    #[must_use]
    pub fn name_of(&self, entry: &Value) -> Option<String> {
        entry[self.name_key].as_str().map(|s| s.trim().to_string())
    }

    /// The translatable fields of an info response. Blank text is dropped.
    #[must_use]
    pub fn fields_of(&self, info: &Value) -> SourceFields {
        let mut fields = SourceFields::new();
        for name in self.fields {
            if let Some(text) = info[*name].as_str() {
                fields.insert(*name, text);
            }
        }
        fields
    }
}
