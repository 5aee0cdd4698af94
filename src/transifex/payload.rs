//! JSON:API request bodies and response readers for Transifex API v3.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::model::SourceFields;

/// Media type Transifex expects on every request.
pub const JSON_API: &str = "application/vnd.api+json";

/// The source-file format every synced resource uses.
pub const I18N_FORMAT: &str = "KEYVALUEJSON";

/// `o:{org}:p:{project}:r:{slug}`
#[must_use]
pub fn resource_id(project_id: &str, slug: &str) -> String {
    format!("{project_id}:r:{slug}")
}

#[must_use]
pub fn create_resource(project_id: &str, slug: &str, name: &str) -> Value {
    json!({
        "data": {
            "type": "resources",
            "attributes": { "slug": slug, "name": name },
            "relationships": {
                "project": { "data": { "type": "projects", "id": project_id } },
                "i18n_format": { "data": { "type": "i18n_formats", "id": I18N_FORMAT } }
            }
        }
    })
}

#[must_use]
pub fn rename_resource(resource_id: &str, name: &str) -> Value {
    json!({
        "data": {
            "type": "resources",
            "id": resource_id,
            "attributes": { "name": name }
        }
    })
}

/// Source-string upload that replaces the resource content with `fields`,
/// one key per field.
///
/// # Errors
///
/// Returns `Error::Json` if the content cannot be encoded.
pub fn upload_strings(resource_id: &str, fields: &SourceFields) -> Result<Value> {
    let content: Map<String, Value> = fields
        .iter()
        .map(|(name, text)| (name.to_string(), Value::String(text.to_string())))
        .collect();
    let content = serde_json::to_string(&content)?;

    Ok(json!({
        "data": {
            "type": "resource_strings_async_uploads",
            "attributes": { "content": content, "content_encoding": "text" },
            "relationships": {
                "resource": { "data": { "type": "resources", "id": resource_id } }
            }
        }
    }))
}

#[must_use]
pub fn tmx_download(project_id: &str) -> Value {
    json!({
        "data": {
            "type": "tmx_async_downloads",
            "relationships": {
                "project": { "data": { "type": "projects", "id": project_id } }
            }
        }
    })
}

/// `data.id` of a JSON:API document.
///
/// # Errors
///
/// Returns `Error::Other` if the document has no string id.
pub fn data_id(doc: &Value) -> Result<String> {
    doc["data"]["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| Error::Other("Transifex response is missing data.id".into()))
}

/// `data.attributes.name` of a resource document.
#[must_use]
pub fn resource_name(doc: &Value) -> Option<&str> {
    doc["data"]["attributes"]["name"].as_str()
}

/// `data.attributes.status` of an async job document.
#[must_use]
pub fn job_status(doc: &Value) -> Option<&str> {
    doc["data"]["attributes"]["status"].as_str()
}

/// Human-readable summary of `data.attributes.errors`.
#[must_use]
pub fn job_errors(doc: &Value) -> String {
    let details: Vec<String> = doc["data"]["attributes"]["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    e["detail"]
                        .as_str()
                        .or_else(|| e["code"].as_str())
                        .unwrap_or("unknown error")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    if details.is_empty() {
        "no details reported".to_string()
    } else {
        details.join("; ")
    }
}

/// Key/text pairs from one page of `/resource_strings`.
#[must_use]
pub fn source_strings(page: &Value) -> Vec<(String, String)> {
    page["data"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let attrs = &entry["attributes"];
                    let key = attrs["key"].as_str()?;
                    let text = attrs["strings"]["other"].as_str()?;
                    Some((key.to_string(), text.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `links.next` of a cursor-paginated list.
#[must_use]
pub fn next_link(page: &Value) -> Option<String> {
    page["links"]["next"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}
