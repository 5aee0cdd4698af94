//! In-memory stand-ins for Braze and Transifex, for unit tests.
//!
//! [`FakeTransport`] answers every request from, in order:
//! 1. the hook, if one is installed and it returns a reply
//! 2. the scripted reply queue
//! 3. the [`FakeBackend`], which models just enough of both APIs to run a
//!    whole sync end to end
//!
//! Every request is recorded, so tests can assert on what was (not) sent.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};

use crate::config::{
    BackupConfig, BackupPolicy, BrazeConfig, HttpConfig, Secret, SyncConfig, TransifexConfig,
};
use crate::http::{ApiRequest, RawResponse, RetryPolicy, Transport, TransportError, TransportErrorKind};
use crate::model::ContentKind;
use crate::transifex::PollSchedule;

pub(crate) const BRAZE_URL: &str = "https://braze.test";
pub(crate) const TX_URL: &str = "https://tx.test";
pub(crate) const FILES_URL: &str = "https://files.tx.test";
pub(crate) const FAKE_TMX: &str =
    r#"<?xml version="1.0" encoding="UTF-8"?><tmx version="1.4"><header/><body/></tmx>"#;

/// A configuration pointing at the fake backend, with no pacing or backoff.
pub(crate) fn test_config(backup_dir: &Path) -> SyncConfig {
    let poll = PollSchedule {
        initial_interval: Duration::ZERO,
        max_interval: Duration::ZERO,
        timeout: Duration::from_secs(5),
    };
    SyncConfig {
        braze: BrazeConfig {
            base_url: BRAZE_URL.into(),
            api_key: Secret::new("braze-key"),
            page_size: 2,
            request_interval: Duration::ZERO,
        },
        transifex: TransifexConfig {
            base_url: TX_URL.into(),
            api_token: Secret::new("tx-token"),
            organization: "acme".into(),
            project: "braze-testing".into(),
            verify_uploads: true,
            upload_poll: poll.clone(),
        },
        backup: BackupConfig {
            enabled: true,
            directory: backup_dir.to_path_buf(),
            policy: BackupPolicy::FailClosed,
            poll,
        },
        http: HttpConfig {
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::immediate(2),
            max_pages: 50,
        },
        parallelism: 1,
    }
}

// ── Replies ───────────────────────────────────────────────────

/// One canned response.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: u16,
    body: Vec<u8>,
    content_type: Option<String>,
    retry_after: Option<String>,
    error: Option<TransportErrorKind>,
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.as_bytes().to_vec(),
            content_type: Some("application/vnd.api+json".into()),
            retry_after: None,
            error: None,
        }
    }

    pub(crate) fn value(status: u16, body: &Value) -> Self {
        Self::json(status, &body.to_string())
    }

    pub(crate) fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_type: None,
            retry_after: None,
            error: None,
        }
    }

    pub(crate) fn bytes(status: u16, content_type: &str, body: &[u8]) -> Self {
        Self {
            status,
            body: body.to_vec(),
            content_type: Some(content_type.into()),
            retry_after: None,
            error: None,
        }
    }

    pub(crate) fn connect_error() -> Self {
        Self {
            error: Some(TransportErrorKind::Connect),
            ..Self::status(0)
        }
    }

    pub(crate) fn retry_after(mut self, value: &str) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    fn into_result(self) -> Result<RawResponse, TransportError> {
        if let Some(kind) = self.error {
            return Err(TransportError {
                kind,
                message: "fake transport refused the connection".into(),
            });
        }
        Ok(RawResponse {
            status: self.status,
            retry_after: self.retry_after,
            content_type: self.content_type,
            body: self.body,
        })
    }
}

// ── Backend ───────────────────────────────────────────────────

/// A Braze list entry plus the fields its info endpoint returns.
#[derive(Debug, Clone)]
pub(crate) struct FakeBrazeItem {
    pub kind: ContentKind,
    pub id: Option<String>,
    pub name: Option<String>,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub(crate) struct FakeResource {
    pub name: String,
    pub strings: BTreeMap<String, String>,
}

/// How the TMX export job behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TmxMode {
    /// Completes with a download link.
    Link,
    /// The status endpoint serves the file itself once ready.
    Inline,
    Fail,
}

#[derive(Debug)]
pub(crate) struct FakeBackend {
    pub braze: Vec<FakeBrazeItem>,
    pub resources: BTreeMap<String, FakeResource>,
    pub creates: usize,
    pub renames: usize,
    pub uploads: Vec<String>,
    pub fail_uploads: HashSet<String>,
    pub upload_jobs: Vec<(String, bool)>,
    pub tmx_mode: TmxMode,
    /// Status polls answered with `processing` before the export finishes.
    pub tmx_pending_polls: usize,
    pub tmx_requests: usize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            braze: Vec::new(),
            resources: BTreeMap::new(),
            creates: 0,
            renames: 0,
            uploads: Vec::new(),
            fail_uploads: HashSet::new(),
            upload_jobs: Vec::new(),
            tmx_mode: TmxMode::Link,
            tmx_pending_polls: 1,
            tmx_requests: 0,
        }
    }
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_template(self, id: &str, name: &str, fields: &[(&str, &str)]) -> Self {
        self.with_raw(ContentKind::EmailTemplate, Some(id), Some(name), fields)
    }

    pub(crate) fn with_block(self, id: &str, name: &str, content: &str) -> Self {
        self.with_raw(ContentKind::ContentBlock, Some(id), Some(name), &[("content", content)])
    }

    pub(crate) fn with_raw(
        mut self,
        kind: ContentKind,
        id: Option<&str>,
        name: Option<&str>,
        fields: &[(&str, &str)],
    ) -> Self {
        self.braze.push(FakeBrazeItem {
            kind,
            id: id.map(String::from),
            name: name.map(String::from),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        });
        self
    }

    pub(crate) fn with_resource(mut self, slug: &str, name: &str) -> Self {
        self.resources.insert(
            slug.to_string(),
            FakeResource {
                name: name.to_string(),
                strings: BTreeMap::new(),
            },
        );
        self
    }

    fn route(&mut self, request: &ApiRequest) -> Reply {
        let (base, path, params) = split_url(request);
        match base {
            BRAZE_URL => self.braze_route(&path, &params),
            TX_URL => self.transifex_route(request, &path, &params),
            FILES_URL if request.method == Method::GET => {
                Reply::bytes(200, "application/octet-stream", FAKE_TMX.as_bytes())
            }
            _ => Reply::json(404, r#"{"message":"unknown host"}"#),
        }
    }

    fn braze_route(&self, path: &str, params: &[(String, String)]) -> Reply {
        let param = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        let (kind, list) = match path {
            "/templates/email/list" => (ContentKind::EmailTemplate, true),
            "/content_blocks/list" => (ContentKind::ContentBlock, true),
            "/templates/email/info" => (ContentKind::EmailTemplate, false),
            "/content_blocks/info" => (ContentKind::ContentBlock, false),
            _ => return Reply::json(404, r#"{"message":"no such endpoint"}"#),
        };
        let (array_key, id_key, name_key) = match kind {
            ContentKind::EmailTemplate => ("templates", "email_template_id", "template_name"),
            ContentKind::ContentBlock => ("content_blocks", "content_block_id", "name"),
        };
        let of_kind = self.braze.iter().filter(|i| i.kind == kind);

        if list {
            let limit: usize = param("limit").and_then(|v| v.parse().ok()).unwrap_or(100);
            let offset: usize = param("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
            let entries: Vec<Value> = of_kind
                .skip(offset)
                .take(limit)
                .map(|item| {
                    let mut entry = json!({ "tags": [] });
                    if let Some(id) = &item.id {
                        entry[id_key] = json!(id);
                    }
                    if let Some(name) = &item.name {
                        entry[name_key] = json!(name);
                    }
                    entry
                })
                .collect();
            return Reply::value(
                200,
                &json!({ "count": entries.len(), array_key: entries, "message": "success" }),
            );
        }

        let Some(wanted) = param(id_key) else {
            return Reply::json(400, r#"{"message":"missing id"}"#);
        };
        let Some(item) = self
            .braze
            .iter()
            .filter(|i| i.kind == kind)
            .find(|i| i.id.as_deref() == Some(wanted))
        else {
            return Reply::json(404, r#"{"message":"not found"}"#);
        };
        let mut info = json!({ id_key: wanted, "message": "success" });
        if let Some(name) = &item.name {
            info[name_key] = json!(name);
        }
        for (field, text) in &item.fields {
            info[field.as_str()] = json!(text);
        }
        Reply::value(200, &info)
    }

    fn transifex_route(&mut self, request: &ApiRequest, path: &str, params: &[(String, String)]) -> Reply {
        let param = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let body = request.body.clone().unwrap_or(Value::Null);
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (request.method.clone(), segments.as_slice()) {
            (Method::GET, ["resources", id]) => match self.resources.get(slug_of(id)) {
                Some(res) => Reply::value(200, &resource_json(id, slug_of(id), &res.name)),
                None => Reply::json(404, r#"{"errors":[{"status":"404","code":"not_found"}]}"#),
            },
            (Method::POST, ["resources"]) => {
                let slug = body["data"]["attributes"]["slug"].as_str().unwrap_or_default().to_string();
                let name = body["data"]["attributes"]["name"].as_str().unwrap_or_default().to_string();
                let project = body["data"]["relationships"]["project"]["data"]["id"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if slug.is_empty() || self.resources.contains_key(&slug) {
                    return Reply::json(409, r#"{"errors":[{"status":"409","code":"conflict"}]}"#);
                }
                self.creates += 1;
                self.resources.insert(
                    slug.clone(),
                    FakeResource {
                        name: name.clone(),
                        strings: BTreeMap::new(),
                    },
                );
                Reply::value(201, &resource_json(&format!("{project}:r:{slug}"), &slug, &name))
            }
            (Method::PATCH, ["resources", id]) => {
                let name = body["data"]["attributes"]["name"].as_str().unwrap_or_default().to_string();
                match self.resources.get_mut(slug_of(id)) {
                    Some(res) => {
                        res.name.clone_from(&name);
                        self.renames += 1;
                        Reply::value(200, &resource_json(id, slug_of(id), &name))
                    }
                    None => Reply::json(404, r#"{"errors":[{"status":"404"}]}"#),
                }
            }
            (Method::POST, ["resource_strings_async_uploads"]) => {
                let id = body["data"]["relationships"]["resource"]["data"]["id"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let slug = slug_of(&id).to_string();
                let content: BTreeMap<String, String> = body["data"]["attributes"]["content"]
                    .as_str()
                    .and_then(|c| serde_json::from_str(c).ok())
                    .unwrap_or_default();
                let Some(res) = self.resources.get_mut(&slug) else {
                    return Reply::json(404, r#"{"errors":[{"status":"404"}]}"#);
                };
                let fails = self.fail_uploads.contains(&slug);
                if !fails {
                    res.strings = content;
                }
                self.uploads.push(slug);
                self.upload_jobs.push((id, fails));
                let job = format!("upload-{}", self.upload_jobs.len());
                Reply::value(
                    202,
                    &json!({ "data": { "id": job, "type": "resource_strings_async_uploads",
                        "attributes": { "status": "pending" } } }),
                )
            }
            (Method::GET, ["resource_strings_async_uploads", job]) => {
                let index: usize = job
                    .trim_start_matches("upload-")
                    .parse()
                    .unwrap_or(0);
                match index.checked_sub(1).and_then(|i| self.upload_jobs.get(i)) {
                    Some((_, true)) => Reply::value(
                        200,
                        &json!({ "data": { "id": job, "attributes": { "status": "failed",
                            "errors": [{ "code": "parse_error", "detail": "Invalid KEYVALUEJSON" }] } } }),
                    ),
                    Some((_, false)) => Reply::value(
                        200,
                        &json!({ "data": { "id": job, "attributes": { "status": "succeeded",
                            "details": { "strings_created": 1 } } } }),
                    ),
                    None => Reply::json(404, r#"{"errors":[{"status":"404"}]}"#),
                }
            }
            (Method::GET, ["resource_strings"]) => {
                let id = param("filter[resource]").unwrap_or_default();
                let cursor: usize = param("page[cursor]").and_then(|c| c.parse().ok()).unwrap_or(0);
                let Some(res) = self.resources.get(slug_of(&id)) else {
                    return Reply::json(404, r#"{"errors":[{"status":"404"}]}"#);
                };
                let page: Vec<Value> = res
                    .strings
                    .iter()
                    .skip(cursor)
                    .take(2)
                    .map(|(key, text)| json!({ "attributes": { "key": key, "strings": { "other": text } } }))
                    .collect();
                let next = (cursor + 2 < res.strings.len()).then(|| {
                    format!("{TX_URL}/resource_strings?filter[resource]={id}&page[cursor]={}", cursor + 2)
                });
                Reply::value(200, &json!({ "data": page, "links": { "next": next } }))
            }
            (Method::POST, ["tmx_async_downloads"]) => {
                self.tmx_requests += 1;
                Reply::value(
                    202,
                    &json!({ "data": { "id": format!("tmx-{}", self.tmx_requests),
                        "type": "tmx_async_downloads", "attributes": { "status": "pending" } } }),
                )
            }
            (Method::GET, ["tmx_async_downloads", job]) => {
                if self.tmx_pending_polls > 0 {
                    self.tmx_pending_polls -= 1;
                    return Reply::value(
                        200,
                        &json!({ "data": { "id": job, "attributes": { "status": "processing" } } }),
                    );
                }
                match self.tmx_mode {
                    TmxMode::Link => Reply::value(
                        200,
                        &json!({ "data": { "id": job, "attributes": { "status": "completed" },
                            "links": { "download": format!("{FILES_URL}/{job}.tmx") } } }),
                    ),
                    TmxMode::Inline => Reply::bytes(200, "application/x-tmx+xml", FAKE_TMX.as_bytes()),
                    TmxMode::Fail => Reply::value(
                        200,
                        &json!({ "data": { "id": job, "attributes": { "status": "failed",
                            "errors": [{ "code": "export_failed", "detail": "TMX generation failed" }] } } }),
                    ),
                }
            }
            _ => Reply::json(404, r#"{"errors":[{"status":"404","detail":"no such route"}]}"#),
        }
    }
}

fn slug_of(resource_id: &str) -> &str {
    resource_id.rsplit_once(":r:").map_or(resource_id, |(_, slug)| slug)
}

fn resource_json(id: &str, slug: &str, name: &str) -> Value {
    json!({ "data": { "id": id, "type": "resources",
        "attributes": { "slug": slug, "name": name } } })
}

/// Split a request into (known base URL, path, query parameters).
fn split_url(request: &ApiRequest) -> (&'static str, String, Vec<(String, String)>) {
    let (without_query, inline_query) = request
        .url
        .split_once('?')
        .unwrap_or((request.url.as_str(), ""));

    let mut params: Vec<(String, String)> = inline_query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (k.to_string(), v.to_string())
        })
        .collect();
    params.extend(request.query.iter().cloned());

    for base in [BRAZE_URL, TX_URL, FILES_URL] {
        if let Some(path) = without_query.strip_prefix(base) {
            if path.is_empty() || path.starts_with('/') {
                return (base, path.to_string(), params);
            }
        }
    }
    ("", without_query.to_string(), params)
}

// ── Transport ─────────────────────────────────────────────────

type Hook = Box<dyn Fn(&ApiRequest, usize) -> Option<Reply> + Send + Sync>;
type Latency = Box<dyn Fn(&ApiRequest) -> Duration + Send + Sync>;

/// Recording transport over scripted replies and a [`FakeBackend`].
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Reply>>,
    backend: Mutex<FakeBackend>,
    hook: Option<Hook>,
    latency: Option<Latency>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    /// Answer with `replies` in order, then fall back to an empty backend.
    pub(crate) fn scripted(replies: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            ..Self::with_backend(FakeBackend::new())
        }
    }

    pub(crate) fn with_backend(backend: FakeBackend) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            backend: Mutex::new(backend),
            hook: None,
            latency: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Intercept requests. The hook sees each request and its index in the
    /// recorded sequence; returning `None` lets normal routing continue.
    pub(crate) fn hook(
        mut self,
        hook: impl Fn(&ApiRequest, usize) -> Option<Reply> + Send + Sync + 'static,
    ) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Delay each response by a per-request duration.
    pub(crate) fn latency(mut self, latency: impl Fn(&ApiRequest) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Some(Box::new(latency));
        self
    }

    pub(crate) fn backend(&self) -> MutexGuard<'_, FakeBackend> {
        self.backend.lock().expect("backend lock poisoned")
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }

    /// Recorded requests whose URL starts with `base`.
    pub(crate) fn requests_to(&self, base: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.starts_with(base))
            .collect()
    }

    fn respond(&self, request: &ApiRequest) -> Reply {
        let index = {
            let mut log = self.requests.lock().expect("request log poisoned");
            log.push(request.clone());
            log.len() - 1
        };
        if let Some(reply) = self.hook.as_ref().and_then(|hook| hook(request, index)) {
            return reply;
        }
        if let Some(reply) = self.script.lock().expect("script poisoned").pop_front() {
            return reply;
        }
        self.backend().route(request)
    }
}

impl Transport for FakeTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let reply = self.respond(request);
        if let Some(latency) = &self.latency {
            let wait = latency(request);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        reply.into_result()
    }
}
