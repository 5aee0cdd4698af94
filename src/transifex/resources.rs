//! Resource upserts and source-string reads.

use reqwest::Method;
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, TransifexConfig};
use crate::error::{Error, Result};
use crate::http::{ApiClient, ApiRequest, Paginator, Transport};
use crate::model::{ItemOutcome, Outcome, SourceFields, SourceItem};

use super::jobs::{poll_until, JobState, PollSchedule};
use super::payload;

/// Creates, renames and fills Transifex resources, one per source item.
pub struct ResourceManager<T: Transport> {
    client: ApiClient<T>,
    project_id: String,
    verify_uploads: bool,
    upload_poll: PollSchedule,
    max_pages: usize,
}

impl<T: Transport> ResourceManager<T> {
    #[must_use]
    pub fn new(client: ApiClient<T>, config: &TransifexConfig, http: &HttpConfig) -> Self {
        Self {
            client,
            project_id: config.project_id(),
            verify_uploads: config.verify_uploads,
            upload_poll: config.upload_poll.clone(),
            max_pages: http.max_pages,
        }
    }

    /// Make the resource for `item` exist with the item's name and content.
    ///
    /// Every failure except an authorization error is folded into a
    /// `Failed` outcome.
    ///
    /// # Errors
    ///
    /// Returns `Error::Auth` if Transifex rejects the token.
    pub async fn upsert(&self, item: &SourceItem) -> Result<ItemOutcome> {
        match self.try_upsert(item).await {
            Ok(outcome) => Ok(outcome),
            Err(err @ Error::Auth { .. }) => Err(err),
            Err(err) => {
                warn!(slug = %item.slug(), error = %err, "Item failed");
                Ok(ItemOutcome::for_item(item, Outcome::failed(err.to_string())))
            }
        }
    }

    async fn try_upsert(&self, item: &SourceItem) -> Result<ItemOutcome> {
        if item.name.trim().is_empty() {
            return Err(Error::Validation(format!(
                "{} {} has no name",
                item.kind, item.id
            )));
        }

        let slug = item.slug();
        let id = payload::resource_id(&self.project_id, &slug);
        let mut record = ItemOutcome::for_item(item, Outcome::Updated);

        match self.lookup(&id).await? {
            None => {
                self.create(&slug, &item.name).await?;
                info!(slug = %slug, name = %item.name, "Created resource");
                record.outcome = Outcome::Created;
            }
            Some(current) if current != item.name => {
                self.rename(&id, &item.name).await?;
                info!(slug = %slug, from = %current, to = %item.name, "Renamed resource");
                record.renamed = true;
            }
            Some(_) => debug!(slug = %slug, "Resource exists"),
        }

        if item.fields.is_empty() {
            record.note = Some("no content".into());
            return Ok(record);
        }

        let job = self.upload(&id, &item.fields).await?;
        if self.verify_uploads {
            self.await_upload(&job).await?;
        }
        record.strings = item.fields.len();
        Ok(record)
    }

    /// Current name of the resource, or `None` if it does not exist.
    async fn lookup(&self, resource_id: &str) -> Result<Option<String>> {
        let request = self.client.request(Method::GET, &format!("/resources/{resource_id}"));
        match self.client.send_json(request).await {
            Ok(doc) => Ok(Some(payload::resource_name(&doc).unwrap_or_default().to_string())),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn create(&self, slug: &str, name: &str) -> Result<()> {
        let request = self
            .client
            .request(Method::POST, "/resources")
            .json(payload::create_resource(&self.project_id, slug, name));
        self.client.send(request).await?;
        Ok(())
    }

    async fn rename(&self, resource_id: &str, name: &str) -> Result<()> {
        let request = self
            .client
            .request(Method::PATCH, &format!("/resources/{resource_id}"))
            .json(payload::rename_resource(resource_id, name));
        self.client.send(request).await?;
        Ok(())
    }

    /// Replace the resource's source strings; returns the upload job id.
    async fn upload(&self, resource_id: &str, fields: &SourceFields) -> Result<String> {
        debug!(resource = %resource_id, strings = fields.len(), "Uploading source strings");
        let request = self
            .client
            .request(Method::POST, "/resource_strings_async_uploads")
            .json(payload::upload_strings(resource_id, fields)?);
        let doc = self.client.send_json(request).await?;
        payload::data_id(&doc)
    }

    async fn await_upload(&self, job: &str) -> Result<()> {
        poll_until(&self.upload_poll, None, "source upload", || self.upload_state(job)).await
    }

    async fn upload_state(&self, job: &str) -> Result<JobState<()>> {
        let request = self
            .client
            .request(Method::GET, &format!("/resource_strings_async_uploads/{job}"));
        let doc = self.client.send_json(request).await?;
        match payload::job_status(&doc) {
            Some("failed") => Err(Error::Other(format!(
                "source upload failed: {}",
                payload::job_errors(&doc)
            ))),
            Some(status @ ("pending" | "processing")) => Ok(JobState::Pending(status.to_string())),
            // "succeeded", or the document the finished job redirects to.
            _ => Ok(JobState::Done(())),
        }
    }

    /// Read back the source strings currently stored for `slug`.
    ///
    /// # Errors
    ///
    /// Propagates request and decoding errors; a missing resource is a
    /// 404 `Error::Client`.
    pub async fn source_strings(&self, slug: &str) -> Result<SourceFields> {
        let resource = payload::resource_id(&self.project_id, slug);
        let first = self
            .client
            .request(Method::GET, "/resource_strings")
            .query("filter[resource]", resource);

        let mut pages = Paginator::new(
            &self.client,
            move |next: Option<&str>| match next {
                Some(url) => ApiRequest::get(url),
                None => first.clone(),
            },
            |_, page| payload::next_link(page),
        )
        .with_max_pages(self.max_pages);

        let mut fields = SourceFields::new();
        while let Some(page) = pages.next_page().await? {
            for (key, text) in payload::source_strings(&page) {
                fields.insert(key, text);
            }
        }
        Ok(fields)
    }
}
