use fundline_core::{AppError, AppResult};
use fundline_domain::{
    Document, DocumentFilter, DocumentStatus, DocumentType, Permission, QueryKey, RecordId,
    Resource, normalize_search, parse_choice,
};
use serde_json::Value;
use tracing::info;

use super::PageContext;
use super::list::ListState;
use super::view::{ListView, ResourceView};
use crate::api_client::Download;
use crate::client_ports::MultipartForm;
use crate::mutation::Mutation;
use crate::query_cache::QueryPolicy;

const UPLOAD_PATH: &str = "/documents/upload";

/// File picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name.
    pub filename: String,
    /// MIME type, when the picker reports one.
    pub content_type: Option<String>,
    /// Contents.
    pub bytes: Vec<u8>,
}

impl UploadFile {
    fn into_form(self, case_id: Option<&RecordId>) -> MultipartForm {
        let form = MultipartForm::default().file("file", self.filename, self.content_type, self.bytes);
        match case_id {
            Some(case_id) => form.text("case_id", case_id.to_string()),
            None => form,
        }
    }
}

/// Documents screen.
pub struct DocumentsPage {
    ctx: PageContext,
    list: ListState<DocumentFilter>,
    policy: QueryPolicy,
}

impl DocumentsPage {
    /// Creates the controller on page 1 with no filter.
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            list: ListState::new(Resource::Documents),
            policy: QueryPolicy::list(),
        }
    }

    /// List state.
    #[must_use]
    pub fn list(&self) -> &ListState<DocumentFilter> {
        &self.list
    }

    /// Mutable list state.
    pub fn list_mut(&mut self) -> &mut ListState<DocumentFilter> {
        &mut self.list
    }

    /// Applies the search box.
    pub fn set_search(&mut self, raw: &str) -> bool {
        let search = normalize_search(raw);
        self.list.update_filter(|filter| filter.search = search)
    }

    /// Applies the document type dropdown.
    pub fn set_document_type(&mut self, raw: &str) -> AppResult<bool> {
        let document_type = parse_choice::<DocumentType>(raw)?;
        Ok(self
            .list
            .update_filter(|filter| filter.document_type = document_type))
    }

    /// Applies the processing status dropdown.
    pub fn set_status(&mut self, raw: &str) -> AppResult<bool> {
        let status = parse_choice::<DocumentStatus>(raw)?;
        Ok(self.list.update_filter(|filter| filter.status = status))
    }

    /// Restricts the list to one case.
    pub fn set_case(&mut self, case_id: Option<&RecordId>) -> bool {
        let case_id = case_id.map(ToString::to_string);
        self.list.update_filter(|filter| filter.case_id = case_id)
    }

    /// Loads the current page.
    pub async fn load(&mut self) -> ListView<Document> {
        self.list.load(&self.ctx, &self.policy).await
    }

    /// Waits for the background refresh started by `load`.
    pub async fn settle(&mut self) -> ListView<Document> {
        self.list.settle(&self.ctx).await
    }

    /// Uploads files one request at a time, optionally linked to a case.
    ///
    /// Stops at the first failure; the list and its dependents are
    /// invalidated once for whatever was stored.
    pub async fn upload_files(
        &mut self,
        files: Vec<UploadFile>,
        case_id: Option<&RecordId>,
    ) -> AppResult<Vec<Value>> {
        if files.is_empty() {
            return Err(AppError::Validation(
                "Select at least one file to upload".to_owned(),
            ));
        }

        let count = files.len();
        let mutations = files
            .into_iter()
            .map(|file| Mutation::upload(Resource::Documents, UPLOAD_PATH, file.into_form(case_id)))
            .collect();

        let stored = self
            .ctx
            .mutate_batch(&Permission::write(Resource::Documents), mutations)
            .await?;
        info!(count, "documents uploaded");
        self.list.close_modal();
        self.ctx.confirm(&if count == 1 {
            "Document uploaded".to_owned()
        } else {
            format!("{count} documents uploaded")
        });
        Ok(stored)
    }

    /// Downloads the original file.
    pub async fn download(&self, id: &RecordId) -> AppResult<Download> {
        self.ctx
            .cache()
            .client()
            .download(&format!("/documents/{id}/download"), Vec::new())
            .await
    }

    /// Extraction and analysis results for one document.
    pub async fn analysis(&self, id: &RecordId) -> ResourceView<Value> {
        let key = QueryKey::build(Resource::Documents, format!("/documents/{id}/analysis"), &());
        let snapshot = self.ctx.cache().read(&key, &self.policy).await;
        ResourceView::from_snapshot(&snapshot)
    }

    /// Deletes a document.
    pub async fn delete(&mut self, id: &RecordId) -> AppResult<()> {
        self.ctx
            .mutate(
                &Permission::write(Resource::Documents),
                Mutation::delete(Resource::Documents, format!("/documents/{id}")),
            )
            .await?;
        self.list.forget(id);
        self.ctx.confirm("Document deleted");
        Ok(())
    }
}
