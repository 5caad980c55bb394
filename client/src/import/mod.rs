// Contact import wizard
//
// Upload -> Mapping -> Importing -> Done. Any failure drops back to the stage the user can fix
// it from: read/parse problems to Upload, API failures to Mapping.

pub mod csv;
pub mod mapping;

use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::MailApi;
use crate::error::{ValidationError, WizardError, WizardResult};
use crate::models::requests::ImportUpload;
use crate::ui::{keys, Action, Capabilities, Notice, Route};
use crate::utils::validation::is_csv_file;

use self::csv::{parse_preview, CsvPreview};
use self::mapping::ImportMapping;

const DEFAULT_CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Upload,
    Mapping,
    Importing,
    Done,
}

/// What the upload step collects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub file: Option<PathBuf>,
    pub mime_type: Option<String>,
    pub consent: bool,
    pub list_name: Option<String>,
    pub allow_update: bool,
}

impl UploadForm {
    /// Checks that need no I/O.
    pub fn validate(&self) -> Result<&PathBuf, ValidationError> {
        let path = self.file.as_ref().ok_or(ValidationError::NoFile)?;
        let file_name = file_name_of(path);
        if !is_csv_file(&file_name, self.mime_type.as_deref()) {
            return Err(ValidationError::InvalidFileType(file_name));
        }
        if !self.consent {
            return Err(ValidationError::ConsentRequired);
        }
        Ok(path)
    }
}

fn file_name_of(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub correlation_id: String,
    pub mapped_columns: usize,
    pub notice: Notice,
    pub route: Route,
}

pub struct ImportWizard {
    api: Arc<dyn MailApi>,
    capabilities: Arc<dyn Capabilities>,
    custom_fields: Vec<String>,
    stage: ImportStage,
    form: UploadForm,
    bytes: Vec<u8>,
    preview: Option<CsvPreview>,
    mapping: Option<ImportMapping>,
}

impl ImportWizard {
    /// `custom_fields` are the account's custom contact fields, offered next to the standard
    /// ones when mapping.
    pub fn new(
        api: Arc<dyn MailApi>,
        capabilities: Arc<dyn Capabilities>,
        custom_fields: Vec<String>,
    ) -> Self {
        Self {
            api,
            capabilities,
            custom_fields,
            stage: ImportStage::Upload,
            form: UploadForm::default(),
            bytes: Vec::new(),
            preview: None,
            mapping: None,
        }
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn preview(&self) -> Option<&CsvPreview> {
        self.preview.as_ref()
    }

    pub fn mapping(&self) -> Option<&ImportMapping> {
        self.mapping.as_ref()
    }

    pub fn can_import(&self) -> bool {
        self.capabilities.can(Action::ImportContacts)
    }

    /// Validate the upload form, read the file and auto-map its headers.
    pub async fn proceed(&mut self, form: UploadForm) -> WizardResult<&CsvPreview> {
        if self.stage == ImportStage::Importing {
            return Err(WizardError::InFlight);
        }
        self.stage = ImportStage::Upload;
        self.preview = None;
        self.mapping = None;
        self.bytes.clear();

        let path = form.validate()?.clone();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            error!(
                "[PHASE: import] [STEP: read] Failed to read {}: {}",
                path.display(),
                e
            );
            e
        })?;

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let preview = parse_preview(&text).map_err(|e| {
            warn!("[PHASE: import] [STEP: parse] {}: {}", path.display(), e);
            e
        })?;
        let mapping = ImportMapping::auto(&preview.headers, &self.custom_fields);

        info!(
            "[PHASE: import] [STEP: parse] {} columns, email_mapped={}",
            preview.headers.len(),
            mapping.email_mapped()
        );

        self.form = form;
        self.bytes = bytes;
        self.mapping = Some(mapping);
        self.stage = ImportStage::Mapping;
        Ok(self.preview.insert(preview))
    }

    /// Return to the upload step, discarding the parsed file.
    pub fn back_to_upload(&mut self) {
        if self.stage == ImportStage::Mapping {
            self.stage = ImportStage::Upload;
            self.preview = None;
            self.mapping = None;
            self.bytes.clear();
        }
    }

    pub fn map_column(&mut self, header: &str, target: &str) -> bool {
        match (&self.stage, self.mapping.as_mut()) {
            (ImportStage::Mapping, Some(m)) => m.set(header, target),
            _ => false,
        }
    }

    pub fn can_commit(&self) -> bool {
        self.stage == ImportStage::Mapping
            && self.mapping.as_ref().is_some_and(|m| m.email_mapped())
    }

    pub async fn commit(&mut self) -> WizardResult<ImportOutcome> {
        if self.stage == ImportStage::Importing {
            return Err(WizardError::InFlight);
        }
        let mapping = match (&self.stage, &self.mapping) {
            (ImportStage::Mapping, Some(m)) if m.email_mapped() => m.to_wire(),
            _ => return Err(ValidationError::EmailNotMapped.into()),
        };
        if !self.can_import() {
            return Err(WizardError::Locked(Action::ImportContacts));
        }

        let file = self.form.file.as_deref().map(file_name_of).unwrap_or_default();
        let upload = ImportUpload {
            file_name: file.clone(),
            content_type: self
                .form
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CSV_MIME.to_string()),
            bytes: self.bytes.clone(),
            list_name: self
                .form
                .list_name
                .clone()
                .filter(|l| !l.trim().is_empty()),
            allow_update: self.form.allow_update,
            mapping,
        };
        let mapped_columns = upload.mapping.len();
        let correlation_id = Uuid::new_v4().to_string();

        info!(
            "[PHASE: import] [STEP: upload] Importing '{}' ({} bytes, {} mapped columns, list={:?}, allow_update={}) (correlation_id={})",
            upload.file_name,
            upload.bytes.len(),
            mapped_columns,
            upload.list_name,
            upload.allow_update,
            correlation_id
        );

        self.stage = ImportStage::Importing;
        match self.api.import_contacts(upload).await {
            Ok(()) => {
                self.stage = ImportStage::Done;
                info!(
                    "[PHASE: import] [STEP: complete] Import accepted (correlation_id={})",
                    correlation_id
                );
                Ok(ImportOutcome {
                    correlation_id,
                    mapped_columns,
                    notice: Notice::success(keys::IMPORT_STARTED).with("file", file),
                    route: Route::Contacts,
                })
            }
            Err(e) => {
                self.stage = ImportStage::Mapping;
                error!(
                    "[PHASE: import] [STEP: upload] Import failed (correlation_id={}): {}",
                    correlation_id, e
                );
                Err(e.into())
            }
        }
    }
}

pub fn failure_notice(err: &WizardError) -> Notice {
    match err {
        WizardError::Api(_) | WizardError::Io(_) => {
            Notice::error(keys::IMPORT_FAILED).with("error", err.to_string())
        }
        _ => Notice::error(keys::VALIDATION_FAILED).with("error", err.to_string()),
    }
}
