//! Narrow accessors over untyped event payloads.
//!
//! Each handler reads only the fields it needs. A field that is absent, null
//! or not a string is reported as [`PayloadError::MissingField`] naming the
//! dotted path, so the failure is attributable in the logs.

use serde_json::Value;

use crate::{PayloadError, ProjectPath, Revision};

/// Reads a string at a JSON pointer; an empty string is accepted.
///
/// `field` is the dotted form of `pointer` used in error messages.
pub fn string_at<'a>(
    payload: &'a Value,
    pointer: &str,
    field: &'static str,
) -> Result<&'a str, PayloadError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(PayloadError::MissingField { field })
}

/// Like [`string_at`], but an empty string counts as missing.
pub fn required_str<'a>(
    payload: &'a Value,
    pointer: &str,
    field: &'static str,
) -> Result<&'a str, PayloadError> {
    string_at(payload, pointer, field).and_then(|value| {
        if value.is_empty() {
            Err(PayloadError::MissingField { field })
        } else {
            Ok(value)
        }
    })
}

// ---------------------------------------------------------------------------
// change-merged
// ---------------------------------------------------------------------------

/// The fields of a `change-merged` event the merge handler uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMergedPayload {
    /// `change.commitMessage`
    pub commit_message: String,
    /// `change.subject`
    pub subject: String,
    /// `submitter.email`
    pub submitter_email: String,
    /// `patchSet.author.email`
    pub author_email: String,
    /// `change.url`
    pub change_url: String,
    /// `change.project`
    pub project: ProjectPath,
    /// `change.branch`
    pub branch: String,
    /// `patchSet.revision`
    pub revision: Revision,
}

impl ChangeMergedPayload {
    /// Extracts the merge fields from a raw event object.
    ///
    /// # Errors
    ///
    /// [`PayloadError::MissingField`] for the first required field that is
    /// absent.
    pub fn from_value(payload: &Value) -> Result<Self, PayloadError> {
        let project = required_str(payload, "/change/project", "change.project")?;
        let revision = required_str(payload, "/patchSet/revision", "patchSet.revision")?;

        Ok(Self {
            commit_message: string_at(payload, "/change/commitMessage", "change.commitMessage")?
                .to_string(),
            subject: required_str(payload, "/change/subject", "change.subject")?.to_string(),
            submitter_email: required_str(payload, "/submitter/email", "submitter.email")?
                .to_string(),
            author_email: required_str(payload, "/patchSet/author/email", "patchSet.author.email")?
                .to_string(),
            change_url: required_str(payload, "/change/url", "change.url")?.to_string(),
            project: ProjectPath::new(project).ok_or(PayloadError::MissingField {
                field: "change.project",
            })?,
            branch: required_str(payload, "/change/branch", "change.branch")?.to_string(),
            revision: Revision::new(revision).ok_or(PayloadError::MissingField {
                field: "patchSet.revision",
            })?,
        })
    }
}

// ---------------------------------------------------------------------------
// ref-updated
// ---------------------------------------------------------------------------

/// The fields of a `ref-updated` event the ref-update handler uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdatedPayload {
    /// `refUpdate.project`
    pub project: ProjectPath,
    /// `refUpdate.newRev`
    pub new_revision: Revision,
    /// `refUpdate.refName`
    pub ref_name: String,
}

impl RefUpdatedPayload {
    /// `true` when the ref was deleted; Gerrit reports `newRev` as all zeros.
    pub fn is_deletion(&self) -> bool {
        self.new_revision.as_str().bytes().all(|b| b == b'0')
    }

    pub fn from_value(payload: &Value) -> Result<Self, PayloadError> {
        let project = required_str(payload, "/refUpdate/project", "refUpdate.project")?;
        let new_revision = required_str(payload, "/refUpdate/newRev", "refUpdate.newRev")?;
        let ref_name = required_str(payload, "/refUpdate/refName", "refUpdate.refName")?;

        Ok(Self {
            project: ProjectPath::new(project).ok_or(PayloadError::MissingField {
                field: "refUpdate.project",
            })?,
            new_revision: Revision::new(new_revision).ok_or(PayloadError::MissingField {
                field: "refUpdate.newRev",
            })?,
            ref_name: ref_name.to_string(),
        })
    }
}
