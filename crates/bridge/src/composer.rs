//! Comment rendering for merged changes.
//!
//! Pure functions: no I/O, no clock, same input gives the same text. Links use
//! Jira wiki markup (`[text|url]`).

use url::Url;

use crate::{ChangeMergedPayload, PayloadError, ProjectPath, RefUpdatedPayload, Revision, SourceName};

/// Label of one line in a [`CommentDraft`].
///
/// The declaration order is the rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentLabel {
    Title,
    Author,
    Submitter,
    Changeset,
    Branch,
    Project,
    Commit,
}

impl CommentLabel {
    /// Returns the label text as it appears in the comment.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Author => "Author",
            Self::Submitter => "Submitter",
            Self::Changeset => "Changeset",
            Self::Branch => "Branch",
            Self::Project => "Project",
            Self::Commit => "Commit",
        }
    }
}

/// One `Label: value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub label: CommentLabel,
    pub value: String,
}

/// A fully rendered merge comment, line by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    lines: Vec<CommentLine>,
}

impl CommentDraft {
    /// Returns the lines in rendering order.
    pub fn lines(&self) -> &[CommentLine] {
        &self.lines
    }

    /// Joins the lines with `\n` into the comment body.
    pub fn body(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{}: {}", line.label.as_str(), line.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for CommentDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.body())
    }
}

/// Renders the merge comment for `payload` as seen on `source`.
///
/// # Errors
///
/// [`PayloadError::InvalidUrl`] if `change.url` has no scheme and host to
/// derive the commit link base from.
pub fn compose(
    payload: &ChangeMergedPayload,
    source: &SourceName,
) -> Result<CommentDraft, PayloadError> {
    let base_url = base_url(&payload.change_url)?;

    let lines = vec![
        line(CommentLabel::Title, payload.subject.clone()),
        line(CommentLabel::Author, payload.author_email.clone()),
        line(CommentLabel::Submitter, payload.submitter_email.clone()),
        line(
            CommentLabel::Changeset,
            format!("[Changeset|{}]", payload.change_url),
        ),
        line(CommentLabel::Branch, payload.branch.clone()),
        line(
            CommentLabel::Project,
            format!("{}/{}", source, payload.project),
        ),
        line(
            CommentLabel::Commit,
            gitiles_commit_link(&base_url, &payload.project, &payload.revision),
        ),
    ];

    Ok(CommentDraft { lines })
}

/// Renders the single-line comment posted for a `ref-updated` event.
///
/// `gitiles_base` is the web root of the Gerrit server (no trailing slash needed).
pub fn compose_ref_update(
    payload: &RefUpdatedPayload,
    source: &SourceName,
    gitiles_base: &str,
) -> String {
    format!(
        "Commit for {}@{}/{}: {}",
        payload.ref_name,
        source,
        payload.project,
        gitiles_commit_link(
            gitiles_base.trim_end_matches('/'),
            &payload.project,
            &payload.new_revision
        )
    )
}

/// `[<rev>|<base>/plugins/gitiles/<project>/+/<rev>]`, project used verbatim.
pub fn gitiles_commit_link(base_url: &str, project: &ProjectPath, revision: &Revision) -> String {
    format!("[{revision}|{base_url}/plugins/gitiles/{project}/+/{revision}]")
}

fn line(label: CommentLabel, value: String) -> CommentLine {
    CommentLine { label, value }
}

fn base_url(change_url: &str) -> Result<String, PayloadError> {
    let invalid = || PayloadError::InvalidUrl {
        field: "change.url",
        value: change_url.to_string(),
    };
    let parsed = Url::parse(change_url).map_err(|_| invalid())?;
    let host = parsed.host_str().ok_or_else(invalid)?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;
