//! # Media Node Lifecycle
//!
//! Editing an image happens in a dialog with its own small state machine:
//!
//! ```text
//! Idle ──open──▶ Selected ──apply_alt / delete──▶ Idle
//!                   │
//!              begin_replace
//!                   ▼
//!            ReplaceInFlight ──finish_replace──▶ Idle
//!                   │  (upload failure returns to Selected)
//!                 close ──▶ Idle, upload result discarded
//! ```
//!
//! The dialog captures the image's position and its session-local
//! [`NodeId`]. Uploads are asynchronous and the user keeps editing
//! meanwhile, so before any write the captured [`MediaTarget`] is resolved
//! against the current document: the identity is looked up again and the
//! write goes to wherever that image now sits. An image that was deleted or
//! replaced is never written, even when an identical one has taken its
//! place; the user gets a notice instead.
//!
//! ```rust
//! use folio_editor::{EditorConfig, EditorSession, MediaDialog, MediaOutcome};
//!
//! let mut session = EditorSession::create(EditorConfig::default(), r#"<img src="a.png">"#);
//! let mut dialog = MediaDialog::new();
//! dialog.open(&session, 0).unwrap();
//! assert_eq!(dialog.apply_alt(&mut session, "A cat").unwrap(), MediaOutcome::Patched);
//! assert!(session.html().starts_with(r#"<img src="a.png" alt="A cat">"#));
//! ```

use crate::commands::{Command, Rejection};
use crate::session::EditorSession;
use crate::state::EditorState;
use folio_schema::{Attrs, NodeId, NodeKind};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A file handed to the asset store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AssetFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Where the asset store put the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub url: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Asset rejected: {0}")]
    Rejected(String),
}

/// External asset storage. One opaque call, no retries; retry policy
/// belongs to the host.
#[allow(async_fn_in_trait)]
pub trait AssetStore {
    async fn upload(&self, file: AssetFile, context: &str) -> Result<StoredAsset, AssetError>;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    #[error("Cannot {action} while the dialog is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("No image at position {0}")]
    NotAnImage(usize),

    #[error("Patch rejected: {0}")]
    Rejected(#[from] Rejection),
}

/// An image captured at a specific revision
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTarget {
    pub position: usize,
    pub revision: u64,
    pub attrs: Attrs,
    pub node: Option<NodeId>,
}

impl MediaTarget {
    pub fn capture(state: &EditorState, position: usize) -> Result<Self, MediaError> {
        match state.doc.node_at(position) {
            Some(node) if node.kind == NodeKind::Image => Ok(Self {
                position,
                revision: state.revision,
                attrs: node.attrs.clone(),
                node: node.id,
            }),
            _ => Err(MediaError::NotAnImage(position)),
        }
    }

    /// Current position of the captured image, `None` once it is gone.
    /// Without an identity only the unchanged revision is trusted.
    pub fn resolve(&self, state: &EditorState) -> Option<usize> {
        let position = match self.node {
            Some(id) => state.doc.position_of(id)?,
            None if state.revision == self.revision => self.position,
            None => return None,
        };
        state
            .doc
            .node_at(position)
            .filter(|node| node.kind == NodeKind::Image)
            .map(|_| position)
    }

    pub fn src(&self) -> Option<&str> {
        self.attrs.get("src").map(String::as_str)
    }
}

/// Handle for one upload. Closing the dialog clears the shared relevance
/// flag and the result is discarded when it arrives.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub id: u64,
    pub target: MediaTarget,
    relevant: Arc<AtomicBool>,
}

impl UploadTicket {
    pub fn is_relevant(&self) -> bool {
        self.relevant.load(Ordering::SeqCst)
    }
}

/// An upload that has finished, successfully or not
#[derive(Debug)]
pub struct CompletedUpload {
    pub ticket: UploadTicket,
    pub result: Result<StoredAsset, AssetError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    Patched,
    /// The dialog was closed before the upload finished
    Discarded,
    /// The image moved or changed; nothing was written
    Stale,
    UploadFailed(String),
}

#[derive(Debug)]
enum DialogState {
    Idle,
    Selected(MediaTarget),
    ReplaceInFlight {
        target: MediaTarget,
        ticket: u64,
        relevant: Arc<AtomicBool>,
    },
}

impl DialogState {
    fn name(&self) -> &'static str {
        match self {
            DialogState::Idle => "idle",
            DialogState::Selected(_) => "selected",
            DialogState::ReplaceInFlight { .. } => "replacing",
        }
    }
}

const STALE_NOTICE: &str = "The image was changed or removed in the meantime; nothing was updated.";

#[derive(Debug)]
pub struct MediaDialog {
    state: DialogState,
    next_ticket: u64,
    notices: Vec<String>,
}

impl MediaDialog {
    pub fn new() -> Self {
        Self {
            state: DialogState::Idle,
            next_ticket: 1,
            notices: Vec::new(),
        }
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, DialogState::Idle)
    }

    pub fn target(&self) -> Option<&MediaTarget> {
        match &self.state {
            DialogState::Idle => None,
            DialogState::Selected(target) | DialogState::ReplaceInFlight { target, .. } => {
                Some(target)
            }
        }
    }

    fn invalid(&self, action: &'static str) -> MediaError {
        MediaError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn notify(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// User-facing messages collected since the last call
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Select the image at `position`
    pub fn open(&mut self, session: &EditorSession, position: usize) -> Result<(), MediaError> {
        if let DialogState::ReplaceInFlight { .. } = self.state {
            return Err(self.invalid("open"));
        }
        let target = MediaTarget::capture(session.state(), position)?;
        debug!(position, revision = target.revision, "media dialog opened");
        self.state = DialogState::Selected(target);
        Ok(())
    }

    /// Close the dialog. An upload in flight is orphaned.
    pub fn close(&mut self) {
        if let DialogState::ReplaceInFlight { relevant, ticket, .. } = &self.state {
            relevant.store(false, Ordering::SeqCst);
            debug!(ticket, "upload orphaned by dialog close");
        }
        self.state = DialogState::Idle;
    }

    /// Patch the alt text; an empty string removes it
    pub fn apply_alt(&mut self, session: &mut EditorSession, alt: &str) -> Result<MediaOutcome, MediaError> {
        let DialogState::Selected(target) = &self.state else {
            return Err(self.invalid("edit alt text"));
        };
        let target = target.clone();

        let Some(position) = target.resolve(session.state()) else {
            warn!(position = target.position, "alt text target is stale");
            self.notify(STALE_NOTICE);
            self.state = DialogState::Idle;
            return Ok(MediaOutcome::Stale);
        };

        let alt = alt.trim();
        let value = (!alt.is_empty()).then(|| alt.to_string());
        session.apply(patch(position, "alt", value))?;
        self.state = DialogState::Idle;
        Ok(MediaOutcome::Patched)
    }

    /// Start replacing the image file
    pub fn begin_replace(&mut self) -> Result<UploadTicket, MediaError> {
        let DialogState::Selected(target) = &self.state else {
            return Err(self.invalid("replace the file"));
        };
        let target = target.clone();

        let id = self.next_ticket;
        self.next_ticket += 1;
        let relevant = Arc::new(AtomicBool::new(true));
        self.state = DialogState::ReplaceInFlight {
            target: target.clone(),
            ticket: id,
            relevant: relevant.clone(),
        };

        Ok(UploadTicket {
            id,
            target,
            relevant,
        })
    }

    /// Apply a finished upload to the captured image, wherever it now is
    pub fn finish_replace(
        &mut self,
        session: &mut EditorSession,
        completed: CompletedUpload,
    ) -> Result<MediaOutcome, MediaError> {
        let CompletedUpload { ticket, result } = completed;
        let current = match &self.state {
            DialogState::ReplaceInFlight { ticket: id, .. } => *id == ticket.id,
            _ => false,
        };
        if !ticket.is_relevant() || !current {
            debug!(ticket = ticket.id, "discarding orphaned upload");
            return Ok(MediaOutcome::Discarded);
        }

        let target = ticket.target;
        let asset = match result {
            Ok(asset) => asset,
            Err(err) => {
                warn!(ticket = ticket.id, %err, "image upload failed");
                self.notify(err.to_string());
                self.state = DialogState::Selected(target);
                return Ok(MediaOutcome::UploadFailed(err.to_string()));
            }
        };

        self.state = DialogState::Idle;
        let Some(position) = target.resolve(session.state()) else {
            warn!(position = target.position, url = %asset.url, "upload target is stale");
            self.notify(STALE_NOTICE);
            return Ok(MediaOutcome::Stale);
        };

        match session.apply(patch(position, "src", Some(asset.url.clone()))) {
            Ok(_) => {
                info!(position, url = %asset.url, "image source replaced");
                Ok(MediaOutcome::Patched)
            }
            Err(reason @ Rejection::NodeMismatch { .. }) | Err(reason @ Rejection::InvalidPosition(_)) => {
                warn!(%reason, "upload target is stale");
                self.notify(STALE_NOTICE);
                Ok(MediaOutcome::Stale)
            }
            Err(reason) => Err(reason.into()),
        }
    }

    /// Delete the selected image. Returns `false` when it is already gone.
    pub fn delete(&mut self, session: &mut EditorSession) -> Result<bool, MediaError> {
        let target = match &self.state {
            DialogState::Idle => return Err(self.invalid("delete")),
            DialogState::Selected(target) | DialogState::ReplaceInFlight { target, .. } => {
                target.clone()
            }
        };
        self.close();

        let Some(position) = target.resolve(session.state()) else {
            debug!(position = target.position, "image already gone");
            return Ok(false);
        };
        session.apply(Command::DeleteNodeAt {
            position,
            expect: NodeKind::Image,
        })?;
        Ok(true)
    }
}

impl Default for MediaDialog {
    fn default() -> Self {
        Self::new()
    }
}

fn patch(position: usize, name: &str, value: Option<String>) -> Command {
    Command::PatchAttrs {
        position,
        expect: NodeKind::Image,
        attrs: BTreeMap::from([(name.to_string(), value)]),
    }
}

/// Performs uploads against an [`AssetStore`]
#[derive(Debug)]
pub struct MediaController<S> {
    store: S,
}

impl<S: AssetStore> MediaController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upload a file for a ticket. Runs to completion even when the dialog
    /// is closed meanwhile; the ticket decides whether the result is used.
    pub async fn upload(&self, ticket: UploadTicket, file: AssetFile, context: &str) -> CompletedUpload {
        info!(
            ticket = ticket.id,
            file = %file.name,
            bytes = file.bytes.len(),
            "uploading image"
        );
        let result = self.store.upload(file, context).await;
        match &result {
            Ok(asset) => info!(ticket = ticket.id, url = %asset.url, "upload finished"),
            Err(err) => warn!(ticket = ticket.id, %err, "upload failed"),
        }
        CompletedUpload { ticket, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;

    fn session(html: &str) -> EditorSession {
        EditorSession::create(EditorConfig::default(), html)
    }

    fn completed(ticket: UploadTicket, url: &str) -> CompletedUpload {
        CompletedUpload {
            ticket,
            result: Ok(StoredAsset {
                url: url.to_string(),
            }),
        }
    }

    #[test]
    fn test_capture_requires_image() {
        let session = session(r#"<p>a</p><img src="x.png">"#);
        assert!(MediaTarget::capture(session.state(), 3).is_ok());
        assert_eq!(
            MediaTarget::capture(session.state(), 0),
            Err(MediaError::NotAnImage(0))
        );
    }

    #[test]
    fn test_replace_patches_src() {
        let mut session = session(r#"<img src="old.png">"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();
        let ticket = dialog.begin_replace().unwrap();
        assert_eq!(dialog.state_name(), "replacing");

        let outcome = dialog
            .finish_replace(&mut session, completed(ticket, "new.png"))
            .unwrap();
        assert_eq!(outcome, MediaOutcome::Patched);
        assert!(session.html().starts_with(r#"<img src="new.png">"#));
        assert!(!dialog.is_open());
    }

    #[test]
    fn test_stale_target_is_not_patched() {
        let mut session = session(r#"<img src="old.png"><p>x</p>"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();
        let ticket = dialog.begin_replace().unwrap();

        session
            .apply(Command::DeleteNodeAt {
                position: 0,
                expect: NodeKind::Image,
            })
            .unwrap();
        let before = session.html();

        let outcome = dialog
            .finish_replace(&mut session, completed(ticket, "new.png"))
            .unwrap();
        assert_eq!(outcome, MediaOutcome::Stale);
        assert_eq!(session.html(), before);
        assert_eq!(dialog.take_notices().len(), 1);
    }

    #[test]
    fn test_closed_dialog_discards_upload() {
        let mut session = session(r#"<img src="old.png">"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();
        let ticket = dialog.begin_replace().unwrap();
        dialog.close();
        assert!(!ticket.is_relevant());

        let outcome = dialog
            .finish_replace(&mut session, completed(ticket, "new.png"))
            .unwrap();
        assert_eq!(outcome, MediaOutcome::Discarded);
        assert!(session.html().contains("old.png"));
    }

    #[test]
    fn test_upload_failure_returns_to_selected() {
        let mut session = session(r#"<img src="old.png">"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();
        let ticket = dialog.begin_replace().unwrap();

        let outcome = dialog
            .finish_replace(
                &mut session,
                CompletedUpload {
                    ticket,
                    result: Err(AssetError::Upload("timeout".to_string())),
                },
            )
            .unwrap();
        assert_eq!(outcome, MediaOutcome::UploadFailed("Upload failed: timeout".to_string()));
        assert_eq!(dialog.state_name(), "selected");
        assert_eq!(dialog.take_notices(), vec!["Upload failed: timeout"]);
    }

    #[test]
    fn test_invalid_transitions() {
        let mut dialog = MediaDialog::new();
        assert!(matches!(
            dialog.begin_replace(),
            Err(MediaError::InvalidTransition { state: "idle", .. })
        ));

        let mut session = session(r#"<img src="a.png">"#);
        assert!(matches!(
            dialog.apply_alt(&mut session, "x"),
            Err(MediaError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_delete_absent_image_is_noop() {
        let mut session = session(r#"<img src="a.png"><p>x</p>"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();

        session
            .apply(Command::DeleteNodeAt {
                position: 0,
                expect: NodeKind::Image,
            })
            .unwrap();
        assert_eq!(dialog.delete(&mut session), Ok(false));
    }

    #[test]
    fn test_delete_selected_image() {
        let mut session = session(r#"<p>x</p><img src="a.png">"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 3).unwrap();
        assert_eq!(dialog.delete(&mut session), Ok(true));
        assert!(!session.html().contains("img"));
    }

    #[test]
    fn test_deleted_duplicate_does_not_redirect_upload() {
        let mut session = session(r#"<img src="a.png" alt="first"><img src="a.png" alt="second"><p>x</p>"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 0).unwrap();
        let ticket = dialog.begin_replace().unwrap();

        session
            .apply(Command::DeleteNodeAt {
                position: 0,
                expect: NodeKind::Image,
            })
            .unwrap();
        let before = session.html();
        assert_eq!(before, r#"<img src="a.png" alt="second"><p>x</p>"#);

        let outcome = dialog
            .finish_replace(&mut session, completed(ticket, "https://cdn/new.png"))
            .unwrap();
        assert_eq!(outcome, MediaOutcome::Stale);
        assert_eq!(session.html(), before);
    }

    #[test]
    fn test_delete_keeps_identical_survivor() {
        let mut session = session(r#"<img src="a.png"><img src="a.png"><p>x</p>"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 1).unwrap();

        session
            .apply(Command::DeleteNodeAt {
                position: 1,
                expect: NodeKind::Image,
            })
            .unwrap();
        assert_eq!(dialog.delete(&mut session), Ok(false));
        assert_eq!(session.html(), r#"<img src="a.png"><p>x</p>"#);
    }

    #[test]
    fn test_target_follows_moved_image() {
        let mut session = session(r#"<img src="a.png"><img src="a.png"><p>x</p>"#);
        let mut dialog = MediaDialog::new();
        dialog.open(&session, 1).unwrap();

        session
            .apply(Command::DeleteNodeAt {
                position: 0,
                expect: NodeKind::Image,
            })
            .unwrap();
        assert_eq!(
            dialog.apply_alt(&mut session, "kept").unwrap(),
            MediaOutcome::Patched
        );
        assert_eq!(session.html(), r#"<img src="a.png" alt="kept"><p>x</p>"#);
    }
}
