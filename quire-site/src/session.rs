//! Session and editing state
//!
//! - [`Session`] holds at most one bearer token, remembered in
//!   session-scoped preferences so it survives a restart until logout.
//! - [`EditBuffer`] holds at most one in-progress edit.
//! - [`BusyFlag`] disables saving while a write-sequence is in flight.
//!
//! Edit buffer transitions:
//!
//! ```text
//! Empty            --edit existing-->  Editing(id)
//! Empty            --first input---->  Creating
//! Editing|Creating --saved/cleared-->  Empty
//! Editing|Creating --save failed---->  unchanged
//! ```

use quire_common::model::parse_tags;
use quire_common::prefs::Preferences;
use quire_common::Poem;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::error::{SiteError, SiteResult};

/// Session preference key for the bearer token
pub const TOKEN_KEY: &str = "github_token";

/// Client-held access token for the authenticated API
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token; blank input is not a token
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret itself, for the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// The authenticated session, if any
#[derive(Debug, Default)]
pub struct Session {
    token: Option<BearerToken>,
}

impl Session {
    /// Session restored from persisted session storage
    pub fn restore(store: &dyn Preferences) -> Self {
        let token = store.get(TOKEN_KEY).and_then(BearerToken::new);
        Self { token }
    }

    /// Current token
    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Replace the session token and remember it
    pub fn login(&mut self, token: BearerToken, store: &mut dyn Preferences) -> SiteResult<()> {
        store.set(TOKEN_KEY, token.expose())?;
        self.token = Some(token);
        info!("Session started");
        Ok(())
    }

    /// Drop the session token and forget it
    pub fn logout(&mut self, store: &mut dyn Preferences) -> SiteResult<()> {
        store.remove(TOKEN_KEY)?;
        self.token = None;
        info!("Session ended");
        Ok(())
    }
}

/// Editable fields of a poem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoemDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Where the edit buffer is in its lifecycle
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditState {
    #[default]
    Empty,
    Creating(PoemDraft),
    Editing { id: String, draft: PoemDraft },
}

/// The single in-progress edit
#[derive(Debug, Default)]
pub struct EditBuffer {
    state: EditState,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, EditState::Empty)
    }

    /// Id of the record being edited, `None` when empty or creating
    pub fn editing_id(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Load an existing poem into the buffer, replacing whatever was there
    pub fn begin_edit(&mut self, poem: &Poem) {
        self.state = EditState::Editing {
            id: poem.id.clone(),
            draft: PoemDraft {
                title: poem.title.clone(),
                content: poem.content.clone(),
                tags: poem.tags.clone(),
            },
        };
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft_mut().title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft_mut().content = content.into();
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.draft_mut().tags = tags;
    }

    /// Set tags from the comma-separated form field
    pub fn set_tags_text(&mut self, text: &str) {
        self.set_tags(parse_tags(text));
    }

    /// Back to `Empty`
    pub fn clear(&mut self) {
        self.state = EditState::Empty;
    }

    /// Record to hand to the repository
    ///
    /// A new poem gets an empty id; the repository assigns one. Title and
    /// content must not be blank.
    pub fn to_record(&self) -> SiteResult<Poem> {
        let (id, draft) = match &self.state {
            EditState::Empty => {
                return Err(SiteError::InvalidDraft("nothing to save".to_string()));
            }
            EditState::Creating(draft) => (String::new(), draft),
            EditState::Editing { id, draft } => (id.clone(), draft),
        };

        if draft.title.trim().is_empty() {
            return Err(SiteError::InvalidDraft("title is required".to_string()));
        }
        if draft.content.trim().is_empty() {
            return Err(SiteError::InvalidDraft("content is required".to_string()));
        }

        Ok(Poem::new(
            id,
            draft.title.clone(),
            draft.content.clone(),
            draft.tags.clone(),
        ))
    }

    fn draft_mut(&mut self) -> &mut PoemDraft {
        if self.is_empty() {
            self.state = EditState::Creating(PoemDraft::default());
        }
        match &mut self.state {
            EditState::Creating(draft) | EditState::Editing { draft, .. } => draft,
            EditState::Empty => unreachable!("empty buffer was just promoted to Creating"),
        }
    }
}

/// In-flight marker for write-sequences
///
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark busy for the lifetime of the returned guard
    ///
    /// Fails with `Busy` if another guard is alive.
    pub fn try_acquire(&self) -> SiteResult<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SiteError::Busy)?;
        Ok(BusyGuard {
            flag: Arc::clone(&self.0),
        })
    }
}

/// Releases the busy flag when dropped, on every exit path
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_common::prefs::MemoryPreferences;

    #[test]
    fn test_bearer_token_trims_and_rejects_blank() {
        assert_eq!(BearerToken::new("  ghp_abc \n").unwrap().expose(), "ghp_abc");
        assert!(BearerToken::new("   ").is_none());
    }

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("ghp_secret").unwrap();
        assert!(!format!("{:?}", token).contains("secret"));
    }

    #[test]
    fn test_session_login_persists_and_restores() {
        let mut store = MemoryPreferences::new();
        let mut session = Session::restore(&store);
        assert!(!session.is_authenticated());

        session
            .login(BearerToken::new("ghp_abc").unwrap(), &mut store)
            .unwrap();

        let restored = Session::restore(&store);
        assert_eq!(restored.token().map(BearerToken::expose), Some("ghp_abc"));
    }

    #[test]
    fn test_session_logout_forgets_token() {
        let mut store = MemoryPreferences::new();
        let mut session = Session::default();
        session
            .login(BearerToken::new("ghp_abc").unwrap(), &mut store)
            .unwrap();
        session.logout(&mut store).unwrap();

        assert!(session.token().is_none());
        assert!(!Session::restore(&store).is_authenticated());
    }

    #[test]
    fn test_first_input_moves_empty_to_creating() {
        let mut buffer = EditBuffer::new();
        assert!(buffer.is_empty());

        buffer.set_title("Rain");
        assert!(matches!(buffer.state(), EditState::Creating(d) if d.title == "Rain"));
        assert_eq!(buffer.editing_id(), None);
    }

    #[test]
    fn test_begin_edit_prefills_fields() {
        let poem = Poem::new("42", "Rain", "drops", vec!["weather".to_string()]);
        let mut buffer = EditBuffer::new();
        buffer.begin_edit(&poem);

        assert_eq!(buffer.editing_id(), Some("42"));
        match buffer.state() {
            EditState::Editing { draft, .. } => {
                assert_eq!(draft.title, "Rain");
                assert_eq!(draft.content, "drops");
                assert_eq!(draft.tags, vec!["weather".to_string()]);
            }
            other => panic!("expected editing state, got {other:?}"),
        }
    }

    #[test]
    fn test_input_while_editing_keeps_id() {
        let poem = Poem::new("42", "Rain", "drops", vec![]);
        let mut buffer = EditBuffer::new();
        buffer.begin_edit(&poem);
        buffer.set_content("more drops");
        buffer.set_tags_text("weather, , mood");

        let record = buffer.to_record().unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.content, "more drops");
        assert_eq!(record.tags, vec!["weather".to_string(), "mood".to_string()]);
    }

    #[test]
    fn test_clear_returns_to_empty() {
        let mut buffer = EditBuffer::new();
        buffer.set_title("x");
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_to_record_validation() {
        let mut buffer = EditBuffer::new();
        assert!(matches!(buffer.to_record(), Err(SiteError::InvalidDraft(_))));

        buffer.set_content("body only");
        assert!(matches!(buffer.to_record(), Err(SiteError::InvalidDraft(m)) if m.contains("title")));

        buffer.set_title("Title");
        let record = buffer.to_record().unwrap();
        assert!(record.id.is_empty());
    }

    #[test]
    fn test_busy_flag_rejects_second_acquire_until_released() {
        let busy = BusyFlag::new();
        let guard = busy.try_acquire().unwrap();
        assert!(busy.is_busy());
        assert!(matches!(busy.clone().try_acquire(), Err(SiteError::Busy)));

        drop(guard);
        assert!(!busy.is_busy());
        assert!(busy.try_acquire().is_ok());
    }

    #[test]
    fn test_busy_flag_released_on_early_return() {
        fn fails(busy: &BusyFlag) -> SiteResult<()> {
            let _guard = busy.try_acquire()?;
            Err(SiteError::AuthRequired)
        }

        let busy = BusyFlag::new();
        assert!(fails(&busy).is_err());
        assert!(!busy.is_busy());
    }
}
