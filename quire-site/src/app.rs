//! Application state
//!
//! One explicit owner for everything a front end manipulates: the poem
//! repository, the session, the edit buffer, favorites, the view cursor and
//! the busy flag. Front ends call methods here and re-render from
//! [`AppState::current_page`].

use chrono::{DateTime, Utc};
use quire_common::config::SiteConfig;
use quire_common::prefs::Preferences;
use quire_common::Poem;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SiteError, SiteResult};
use crate::favorites::Favorites;
use crate::repository::PoemRepository;
use crate::session::{BearerToken, BusyFlag, EditBuffer, Session};
use crate::store::ContentStore;
use crate::view::{self, Filter, PageView, TagSummary, ViewState};

pub struct AppState {
    repository: PoemRepository,
    session: Session,
    editor: EditBuffer,
    favorites: Favorites,
    view: ViewState,
    busy: BusyFlag,
    /// Long-lived preferences (favorites)
    preferences: Box<dyn Preferences>,
    /// Session-scoped preferences (bearer token)
    session_store: Box<dyn Preferences>,
}

impl AppState {
    /// Build the state, restoring the session and favorites from storage
    ///
    /// Does no network I/O; call [`refresh`](Self::refresh) to load poems.
    pub fn initialize(
        config: &SiteConfig,
        store: Arc<dyn ContentStore>,
        preferences: Box<dyn Preferences>,
        session_store: Box<dyn Preferences>,
    ) -> Self {
        let session = Session::restore(session_store.as_ref());
        let favorites = Favorites::load(preferences.as_ref());
        debug!(
            store = %store.describe(),
            authenticated = session.is_authenticated(),
            favorites = favorites.len(),
            "Application state initialized"
        );

        Self {
            repository: PoemRepository::new(store),
            session,
            editor: EditBuffer::new(),
            favorites,
            view: ViewState::new(config.page_size),
            busy: BusyFlag::new(),
            preferences,
            session_store,
        }
    }

    /// (Re)load the collection
    pub async fn refresh(&mut self, force: bool) -> SiteResult<()> {
        self.repository.load(force).await?;
        Ok(())
    }

    pub fn poems(&self) -> &[Poem] {
        self.repository.cached()
    }

    pub fn find(&self, id: &str) -> Option<&Poem> {
        self.repository.find(id)
    }

    // ---- Session ----

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Start a session with a user-supplied access token
    pub fn login(&mut self, raw_token: &str) -> SiteResult<()> {
        let token = BearerToken::new(raw_token).ok_or_else(|| {
            SiteError::Common(quire_common::Error::InvalidInput(
                "access token is empty".to_string(),
            ))
        })?;
        self.session.login(token, self.session_store.as_mut())
    }

    pub fn logout(&mut self) -> SiteResult<()> {
        self.session.logout(self.session_store.as_mut())
    }

    // ---- Favorites ----

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    /// Flip a favorite; returns whether the poem is now a favorite
    ///
    /// An active favorites filter is re-targeted at the updated set.
    pub fn toggle_favorite(&mut self, id: &str) -> SiteResult<bool> {
        let now_favorite = self.favorites.toggle(id, self.preferences.as_mut())?;
        if self.view.filter().is_favorites() {
            self.view.select(Filter::Favorites(self.favorites.ids().clone()));
        }
        Ok(now_favorite)
    }

    // ---- View ----

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Replace the active filter; the page cursor goes back to 1
    pub fn select_filter(&mut self, filter: Filter) {
        debug!(%filter, "Filter selected");
        self.view.select(filter);
    }

    /// Select the favorites filter with the current favorite ids
    pub fn show_favorites(&mut self) {
        self.select_filter(Filter::Favorites(self.favorites.ids().clone()));
    }

    pub fn load_more(&mut self) {
        self.view.load_more();
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.set_page(page);
    }

    /// The page the current filter and cursor reveal
    pub fn current_page(&self) -> PageView<'_> {
        self.view.project(self.repository.cached())
    }

    pub fn tag_summary(&self) -> TagSummary {
        view::tag_summary(self.repository.cached())
    }

    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        view::latest_update(self.repository.cached())
    }

    // ---- Editing ----

    pub fn editor(&self) -> &EditBuffer {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut EditBuffer {
        &mut self.editor
    }

    /// Load a cached poem into the edit buffer
    pub fn begin_edit(&mut self, id: &str) -> SiteResult<()> {
        let poem = self
            .repository
            .find(id)
            .ok_or_else(|| SiteError::NotFound(format!("poem {}", id)))?;
        self.editor.begin_edit(poem);
        Ok(())
    }

    /// A handle on the busy flag, for front ends that disable controls
    pub fn busy(&self) -> BusyFlag {
        self.busy.clone()
    }

    /// Save the edit buffer
    ///
    /// On success the buffer is cleared and the collection reloaded. On any
    /// failure the buffer is left exactly as it was.
    pub async fn save_draft(&mut self) -> SiteResult<Poem> {
        let _guard = self.busy.try_acquire()?;

        let record = self.editor.to_record()?;
        let saved = self.repository.upsert(record, self.session.token()).await?;

        self.editor.clear();
        info!(id = %saved.id, title = %saved.title, "Poem saved");
        self.reload_after_write().await;
        Ok(saved)
    }

    /// Delete a poem by id
    pub async fn delete(&mut self, id: &str) -> SiteResult<Poem> {
        let _guard = self.busy.try_acquire()?;

        let removed = self.repository.remove(id, self.session.token()).await?;

        if self.editor.editing_id() == Some(id) {
            self.editor.clear();
        }
        info!(id = %removed.id, title = %removed.title, "Poem deleted");
        self.reload_after_write().await;
        Ok(removed)
    }

    /// The write already landed; a failed reload only means a stale view
    async fn reload_after_write(&mut self) {
        if let Err(e) = self.repository.load(true).await {
            warn!(error = %e, "Reload after write failed");
        }
    }
}
