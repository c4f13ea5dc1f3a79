//! # Quire site
//!
//! Poem collection client and the state a front end drives:
//! - [`store`]: read-token-write access to the persisted JSON document
//! - [`repository`]: cached collection plus upsert/remove
//! - [`view`] and [`render`]: filter, sort, paginate and project for display
//! - [`session`] and [`favorites`]: bearer token, edit buffer, busy flag, favorite ids
//! - [`app`]: the single explicit owner of all of the above

pub mod app;
pub mod error;
pub mod favorites;
pub mod render;
pub mod repository;
pub mod session;
pub mod store;
pub mod view;

pub use app::AppState;
pub use error::{SiteError, SiteResult};
pub use repository::PoemRepository;
pub use store::{ContentStore, GitHubStore, MemoryStore};
