//! Projection of pages and poems for display
//!
//! - [`html`]: escaped markup fragments (cards, bodies, tag filters)
//! - [`text`]: plain terminal output

pub mod html;
pub mod text;

pub use html::escape_html;
