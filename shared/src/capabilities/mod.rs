//! Effects the edit workflow asks the shell to perform.
//!
//! The core never reaches for a global store or router. Fetches and
//! mutations go out through [`Http`], route changes through [`Navigate`],
//! and delete confirmation through [`Confirm`]. The shell performs each one
//! and, where an answer is expected, feeds it back as an [`Event`].

mod confirm;
mod http;
mod navigate;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use self::confirm::{Confirm, ConfirmOperation};
pub use self::http::{settle_empty, settle_json, HttpError, ValidatedUrl};
pub use self::navigate::{Navigate, NavigateOperation};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::app::{App, Event};

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub navigate: Navigate<Event>,
    pub confirm: Confirm<Event>,
}
