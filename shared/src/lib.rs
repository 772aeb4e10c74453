// lib.rs - edit-and-submit workflow for locations and reviews

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod binding;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod form;
pub mod loader;
pub mod model;
pub mod session;
pub mod submit;
pub mod validation;

pub use app::{App, Editor, Event, FormViewModel, Model, PhotoEvent, ViewModel};
pub use binding::{
    EditingContext, FormKind, LocationFormValues, LocationKind, PresentationMode,
    ReviewFormValues, ReviewKind, Route,
};
pub use capabilities::{Capabilities, Effect, HttpError, ValidatedUrl};
pub use config::{ConfigError, FormsConfig};
pub use error::{DispatchError, ErrorKind, FormError, LoadError};
pub use form::FormState;
pub use loader::{BindState, Bound, LoadTicket, Loader, Resolution};
pub use session::{FormSession, FormView};
pub use submit::{Intent, NextStep, SubmissionOutcome, SubmitCoordinator};
pub use validation::FieldErrors;

pub const MAX_COMMENT_LENGTH: usize = 4096;
pub const MAX_DESCRIPTION_LENGTH: usize = 4096;
pub const MAX_PHOTOS: usize = 10;
