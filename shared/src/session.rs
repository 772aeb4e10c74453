//! One mounted edit form.
//!
//! A [`FormSession`] ties a [`Loader`], the [`FormState`] and the editing
//! context together. A create session starts with a blank form. An edit
//! session has no form until its entity loads, and gets a fresh one every time
//! the bound identifier changes. The session only ever holds state; the app
//! turns what it returns into effects.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::binding::{EditingContext, FormKind, PresentationMode};
use crate::config::FormsConfig;
use crate::error::{DispatchError, FormError, LoadError};
use crate::form::FormState;
use crate::loader::{BindState, LoadTicket, Loader, Resolution};
use crate::model::LocationId;
use crate::submit::{Intent, SubmissionOutcome, SubmitCoordinator};
use crate::validation::FieldErrors;

pub const SUBMIT_LABEL: &str = "Submit";
pub const SUBMITTING_LABEL: &str = "Submitting";

/// Snapshot of what the render layer should draw.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(bound = "")]
pub struct FormView<K: FormKind> {
    /// `None` while the entity is loading, or forever if the load failed.
    pub values: Option<K::Values>,
    pub is_loading: bool,
    pub can_submit: bool,
    pub submit_label: &'static str,
    pub show_delete: bool,
    /// The review section gets its own heading only on create.
    pub show_review_heading: bool,
    /// A delete confirmation is waiting on the user.
    pub confirming_delete: bool,
    /// Empty until the user has changed something or tried to submit.
    pub errors: FieldErrors,
    /// Message of the last failed load or mutation.
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Mode is read when the user submits, not when the result arrives.
    Submit(PresentationMode),
    Delete,
}

#[derive(Debug, Clone)]
pub struct FormSession<K: FormKind> {
    session: u64,
    loader: Loader<K>,
    form: Option<FormState<K>>,
    context: EditingContext<K>,
    pending: Option<Pending>,
    confirming: bool,
    today: Option<NaiveDate>,
    failure: Option<DispatchError>,
}

impl<K: FormKind> FormSession<K> {
    fn with_context(session: u64, context: EditingContext<K>) -> Self {
        Self {
            session,
            loader: Loader::new(),
            form: None,
            context,
            pending: None,
            confirming: false,
            today: None,
            failure: None,
        }
    }

    /// Blank form for a new entity under `parent`.
    pub fn create(session: u64, parent: Option<LocationId>) -> Self {
        let mut this = Self::with_context(session, EditingContext::creating(parent));
        this.form = Some(FormState::blank());
        this
    }

    /// Edit form for `id`, together with the fetch to start.
    pub fn edit(session: u64, id: K::Id) -> (Self, Option<LoadTicket<K>>) {
        let mut this = Self::with_context(session, EditingContext::creating(None));
        let ticket = this.set_editing_id(id);
        (this, ticket)
    }

    /// Number the app gave this mount. Results carry it so that anything
    /// arriving after a remount is recognised as stale.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Re-targets an edit session, e.g. after navigating between two edit
    /// routes without remounting. The same id again is a no-op.
    pub fn set_editing_id(&mut self, id: K::Id) -> Option<LoadTicket<K>> {
        let ticket = self.loader.bind(Some(id.clone()))?;
        debug!(kind = K::NAME, %id, "edit target changed");
        self.form = None;
        self.pending = None;
        self.confirming = false;
        self.failure = None;
        self.context = EditingContext {
            editing_id: Some(id),
            parent: None,
        };
        Some(ticket)
    }

    /// Applies a fetch result. Returns whether anything changed.
    pub fn apply_load(
        &mut self,
        generation: u64,
        result: Result<K::Entity, DispatchError>,
    ) -> bool {
        match self.loader.resolve(generation, result) {
            Resolution::Applied(bound) => {
                let mut form = FormState::new(bound.values);
                if let Some(today) = self.today {
                    form.set_today(today);
                }
                self.form = Some(form);
                self.context = bound.context;
                true
            }
            Resolution::Failed(LoadError::Fetch(err)) => {
                self.failure = Some(err);
                true
            }
            Resolution::Failed(_) | Resolution::Stale => false,
        }
    }

    pub fn load_state(&self) -> &BindState<K> {
        self.loader.state()
    }

    pub fn form(&self) -> Option<&FormState<K>> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut FormState<K>> {
        self.form.as_mut()
    }

    pub fn context(&self) -> &EditingContext<K> {
        &self.context
    }

    /// Moves the date observation dates are checked against, for this form
    /// and any form a later load brings in.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = Some(today);
        if let Some(form) = &mut self.form {
            form.set_today(today);
        }
    }

    /// Locks the form and returns the intent to send.
    pub fn begin_submit(
        &mut self,
        config: &FormsConfig,
        mode: PresentationMode,
    ) -> Result<Intent<K>, FormError> {
        let form = self.form.as_mut().ok_or(FormError::NotLoaded)?;
        let intent = SubmitCoordinator::new(config).begin_submit(form, &self.context)?;
        self.pending = Some(Pending::Submit(mode));
        self.failure = None;
        Ok(intent)
    }

    /// Settles the submit in flight. `None` when nothing was waiting for this
    /// result.
    pub fn finish_submit(
        &mut self,
        config: &FormsConfig,
        result: Result<K::Entity, DispatchError>,
    ) -> Option<SubmissionOutcome> {
        let Some(Pending::Submit(mode)) = self.pending else {
            debug!(kind = K::NAME, "submit result without a pending submit; dropped");
            return None;
        };
        self.pending = None;
        let form = self.form.as_mut()?;
        let outcome =
            SubmitCoordinator::new(config).finish_submit(form, &self.context, mode, result);
        self.note(&outcome);
        Some(outcome)
    }

    /// Starts a delete: the user has to confirm before anything is sent.
    pub fn request_delete(&mut self, config: &FormsConfig) -> Result<(), FormError> {
        let form = self.form.as_ref().ok_or(FormError::NotLoaded)?;
        SubmitCoordinator::new(config).begin_delete(form, &self.context)?;
        if self.confirming {
            return Err(FormError::Busy);
        }
        self.confirming = true;
        Ok(())
    }

    /// Applies the user's answer to the pending confirmation.
    pub fn answer_delete(
        &mut self,
        config: &FormsConfig,
        confirmed: bool,
    ) -> Result<Intent<K>, FormError> {
        if !std::mem::take(&mut self.confirming) {
            return Err(FormError::NotConfirming);
        }
        let form = self.form.as_mut().ok_or(FormError::NotLoaded)?;
        let intent = SubmitCoordinator::new(config).confirm_delete(form, &self.context, confirmed)?;
        self.pending = Some(Pending::Delete);
        self.failure = None;
        Ok(intent)
    }

    pub fn finish_delete(
        &mut self,
        config: &FormsConfig,
        result: Result<(), DispatchError>,
    ) -> Option<SubmissionOutcome> {
        if self.pending != Some(Pending::Delete) {
            debug!(kind = K::NAME, "delete result without a pending delete; dropped");
            return None;
        }
        self.pending = None;
        let form = self.form.as_mut()?;
        let outcome = SubmitCoordinator::new(config).finish_delete(form, &self.context, result);
        self.note(&outcome);
        Some(outcome)
    }

    fn note(&mut self, outcome: &SubmissionOutcome) {
        if let SubmissionOutcome::Failure(err) = outcome {
            self.failure = Some(err.clone());
        }
    }

    /// Unmount. Any load still in flight is dropped when it lands.
    pub fn close(&mut self) {
        debug!(kind = K::NAME, session = self.session, "edit session closed");
        self.loader.cancel();
        self.pending = None;
        self.confirming = false;
    }

    pub fn view(&self) -> FormView<K> {
        let editing = self.context.is_editing();
        let failure = self.failure.as_ref().map(|e| e.message.clone());
        let Some(form) = &self.form else {
            return FormView {
                values: None,
                is_loading: self.loader.state().is_loading(),
                can_submit: false,
                submit_label: SUBMIT_LABEL,
                show_delete: false,
                show_review_heading: !editing,
                confirming_delete: false,
                errors: FieldErrors::new(),
                failure,
            };
        };
        let show_errors = form.is_dirty() || form.submit_count() > 0;
        FormView {
            values: Some(form.values().clone()),
            is_loading: false,
            can_submit: form.can_submit() && !self.confirming,
            submit_label: if form.is_submitting() {
                SUBMITTING_LABEL
            } else {
                SUBMIT_LABEL
            },
            show_delete: editing,
            show_review_heading: !editing,
            confirming_delete: self.confirming,
            errors: if show_errors {
                form.errors()
            } else {
                FieldErrors::new()
            },
            failure,
        }
    }
}
