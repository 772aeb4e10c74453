use chrono::{Local, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::binding::{FormKind, PhotoField};
use crate::error::FormError;
use crate::model::PhotoId;
use crate::validation::FieldErrors;

/// Local state of one mounted form.
///
/// `initial` is what [`FormState::reset`] returns to and what dirtiness is
/// measured against. `is_submitting` is the only guard against double
/// submission: while it is set, [`FormState::begin_submit`] refuses.
///
/// `today` is the user's local date and bounds observation dates. It starts
/// at the local clock and hosts may move it with [`FormState::set_today`].
#[derive(Debug, Clone)]
pub struct FormState<K: FormKind> {
    initial: K::Values,
    values: K::Values,
    is_submitting: bool,
    submit_count: u32,
    today: NaiveDate,
}

/// The user's calendar date, in their own time zone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl<K: FormKind> FormState<K> {
    pub fn new(initial: K::Values) -> Self {
        Self {
            values: initial.clone(),
            initial,
            is_submitting: false,
            submit_count: 0,
            today: local_today(),
        }
    }

    /// Blank form for creating a new entity.
    pub fn blank() -> Self {
        Self::new(K::Values::default())
    }

    pub fn values(&self) -> &K::Values {
        &self.values
    }

    pub fn initial_values(&self) -> &K::Values {
        &self.initial
    }

    pub fn edit(&mut self, f: impl FnOnce(&mut K::Values)) {
        f(&mut self.values);
    }

    pub fn set_values(&mut self, values: K::Values) {
        self.values = values;
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn errors(&self) -> FieldErrors {
        K::validate(&self.values, self.today)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    pub fn is_uploading(&self) -> bool {
        K::photos(&self.values).iter().any(|p| p.is_uploading)
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Submit attempts so far, including the ones the form refused.
    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    /// Whether the submit trigger is enabled.
    pub fn can_submit(&self) -> bool {
        self.check_submittable().is_ok()
    }

    fn check_submittable(&self) -> Result<(), FormError> {
        if self.is_submitting {
            return Err(FormError::Busy);
        }
        if self.is_uploading() {
            return Err(FormError::UploadInProgress);
        }
        if !self.is_dirty() {
            return Err(FormError::Unchanged);
        }
        self.errors().into_result().map_err(FormError::Validation)
    }

    /// Moves the form into the submitting state, or explains why the submit
    /// trigger is disabled.
    pub fn begin_submit(&mut self) -> Result<(), FormError> {
        self.submit_count += 1;
        if let Err(err) = self.check_submittable() {
            debug!(kind = K::NAME, attempt = self.submit_count, %err, "submit refused");
            return Err(err);
        }
        self.is_submitting = true;
        debug!(kind = K::NAME, attempt = self.submit_count, "form submitting");
        Ok(())
    }

    /// Marks the start of a non-submit mutation (delete) that still has to
    /// lock the form.
    pub(crate) fn begin_busy(&mut self) -> Result<(), FormError> {
        if self.is_submitting {
            return Err(FormError::Busy);
        }
        self.is_submitting = true;
        Ok(())
    }

    pub fn set_submitting(&mut self, submitting: bool) {
        self.is_submitting = submitting;
    }

    /// Back to the initial values with the in-flight flag cleared.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.is_submitting = false;
        debug!(kind = K::NAME, "form reset");
    }

    // --- Photo uploads ---

    /// Adds an uploading placeholder and returns its key.
    pub fn begin_photo_upload(&mut self) -> Uuid {
        let key = Uuid::new_v4();
        self.begin_photo_upload_with(key);
        key
    }

    /// Adds an uploading placeholder under a key the host already holds.
    /// A key that is already present is left alone.
    pub fn begin_photo_upload_with(&mut self, key: Uuid) {
        let photos = K::photos_mut(&mut self.values);
        if photos.iter().all(|p| p.key != key) {
            photos.push(PhotoField::pending_with(key));
        }
    }

    /// Attaches the server photo to its placeholder. Returns false when the
    /// placeholder is gone (removed by the user or by a reset).
    pub fn complete_photo_upload(
        &mut self,
        key: Uuid,
        id: PhotoId,
        thumbnail: Option<String>,
    ) -> bool {
        match K::photos_mut(&mut self.values).iter_mut().find(|p| p.key == key) {
            Some(slot) => {
                slot.id = Some(id);
                slot.thumbnail = thumbnail;
                slot.is_uploading = false;
                true
            }
            None => false,
        }
    }

    pub fn fail_photo_upload(&mut self, key: Uuid) {
        self.remove_photo(key);
    }

    pub fn remove_photo(&mut self, key: Uuid) -> bool {
        let photos = K::photos_mut(&mut self.values);
        let before = photos.len();
        photos.retain(|p| p.key != key);
        photos.len() != before
    }
}
