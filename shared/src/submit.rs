//! Submit coordinator.
//!
//! Turns a submit (or delete) on a [`FormState`] into one remote [`Intent`]
//! and settles the form once that intent comes back. Update vs. create is
//! resolved from the editing context first; presentation mode only matters on
//! the create path. The intent itself is sent by the app as an HTTP effect.

use tracing::{debug, info, instrument, warn};

use crate::binding::{EditingContext, FormKind, PresentationMode, Route};
use crate::config::FormsConfig;
use crate::error::{DispatchError, FormError};
use crate::form::FormState;
use crate::model::LocationId;

/// One remote mutation, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<K: FormKind> {
    Create {
        parent: Option<LocationId>,
        payload: K::Payload,
    },
    Update {
        id: K::Id,
        payload: K::Payload,
    },
    Delete {
        id: K::Id,
    },
}

/// What the workflow did after a successful intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Navigated to this path. The form stays locked; the view is leaving.
    Navigated(String),
    /// Inline create: form back to blank and ready for the next entry.
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Success(NextStep),
    /// The remote intent failed. The form is editable again and nothing
    /// navigated.
    Failure(DispatchError),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn navigated_to(&self) -> Option<&str> {
        match self {
            Self::Success(NextStep::Navigated(path)) => Some(path),
            _ => None,
        }
    }
}

pub struct SubmitCoordinator<'a> {
    config: &'a FormsConfig,
}

impl<'a> SubmitCoordinator<'a> {
    pub fn new(config: &'a FormsConfig) -> Self {
        Self { config }
    }

    fn parent_path<K: FormKind>(&self, known: Option<&LocationId>, entity: &K::Entity) -> String {
        let parent = known.cloned().unwrap_or_else(|| K::parent_of(entity));
        self.config.path_for(&Route::LocationDetail(parent))
    }

    /// Locks the form and builds the intent for its current values.
    ///
    /// `Err` means nothing may be sent: the trigger is disabled (busy,
    /// unchanged, uploading, or invalid).
    pub fn begin_submit<K: FormKind>(
        &self,
        form: &mut FormState<K>,
        ctx: &EditingContext<K>,
    ) -> Result<Intent<K>, FormError> {
        form.begin_submit()?;
        let payload = K::to_payload(form.values());
        Ok(match &ctx.editing_id {
            Some(id) => Intent::Update {
                id: id.clone(),
                payload,
            },
            None => Intent::Create {
                parent: ctx.parent.clone(),
                payload,
            },
        })
    }

    /// Settles a submit once its intent resolved. On success the caller
    /// performs the navigation named in the outcome.
    #[instrument(skip_all, fields(kind = K::NAME, editing = ctx.is_editing(), ?mode))]
    pub fn finish_submit<K: FormKind>(
        &self,
        form: &mut FormState<K>,
        ctx: &EditingContext<K>,
        mode: PresentationMode,
        result: Result<K::Entity, DispatchError>,
    ) -> SubmissionOutcome {
        let entity = match result {
            Ok(entity) => entity,
            Err(error) => {
                form.set_submitting(false);
                warn!(code = error.kind.code(), %error, "submit failed; form re-enabled");
                return SubmissionOutcome::Failure(error);
            }
        };

        let step = match (&ctx.editing_id, mode) {
            (Some(_), _) | (None, PresentationMode::FullPage) => {
                NextStep::Navigated(self.parent_path::<K>(ctx.parent.as_ref(), &entity))
            }
            (None, PresentationMode::Inline) => {
                form.reset();
                NextStep::Reset
            }
        };
        info!(id = %K::id_of(&entity), ?step, "submit succeeded");
        SubmissionOutcome::Success(step)
    }

    /// Checks that a delete may be offered. Nothing is locked yet: the user
    /// still has to confirm.
    pub fn begin_delete<K: FormKind>(
        &self,
        form: &FormState<K>,
        ctx: &EditingContext<K>,
    ) -> Result<K::Id, FormError> {
        let id = ctx.editing_id.clone().ok_or(FormError::NotEditing)?;
        if form.is_submitting() {
            return Err(FormError::Busy);
        }
        Ok(id)
    }

    /// Applies the user's answer. Declining returns
    /// [`FormError::UserCancelled`] without touching the form.
    pub fn confirm_delete<K: FormKind>(
        &self,
        form: &mut FormState<K>,
        ctx: &EditingContext<K>,
        confirmed: bool,
    ) -> Result<Intent<K>, FormError> {
        let id = self.begin_delete(form, ctx)?;
        if !confirmed {
            debug!(kind = K::NAME, %id, "delete declined");
            return Err(FormError::UserCancelled);
        }
        form.begin_busy()?;
        Ok(Intent::Delete { id })
    }

    #[instrument(skip_all, fields(kind = K::NAME))]
    pub fn finish_delete<K: FormKind>(
        &self,
        form: &mut FormState<K>,
        ctx: &EditingContext<K>,
        result: Result<(), DispatchError>,
    ) -> SubmissionOutcome {
        if let Err(error) = result {
            form.set_submitting(false);
            warn!(code = error.kind.code(), %error, "delete failed; form re-enabled");
            return SubmissionOutcome::Failure(error);
        }
        let path = self.config.path_for(&K::after_delete(ctx.parent.as_ref()));
        info!(%path, "deleted");
        SubmissionOutcome::Success(NextStep::Navigated(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{LocationKind, ReviewKind};
    use crate::capabilities::testing::{sample_location, sample_review};
    use crate::model::{Coordinate, ReviewId, TypeId};
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn editing_review() -> (FormState<ReviewKind>, EditingContext<ReviewKind>) {
        let review = sample_review("42", "7");
        let mut form = FormState::<ReviewKind>::new(ReviewKind::to_form(&review));
        form.edit(|v| v.review.comment = "Picked clean".into());
        (form, EditingContext::for_entity(&review))
    }

    fn new_review() -> (FormState<ReviewKind>, EditingContext<ReviewKind>) {
        let mut form = FormState::<ReviewKind>::blank();
        form.edit(|v| {
            v.review.comment = "Loaded with figs".into();
            v.review.observed_on = NaiveDate::from_ymd_opt(2024, 7, 4);
        });
        (form, EditingContext::creating(LocationId::new("7").ok()))
    }

    fn server_error() -> DispatchError {
        DispatchError::from_status(500, "upstream unavailable")
    }

    #[test]
    fn update_intent_targets_edited_id() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = editing_review();

        match coordinator.begin_submit(&mut form, &ctx).unwrap() {
            Intent::Update { id, payload } => {
                assert_eq!(id, ReviewId::new("42").unwrap());
                assert_eq!(payload.comment.as_deref(), Some("Picked clean"));
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert!(form.is_submitting());
        assert_eq!(coordinator.begin_submit(&mut form, &ctx), Err(FormError::Busy));
    }

    #[test]
    fn update_navigates_to_parent_in_any_mode() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        for mode in [PresentationMode::Inline, PresentationMode::FullPage] {
            let (mut form, ctx) = editing_review();
            coordinator.begin_submit(&mut form, &ctx).unwrap();

            let outcome =
                coordinator.finish_submit(&mut form, &ctx, mode, Ok(sample_review("42", "7")));

            assert_eq!(outcome.navigated_to(), Some("/locations/7"));
            assert!(form.is_submitting());
        }
    }

    #[test]
    fn inline_create_resets_without_navigating() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = new_review();

        let intent = coordinator.begin_submit(&mut form, &ctx).unwrap();
        assert!(matches!(intent, Intent::Create { parent: Some(p), .. } if p.as_str() == "7"));

        let outcome = coordinator.finish_submit(
            &mut form,
            &ctx,
            PresentationMode::Inline,
            Ok(sample_review("99", "7")),
        );

        assert_eq!(outcome, SubmissionOutcome::Success(NextStep::Reset));
        assert!(!form.is_dirty());
        assert!(!form.is_submitting());
    }

    #[test]
    fn full_page_create_navigates_and_keeps_values() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = new_review();
        coordinator.begin_submit(&mut form, &ctx).unwrap();

        let outcome = coordinator.finish_submit(
            &mut form,
            &ctx,
            PresentationMode::FullPage,
            Ok(sample_review("99", "7")),
        );

        assert_eq!(outcome.navigated_to(), Some("/locations/7"));
        assert!(form.is_dirty());
    }

    #[test]
    fn create_without_known_parent_uses_returned_entity() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let mut form = FormState::<LocationKind>::blank();
        form.edit(|v| {
            v.location.position = Coordinate::new(51.5, -0.12);
            v.location.type_ids = vec![TypeId::new("3").unwrap()];
        });
        let ctx = EditingContext::creating(None);
        coordinator.begin_submit(&mut form, &ctx).unwrap();

        let outcome = coordinator.finish_submit(
            &mut form,
            &ctx,
            PresentationMode::FullPage,
            Ok(sample_location("501")),
        );

        assert_eq!(outcome.navigated_to(), Some("/locations/501"));
    }

    #[test]
    fn failed_submit_re_enables_form_and_keeps_input() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = new_review();
        coordinator.begin_submit(&mut form, &ctx).unwrap();

        let outcome =
            coordinator.finish_submit(&mut form, &ctx, PresentationMode::Inline, Err(server_error()));

        assert!(matches!(outcome, SubmissionOutcome::Failure(_)));
        assert!(!form.is_submitting());
        assert!(form.is_dirty());
        assert!(form.can_submit());
    }

    #[test]
    fn disabled_trigger_builds_no_intent() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let review = sample_review("42", "7");
        let mut form = FormState::<ReviewKind>::new(ReviewKind::to_form(&review));
        let ctx = EditingContext::for_entity(&review);

        assert_eq!(
            coordinator.begin_submit(&mut form, &ctx),
            Err(FormError::Unchanged)
        );
        assert!(!form.is_submitting());
    }

    #[test]
    fn delete_requires_editing_id() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (form, ctx) = new_review();
        assert_eq!(coordinator.begin_delete(&form, &ctx), Err(FormError::NotEditing));
    }

    #[test]
    fn declined_delete_is_a_no_op() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = editing_review();

        assert_eq!(
            coordinator.confirm_delete(&mut form, &ctx, false),
            Err(FormError::UserCancelled)
        );
        assert!(!form.is_submitting());
    }

    #[test]
    fn confirmed_review_delete_returns_to_location() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = editing_review();

        let intent = coordinator.confirm_delete(&mut form, &ctx, true).unwrap();
        assert_eq!(
            intent,
            Intent::Delete {
                id: ReviewId::new("42").unwrap()
            }
        );
        assert!(form.is_submitting());

        let outcome = coordinator.finish_delete(&mut form, &ctx, Ok(()));
        assert_eq!(outcome.navigated_to(), Some("/locations/7"));
    }

    #[test]
    fn location_delete_returns_to_map() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let location = sample_location("7");
        let mut form = FormState::<LocationKind>::new(LocationKind::to_form(&location));
        let ctx = EditingContext::for_entity(&location);

        coordinator.confirm_delete(&mut form, &ctx, true).unwrap();
        let outcome = coordinator.finish_delete(&mut form, &ctx, Ok(()));

        assert_eq!(outcome.navigated_to(), Some("/map"));
    }

    #[test]
    fn failed_delete_re_enables_form() {
        let config = FormsConfig::default();
        let coordinator = SubmitCoordinator::new(&config);
        let (mut form, ctx) = editing_review();
        coordinator.confirm_delete(&mut form, &ctx, true).unwrap();

        let outcome = coordinator.finish_delete(&mut form, &ctx, Err(server_error()));

        assert!(matches!(outcome, SubmissionOutcome::Failure(_)));
        assert!(!form.is_submitting());
    }

    fn mode() -> impl Strategy<Value = PresentationMode> {
        prop_oneof![Just(PresentationMode::Inline), Just(PresentationMode::FullPage)]
    }

    proptest! {
        #[test]
        fn submit_outcome_follows_context_mode_and_result(
            editing in proptest::option::of(1u32..10_000),
            mode in mode(),
            succeeds in any::<bool>(),
        ) {
            let config = FormsConfig::default();
            let coordinator = SubmitCoordinator::new(&config);
            let (mut form, ctx) = match editing {
                Some(n) => {
                    let review = sample_review(&n.to_string(), "7");
                    let mut form = FormState::<ReviewKind>::new(ReviewKind::to_form(&review));
                    form.edit(|v| v.review.comment = "Still fruiting".into());
                    (form, EditingContext::for_entity(&review))
                }
                None => new_review(),
            };

            let intent = coordinator.begin_submit(&mut form, &ctx).unwrap();
            match (&intent, editing) {
                (Intent::Update { id, .. }, Some(n)) => prop_assert_eq!(id.as_str(), n.to_string()),
                (Intent::Create { parent, .. }, None) => {
                    prop_assert_eq!(parent.as_ref().map(LocationId::as_str), Some("7"));
                }
                (other, _) => prop_assert!(false, "wrong intent {:?}", other),
            }

            let result = if succeeds { Ok(sample_review("99", "7")) } else { Err(server_error()) };
            let outcome = coordinator.finish_submit(&mut form, &ctx, mode, result);

            let navigations = usize::from(outcome.navigated_to().is_some());
            let resets = usize::from(outcome == SubmissionOutcome::Success(NextStep::Reset));
            let creating_inline = editing.is_none() && mode == PresentationMode::Inline;

            prop_assert_eq!(navigations, usize::from(succeeds && !creating_inline));
            prop_assert_eq!(resets, usize::from(succeeds && creating_inline));
            if navigations == 1 {
                prop_assert_eq!(outcome.navigated_to(), Some("/locations/7"));
            }
            // Only a navigation leaves the form locked.
            prop_assert_eq!(form.is_submitting(), navigations == 1);
            prop_assert_eq!(form.is_dirty(), resets == 0);
        }
    }
}
