//! The edit-form core as a Crux app.
//!
//! The shell mounts one form at a time with `New*`/`Edit*` events, streams
//! the user's edits in, and reports the viewport width. Every remote call
//! leaves as an HTTP effect and comes back as a `*Loaded`/`*Saved`/`Deleted`
//! event tagged with the session it was sent for. A result whose session is
//! no longer mounted is dropped.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::binding::{
    FormKind, LocationFormValues, LocationKind, PresentationMode, ReviewFormValues, ReviewKind,
};
use crate::capabilities::{settle_empty, settle_json, Capabilities, ValidatedUrl};
use crate::config::FormsConfig;
use crate::error::{DispatchError, ErrorKind};
use crate::form::FormState;
use crate::loader::LoadTicket;
use crate::model::{Location, LocationId, PhotoId, Review, ReviewId};
use crate::session::{FormSession, FormView};
use crate::submit::{Intent, SubmissionOutcome};

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PhotoEvent {
    /// The shell started an upload and holds `key` for it.
    Started { key: Uuid },
    Uploaded {
        key: Uuid,
        id: PhotoId,
        thumbnail: Option<String>,
    },
    Failed { key: Uuid },
    Removed { key: Uuid },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ========== Shell ==========
    Configure(FormsConfig),
    ViewportResized { width_px: u32 },
    /// The user's local date rolled over, or the shell wants to pin it.
    DateChanged { today: NaiveDate },
    NewReview { location_id: LocationId },
    EditReview { id: ReviewId },
    NewLocation,
    EditLocation { id: LocationId },
    ReviewChanged(ReviewFormValues),
    LocationChanged(LocationFormValues),
    Photo(PhotoEvent),
    Submit,
    DeleteRequested,
    Close,

    // ========== Capability results ==========
    ReviewLoaded {
        session: u64,
        generation: u64,
        result: Result<Review, DispatchError>,
    },
    LocationLoaded {
        session: u64,
        generation: u64,
        result: Result<Location, DispatchError>,
    },
    ReviewSaved {
        session: u64,
        result: Result<Review, DispatchError>,
    },
    LocationSaved {
        session: u64,
        result: Result<Location, DispatchError>,
    },
    ConfirmAnswered { session: u64, confirmed: bool },
    Deleted {
        session: u64,
        result: Result<(), DispatchError>,
    },
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Default)]
pub enum Editor {
    #[default]
    Closed,
    Review(FormSession<ReviewKind>),
    Location(FormSession<LocationKind>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mounted {
    Review,
    Location,
}

impl Editor {
    fn mounted(&self) -> Option<Mounted> {
        match self {
            Self::Closed => None,
            Self::Review(_) => Some(Mounted::Review),
            Self::Location(_) => Some(Mounted::Location),
        }
    }
}

#[derive(Debug, Default)]
pub struct Model {
    pub config: FormsConfig,
    /// Last width the shell reported. Unknown counts as a narrow viewport.
    pub viewport_width_px: Option<u32>,
    pub today: Option<NaiveDate>,
    pub editor: Editor,
    sessions: u64,
}

impl Model {
    pub fn presentation_mode(&self) -> PresentationMode {
        self.viewport_width_px.map_or(PresentationMode::FullPage, |width| {
            PresentationMode::from_viewport_width(width, self.config.desktop_breakpoint_px)
        })
    }

    fn next_session(&mut self) -> u64 {
        self.sessions += 1;
        self.sessions
    }
}

// ============================================================================
// ViewModel
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum FormViewModel {
    Review(FormView<ReviewKind>),
    Location(FormView<LocationKind>),
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ViewModel {
    pub form: Option<FormViewModel>,
}

// ============================================================================
// Per-kind routing
// ============================================================================

/// Ties a form kind to its editor slot and its result events.
trait Routed: FormKind {
    fn session(editor: &mut Editor) -> Option<&mut FormSession<Self>>;
    fn mount(session: FormSession<Self>) -> Editor;
    fn loaded(session: u64, generation: u64, result: Result<Self::Entity, DispatchError>) -> Event;
    fn saved(session: u64, result: Result<Self::Entity, DispatchError>) -> Event;
}

impl Routed for ReviewKind {
    fn session(editor: &mut Editor) -> Option<&mut FormSession<Self>> {
        match editor {
            Editor::Review(session) => Some(session),
            _ => None,
        }
    }

    fn mount(session: FormSession<Self>) -> Editor {
        Editor::Review(session)
    }

    fn loaded(session: u64, generation: u64, result: Result<Review, DispatchError>) -> Event {
        Event::ReviewLoaded {
            session,
            generation,
            result,
        }
    }

    fn saved(session: u64, result: Result<Review, DispatchError>) -> Event {
        Event::ReviewSaved { session, result }
    }
}

impl Routed for LocationKind {
    fn session(editor: &mut Editor) -> Option<&mut FormSession<Self>> {
        match editor {
            Editor::Location(session) => Some(session),
            _ => None,
        }
    }

    fn mount(session: FormSession<Self>) -> Editor {
        Editor::Location(session)
    }

    fn loaded(session: u64, generation: u64, result: Result<Location, DispatchError>) -> Event {
        Event::LocationLoaded {
            session,
            generation,
            result,
        }
    }

    fn saved(session: u64, result: Result<Location, DispatchError>) -> Event {
        Event::LocationSaved { session, result }
    }
}

/// The mounted session of kind `K`, if `id` still names it.
fn mounted_session<K: Routed>(editor: &mut Editor, id: u64) -> Option<&mut FormSession<K>> {
    let session = K::session(editor).filter(|s| s.session() == id);
    if session.is_none() {
        debug!(kind = K::NAME, session = id, "result for a form that is gone; dropped");
    }
    session
}

// ============================================================================
// App
// ============================================================================

#[derive(Default)]
pub struct App;

impl App {
    fn base_url(config: &FormsConfig) -> Result<ValidatedUrl, DispatchError> {
        Ok(ValidatedUrl::new(config.api_base_url.clone())?)
    }

    fn fetch<K: Routed>(
        config: &FormsConfig,
        session: u64,
        ticket: &LoadTicket<K>,
        caps: &Capabilities,
    ) -> Result<(), DispatchError> {
        let url = Self::base_url(config)?.join(&K::resource_path(&ticket.id))?;
        let generation = ticket.generation;
        debug!(kind = K::NAME, id = %ticket.id, generation, "fetching");
        caps.http
            .get(url.as_str())
            .expect_json::<K::Entity>()
            .send(move |result| K::loaded(session, generation, settle_json(result)));
        Ok(())
    }

    fn send<K: Routed>(
        config: &FormsConfig,
        session: u64,
        intent: Intent<K>,
        caps: &Capabilities,
    ) -> Result<(), DispatchError> {
        let base = Self::base_url(config)?;
        let encode = |payload: &K::Payload| {
            serde_json::to_vec(payload).map_err(|e| DispatchError::new(ErrorKind::Unknown, e.to_string()))
        };

        match intent {
            Intent::Create { parent, payload } => {
                let path = K::collection_path(parent.as_ref()).ok_or_else(|| {
                    DispatchError::new(ErrorKind::Validation, format!("a {} needs a location", K::NAME))
                })?;
                let url = base.join(&path)?;
                info!(kind = K::NAME, %url, "creating");
                caps.http
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .body(encode(&payload)?)
                    .expect_json::<K::Entity>()
                    .send(move |result| K::saved(session, settle_json(result)));
            }
            Intent::Update { id, payload } => {
                let url = base.join(&K::resource_path(&id))?;
                info!(kind = K::NAME, %id, "updating");
                caps.http
                    .put(url.as_str())
                    .header("Content-Type", "application/json")
                    .body(encode(&payload)?)
                    .expect_json::<K::Entity>()
                    .send(move |result| K::saved(session, settle_json(result)));
            }
            Intent::Delete { id } => {
                let url = base.join(&K::resource_path(&id))?;
                info!(kind = K::NAME, %id, "deleting");
                caps.http.delete(url.as_str()).send(move |result| Event::Deleted {
                    session,
                    result: settle_empty(result),
                });
            }
        }
        Ok(())
    }

    fn follow(outcome: &SubmissionOutcome, caps: &Capabilities) {
        if let Some(path) = outcome.navigated_to() {
            caps.navigate.to(path);
        }
    }

    // --- Mounting ---

    fn open_new<K: Routed>(model: &mut Model, parent: Option<LocationId>) {
        Self::close(model);
        let mut session = FormSession::<K>::create(model.next_session(), parent);
        if let Some(today) = model.today {
            session.set_today(today);
        }
        model.editor = K::mount(session);
    }

    fn open_edit<K: Routed>(model: &mut Model, caps: &Capabilities, id: K::Id) {
        if K::session(&mut model.editor).is_none() {
            Self::close(model);
            let (mut session, ticket) = FormSession::<K>::edit(model.next_session(), id);
            if let Some(today) = model.today {
                session.set_today(today);
            }
            Self::start_load(&model.config, &mut session, ticket, caps);
            model.editor = K::mount(session);
            return;
        }
        if let Some(session) = K::session(&mut model.editor) {
            let ticket = session.set_editing_id(id);
            Self::start_load(&model.config, session, ticket, caps);
        }
    }

    fn start_load<K: Routed>(
        config: &FormsConfig,
        session: &mut FormSession<K>,
        ticket: Option<LoadTicket<K>>,
        caps: &Capabilities,
    ) {
        let Some(ticket) = ticket else {
            return;
        };
        if let Err(err) = Self::fetch(config, session.session(), &ticket, caps) {
            session.apply_load(ticket.generation, Err(err));
        }
    }

    fn close(model: &mut Model) {
        match &mut model.editor {
            Editor::Closed => {}
            Editor::Review(session) => session.close(),
            Editor::Location(session) => session.close(),
        }
        model.editor = Editor::Closed;
    }

    // --- Editing ---

    fn change<K: Routed>(model: &mut Model, values: K::Values) {
        match K::session(&mut model.editor).and_then(FormSession::form_mut) {
            Some(form) => form.set_values(values),
            None => debug!(kind = K::NAME, "edit for a form that is not showing; ignored"),
        }
    }

    fn photo<K: FormKind>(form: &mut FormState<K>, event: PhotoEvent) {
        match event {
            PhotoEvent::Started { key } => form.begin_photo_upload_with(key),
            PhotoEvent::Uploaded { key, id, thumbnail } => {
                if !form.complete_photo_upload(key, id, thumbnail) {
                    debug!(kind = K::NAME, %key, "upload finished for a removed slot");
                }
            }
            PhotoEvent::Failed { key } => {
                warn!(kind = K::NAME, %key, "photo upload failed");
                form.fail_photo_upload(key);
            }
            PhotoEvent::Removed { key } => {
                form.remove_photo(key);
            }
        }
    }

    // --- Submit and delete ---

    fn submit<K: Routed>(model: &mut Model, caps: &Capabilities) {
        let mode = model.presentation_mode();
        let Model { config, editor, .. } = model;
        let Some(session) = K::session(editor) else {
            return;
        };
        match session.begin_submit(config, mode) {
            Ok(intent) => {
                if let Err(err) = Self::send(config, session.session(), intent, caps) {
                    session.finish_submit(config, Err(err));
                }
            }
            Err(err) => debug!(kind = K::NAME, %err, "submit refused"),
        }
    }

    fn saved<K: Routed>(
        model: &mut Model,
        caps: &Capabilities,
        session: u64,
        result: Result<K::Entity, DispatchError>,
    ) {
        let Model { config, editor, .. } = model;
        let Some(session) = mounted_session::<K>(editor, session) else {
            return;
        };
        if let Some(outcome) = session.finish_submit(config, result) {
            Self::follow(&outcome, caps);
        }
    }

    fn loaded<K: Routed>(
        model: &mut Model,
        session: u64,
        generation: u64,
        result: Result<K::Entity, DispatchError>,
    ) {
        if let Some(session) = mounted_session::<K>(&mut model.editor, session) {
            session.apply_load(generation, result);
        }
    }

    fn request_delete<K: Routed>(model: &mut Model, caps: &Capabilities) {
        let Model { config, editor, .. } = model;
        let Some(session) = K::session(editor) else {
            return;
        };
        match session.request_delete(config) {
            Ok(()) => {
                let id = session.session();
                caps.confirm.ask(K::DELETE_CONFIRMATION, move |confirmed| {
                    Event::ConfirmAnswered {
                        session: id,
                        confirmed,
                    }
                });
            }
            Err(err) => debug!(kind = K::NAME, %err, "delete unavailable"),
        }
    }

    fn confirm_answered<K: Routed>(
        model: &mut Model,
        caps: &Capabilities,
        session: u64,
        confirmed: bool,
    ) {
        let Model { config, editor, .. } = model;
        let Some(session) = mounted_session::<K>(editor, session) else {
            return;
        };
        match session.answer_delete(config, confirmed) {
            Ok(intent) => {
                if let Err(err) = Self::send(config, session.session(), intent, caps) {
                    session.finish_delete(config, Err(err));
                }
            }
            Err(err) => debug!(kind = K::NAME, %err, "delete not sent"),
        }
    }

    fn deleted<K: Routed>(
        model: &mut Model,
        caps: &Capabilities,
        session: u64,
        result: Result<(), DispatchError>,
    ) {
        let Model { config, editor, .. } = model;
        let Some(session) = mounted_session::<K>(editor, session) else {
            return;
        };
        if let Some(outcome) = session.finish_delete(config, result) {
            Self::follow(&outcome, caps);
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => model.config = config,
                Err(err) => warn!(%err, "config rejected; keeping the previous one"),
            },

            Event::ViewportResized { width_px } => {
                // Only read at submit time; nothing to redraw.
                model.viewport_width_px = Some(width_px);
                return;
            }

            Event::DateChanged { today } => {
                model.today = Some(today);
                match &mut model.editor {
                    Editor::Closed => {}
                    Editor::Review(session) => session.set_today(today),
                    Editor::Location(session) => session.set_today(today),
                }
            }

            Event::NewReview { location_id } => {
                Self::open_new::<ReviewKind>(model, Some(location_id));
            }
            Event::EditReview { id } => Self::open_edit::<ReviewKind>(model, caps, id),
            Event::NewLocation => Self::open_new::<LocationKind>(model, None),
            Event::EditLocation { id } => Self::open_edit::<LocationKind>(model, caps, id),

            Event::ReviewChanged(values) => Self::change::<ReviewKind>(model, values),
            Event::LocationChanged(values) => Self::change::<LocationKind>(model, values),

            Event::Photo(event) => match &mut model.editor {
                Editor::Review(session) => {
                    if let Some(form) = session.form_mut() {
                        Self::photo(form, event);
                    }
                }
                Editor::Location(session) => {
                    if let Some(form) = session.form_mut() {
                        Self::photo(form, event);
                    }
                }
                Editor::Closed => debug!("photo event with no form open; ignored"),
            },

            Event::Submit => match model.editor.mounted() {
                Some(Mounted::Review) => Self::submit::<ReviewKind>(model, caps),
                Some(Mounted::Location) => Self::submit::<LocationKind>(model, caps),
                None => debug!("submit with no form open; ignored"),
            },

            Event::DeleteRequested => match model.editor.mounted() {
                Some(Mounted::Review) => Self::request_delete::<ReviewKind>(model, caps),
                Some(Mounted::Location) => Self::request_delete::<LocationKind>(model, caps),
                None => debug!("delete with no form open; ignored"),
            },

            Event::Close => Self::close(model),

            Event::ReviewLoaded {
                session,
                generation,
                result,
            } => Self::loaded::<ReviewKind>(model, session, generation, result),
            Event::LocationLoaded {
                session,
                generation,
                result,
            } => Self::loaded::<LocationKind>(model, session, generation, result),

            Event::ReviewSaved { session, result } => {
                Self::saved::<ReviewKind>(model, caps, session, result);
            }
            Event::LocationSaved { session, result } => {
                Self::saved::<LocationKind>(model, caps, session, result);
            }

            Event::ConfirmAnswered { session, confirmed } => match model.editor.mounted() {
                Some(Mounted::Review) => {
                    Self::confirm_answered::<ReviewKind>(model, caps, session, confirmed);
                }
                Some(Mounted::Location) => {
                    Self::confirm_answered::<LocationKind>(model, caps, session, confirmed);
                }
                None => debug!(session, "confirmation for a closed form; dropped"),
            },

            Event::Deleted { session, result } => match model.editor.mounted() {
                Some(Mounted::Review) => Self::deleted::<ReviewKind>(model, caps, session, result),
                Some(Mounted::Location) => {
                    Self::deleted::<LocationKind>(model, caps, session, result);
                }
                None => debug!(session, "delete result for a closed form; dropped"),
            },
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        let form = match &model.editor {
            Editor::Closed => None,
            Editor::Review(session) => Some(FormViewModel::Review(session.view())),
            Editor::Location(session) => Some(FormViewModel::Location(session.view())),
        };
        ViewModel { form }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::testing::{
        confirmations, http_requests, json_body, navigations, sample_location, sample_review,
    };
    use crate::capabilities::Effect;
    use crux_core::testing::AppTester;

    fn review_id(s: &str) -> ReviewId {
        ReviewId::new(s).unwrap()
    }

    fn review_view(app: &AppTester<App, Effect>, model: &Model) -> FormView<ReviewKind> {
        match app.view(model).form {
            Some(FormViewModel::Review(view)) => view,
            other => panic!("expected a review form, got {other:?}"),
        }
    }

    fn filled_review() -> ReviewFormValues {
        let mut values = ReviewFormValues::default();
        values.review.comment = "Two trees, both loaded".into();
        values.review.observed_on = NaiveDate::from_ymd_opt(2024, 7, 2);
        values
    }

    #[test]
    fn edit_fetches_the_entity_once() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::EditReview { id: review_id("42") }, &mut model);
        let requests = http_requests(&update.effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert!(requests[0].url.ends_with("/reviews/42"));
        assert!(review_view(&app, &model).is_loading);

        // Same id again: no second fetch.
        let update = app.update(Event::EditReview { id: review_id("42") }, &mut model);
        assert!(http_requests(&update.effects).is_empty());
    }

    #[test]
    fn loaded_entity_shows_without_further_events() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        app.update(Event::EditReview { id: review_id("42") }, &mut model);

        app.update(
            Event::ReviewLoaded {
                session: 1,
                generation: 1,
                result: Ok(sample_review("42", "7")),
            },
            &mut model,
        );

        let view = review_view(&app, &model);
        assert_eq!(view.values, Some(ReviewKind::to_form(&sample_review("42", "7"))));
        assert!(view.show_delete);
        assert!(!view.is_loading);
    }

    #[test]
    fn result_after_close_is_dropped() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        app.update(Event::EditReview { id: review_id("42") }, &mut model);
        app.update(Event::Close, &mut model);

        app.update(
            Event::ReviewLoaded {
                session: 1,
                generation: 1,
                result: Ok(sample_review("42", "7")),
            },
            &mut model,
        );
        assert_eq!(app.view(&model).form, None);

        // Reopening the same id fetches again under a new session.
        let update = app.update(Event::EditReview { id: review_id("42") }, &mut model);
        assert_eq!(http_requests(&update.effects).len(), 1);
        app.update(
            Event::ReviewLoaded {
                session: 1,
                generation: 1,
                result: Ok(sample_review("42", "7")),
            },
            &mut model,
        );
        assert!(review_view(&app, &model).values.is_none());
    }

    #[test]
    fn unknown_viewport_counts_as_full_page() {
        let mut model = Model::default();
        assert_eq!(model.presentation_mode(), PresentationMode::FullPage);
        model.viewport_width_px = Some(1280);
        assert_eq!(model.presentation_mode(), PresentationMode::Inline);
    }

    #[test]
    fn create_posts_to_the_location_reviews() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        app.update(
            Event::NewReview {
                location_id: LocationId::new("7").unwrap(),
            },
            &mut model,
        );
        app.update(Event::ReviewChanged(filled_review()), &mut model);

        let update = app.update(Event::Submit, &mut model);

        let requests = http_requests(&update.effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].url.ends_with("/locations/7/reviews"));
        assert_eq!(json_body(requests[0])["comment"], "Two trees, both loaded");
        assert_eq!(review_view(&app, &model).submit_label, crate::session::SUBMITTING_LABEL);
    }

    #[test]
    fn bad_base_url_fails_the_submit_locally() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        model.config.api_base_url = "not a url".into();
        app.update(
            Event::NewReview {
                location_id: LocationId::new("7").unwrap(),
            },
            &mut model,
        );
        app.update(Event::ReviewChanged(filled_review()), &mut model);

        let update = app.update(Event::Submit, &mut model);

        assert!(http_requests(&update.effects).is_empty());
        let view = review_view(&app, &model);
        assert!(view.can_submit);
        assert!(view.failure.is_some());
    }

    #[test]
    fn rejected_config_keeps_the_previous_one() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let bad = FormsConfig {
            map_path: "map".into(),
            ..FormsConfig::default()
        };
        app.update(Event::Configure(bad), &mut model);
        assert_eq!(model.config, FormsConfig::default());
    }

    #[test]
    fn location_delete_confirms_then_goes_to_the_map() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        app.update(
            Event::EditLocation {
                id: LocationId::new("7").unwrap(),
            },
            &mut model,
        );
        app.update(
            Event::LocationLoaded {
                session: 1,
                generation: 1,
                result: Ok(sample_location("7")),
            },
            &mut model,
        );

        let update = app.update(Event::DeleteRequested, &mut model);
        assert_eq!(
            confirmations(&update.effects),
            vec![LocationKind::DELETE_CONFIRMATION]
        );

        let update = app.update(
            Event::ConfirmAnswered {
                session: 1,
                confirmed: true,
            },
            &mut model,
        );
        let requests = http_requests(&update.effects);
        assert_eq!(requests[0].method, "DELETE");
        assert!(requests[0].url.ends_with("/locations/7"));

        let update = app.update(
            Event::Deleted {
                session: 1,
                result: Ok(()),
            },
            &mut model,
        );
        assert_eq!(navigations(&update.effects), vec!["/map"]);
    }
}
