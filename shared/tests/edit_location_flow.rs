use chrono::NaiveDate;
use crux_core::testing::AppTester;
use entry_forms::capabilities::testing::{
    confirmations, http_requests, json_body, navigations, sample_location,
};
use entry_forms::model::{Coordinate, Location, LocationId, Month, TypeId};
use entry_forms::{
    App, BindState, DispatchError, Editor, Effect, ErrorKind, Event, FormKind, FormView,
    FormViewModel, HttpError, LoadError, LocationFormValues, LocationKind, Model,
    ValidatedUrl,
};

const WIDE: u32 = 1280;
const NARROW: u32 = 375;

fn filled() -> LocationFormValues {
    let mut values = LocationFormValues::default();
    values.location.position = Coordinate::new(45.5, -122.6);
    values.location.type_ids = vec![TypeId::new("120").unwrap()];
    values.location.description = "  Overhangs the sidewalk ".into();
    values.location.season_start = Month::new(5);
    values.location.season_stop = Month::new(7);
    values
}

fn view(app: &AppTester<App, Effect>, model: &Model) -> FormView<LocationKind> {
    match app.view(model).form {
        Some(FormViewModel::Location(view)) => view,
        other => panic!("expected a location form, got {other:?}"),
    }
}

fn session(model: &Model) -> u64 {
    match &model.editor {
        Editor::Location(session) => session.session(),
        other => panic!("expected a location form, got {other:?}"),
    }
}

fn create(app: &AppTester<App, Effect>, model: &mut Model, width: u32) {
    app.update(Event::ViewportResized { width_px: width }, model);
    app.update(Event::NewLocation, model);
}

fn open(app: &AppTester<App, Effect>, model: &mut Model, width: u32) {
    app.update(Event::ViewportResized { width_px: width }, model);
    app.update(
        Event::EditLocation {
            id: LocationId::new("7").unwrap(),
        },
        model,
    );
    let generation = match &model.editor {
        Editor::Location(session) => match session.load_state() {
            BindState::Loading { generation, .. } => *generation,
            other => panic!("expected a load in flight, got {other:?}"),
        },
        other => panic!("expected a location form, got {other:?}"),
    };
    app.update(
        Event::LocationLoaded {
            session: session(model),
            generation,
            result: Ok(sample_location("7")),
        },
        model,
    );
}

fn saved(
    app: &AppTester<App, Effect>,
    model: &mut Model,
    result: Result<Location, DispatchError>,
) -> Vec<Effect> {
    let session = session(model);
    app.update(Event::LocationSaved { session, result }, model).effects
}

#[test]
fn new_location_with_first_review_lands_on_its_page() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    create(&app, &mut model, NARROW);
    assert!(view(&app, &model).show_review_heading);
    assert!(!view(&app, &model).show_delete);

    let mut values = filled();
    values.review.comment = "First pick of the year".into();
    values.review.observed_on = NaiveDate::from_ymd_opt(2024, 5, 30);
    app.update(Event::LocationChanged(values), &mut model);
    let update = app.update(Event::Submit, &mut model);

    let requests = http_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert!(requests[0].url.ends_with("/locations"));
    let body = json_body(requests[0]);
    assert_eq!(body["description"], "Overhangs the sidewalk");
    assert_eq!(body["type_ids"], serde_json::json!(["120"]));
    assert_eq!(body["review"]["comment"], "First pick of the year");

    // Parent was unknown up front, so it comes from the created location.
    let effects = saved(&app, &mut model, Ok(sample_location("501")));
    assert_eq!(navigations(&effects), vec!["/locations/501"]);
}

#[test]
fn blank_first_review_is_left_out() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    create(&app, &mut model, NARROW);
    app.update(Event::LocationChanged(filled()), &mut model);

    let update = app.update(Event::Submit, &mut model);

    let requests = http_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    assert!(json_body(requests[0]).get("review").is_none());
}

#[test]
fn inline_location_create_resets() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    create(&app, &mut model, WIDE);
    app.update(Event::LocationChanged(filled()), &mut model);
    app.update(Event::Submit, &mut model);

    let effects = saved(&app, &mut model, Ok(sample_location("501")));

    assert!(navigations(&effects).is_empty());
    assert_eq!(view(&app, &model).values, Some(LocationFormValues::default()));
}

#[test]
fn incomplete_location_is_rejected_locally() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    create(&app, &mut model, WIDE);
    let mut values = LocationFormValues::default();
    values.location.description = "Somewhere near the river".into();
    values.review.comment = "Started a review too".into();
    app.update(Event::LocationChanged(values), &mut model);

    let shown = view(&app, &model);
    assert!(!shown.can_submit);
    assert!(shown.errors.contains("location.position"));
    assert!(shown.errors.contains("location.type_ids"));
    assert!(shown.errors.contains("review.observed_on"));

    let update = app.update(Event::Submit, &mut model);
    assert!(http_requests(&update.effects).is_empty());
}

#[test]
fn edit_location_navigates_back_in_any_mode() {
    for width in [WIDE, NARROW] {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        open(&app, &mut model, width);
        let shown = view(&app, &model);
        assert_eq!(shown.values, Some(LocationKind::to_form(&sample_location("7"))));
        assert!(!shown.show_review_heading);

        let mut values = shown.values.unwrap();
        values.location.unverified = true;
        app.update(Event::LocationChanged(values), &mut model);
        let update = app.update(Event::Submit, &mut model);

        let requests = http_requests(&update.effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "PUT");
        assert!(requests[0].url.ends_with("/locations/7"));
        assert_eq!(json_body(requests[0])["unverified"], true);

        let effects = saved(&app, &mut model, Ok(sample_location("7")));
        assert_eq!(navigations(&effects), vec!["/locations/7"]);
    }
}

#[test]
fn deleting_a_location_goes_to_the_map() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    open(&app, &mut model, WIDE);

    // 1. Ask first
    let update = app.update(Event::DeleteRequested, &mut model);
    assert_eq!(
        confirmations(&update.effects),
        vec![LocationKind::DELETE_CONFIRMATION]
    );
    assert!(http_requests(&update.effects).is_empty());

    // 2. Confirmed: the delete goes out and the form locks
    let session = session(&model);
    let update = app.update(
        Event::ConfirmAnswered {
            session,
            confirmed: true,
        },
        &mut model,
    );
    let requests = http_requests(&update.effects);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "DELETE");
    assert!(requests[0].url.ends_with("/locations/7"));
    assert!(!view(&app, &model).can_submit);

    // 3. Done: off to the map
    let update = app.update(
        Event::Deleted {
            session,
            result: Ok(()),
        },
        &mut model,
    );
    assert_eq!(navigations(&update.effects), vec!["/map"]);
}

#[test]
fn failed_location_delete_re_enables_form() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    open(&app, &mut model, WIDE);
    app.update(Event::DeleteRequested, &mut model);
    let session = session(&model);
    app.update(
        Event::ConfirmAnswered {
            session,
            confirmed: true,
        },
        &mut model,
    );

    let update = app.update(
        Event::Deleted {
            session,
            result: Err(DispatchError::from_status(503, "Service Unavailable")),
        },
        &mut model,
    );

    assert!(navigations(&update.effects).is_empty());
    let shown = view(&app, &model);
    assert_eq!(shown.failure.as_deref(), Some("Service Unavailable"));
    assert!(shown.show_delete);
    assert!(!shown.confirming_delete);

    // Another attempt asks again.
    let update = app.update(Event::DeleteRequested, &mut model);
    assert_eq!(confirmations(&update.effects).len(), 1);
}

#[test]
fn answer_for_an_earlier_form_is_ignored() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    open(&app, &mut model, WIDE);
    app.update(Event::DeleteRequested, &mut model);
    let first = session(&model);

    // The user navigated to another location's editor before answering.
    app.update(Event::Close, &mut model);
    open(&app, &mut model, WIDE);
    let update = app.update(
        Event::ConfirmAnswered {
            session: first,
            confirmed: true,
        },
        &mut model,
    );

    assert!(http_requests(&update.effects).is_empty());
    assert!(view(&app, &model).show_delete);
}

#[test]
fn unusable_base_url_fails_the_load_without_a_request() {
    let err = ValidatedUrl::new("ftp://files.example.com").unwrap_err();
    assert!(matches!(err, HttpError::InvalidUrl { .. }));

    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    model.config.api_base_url = "ftp://files.example.com".into();
    let update = app.update(
        Event::EditLocation {
            id: LocationId::new("7").unwrap(),
        },
        &mut model,
    );

    assert!(http_requests(&update.effects).is_empty());
    let shown = view(&app, &model);
    assert!(shown.values.is_none());
    assert!(!shown.is_loading);
    assert_eq!(shown.failure, Some(DispatchError::from(err).message));
    match &model.editor {
        Editor::Location(session) => match session.load_state() {
            BindState::Failed {
                error: LoadError::Fetch(error),
                ..
            } => assert_eq!(error.kind, ErrorKind::Validation),
            other => panic!("expected a failed load, got {other:?}"),
        },
        other => panic!("expected a location form, got {other:?}"),
    }
}
