//! Entity ⇄ form bindings.
//!
//! A [`FormKind`] names one editable entity and carries the pure transforms
//! the workflow needs: entity → form values when a record is loaded, and form
//! values → wire payload at submit time. Everything generic in the loader,
//! the form state and the submit coordinator goes through this trait.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;
use uuid::Uuid;

use crate::model::{
    Access, CaptchaToken, Coordinate, FruitingStatus, Location, LocationId, LocationPayload,
    Month, Photo, PhotoId, Rating, Review, ReviewId, ReviewPayload, TypeId,
};
use crate::validation::{self, FieldErrors};

pub trait FormKind: fmt::Debug + Clone + Copy + Send + Sync + 'static {
    type Id: Clone + fmt::Debug + fmt::Display + PartialEq + Eq + Hash + Send + Sync + 'static;
    type Entity: DeserializeOwned + Clone + fmt::Debug + PartialEq + Send + Sync + 'static;
    type Values: Serialize + Clone + fmt::Debug + Default + PartialEq + Send + Sync + 'static;
    type Payload: Serialize + Clone + fmt::Debug + PartialEq + Send + Sync + 'static;

    /// Lower-case noun used in logs and prompts.
    const NAME: &'static str;
    const DELETE_CONFIRMATION: &'static str;

    fn to_form(entity: &Self::Entity) -> Self::Values;

    fn to_payload(values: &Self::Values) -> Self::Payload;

    /// `today` bounds observation dates; callers pass the user's local date.
    fn validate(values: &Self::Values, today: NaiveDate) -> FieldErrors;

    fn photos(values: &Self::Values) -> &[PhotoField];

    fn photos_mut(values: &mut Self::Values) -> &mut Vec<PhotoField>;

    /// Location whose detail view is the landing page after a mutation.
    fn parent_of(entity: &Self::Entity) -> LocationId;

    fn id_of(entity: &Self::Entity) -> Self::Id;

    /// API path of one entity, relative to the API base.
    fn resource_path(id: &Self::Id) -> String;

    /// API path a create is posted to. `None` when the create cannot be
    /// addressed without a parent that is not known yet.
    fn collection_path(parent: Option<&LocationId>) -> Option<String>;

    /// Where to go once the entity itself is gone.
    fn after_delete(parent: Option<&LocationId>) -> Route {
        parent.map_or(Route::Map, |id| Route::LocationDetail(id.clone()))
    }
}

/// `editing_id` alone decides create vs. update; `parent` is the location the
/// form hangs off, when known up front.
#[derive(Debug, Clone, PartialEq)]
pub struct EditingContext<K: FormKind> {
    pub editing_id: Option<K::Id>,
    pub parent: Option<LocationId>,
}

impl<K: FormKind> EditingContext<K> {
    pub fn creating(parent: Option<LocationId>) -> Self {
        Self {
            editing_id: None,
            parent,
        }
    }

    pub fn editing(id: K::Id, parent: LocationId) -> Self {
        Self {
            editing_id: Some(id),
            parent: Some(parent),
        }
    }

    pub fn for_entity(entity: &K::Entity) -> Self {
        Self::editing(K::id_of(entity), K::parent_of(entity))
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationMode {
    /// Embedded under the location detail view; stay and reset after create.
    Inline,
    /// Standalone page; navigate back to the parent after create.
    FullPage,
}

impl PresentationMode {
    pub fn from_viewport_width(width_px: u32, desktop_breakpoint_px: u32) -> Self {
        if width_px >= desktop_breakpoint_px {
            Self::Inline
        } else {
            Self::FullPage
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    LocationDetail(LocationId),
    Map,
}

// ============================================================================
// Photo fields
// ============================================================================

/// One photo slot on a form. Placeholders exist while an upload runs and are
/// keyed so the upload result can find its slot again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoField {
    pub key: Uuid,
    pub id: Option<PhotoId>,
    pub thumbnail: Option<String>,
    pub is_uploading: bool,
}

impl PhotoField {
    pub fn pending() -> Self {
        Self::pending_with(Uuid::new_v4())
    }

    /// Placeholder under a key chosen by the host, which then reports the
    /// upload result against the same key.
    pub fn pending_with(key: Uuid) -> Self {
        Self {
            key,
            id: None,
            thumbnail: None,
            is_uploading: true,
        }
    }

    pub fn uploaded(id: PhotoId, thumbnail: Option<String>) -> Self {
        Self {
            key: Uuid::new_v4(),
            id: Some(id),
            thumbnail,
            is_uploading: false,
        }
    }
}

impl From<&Photo> for PhotoField {
    fn from(photo: &Photo) -> Self {
        Self::uploaded(photo.id.clone(), Some(photo.thumbnail.clone()))
    }
}

// Uuid keys differ between otherwise identical slots; compare what the user sees.
fn same_photos(a: &[PhotoField], b: &[PhotoField]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| x.id == y.id && x.is_uploading == y.is_uploading)
}

// ============================================================================
// Review
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewFields {
    pub comment: String,
    pub observed_on: Option<NaiveDate>,
    pub fruiting: Option<FruitingStatus>,
    pub quality_rating: Option<Rating>,
    pub yield_rating: Option<Rating>,
    pub photos: Vec<PhotoField>,
}

impl PartialEq for ReviewFields {
    fn eq(&self, other: &Self) -> bool {
        self.comment == other.comment
            && self.observed_on == other.observed_on
            && self.fruiting == other.fruiting
            && self.quality_rating == other.quality_rating
            && self.yield_rating == other.yield_rating
            && same_photos(&self.photos, &other.photos)
    }
}

impl ReviewFields {
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_review(review: &Review) -> Self {
        Self {
            comment: review.comment.clone().unwrap_or_default(),
            observed_on: review.observed_on,
            fruiting: review.fruiting,
            quality_rating: review.quality_rating,
            yield_rating: review.yield_rating,
            photos: review.photos.iter().map(PhotoField::from).collect(),
        }
    }

    pub fn to_payload(&self, captcha: Option<CaptchaToken>) -> ReviewPayload {
        let comment = self.comment.trim();
        ReviewPayload {
            comment: (!comment.is_empty()).then(|| comment.to_string()),
            observed_on: self.observed_on,
            fruiting: self.fruiting,
            quality_rating: self.quality_rating,
            yield_rating: self.yield_rating,
            photo_ids: self.photos.iter().filter_map(|p| p.id.clone()).collect(),
            captcha,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewFormValues {
    pub review: ReviewFields,
    #[serde(skip_serializing)]
    pub captcha: Option<CaptchaToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewKind;

impl FormKind for ReviewKind {
    type Id = ReviewId;
    type Entity = Review;
    type Values = ReviewFormValues;
    type Payload = ReviewPayload;

    const NAME: &'static str = "review";
    const DELETE_CONFIRMATION: &'static str = "Are you sure you want to delete this review?";

    fn to_form(entity: &Review) -> ReviewFormValues {
        ReviewFormValues {
            review: ReviewFields::from_review(entity),
            captcha: None,
        }
    }

    fn to_payload(values: &ReviewFormValues) -> ReviewPayload {
        values.review.to_payload(values.captcha.clone())
    }

    fn validate(values: &ReviewFormValues, today: NaiveDate) -> FieldErrors {
        validation::validate_review_form(&values.review, today)
    }

    fn photos(values: &ReviewFormValues) -> &[PhotoField] {
        &values.review.photos
    }

    fn photos_mut(values: &mut ReviewFormValues) -> &mut Vec<PhotoField> {
        &mut values.review.photos
    }

    fn parent_of(entity: &Review) -> LocationId {
        entity.location_id.clone()
    }

    fn id_of(entity: &Review) -> ReviewId {
        entity.id.clone()
    }

    fn resource_path(id: &ReviewId) -> String {
        format!("reviews/{id}")
    }

    fn collection_path(parent: Option<&LocationId>) -> Option<String> {
        parent.map(|id| format!("locations/{id}/reviews"))
    }
}

// ============================================================================
// Location
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationFields {
    pub position: Option<Coordinate>,
    pub type_ids: Vec<TypeId>,
    pub description: String,
    pub access: Option<Access>,
    pub season_start: Option<Month>,
    pub season_stop: Option<Month>,
    pub unverified: bool,
}

impl LocationFields {
    pub fn from_location(location: &Location) -> Self {
        Self {
            position: Coordinate::new(location.lat, location.lng),
            type_ids: location.type_ids.clone(),
            description: location.description.clone().unwrap_or_default(),
            access: location.access,
            season_start: location.season_start,
            season_stop: location.season_stop,
            unverified: location.unverified,
        }
    }
}

/// Location form: the location itself plus an optional first review that is
/// only offered when creating.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationFormValues {
    pub location: LocationFields,
    pub review: ReviewFields,
    #[serde(skip_serializing)]
    pub captcha: Option<CaptchaToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationKind;

impl FormKind for LocationKind {
    type Id = LocationId;
    type Entity = Location;
    type Values = LocationFormValues;
    type Payload = LocationPayload;

    const NAME: &'static str = "location";
    const DELETE_CONFIRMATION: &'static str = "Are you sure you want to delete this location?";

    fn to_form(entity: &Location) -> LocationFormValues {
        LocationFormValues {
            location: LocationFields::from_location(entity),
            review: ReviewFields::default(),
            captcha: None,
        }
    }

    fn to_payload(values: &LocationFormValues) -> LocationPayload {
        let location = &values.location;
        let (lat, lng) = location
            .position
            .map_or((0.0, 0.0), |p| (p.lat(), p.lng()));
        let description = location.description.trim();
        LocationPayload {
            type_ids: location.type_ids.clone(),
            lat,
            lng,
            description: (!description.is_empty()).then(|| description.to_string()),
            access: location.access,
            season_start: location.season_start,
            season_stop: location.season_stop,
            unverified: location.unverified,
            review: (!values.review.is_blank()).then(|| values.review.to_payload(None)),
            captcha: values.captcha.clone(),
        }
    }

    fn validate(values: &LocationFormValues, today: NaiveDate) -> FieldErrors {
        validation::validate_location(&values.location, &values.review, today)
    }

    fn photos(values: &LocationFormValues) -> &[PhotoField] {
        &values.review.photos
    }

    fn photos_mut(values: &mut LocationFormValues) -> &mut Vec<PhotoField> {
        &mut values.review.photos
    }

    fn parent_of(entity: &Location) -> LocationId {
        entity.id.clone()
    }

    fn id_of(entity: &Location) -> LocationId {
        entity.id.clone()
    }

    fn resource_path(id: &LocationId) -> String {
        format!("locations/{id}")
    }

    fn collection_path(_parent: Option<&LocationId>) -> Option<String> {
        Some("locations".to_string())
    }

    fn after_delete(_parent: Option<&LocationId>) -> Route {
        Route::Map
    }
}
