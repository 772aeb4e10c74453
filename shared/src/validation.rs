//! Synchronous form validation.
//!
//! Validators never touch the network. They produce a [`FieldErrors`] map
//! keyed by the dotted path of the offending field (`review.observed_on`,
//! `location.type_ids`), which is what the render layer binds error text to.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::binding::{LocationFields, PhotoField, ReviewFields};
use crate::{MAX_COMMENT_LENGTH, MAX_DESCRIPTION_LENGTH, MAX_PHOTOS};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        // First error for a field wins.
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn merge_prefixed(&mut self, prefix: &str, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(format!("{prefix}.{field}"), message);
        }
    }
}

/// Validates review fields as of `today`. Keys are relative to the review
/// (`observed_on`, `comment`, ...); callers nest them under their own prefix.
pub fn validate_review(review: &ReviewFields, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();

    match review.observed_on {
        None => errors.insert("observed_on", "Observation date is required"),
        Some(date) if date > today => {
            errors.insert("observed_on", "Observation date cannot be in the future");
        }
        Some(_) => {}
    }

    if review.comment.chars().count() > MAX_COMMENT_LENGTH {
        errors.insert(
            "comment",
            format!("Comments are limited to {MAX_COMMENT_LENGTH} characters"),
        );
    }

    validate_photos(&review.photos, &mut errors);
    errors
}

fn validate_photos(photos: &[PhotoField], errors: &mut FieldErrors) {
    if photos.len() > MAX_PHOTOS {
        errors.insert("photos", format!("At most {MAX_PHOTOS} photos per review"));
    }
    if photos.iter().any(|p| !p.is_uploading && p.id.is_none()) {
        errors.insert("photos", "A photo failed to upload; remove it and try again");
    }
}

/// Validates location fields, plus the optional first review when the user
/// filled one in.
pub fn validate_location(
    location: &LocationFields,
    review: &ReviewFields,
    today: NaiveDate,
) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let mut own = FieldErrors::new();

    if location.position.is_none() {
        own.insert("position", "Drop a pin on the map to set the position");
    }
    if location.type_ids.is_empty() {
        own.insert("type_ids", "Choose at least one type");
    }
    if location.description.chars().count() > MAX_DESCRIPTION_LENGTH {
        own.insert(
            "description",
            format!("Descriptions are limited to {MAX_DESCRIPTION_LENGTH} characters"),
        );
    }
    if location.season_stop.is_some() && location.season_start.is_none() {
        own.insert("season_start", "Season start is required when a stop is given");
    }

    errors.merge_prefixed("location", own);
    if !review.is_blank() {
        errors.merge_prefixed("review", validate_review(review, today));
    }
    errors
}

/// Review validation nested under the `review.` prefix, as the review form
/// lays out its fields.
pub fn validate_review_form(review: &ReviewFields, today: NaiveDate) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.merge_prefixed("review", validate_review(review, today));
    errors
}
