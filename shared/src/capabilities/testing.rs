//! Sample entities and effect helpers shared by unit and integration tests.

use chrono::NaiveDate;
use crux_http::protocol::HttpRequest;

use super::Effect;
use crate::model::{FruitingStatus, Location, LocationId, Rating, Review, ReviewId, TypeId};

pub fn sample_review(id: &str, location_id: &str) -> Review {
    Review {
        id: ReviewId::new(id).unwrap(),
        location_id: LocationId::new(location_id).unwrap(),
        comment: Some("Heavy crop this year".into()),
        observed_on: NaiveDate::from_ymd_opt(2024, 6, 1),
        fruiting: Some(FruitingStatus::Ripe),
        quality_rating: Rating::new(4),
        yield_rating: Rating::new(5),
        photos: vec![],
    }
}

pub fn sample_location(id: &str) -> Location {
    Location {
        id: LocationId::new(id).unwrap(),
        type_ids: vec![TypeId::new("11").unwrap()],
        lat: 40.71,
        lng: -74.0,
        description: Some("Corner of the park".into()),
        access: None,
        season_start: None,
        season_stop: None,
        unverified: false,
        reviews: vec![],
    }
}

// ============================================================================
// Effect inspection
// ============================================================================

pub fn http_requests(effects: &[Effect]) -> Vec<&HttpRequest> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(&request.operation),
            _ => None,
        })
        .collect()
}

pub fn navigations(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Navigate(request) => Some(request.operation.path.as_str()),
            _ => None,
        })
        .collect()
}

pub fn confirmations(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Confirm(request) => Some(request.operation.message.as_str()),
            _ => None,
        })
        .collect()
}

pub fn rendered(effects: &[Effect]) -> bool {
    effects.iter().any(|effect| matches!(effect, Effect::Render(_)))
}

pub fn json_body(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}
