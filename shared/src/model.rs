use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FormError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        #[serde(try_from = "IdRepr", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, FormError> {
                let id = id.into().trim().to_string();
                validate_id(stringify!($name), &id)?;
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<IdRepr> for $name {
            type Error = FormError;

            fn try_from(repr: IdRepr) -> Result<Self, Self::Error> {
                Self::new(repr.into_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// The API hands out numeric ids while routes carry strings; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum IdRepr {
    Number(u64),
    Text(String),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

const MAX_ID_LENGTH: usize = 64;

fn validate_id(kind: &str, id: &str) -> Result<(), FormError> {
    if id.is_empty() {
        return Err(FormError::InvalidId(format!("{kind} cannot be empty")));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(FormError::InvalidId(format!(
            "{kind} exceeds {MAX_ID_LENGTH} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FormError::InvalidId(format!(
            "{kind} contains invalid characters (allowed: a-z, A-Z, 0-9, -, _)"
        )));
    }
    Ok(())
}

typed_id!(LocationId);
typed_id!(ReviewId);
typed_id!(TypeId);
typed_id!(PhotoId);

// --- Validated value types ---

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }

    pub fn lat(self) -> f64 {
        self.lat
    }

    pub fn lng(self) -> f64 {
        self.lng
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = String;

    fn try_from((lat, lng): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lat, lng).ok_or_else(|| format!("invalid coordinate: lat={lat}, lng={lng}"))
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(c: Coordinate) -> Self {
        (c.lat, c.lng)
    }
}

/// Star rating, 1 through [`Rating::MAX`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("rating {value} outside 1..={}", Self::MAX))
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FruitingStatus {
    Flowers,
    Unripe,
    Ripe,
}

impl TryFrom<u8> for FruitingStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Flowers),
            1 => Ok(Self::Unripe),
            2 => Ok(Self::Ripe),
            other => Err(format!("unknown fruiting status {other}")),
        }
    }
}

impl From<FruitingStatus> for u8 {
    fn from(f: FruitingStatus) -> Self {
        match f {
            FruitingStatus::Flowers => 0,
            FruitingStatus::Unripe => 1,
            FruitingStatus::Ripe => 2,
        }
    }
}

/// How the source tree relates to the person who added it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Access {
    AddedByOwner,
    OwnerPermission,
    PublicProperty,
    PrivateOverhanging,
    PrivateProperty,
}

impl TryFrom<u8> for Access {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AddedByOwner),
            1 => Ok(Self::OwnerPermission),
            2 => Ok(Self::PublicProperty),
            3 => Ok(Self::PrivateOverhanging),
            4 => Ok(Self::PrivateProperty),
            other => Err(format!("unknown access level {other}")),
        }
    }
}

impl From<Access> for u8 {
    fn from(a: Access) -> Self {
        match a {
            Access::AddedByOwner => 0,
            Access::OwnerPermission => 1,
            Access::PublicProperty => 2,
            Access::PrivateOverhanging => 3,
            Access::PrivateProperty => 4,
        }
    }
}

/// Zero-based month index (January = 0).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    pub fn new(index: u8) -> Option<Self> {
        (index < 12).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Month {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("month index {value} outside 0..12"))
    }
}

impl From<Month> for u8 {
    fn from(m: Month) -> Self {
        m.0
    }
}

/// CAPTCHA response token. Sent with a mutation, never stored on an entity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptchaToken(String);

impl CaptchaToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CaptchaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// --- Remote entities ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub thumbnail: String,
    #[serde(default)]
    pub medium: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Review {
    pub id: ReviewId,
    pub location_id: LocationId,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub observed_on: Option<NaiveDate>,
    #[serde(default)]
    pub fruiting: Option<FruitingStatus>,
    #[serde(default)]
    pub quality_rating: Option<Rating>,
    #[serde(default)]
    pub yield_rating: Option<Rating>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub type_ids: Vec<TypeId>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default)]
    pub season_start: Option<Month>,
    #[serde(default)]
    pub season_stop: Option<Month>,
    #[serde(default)]
    pub unverified: bool,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

// --- Wire payloads ---

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ReviewPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fruiting: Option<FruitingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_rating: Option<Rating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_rating: Option<Rating>,
    pub photo_ids: Vec<PhotoId>,
    #[serde(
        rename = "g-recaptcha-response",
        skip_serializing_if = "Option::is_none"
    )]
    pub captcha: Option<CaptchaToken>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LocationPayload {
    pub type_ids: Vec<TypeId>,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_start: Option<Month>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_stop: Option<Month>,
    pub unverified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewPayload>,
    #[serde(
        rename = "g-recaptcha-response",
        skip_serializing_if = "Option::is_none"
    )]
    pub captcha: Option<CaptchaToken>,
}
