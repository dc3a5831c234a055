use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// The review status of a submission. Every submission starts out as
/// `new`; only `new` submissions may be edited. The later transitions
/// are made by the review process, not by this API.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    New,
    Pending,
    Accepted,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Pending => "pending",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
        }
    }

    pub fn from_db(value: &str) -> Option<Status> {
        match value {
            "new" => Some(Status::New),
            "pending" => Some(Status::Pending),
            "accepted" => Some(Status::Accepted),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }
}

/// The person who authored a submission, identified by email. The
/// wire names follow the original FSTR contract: `fam` is the family
/// name, `name` the given name and `otc` the patronymic.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Submitter {
    pub(crate) email: String,

    pub(crate) fam: String,

    pub(crate) name: String,

    #[serde(default)]
    pub(crate) otc: Option<String>,

    pub(crate) phone: String,
}

/// The coordinates of a pass.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Coords {
    /// Degrees in [-90, 90].
    pub(crate) latitude: f64,

    /// Degrees in [-180, 180].
    pub(crate) longitude: f64,

    /// Metres above sea level, non-negative.
    pub(crate) height: i32,
}

/// The per-season difficulty grades, at most two characters each.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Level {
    #[serde(default)]
    pub(crate) winter: Option<String>,

    #[serde(default)]
    pub(crate) summer: Option<String>,

    #[serde(default)]
    pub(crate) autumn: Option<String>,

    #[serde(default)]
    pub(crate) spring: Option<String>,
}

/// A single photograph attached to a submission. The data is an
/// opaque encoded blob; this API never inspects it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Image {
    pub(crate) data: String,

    pub(crate) title: String,
}

/// The full submission payload, shared by the creation and update
/// endpoints.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmissionPayload {
    pub(crate) user: Submitter,

    pub(crate) coords: Coords,

    pub(crate) level: Level,

    /// Must contain at least one image, on update as well as on
    /// creation.
    pub(crate) images: Vec<Image>,

    #[serde(rename = "beautyTitle")]
    pub(crate) beauty_title: String,

    pub(crate) title: String,

    #[serde(default)]
    pub(crate) other_titles: Option<String>,

    #[serde(default)]
    pub(crate) connect: Option<String>,
}

impl SubmissionPayload {
    /// Checks every field constraint. Runs before any unit of work is
    /// started, so a failure leaves the database untouched.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.user.email)?;
        validate_non_empty("user.fam", &self.user.fam)?;
        validate_non_empty("user.name", &self.user.name)?;
        validate_phone(&self.user.phone)?;

        self.coords.validate()?;

        validate_level("winter", &self.level.winter)?;
        validate_level("summer", &self.level.summer)?;
        validate_level("autumn", &self.level.autumn)?;
        validate_level("spring", &self.level.spring)?;

        validate_non_empty("beautyTitle", &self.beauty_title)?;
        validate_non_empty("title", &self.title)?;

        if self.images.is_empty() {
            return Err(ValidationError::NoImages);
        }

        for image in &self.images {
            validate_non_empty("image.data", &image.data)?;
            validate_non_empty("image.title", &image.title)?;
        }

        Ok(())
    }
}

impl Coords {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }

        if self.height < 0 {
            return Err(ValidationError::NegativeHeight(self.height));
        }

        Ok(())
    }
}

/// The denormalized read view of a submission: the payload it was
/// created (or last updated) with, plus its review status.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub(crate) submission: SubmissionPayload,

    pub(crate) status: Status,
}

/// One row of the per-submitter listing.
#[derive(Clone, Debug, Serialize)]
pub struct SubmissionSummary {
    pub(crate) id: i32,

    pub(crate) status: Status,

    pub(crate) title: String,

    pub(crate) beauty_title: String,

    pub(crate) date_added: DateTime<Utc>,
}

/// The result of a status-gated update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
    /// The submission was `new` and every field was overwritten.
    Updated,

    /// The submission has already entered review; nothing was
    /// changed. This is a business rejection, not a fault.
    NotEditable { status: Status },

    /// No submission with the given ID exists.
    NotFound,
}

fn validate_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidEmail(email.to_owned());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || email.chars().any(char::is_whitespace)
        || domain.contains('@')
    {
        return Err(invalid());
    }

    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);

    if phone.len() < 5 || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPhone(phone.to_owned()));
    }

    Ok(())
}

fn validate_level(season: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > 2 => Err(ValidationError::LevelTooLong {
            season,
            value: v.clone(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::errors::ValidationError;

    fn payload() -> SubmissionPayload {
        serde_json::from_value(serde_json::json!({
            "user": {
                "email": "climber@example.com",
                "fam": "Pupkin",
                "name": "Vasily",
                "otc": "Ivanovich",
                "phone": "+79031234567"
            },
            "coords": { "latitude": 45.3842, "longitude": 7.1525, "height": 1200 },
            "level": { "winter": "", "summer": "1А", "autumn": "1А", "spring": null },
            "images": [
                { "data": "aGVsbG8=", "title": "Седловина" },
                { "data": "d29ybGQ=", "title": "Подъём" }
            ],
            "beautyTitle": "пер. ",
            "title": "Пхия",
            "other_titles": "Триев",
            "connect": ""
        }))
        .expect("deserialize test payload")
    }

    #[test]
    fn accepts_well_formed_payload() {
        assert_eq!(payload().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_email() {
        for email in &["", "plainaddress", "@no-local.org", "no-domain@", "a@b", "a b@c.org"] {
            let mut p = payload();
            p.user.email = (*email).to_owned();

            assert_eq!(
                p.validate(),
                Err(ValidationError::InvalidEmail((*email).to_owned())),
                "email {:?} should be rejected",
                email
            );
        }
    }

    #[test]
    fn rejects_bad_phone() {
        for phone in &["", "123", "+123", "phone number", "8 903 123-45-67"] {
            let mut p = payload();
            p.user.phone = (*phone).to_owned();

            assert_eq!(
                p.validate(),
                Err(ValidationError::InvalidPhone((*phone).to_owned())),
                "phone {:?} should be rejected",
                phone
            );
        }
    }

    #[test]
    fn rejects_empty_names_and_titles() {
        let mut p = payload();
        p.user.fam = String::new();
        assert_eq!(p.validate(), Err(ValidationError::EmptyField("user.fam")));

        let mut p = payload();
        p.title = String::new();
        assert_eq!(p.validate(), Err(ValidationError::EmptyField("title")));

        let mut p = payload();
        p.beauty_title = String::new();
        assert_eq!(p.validate(), Err(ValidationError::EmptyField("beautyTitle")));
    }

    #[test]
    fn rejects_long_difficulty_level() {
        let mut p = payload();
        p.level.summer = Some("1А*".to_owned());

        assert_eq!(
            p.validate(),
            Err(ValidationError::LevelTooLong {
                season: "summer",
                value: "1А*".to_owned()
            })
        );
    }

    #[test]
    fn two_character_cyrillic_level_is_fine() {
        let mut p = payload();
        p.level.winter = Some("3Б".to_owned());

        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_image_set() {
        let mut p = payload();
        p.images.clear();

        assert_eq!(p.validate(), Err(ValidationError::NoImages));
    }

    #[test]
    fn rejects_untitled_image() {
        let mut p = payload();
        p.images[1].title = String::new();

        assert_eq!(p.validate(), Err(ValidationError::EmptyField("image.title")));
    }

    #[test]
    fn rejects_negative_height() {
        let mut p = payload();
        p.coords.height = -1;

        assert_eq!(p.validate(), Err(ValidationError::NegativeHeight(-1)));
    }

    proptest! {
        #[test]
        fn coords_within_bounds_validate(
            latitude in -90.0f64..=90.0,
            longitude in -180.0f64..=180.0,
            height in 0i32..9000,
        ) {
            let coords = Coords { latitude, longitude, height };

            prop_assert_eq!(coords.validate(), Ok(()));
        }

        #[test]
        fn latitude_out_of_bounds_fails(excess in 1e-6f64..1e6) {
            for &sign in &[-1.0, 1.0] {
                let latitude = sign * (90.0 + excess);
                let coords = Coords { latitude, longitude: 0.0, height: 0 };

                prop_assert_eq!(coords.validate(), Err(ValidationError::LatitudeOutOfRange(latitude)));
            }
        }

        #[test]
        fn longitude_out_of_bounds_fails(excess in 1e-6f64..1e6) {
            for &sign in &[-1.0, 1.0] {
                let longitude = sign * (180.0 + excess);
                let coords = Coords { latitude: 0.0, longitude, height: 0 };

                prop_assert_eq!(coords.validate(), Err(ValidationError::LongitudeOutOfRange(longitude)));
            }
        }

        #[test]
        fn digit_phones_validate(digits in "[0-9]{5,15}", plus in proptest::bool::ANY) {
            let phone = if plus { format!("+{}", digits) } else { digits };

            prop_assert_eq!(validate_phone(&phone), Ok(()));
        }
    }
}
