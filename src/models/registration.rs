use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Prefix for human-readable registration codes (e.g. BK2025-0007).
pub const REGISTRATION_PREFIX: &str = "BK2025";

/// Upload ceiling for participant photos.
pub const MAX_PHOTO_BYTES: i64 = 100 * 1024 * 1024;

/// Accepted photo content types.
pub const ALLOWED_PHOTO_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/gif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    /// Display label for a stored value; unknown values fall back to the raw string.
    pub fn label_of(value: &str) -> String {
        value
            .parse::<Gender>()
            .map(|g| g.label().to_string())
            .unwrap_or_else(|_| value.to_string())
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(anyhow::anyhow!("Unknown gender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeGroup {
    FiveToTen,
    ElevenToTwenty,
    TwentyOneToForty,
    FortyOneAndAbove,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 4] = [
        AgeGroup::FiveToTen,
        AgeGroup::ElevenToTwenty,
        AgeGroup::TwentyOneToForty,
        AgeGroup::FortyOneAndAbove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::FiveToTen => "5-10",
            AgeGroup::ElevenToTwenty => "11-20",
            AgeGroup::TwentyOneToForty => "21-40",
            AgeGroup::FortyOneAndAbove => "41-above",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeGroup::FiveToTen => "5 Yrs to 10 Yrs",
            AgeGroup::ElevenToTwenty => "11 Yrs to 20 Yrs",
            AgeGroup::TwentyOneToForty => "21 Yrs to 40 Yrs",
            AgeGroup::FortyOneAndAbove => "41 Yrs and Above",
        }
    }

    pub fn label_of(value: &str) -> String {
        value
            .parse::<AgeGroup>()
            .map(|g| g.label().to_string())
            .unwrap_or_else(|_| value.to_string())
    }
}

impl std::fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgeGroup {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5-10" => Ok(AgeGroup::FiveToTen),
            "11-20" => Ok(AgeGroup::ElevenToTwenty),
            "21-40" => Ok(AgeGroup::TwentyOneToForty),
            "41-above" => Ok(AgeGroup::FortyOneAndAbove),
            _ => Err(anyhow::anyhow!("Unknown age group: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Singing,
    Dancing,
    MusicalInstrument,
    Others,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Singing,
        EventCategory::Dancing,
        EventCategory::MusicalInstrument,
        EventCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Singing => "singing",
            EventCategory::Dancing => "dancing",
            EventCategory::MusicalInstrument => "musical-instrument",
            EventCategory::Others => "others",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Singing => "Singing",
            EventCategory::Dancing => "Dancing",
            EventCategory::MusicalInstrument => "Musical Instrument",
            EventCategory::Others => "Others",
        }
    }

    pub fn label_of(value: &str) -> String {
        value
            .parse::<EventCategory>()
            .map(|e| e.label().to_string())
            .unwrap_or_else(|_| value.to_string())
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singing" => Ok(EventCategory::Singing),
            "dancing" => Ok(EventCategory::Dancing),
            "musical-instrument" => Ok(EventCategory::MusicalInstrument),
            "others" => Ok(EventCategory::Others),
            _ => Err(anyhow::anyhow!("Unknown event category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsChoice {
    Yes,
    No,
}

impl TermsChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermsChoice::Yes => "yes",
            TermsChoice::No => "no",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TermsChoice::Yes => "Yes, I Agree",
            TermsChoice::No => "No, I Don't Agree",
        }
    }

    pub fn label_of(value: &str) -> String {
        value
            .parse::<TermsChoice>()
            .map(|t| t.label().to_string())
            .unwrap_or_else(|_| value.to_string())
    }
}

impl std::fmt::Display for TermsChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TermsChoice {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(TermsChoice::Yes),
            "no" => Ok(TermsChoice::No),
            _ => Err(anyhow::anyhow!("Unknown terms value: {s}")),
        }
    }
}

/// A stored talent-event registration.
///
/// Choice fields hold the stored value (e.g. "singing"); display labels come
/// from the enum tables above.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub serial_number: Option<i32>,
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub age_group: String,
    pub event: String,
    pub city: String,
    pub whatsapp_number: String,
    pub photo_path: Option<String>,
    pub photo_size: i64,
    pub photo_content_type: Option<String>,
    pub terms: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Registration {
    /// Human-readable registration code derived from the serial number.
    pub fn registration_code(&self) -> String {
        format!(
            "{}-{:04}",
            REGISTRATION_PREFIX,
            self.serial_number.unwrap_or_default()
        )
    }

    /// Photo size in megabytes, rounded to 2 decimals. 0 when no photo.
    pub fn photo_size_mb(&self) -> f64 {
        if self.photo_path.is_some() {
            (self.photo_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
        } else {
            0.0
        }
    }

    pub fn gender_label(&self) -> String {
        Gender::label_of(&self.gender)
    }

    pub fn age_group_label(&self) -> String {
        AgeGroup::label_of(&self.age_group)
    }

    pub fn event_label(&self) -> String {
        EventCategory::label_of(&self.event)
    }

    pub fn terms_label(&self) -> String {
        TermsChoice::label_of(&self.terms)
    }

    /// Admin-facing JSON: the row plus the derived read-only fields.
    pub fn to_admin_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("registration_id".into(), self.registration_code().into());
            obj.insert("photo_size_mb".into(), self.photo_size_mb().into());
            obj.insert("event_display".into(), self.event_label().into());
            obj.insert("age_group_display".into(), self.age_group_label().into());
            obj.insert("gender_display".into(), self.gender_label().into());
        }
        value
    }
}

/// Reduced projection for the stats endpoint's recent-registrations list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub full_name: String,
    pub event: String,
    pub age_group: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationListQuery {
    pub event: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub is_active: Option<bool>,
    /// Matches serial number, full name, WhatsApp number, city or id.
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkActionRequest {
    /// "activate" | "deactivate"
    pub action: String,
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    /// Empty or absent selects every registration.
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(serial: i32) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            serial_number: Some(serial),
            full_name: "Asha Rao".into(),
            gender: "female".into(),
            date_of_birth: "01-01-2000".into(),
            age_group: "21-40".into(),
            event: "singing".into(),
            city: "Pune".into(),
            whatsapp_number: "9876543210".into(),
            photo_path: Some("participant_photos/abc.jpg".into()),
            photo_size: 2 * 1024 * 1024,
            photo_content_type: Some("image/jpeg".into()),
            terms: "yes".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_registration_code_zero_pads_to_four_digits() {
        assert_eq!(sample(7).registration_code(), "BK2025-0007");
        assert_eq!(sample(1).registration_code(), "BK2025-0001");
        // Large serials are not truncated
        assert_eq!(sample(12345).registration_code(), "BK2025-12345");
    }

    #[test]
    fn test_photo_size_mb_rounds_to_two_decimals() {
        let mut reg = sample(1);
        reg.photo_size = 1_572_864; // 1.5 MB
        assert_eq!(reg.photo_size_mb(), 1.5);
        reg.photo_size = 1_234_567;
        assert_eq!(reg.photo_size_mb(), 1.18);
    }

    #[test]
    fn test_photo_size_mb_is_zero_without_photo() {
        let mut reg = sample(1);
        reg.photo_path = None;
        reg.photo_size = 999;
        assert_eq!(reg.photo_size_mb(), 0.0);
    }

    #[test]
    fn test_choice_labels() {
        assert_eq!(Gender::label_of("female"), "Female");
        assert_eq!(AgeGroup::label_of("41-above"), "41 Yrs and Above");
        assert_eq!(EventCategory::label_of("musical-instrument"), "Musical Instrument");
        assert_eq!(TermsChoice::label_of("yes"), "Yes, I Agree");
    }

    #[test]
    fn test_unknown_choice_falls_back_to_raw_value() {
        assert_eq!(EventCategory::label_of("juggling"), "juggling");
    }

    #[test]
    fn test_choice_roundtrip() {
        for e in EventCategory::ALL {
            assert_eq!(e.as_str().parse::<EventCategory>().unwrap(), e);
        }
        for a in AgeGroup::ALL {
            assert_eq!(a.as_str().parse::<AgeGroup>().unwrap(), a);
        }
    }

    #[test]
    fn test_admin_json_includes_derived_fields() {
        let value = sample(7).to_admin_json();
        assert_eq!(value["registration_id"], "BK2025-0007");
        assert_eq!(value["event_display"], "Singing");
        assert_eq!(value["photo_size_mb"], 2.0);
    }
}
