use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Registration,
    PhotoUploaded,
    EmailSent,
    VideoSubmission,
    StatusUpdate,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Registration => "registration",
            ActivityKind::PhotoUploaded => "photo_uploaded",
            ActivityKind::EmailSent => "email_sent",
            ActivityKind::VideoSubmission => "video_submission",
            ActivityKind::StatusUpdate => "status_update",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Registration => "Registration Submitted",
            ActivityKind::PhotoUploaded => "Photo Uploaded",
            ActivityKind::EmailSent => "Email Notification Sent",
            ActivityKind::VideoSubmission => "Video Submitted via WhatsApp",
            ActivityKind::StatusUpdate => "Status Updated",
        }
    }

    pub fn label_of(value: &str) -> String {
        value
            .parse::<ActivityKind>()
            .map(|k| k.label().to_string())
            .unwrap_or_else(|_| value.to_string())
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registration" => Ok(ActivityKind::Registration),
            "photo_uploaded" => Ok(ActivityKind::PhotoUploaded),
            "email_sent" => Ok(ActivityKind::EmailSent),
            "video_submission" => Ok(ActivityKind::VideoSubmission),
            "status_update" => Ok(ActivityKind::StatusUpdate),
            _ => Err(anyhow::anyhow!("Unknown activity type: {s}")),
        }
    }
}

/// One append-only audit-trail entry tied to a registration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationActivity {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub activity_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}
