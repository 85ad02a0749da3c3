use std::path::Path;

use axum::extract::Multipart;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        activity::ActivityKind,
        registration::{
            AgeGroup, EventCategory, Gender, Registration, TermsChoice, ALLOWED_PHOTO_TYPES,
            MAX_PHOTO_BYTES,
        },
    },
    services::activity,
};

const PHOTO_NAMESPACE: &str = "participant_photos";

/// Raw photo part from the submission form.
pub struct SubmittedPhoto {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Parsed form fields, as submitted (camelCase part names from the frontend).
pub struct RegistrationForm {
    pub full_name: String,
    pub gender: String,
    pub date_of_birth: String,
    pub age_group: String,
    pub event: String,
    pub city: String,
    pub whatsapp_number: String,
    pub terms: String,
    pub photo: Option<SubmittedPhoto>,
}

/// Origin metadata captured from the submitting request.
#[derive(Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RegistrationForm {
    pub async fn from_multipart(mut multipart: Multipart) -> anyhow::Result<Self> {
        let mut form = RegistrationForm {
            full_name: String::new(),
            gender: String::new(),
            date_of_birth: String::new(),
            age_group: String::new(),
            event: String::new(),
            city: String::new(),
            whatsapp_number: String::new(),
            terms: String::new(),
            photo: None,
        };

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "photo" => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?.to_vec();
                    form.photo = Some(SubmittedPhoto { bytes, filename, content_type });
                }
                "fullName" => form.full_name = field.text().await?,
                "gender" => form.gender = field.text().await?,
                "dateOfBirth" => form.date_of_birth = field.text().await?,
                "ageGroup" => form.age_group = field.text().await?,
                "event" => form.event = field.text().await?,
                "city" => form.city = field.text().await?,
                "whatsappNumber" => form.whatsapp_number = field.text().await?,
                "terms" => form.terms = field.text().await?,
                _ => {}
            }
        }

        Ok(form)
    }
}

pub struct RegistrationService;

impl RegistrationService {
    /// Validate and persist a submission: photo to disk, row with the next
    /// serial number, then one "registration" activity entry.
    pub async fn submit(
        pool: &PgPool,
        media_dir: &str,
        form: RegistrationForm,
        meta: RequestMeta,
    ) -> Result<Registration, ApiError> {
        validate(&form)?;

        let (photo_path, photo_size, photo_content_type) = match &form.photo {
            Some(photo) => {
                let path = store_photo(media_dir, photo).await?;
                (Some(path), photo.bytes.len() as i64, Some(photo.content_type.clone()))
            }
            None => (None, 0, None),
        };

        // Read-max-then-increment; the unique index on serial_number turns a
        // concurrent duplicate into an insert error.
        let last: Option<i32> = sqlx::query_scalar("SELECT MAX(serial_number) FROM registrations")
            .fetch_one(pool)
            .await?;
        let serial = next_serial(last);

        let registration = sqlx::query_as::<_, Registration>(
            "INSERT INTO registrations
                (id, serial_number, full_name, gender, date_of_birth, age_group, event,
                 city, whatsapp_number, photo_path, photo_size, photo_content_type, terms,
                 ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(serial)
        .bind(&form.full_name)
        .bind(&form.gender)
        .bind(&form.date_of_birth)
        .bind(&form.age_group)
        .bind(&form.event)
        .bind(&form.city)
        .bind(&form.whatsapp_number)
        .bind(&photo_path)
        .bind(photo_size)
        .bind(&photo_content_type)
        .bind(&form.terms)
        .bind(&meta.ip_address)
        .bind(&meta.user_agent)
        .fetch_one(pool)
        .await?;

        activity::record(
            pool,
            registration.id,
            ActivityKind::Registration,
            &format!("Registration created for {}", form.full_name),
            json!({}),
        )
        .await?;

        tracing::info!("Registration created successfully: ID {}", registration.id);

        Ok(registration)
    }
}

/// Next serial number given the current maximum: strictly increasing from 1.
pub fn next_serial(last: Option<i32>) -> i32 {
    last.map_or(1, |n| n + 1)
}

fn validate(form: &RegistrationForm) -> Result<(), ApiError> {
    // Hard precondition: nothing is persisted unless the terms are agreed.
    if form.terms.parse::<TermsChoice>().ok() != Some(TermsChoice::Yes) {
        return Err(ApiError::TermsNotAccepted);
    }

    if form.full_name.trim().is_empty() {
        return Err(ApiError::validation("full_name", "must not be empty"));
    }
    if form.full_name.chars().count() > 200 {
        return Err(ApiError::validation("full_name", "must be at most 200 characters"));
    }

    form.gender
        .parse::<Gender>()
        .map_err(|e| ApiError::validation("gender", e.to_string()))?;
    form.age_group
        .parse::<AgeGroup>()
        .map_err(|e| ApiError::validation("age_group", e.to_string()))?;
    form.event
        .parse::<EventCategory>()
        .map_err(|e| ApiError::validation("event", e.to_string()))?;

    if !is_valid_dob(&form.date_of_birth) {
        return Err(ApiError::validation(
            "date_of_birth",
            "must be in DD-MM-YYYY format",
        ));
    }

    let digits = form.whatsapp_number.chars().filter(char::is_ascii_digit).count();
    if !(10..=15).contains(&digits) {
        return Err(ApiError::validation(
            "whatsapp_number",
            "must contain 10 to 15 digits",
        ));
    }

    if let Some(photo) = &form.photo {
        validate_photo(photo)?;
    }

    Ok(())
}

fn validate_photo(photo: &SubmittedPhoto) -> Result<(), ApiError> {
    if photo.bytes.len() as i64 > MAX_PHOTO_BYTES {
        return Err(ApiError::validation("photo", "size should not exceed 100MB"));
    }
    if !ALLOWED_PHOTO_TYPES.contains(&photo.content_type.as_str()) {
        return Err(ApiError::validation(
            "photo",
            "only JPEG, PNG, and GIF images are allowed",
        ));
    }
    image::load_from_memory(&photo.bytes)
        .map_err(|_| ApiError::validation("photo", "file is not a valid image"))?;
    Ok(())
}

/// DD-MM-YYYY: ten chars, dashes at positions 2 and 5, digits elsewhere.
fn is_valid_dob(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Write the photo under `participant_photos/` with a random name; returns the
/// stored path relative to the media dir.
async fn store_photo(media_dir: &str, photo: &SubmittedPhoto) -> Result<String, ApiError> {
    let ext = Path::new(&photo.filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");

    let dir = Path::new(media_dir).join(PHOTO_NAMESPACE);
    tokio::fs::create_dir_all(&dir).await?;

    let storage_filename = format!("{}.{}", Uuid::new_v4(), ext);
    tokio::fs::write(dir.join(&storage_filename), &photo.bytes).await?;

    Ok(format!("{PHOTO_NAMESPACE}/{storage_filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            full_name: "Asha Rao".into(),
            gender: "female".into(),
            date_of_birth: "01-01-2000".into(),
            age_group: "21-40".into(),
            event: "singing".into(),
            city: "Pune".into(),
            whatsapp_number: "9876543210".into(),
            terms: "yes".into(),
            photo: None,
        }
    }

    fn png_photo() -> SubmittedPhoto {
        let img = image::RgbImage::new(2, 2);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        SubmittedPhoto {
            bytes,
            filename: "test.png".into(),
            content_type: "image/png".into(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate(&valid_form()).is_ok());
    }

    #[test]
    fn test_terms_must_be_agreed() {
        let mut form = valid_form();
        form.terms = "no".into();
        assert!(matches!(validate(&form), Err(ApiError::TermsNotAccepted)));

        form.terms = String::new();
        assert!(matches!(validate(&form), Err(ApiError::TermsNotAccepted)));
    }

    #[test]
    fn test_dob_format() {
        assert!(is_valid_dob("15-08-1995"));
        assert!(!is_valid_dob("1995-08-15"));
        assert!(!is_valid_dob("5-8-1995"));
        assert!(!is_valid_dob("15/08/1995"));
        assert!(!is_valid_dob("aa-bb-cccc"));

        let mut form = valid_form();
        form.date_of_birth = "2000-01-01".into();
        match validate(&form) {
            Err(ApiError::Validation { field, .. }) => assert_eq!(field, "date_of_birth"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_whatsapp_number_digit_count() {
        // Non-digits are stripped before counting
        let mut form = valid_form();
        form.whatsapp_number = "+91 98765-43210".into();
        assert!(validate(&form).is_ok());

        form.whatsapp_number = "12345".into();
        assert!(matches!(
            validate(&form),
            Err(ApiError::Validation { field: "whatsapp_number", .. })
        ));

        form.whatsapp_number = "1234567890123456".into();
        assert!(validate(&form).is_err());
    }

    #[test]
    fn test_unknown_choice_values_are_rejected() {
        let mut form = valid_form();
        form.event = "juggling".into();
        assert!(matches!(
            validate(&form),
            Err(ApiError::Validation { field: "event", .. })
        ));
    }

    #[test]
    fn test_photo_content_type_allowlist() {
        let mut form = valid_form();
        let mut photo = png_photo();
        photo.content_type = "application/pdf".into();
        form.photo = Some(photo);
        assert!(matches!(
            validate(&form),
            Err(ApiError::Validation { field: "photo", .. })
        ));
    }

    #[test]
    fn test_photo_must_decode_as_image() {
        let mut form = valid_form();
        form.photo = Some(SubmittedPhoto {
            bytes: b"file_content".to_vec(),
            filename: "test.jpg".into(),
            content_type: "image/jpeg".into(),
        });
        assert!(matches!(
            validate(&form),
            Err(ApiError::Validation { field: "photo", .. })
        ));
    }

    #[test]
    fn test_valid_photo_passes() {
        let mut form = valid_form();
        form.photo = Some(png_photo());
        assert!(validate(&form).is_ok());
    }

    #[test]
    fn test_next_serial_starts_at_one() {
        assert_eq!(next_serial(None), 1);
        assert_eq!(next_serial(Some(1)), 2);
        assert_eq!(next_serial(Some(41)), 42);
    }

    #[tokio::test]
    async fn test_store_photo_writes_under_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let photo = png_photo();
        let path = store_photo(dir.path().to_str().unwrap(), &photo).await.unwrap();
        assert!(path.starts_with("participant_photos/"));
        assert!(path.ends_with(".png"));
        let stored = tokio::fs::read(dir.path().join(&path)).await.unwrap();
        assert_eq!(stored, photo.bytes);
    }
}
