use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{error::ApiError, models::registration::Registration};

pub const EXPORT_HEADERS: [&str; 13] = [
    "Serial No.",
    "Registration ID",
    "Full Name",
    "Gender",
    "Date of Birth",
    "Age Group",
    "Event",
    "City",
    "WhatsApp Number",
    "Terms Agreed",
    "Registration Date",
    "Photo Size (MB)",
    "Active Status",
];

const XLSX_HEADER_FILL: u32 = 0x366092;
const MAX_COLUMN_WIDTH: f64 = 50.0;

pub struct ExportService;

impl ExportService {
    /// CSV export: header row plus one row per registration, serial order.
    pub fn to_csv(registrations: Vec<Registration>) -> Result<Vec<u8>, ApiError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(EXPORT_HEADERS)
            .map_err(|e| ApiError::Export(e.to_string()))?;

        for registration in sorted_by_serial(registrations) {
            writer
                .write_record(row_values(&registration))
                .map_err(|e| ApiError::Export(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| ApiError::Export(e.to_string()))
    }

    /// Spreadsheet export: same columns as CSV with a styled header row and
    /// auto-sized columns.
    pub fn to_xlsx(registrations: Vec<Registration>) -> Result<Vec<u8>, ApiError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name("Talent Event Registrations")
            .map_err(|e| ApiError::Export(e.to_string()))?;

        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(XLSX_HEADER_FILL))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let cell_format = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        let mut widths: Vec<usize> = EXPORT_HEADERS.iter().map(|h| h.len()).collect();

        for (col, header) in EXPORT_HEADERS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *header, &header_format)
                .map_err(|e| ApiError::Export(e.to_string()))?;
        }

        for (row, registration) in sorted_by_serial(registrations).iter().enumerate() {
            let row = (row + 1) as u32;
            for (col, value) in row_values(registration).iter().enumerate() {
                // Serial and photo size stay numeric cells
                match col {
                    0 | 11 => {
                        let number: f64 = value.parse().unwrap_or(0.0);
                        worksheet
                            .write_number_with_format(row, col as u16, number, &cell_format)
                            .map_err(|e| ApiError::Export(e.to_string()))?;
                    }
                    _ => {
                        worksheet
                            .write_string_with_format(row, col as u16, value, &cell_format)
                            .map_err(|e| ApiError::Export(e.to_string()))?;
                    }
                }
                widths[col] = widths[col].max(value.len());
            }
        }

        for (col, max_len) in widths.iter().enumerate() {
            worksheet
                .set_column_width(col as u16, capped_width(*max_len))
                .map_err(|e| ApiError::Export(e.to_string()))?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| ApiError::Export(e.to_string()))
    }

    /// ZIP of participant photos renamed `{serial:03}_{name}_{event}.{ext}`
    /// plus a README summary. Returns None when no selected registration has a
    /// photo on disk. The scratch file is removed on every exit path.
    pub fn photos_archive(
        registrations: Vec<Registration>,
        media_dir: &str,
        exported_by: &str,
    ) -> Result<Option<Vec<u8>>, ApiError> {
        let eligible: Vec<(Registration, PathBuf)> = sorted_by_serial(registrations)
            .into_iter()
            .filter_map(|reg| {
                let rel = reg.photo_path.clone()?;
                let path = Path::new(media_dir).join(rel);
                path.exists().then_some((reg, path))
            })
            .collect();

        if eligible.is_empty() {
            return Ok(None);
        }

        let temp = tempfile::NamedTempFile::new()?;
        let mut zip = ZipWriter::new(temp.as_file());
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut included: Vec<&Registration> = Vec::new();
        for (reg, path) in &eligible {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("skipping photo {}: {e}", path.display());
                    continue;
                }
            };

            zip.start_file(archive_entry_name(reg), options)
                .map_err(|e| ApiError::Export(e.to_string()))?;
            zip.write_all(&bytes)?;
            included.push(reg);
        }

        zip.start_file("README.txt", options)
            .map_err(|e| ApiError::Export(e.to_string()))?;
        zip.write_all(archive_summary(&included, exported_by).as_bytes())?;
        zip.finish().map_err(|e| ApiError::Export(e.to_string()))?;

        let bytes = std::fs::read(temp.path())?;
        Ok(Some(bytes))
    }
}

fn sorted_by_serial(mut registrations: Vec<Registration>) -> Vec<Registration> {
    registrations.sort_by_key(|r| r.serial_number.unwrap_or(i32::MAX));
    registrations
}

fn row_values(reg: &Registration) -> [String; 13] {
    [
        reg.serial_number.map(|n| n.to_string()).unwrap_or_default(),
        reg.registration_code(),
        reg.full_name.clone(),
        reg.gender_label(),
        reg.date_of_birth.clone(),
        reg.age_group_label(),
        reg.event_label(),
        reg.city.clone(),
        reg.whatsapp_number.clone(),
        reg.terms_label(),
        reg.created_at.format("%Y-%m-%d %H:%M").to_string(),
        reg.photo_size_mb().to_string(),
        if reg.is_active { "Active" } else { "Inactive" }.to_string(),
    ]
}

fn capped_width(max_len: usize) -> f64 {
    ((max_len + 2) as f64).min(MAX_COLUMN_WIDTH)
}

/// `{serial:03}_{FullName}_{EventCategory}.{ext}` with both name parts
/// sanitized and the extension taken from the stored photo.
fn archive_entry_name(reg: &Registration) -> String {
    let ext = reg
        .photo_path
        .as_deref()
        .and_then(|p| Path::new(p).extension())
        .and_then(|e| e.to_str());

    let stem = format!(
        "{:03}_{}_{}",
        reg.serial_number.unwrap_or_default(),
        sanitize_component(&reg.full_name),
        sanitize_component(&reg.event_label()),
    );

    match ext {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Keep alphanumerics, spaces, hyphens and underscores; trim, then replace
/// spaces with underscores.
fn sanitize_component(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim().replace(' ', "_")
}

fn archive_summary(included: &[&Registration], exported_by: &str) -> String {
    let mut summary = format!(
        "Talent Event Registration Photos Summary\n\
         =====================================\n\n\
         Total Photos: {}\n\
         Export Date: {}\n\
         Export by: {}\n\n\
         File Naming Convention:\n\
         SerialNumber_FullName_EventCategory.extension\n\n\
         Registrations Included:\n",
        included.len(),
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        exported_by,
    );

    for reg in included {
        summary.push_str(&format!(
            "- {:03}: {} ({})\n",
            reg.serial_number.unwrap_or_default(),
            reg.full_name,
            reg.event_label(),
        ));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn sample(serial: i32, name: &str, event: &str) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            serial_number: Some(serial),
            full_name: name.into(),
            gender: "female".into(),
            date_of_birth: "01-01-2000".into(),
            age_group: "21-40".into(),
            event: event.into(),
            city: "Pune".into(),
            whatsapp_number: "9876543210".into(),
            photo_path: None,
            photo_size: 0,
            photo_content_type: None,
            terms: "yes".into(),
            created_at: Utc.with_ymd_and_hms(2025, 8, 6, 10, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 8, 6, 10, 30, 0).unwrap(),
            is_active: true,
            ip_address: None,
            user_agent: None,
        }
    }

    #[test]
    fn test_csv_rows_are_serial_ordered_regardless_of_input_order() {
        let regs = vec![
            sample(3, "Carol", "others"),
            sample(1, "Asha Rao", "singing"),
            sample(2, "Bob", "dancing"),
        ];
        let bytes = ExportService::to_csv(regs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Serial No.,Registration ID,Full Name"));
        assert!(lines[1].starts_with("1,BK2025-0001,Asha Rao,Female,01-01-2000"));
        assert!(lines[2].starts_with("2,BK2025-0002,Bob"));
        assert!(lines[3].starts_with("3,BK2025-0003,Carol"));
    }

    #[test]
    fn test_csv_row_uses_display_labels_and_formatted_timestamp() {
        let bytes = ExportService::to_csv(vec![sample(1, "Asha Rao", "musical-instrument")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let row = text.lines().nth(1).unwrap();

        assert!(row.contains("Musical Instrument"));
        assert!(row.contains("21 Yrs to 40 Yrs"));
        assert!(row.contains("\"Yes, I Agree\""));
        assert!(row.contains("2025-08-06 10:30"));
        assert!(row.ends_with("Active"));
    }

    #[test]
    fn test_xlsx_produces_a_zip_container() {
        let bytes = ExportService::to_xlsx(vec![sample(1, "Asha Rao", "singing")]).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn test_column_width_is_capped() {
        assert_eq!(capped_width(8), 10.0);
        assert_eq!(capped_width(200), 50.0);
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("Asha Rao!"), "Asha_Rao");
        assert_eq!(sanitize_component("O'Neil #9"), "ONeil_9");
        assert_eq!(sanitize_component("a-b_c"), "a-b_c");
    }

    #[test]
    fn test_archive_entry_name() {
        let mut reg = sample(1, "Asha Rao", "singing");
        reg.photo_path = Some("participant_photos/x.jpg".into());
        assert_eq!(archive_entry_name(&reg), "001_Asha_Rao_Singing.jpg");
    }

    #[test]
    fn test_photos_archive_empty_selection_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = ExportService::photos_archive(
            vec![sample(1, "Asha Rao", "singing")],
            dir.path().to_str().unwrap(),
            "admin",
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_photos_archive_contents_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("participant_photos")).unwrap();

        let mut first = sample(2, "Bob", "dancing");
        first.photo_path = Some("participant_photos/b.png".into());
        std::fs::write(dir.path().join("participant_photos/b.png"), b"png-bytes").unwrap();

        let mut second = sample(1, "Asha Rao", "singing");
        second.photo_path = Some("participant_photos/a.jpg".into());
        std::fs::write(dir.path().join("participant_photos/a.jpg"), b"jpg-bytes").unwrap();

        // One registration without a stored photo is filtered out
        let third = sample(3, "Carol", "others");

        let bytes = ExportService::photos_archive(
            vec![first, second, third],
            dir.path().to_str().unwrap(),
            "admin",
        )
        .unwrap()
        .expect("archive should be produced");

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "001_Asha_Rao_Singing.jpg",
                "002_Bob_Dancing.png",
                "README.txt"
            ]
        );

        let mut readme = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("README.txt").unwrap(),
            &mut readme,
        )
        .unwrap();
        assert!(readme.contains("Total Photos: 2"));
        assert!(readme.contains("Export by: admin"));
        assert!(readme.contains("- 001: Asha Rao (Singing)"));
        assert!(readme.contains("- 002: Bob (Dancing)"));
    }
}
