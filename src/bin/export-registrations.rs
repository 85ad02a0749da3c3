/// Offline export of registration data, for operators without admin-API access.
///
/// Usage: export-registrations --format csv|xlsx|photos --out PATH
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use talent_event_api::models::registration::Registration;
use talent_event_api::services::export::ExportService;

#[derive(Parser)]
#[command(name = "export-registrations", about = "Export talent-event registrations to a file")]
struct Args {
    /// Export format: csv, xlsx or photos
    #[arg(long)]
    format: String,

    /// Output file path
    #[arg(long)]
    out: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL environment variable not set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let registrations: Vec<Registration> =
        sqlx::query_as("SELECT * FROM registrations ORDER BY serial_number")
            .fetch_all(&pool)
            .await?;

    tracing::info!("Exporting {} registrations as {}", registrations.len(), args.format);

    let bytes = match args.format.as_str() {
        "csv" => ExportService::to_csv(registrations)?,
        "xlsx" => ExportService::to_xlsx(registrations)?,
        "photos" => {
            let media_dir =
                std::env::var("MEDIA_DIR").unwrap_or_else(|_| "/data/media".into());
            match ExportService::photos_archive(registrations, &media_dir, "cli")? {
                Some(bytes) => bytes,
                None => {
                    tracing::warn!("No photos found for the selected registrations");
                    return Ok(());
                }
            }
        }
        other => return Err(format!("Unknown export format: {other}").into()),
    };

    tokio::fs::write(&args.out, &bytes).await?;
    tracing::info!("Wrote {} bytes to {}", bytes.len(), args.out.display());

    Ok(())
}
