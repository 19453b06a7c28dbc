//! `workroom migrate` - Apply the database schema.

use std::path::Path;
use tracing::info;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;

    info!(backend = %config.database.backend, "Applying schema");
    workroom_store::migrate(&config.database).await?;

    println!("✅ Schema is up to date ({})", config.database.backend);
    Ok(())
}
