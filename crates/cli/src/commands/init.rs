//! `workroom init` - Write a default configuration file.

use std::path::Path;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_path(explicit);

    if path.exists() {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&path, workroom_config::AppConfig::default_toml())?;

    println!("✅ Created config at: {}", path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set provider.api_key (or OPENAI_API_KEY)");
    println!("   2. Set auth.jwt_secret (or WORKROOM_JWT_SECRET)");
    println!("   3. Run: workroom migrate && workroom serve");
    Ok(())
}
