//! `workroom doctor` - Diagnose configuration and connectivity.

use std::path::Path;
use workroom_config::AppConfig;

pub async fn run(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Workroom Doctor - System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;
    let path = super::config_path(explicit);

    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} - using defaults", path.display());
    }

    let config = match super::load_config(explicit) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Ok(());
        }
    };

    issues += check_secrets(&config);

    match workroom_store::open(&config.database).await {
        Ok(stores) => match stores.conversations.count_conversations().await {
            Ok(n) => println!(
                "  ✅ Database reachable ({}, {n} conversation(s))",
                config.database.backend
            ),
            Err(e) => {
                println!("  ❌ Database query failed: {e} - run `workroom migrate`");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Database unreachable: {e}");
            issues += 1;
        }
    }

    for name in workroom_config::BUILTIN_ASSISTANTS {
        let settings = config.assistant(name);
        let state = if settings.enabled { "enabled" } else { "disabled" };
        println!(
            "  • {name}: {state}, model {}",
            settings
                .model
                .as_deref()
                .unwrap_or(&config.provider.chat_model)
        );
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}

fn check_secrets(config: &AppConfig) -> usize {
    let mut issues = 0;
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key - set provider.api_key or OPENAI_API_KEY");
        issues += 1;
    }
    if config.auth.jwt_secret.is_some() {
        println!("  ✅ JWT secret configured");
    } else {
        println!("  ⚠️  No JWT secret - set auth.jwt_secret or WORKROOM_JWT_SECRET");
        issues += 1;
    }
    issues
}
