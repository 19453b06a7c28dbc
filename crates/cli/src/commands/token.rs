//! `workroom token` - Mint a bearer token for local testing.

use std::path::Path;
use workroom_gateway::JwtAuthenticator;

pub async fn run(
    explicit: Option<&Path>,
    user: &str,
    ttl: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(explicit)?;
    if let Some(ttl) = ttl {
        config.auth.token_ttl_secs = ttl;
    }
    if config.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
        return Err("auth.jwt_secret (or WORKROOM_JWT_SECRET) must be set to mint tokens".into());
    }

    let token = JwtAuthenticator::from_config(&config.auth).issue(user)?;
    println!("{token}");
    Ok(())
}
