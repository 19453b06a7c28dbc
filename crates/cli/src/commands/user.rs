//! `workroom user add` - Register a user with a tenant and role.

use std::path::Path;
use workroom_core::identity::UserProfile;

pub async fn add(
    explicit: Option<&Path>,
    id: &str,
    tenant: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(explicit)?;
    let stores = workroom_store::open(&config.database).await?;

    stores
        .users
        .upsert_user(UserProfile::new(id, tenant, role))
        .await?;

    println!("✅ User {id} ({role}) added to tenant {tenant}");
    Ok(())
}
