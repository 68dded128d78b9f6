use std::sync::Arc;

use anyhow::{Context, Result};

use eventflow_core::api::ApiClient;
use eventflow_core::contacts::ContactPicker;
use eventflow_core::{CoreConfig, EventBus};

/// Search the contact directory and print one line per match.
pub async fn search(config: CoreConfig, query: String) -> Result<()> {
    let user_id = config.user_id.clone();
    let api = Arc::new(ApiClient::new(&config)?);
    let picker = ContactPicker::new(api, user_id, EventBus::new());

    let contacts = picker.search_now(&query).await?;
    if contacts.is_empty() {
        println!("no contacts match \"{}\"", query.trim());
        return Ok(());
    }
    for contact in contacts {
        println!(
            "{}  {}  {:?}  {}",
            contact.user_id,
            contact.label(),
            contact.role,
            contact.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Resolve a contact (by user id or email) to a direct conversation,
/// creating one only when none exists yet.
pub async fn resolve(config: CoreConfig, contact: String) -> Result<()> {
    let user_id = config.user_id.clone();
    let api = Arc::new(ApiClient::new(&config)?);
    let picker = ContactPicker::new(api, user_id, EventBus::new());

    let directory = picker.search_now("").await?;
    let target = directory
        .into_iter()
        .find(|c| c.user_id == contact || c.email.as_deref() == Some(contact.as_str()))
        .with_context(|| format!("no contact {contact} in the directory"))?;

    let conversation = picker.select_contact(&target).await?;
    println!("{}", conversation.id);
    Ok(())
}
