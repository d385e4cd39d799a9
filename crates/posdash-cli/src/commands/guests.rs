use std::sync::Arc;

use posdash_core::api::RecordGateway;
use posdash_core::collection::CollectionController;
use posdash_core::config::ClientConfig;
use posdash_core::editor::{save_guest, GuestDraft};
use posdash_core::Guest;

use crate::cli::{ContactArgs, GuestCommand};
use crate::commands::common::{
    api_client, format_guest_lines, format_timestamp, normalize_record_id, or_placeholder,
    push_channel,
};
use crate::error::CliError;

pub async fn run(command: GuestCommand, config: &ClientConfig) -> Result<(), CliError> {
    let api = Arc::new(api_client(config)?);

    match command {
        GuestCommand::List { json } => {
            let guests: Vec<Guest> = api.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&guests)?);
            } else {
                for line in format_guest_lines(&guests) {
                    println!("{line}");
                }
            }
        }
        GuestCommand::Show { id } => {
            let guest: Guest = api.get(&normalize_record_id(&id)?).await?;
            println!("Name:    {}", guest.name);
            println!("Email:   {}", guest.email);
            println!("Phone:   {}", or_placeholder(guest.phone.as_deref()));
            println!("Address: {}", or_placeholder(guest.address.as_deref()));
            println!("Created: {}", format_timestamp(guest.created_at));
        }
        GuestCommand::Add {
            name,
            email,
            contact,
        } => {
            let draft = merge_draft(GuestDraft::default(), Some(name), Some(email), contact);
            let controller = CollectionController::new(api, push_channel(config)?);
            let guest = save_guest(&controller, None, draft).await?;
            println!("{}", guest.id.map(|id| id.to_string()).unwrap_or_default());
        }
        GuestCommand::Edit {
            id,
            name,
            email,
            contact,
        } => {
            let id = normalize_record_id(&id)?;
            let current: Guest = RecordGateway::<Guest>::get_one(api.as_ref(), &id).await?;
            let draft = merge_draft(GuestDraft::from_guest(&current), name, email, contact);
            let controller = CollectionController::new(api, push_channel(config)?);
            let guest = save_guest(&controller, Some(&id), draft).await?;
            println!("{}", guest.id.unwrap_or(id));
        }
        GuestCommand::Delete { id } => {
            let id = normalize_record_id(&id)?;
            let controller = CollectionController::<Guest, _>::new(api, push_channel(config)?);
            if !controller.delete(&id).await {
                return Err(CliError::DeleteFailed(format!("guest {id}")));
            }
            println!("{id}");
        }
    }

    Ok(())
}

/// Overlay command line values onto a draft.
pub fn merge_draft(
    mut draft: GuestDraft,
    name: Option<String>,
    email: Option<String>,
    contact: ContactArgs,
) -> GuestDraft {
    if let Some(name) = name {
        draft.name = name;
    }
    if let Some(email) = email {
        draft.email = email;
    }
    if let Some(phone) = contact.phone {
        draft.phone = phone;
    }
    if let Some(address) = contact.address {
        draft.address = address;
    }
    draft
}
