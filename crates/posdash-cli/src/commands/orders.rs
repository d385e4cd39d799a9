use std::sync::Arc;

use posdash_core::api::RecordGateway;
use posdash_core::collection::CollectionController;
use posdash_core::config::ClientConfig;
use posdash_core::editor::{save_order, OrderDraft};
use posdash_core::Order;

use crate::cli::OrderCommand;
use crate::commands::common::{
    api_client, format_order_detail, format_order_lines, normalize_record_id, push_channel,
    push_item_arg,
};
use crate::error::CliError;

pub async fn run(command: OrderCommand, config: &ClientConfig) -> Result<(), CliError> {
    let api = Arc::new(api_client(config)?);

    match command {
        OrderCommand::List { json } => {
            let orders: Vec<Order> = api.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&orders)?);
            } else {
                for line in format_order_lines(&orders) {
                    println!("{line}");
                }
            }
        }
        OrderCommand::Show { id } => {
            let order: Order = api.get(&normalize_record_id(&id)?).await?;
            for line in format_order_detail(&order) {
                println!("{line}");
            }
        }
        OrderCommand::Add {
            guest,
            code,
            items,
            status,
        } => {
            let mut draft = OrderDraft::new_with_code(Some(normalize_record_id(&guest)?));
            if let Some(code) = code {
                draft.order_code = code;
            }
            if let Some(status) = status {
                draft.status = status.into();
            }
            for arg in &items {
                push_item_arg(&mut draft, arg)?;
            }
            let controller = CollectionController::new(api, push_channel(config)?);
            let order = save_order(&controller, draft).await?;
            println!("{}", order.order_code);
        }
        OrderCommand::Edit {
            id,
            guest,
            code,
            items,
            status,
        } => {
            let id = normalize_record_id(&id)?;
            let current: Order = RecordGateway::<Order>::get_one(api.as_ref(), &id).await?;
            let mut draft = OrderDraft::from_order(&current);
            if let Some(guest) = guest {
                draft.guest = Some(normalize_record_id(&guest)?);
            }
            if let Some(code) = code {
                draft.order_code = code;
            }
            if let Some(status) = status {
                draft.status = status.into();
            }
            if !items.is_empty() {
                draft.items.clear();
                for arg in &items {
                    push_item_arg(&mut draft, arg)?;
                }
            }
            let controller = CollectionController::new(api, push_channel(config)?);
            let order = save_order(&controller, draft).await?;
            println!("{}", order.order_code);
        }
        OrderCommand::Delete { id } => {
            let id = normalize_record_id(&id)?;
            let controller = CollectionController::<Order, _>::new(api, push_channel(config)?);
            if !controller.delete(&id).await {
                return Err(CliError::DeleteFailed(format!("order {id}")));
            }
            println!("{id}");
        }
    }

    Ok(())
}
