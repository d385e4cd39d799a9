use posdash_core::config::ClientConfig;

use crate::commands::common::{api_client, format_status_lines};
use crate::error::CliError;

pub async fn run_status(config: &ClientConfig, as_json: bool) -> Result<(), CliError> {
    let status = api_client(config)?.status().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }

    Ok(())
}
