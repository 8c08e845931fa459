use goodstore_core::{CategoryFilter, StoreId};
use goodstore_map::HttpStoreSource;

use crate::StoresCommands;

/// Runs one `stores` subcommand and returns the JSON to print.
pub(crate) async fn run(
    source: &HttpStoreSource,
    command: StoresCommands,
) -> anyhow::Result<String> {
    match command {
        StoresCommands::List { category } => {
            let filter = category.unwrap_or(CategoryFilter::All);
            let stores = source.fetch_stores(&filter).await?;
            tracing::info!(filter = %filter, count = stores.len(), "fetched stores");
            Ok(serde_json::to_string_pretty(&stores)?)
        }
        StoresCommands::Get { id } => {
            let id = StoreId(id);
            match source.get_store(id).await? {
                Some(store) => Ok(serde_json::to_string_pretty(&store)?),
                None => anyhow::bail!("store {id} not found"),
            }
        }
        StoresCommands::Search { query } => {
            let stores = source.search_stores(&query).await?;
            tracing::info!(query = %query, count = stores.len(), "searched stores");
            Ok(serde_json::to_string_pretty(&stores)?)
        }
    }
}
