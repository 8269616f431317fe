use std::time::Duration;

use catalog_state::{StateStore, blocking_query};
use serde_json::{Value, json};

pub async fn coordinates(
    store: &StateStore,
    node: Option<&str>,
    segment: Option<&str>,
    wait_index: u64,
    timeout: Duration,
) -> anyhow::Result<()> {
    let output = coordinates_json(store, node, segment, wait_index, timeout).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn nodes(store: &StateStore) -> anyhow::Result<()> {
    let (index, nodes) = store.nodes(None)?;
    let output = json!({ "index": index, "nodes": nodes });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn coordinates_json(
    store: &StateStore,
    node: Option<&str>,
    segment: Option<&str>,
    wait_index: u64,
    timeout: Duration,
) -> anyhow::Result<Value> {
    Ok(match node {
        Some(node) => {
            let (index, set) = blocking_query(wait_index, timeout, |ws| {
                store.coordinate(Some(ws), node, segment)
            })
            .await?;
            json!({ "index": index, "node": node, "coordinates": set })
        }
        None => {
            let (index, rows) =
                blocking_query(wait_index, timeout, |ws| store.coordinates(Some(ws), segment))
                    .await?;
            json!({ "index": index, "coordinates": rows })
        }
    })
}
