//! Loading of the resources an application was deployed with.
//!
//! A manifest holds any number of YAML (or JSON) documents. Documents of kind
//! `List` contribute their `items`; empty documents are skipped.

mod error;

use std::path::Path;

use serde::Deserialize;
use snafu::ResultExt;

pub use self::error::Error;
use crate::entity::Entity;

const LIST_KIND: &str = "List";

/// Reads every resource of the manifest at `path`, in document order.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a document cannot be
/// decoded.
pub async fn load(path: &Path) -> Result<Vec<Entity>, Error> {
    let content =
        tokio::fs::read(path).await.with_context(|_| error::ReadManifestSnafu { path })?;
    parse(&content, path)
}

fn parse(content: &[u8], path: &Path) -> Result<Vec<Entity>, Error> {
    let mut entities = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_slice(content).enumerate() {
        let value = serde_json::Value::deserialize(document)
            .with_context(|_| error::ParseDocumentSnafu { path, index })?;
        for value in flatten_lists(value) {
            entities.push(
                Entity::from_json(value)
                    .with_context(|_| error::DecodeResourceSnafu { path, index })?,
            );
        }
    }
    tracing::debug!("Loaded {} resources from {}", entities.len(), path.display());
    Ok(entities)
}

fn flatten_lists(value: serde_json::Value) -> Vec<serde_json::Value> {
    match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Object(mut object)
            if object.get("kind").and_then(serde_json::Value::as_str) == Some(LIST_KIND) =>
        {
            match object.remove("items") {
                Some(serde_json::Value::Array(items)) => {
                    items.into_iter().flat_map(flatten_lists).collect()
                }
                _ => Vec::new(),
            }
        }
        value => vec![value],
    }
}
