//! Resource Fetcher
//!
//! Fetches one collection (or all primary collections) in the requested list
//! format and post-processes the records through the formatter.

use super::catalog::Catalog;
use super::formatter::format_resource;
use super::record::Record;
use super::registry::{ListFormat, ResourceType};
use crate::error::CliError;
use anyhow::Result;
use serde_json::{Map, Value};

/// Fetch and post-process the records of one type
pub async fn list_resources(
    catalog: &mut Catalog<'_>,
    kind: ResourceType,
    format: ListFormat,
) -> Result<Vec<Value>> {
    if !kind.supports_format(format) {
        return Err(CliError::parameter(format!(
            "list_format {} is not supported for {}",
            format,
            kind.collection()
        ))
        .into());
    }

    let items = if format.wants_detail() && kind.has_detail_listing() {
        catalog.detailed(kind).await?.to_vec()
    } else {
        catalog.client().list(kind).await?
    };
    tracing::debug!("fetched {} {} records as {}", items.len(), kind, format);

    match format {
        ListFormat::Uuid => items
            .iter()
            .map(|item| -> Result<Value> {
                let uuid = Record::new(kind, item).uuid()?;
                let mut entry = Map::new();
                entry.insert(uuid.to_string(), Value::Null);
                Ok(Value::Object(entry))
            })
            .collect(),
        ListFormat::Brief | ListFormat::Text => {
            let mut formatted = Vec::with_capacity(items.len());
            for item in &items {
                formatted.push(format_resource(catalog, kind, item, format).await?);
            }
            Ok(formatted)
        }
        ListFormat::Detail | ListFormat::Raw => Ok(items),
    }
}

/// Listing of one type keyed by its collection name, e.g. `{"servers": [...]}`
pub async fn list_kind(catalog: &mut Catalog<'_>, kind: ResourceType, format: ListFormat) -> Result<Value> {
    let items = list_resources(catalog, kind, format).await?;
    let mut listing = Map::new();
    listing.insert(kind.collection().to_string(), Value::Array(items));
    Ok(Value::Object(listing))
}

/// Servers, drives, vlans and ips under one object
pub async fn list_all(catalog: &mut Catalog<'_>, format: ListFormat) -> Result<Value> {
    let mut listing = Map::new();
    for kind in ResourceType::PRIMARY {
        let items = list_resources(catalog, kind, format).await?;
        listing.insert(kind.collection().to_string(), Value::Array(items));
    }
    Ok(Value::Object(listing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_parameter_error;
    use crate::resource::catalog::tests::offline_client;
    use serde_json::json;

    #[tokio::test]
    async fn test_uuid_format_yields_null_valued_entries() {
        let client = offline_client();
        let mut catalog = Catalog::new(&client);
        catalog.seed(
            ResourceType::Vlan,
            vec![json!({"uuid": "v-1"}), json!({"uuid": "v-2"})],
        );

        let items = list_resources(&mut catalog, ResourceType::Vlan, ListFormat::Uuid)
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"v-1": null}), json!({"v-2": null})]);
    }

    #[tokio::test]
    async fn test_detail_format_passes_through() {
        let client = offline_client();
        let mut catalog = Catalog::new(&client);
        let vlan = json!({"uuid": "v-1", "meta": {"name": "lan"}, "servers": []});
        catalog.seed(ResourceType::Vlan, vec![vlan.clone()]);

        let listing = list_kind(&mut catalog, ResourceType::Vlan, ListFormat::Detail)
            .await
            .unwrap();
        assert_eq!(listing, json!({"vlans": [vlan]}));
    }

    #[tokio::test]
    async fn test_text_format_of_vlans() {
        let client = offline_client();
        let mut catalog = Catalog::new(&client);
        catalog.seed(
            ResourceType::Vlan,
            vec![json!({"uuid": "v-1", "meta": {"name": "lan", "description": "office"}})],
        );

        let items = list_resources(&mut catalog, ResourceType::Vlan, ListFormat::Text)
            .await
            .unwrap();
        assert_eq!(items, vec![json!({"v-1": ["name=lan  description=office"]})]);
    }

    #[tokio::test]
    async fn test_restricted_formats_fail_before_fetching() {
        let client = offline_client();
        let mut catalog = Catalog::new(&client);

        for (kind, format) in [
            (ResourceType::Subscription, ListFormat::Brief),
            (ResourceType::Subscription, ListFormat::Text),
            (ResourceType::Capabilities, ListFormat::Uuid),
            (ResourceType::Capabilities, ListFormat::Brief),
            (ResourceType::Capabilities, ListFormat::Text),
        ] {
            let err = list_resources(&mut catalog, kind, format).await.unwrap_err();
            assert!(is_parameter_error(&err), "{} {}", kind, format);
        }
    }

    #[tokio::test]
    async fn test_list_all_has_the_four_primary_keys() {
        let client = offline_client();
        let mut catalog = Catalog::new(&client);
        for kind in ResourceType::PRIMARY {
            catalog.seed(kind, vec![]);
        }

        let listing = list_all(&mut catalog, ListFormat::Brief).await.unwrap();
        let keys: Vec<&str> = listing.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["servers", "drives", "vlans", "ips"]);
        for key in ["servers", "drives", "vlans", "ips"] {
            assert_eq!(listing[key], json!([]));
        }
    }
}
