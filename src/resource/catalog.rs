//! Resource Catalog
//!
//! Command-scoped view of the account: detailed listings fetched at most once
//! per resource type, lookups by name or uuid, and display-name resolution for
//! cross-references between resources.

use super::record::Record;
use super::registry::ResourceType;
use crate::cloudsigma::client::CloudSigmaClient;
use crate::error::CliError;
use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;

/// Detailed listings cached for the lifetime of one command
pub struct Catalog<'a> {
    client: &'a CloudSigmaClient,
    detail: HashMap<ResourceType, Vec<Value>>,
}

impl<'a> Catalog<'a> {
    pub fn new(client: &'a CloudSigmaClient) -> Self {
        Self {
            client,
            detail: HashMap::new(),
        }
    }

    pub fn client(&self) -> &'a CloudSigmaClient {
        self.client
    }

    /// Pre-populate a listing without a remote fetch
    #[cfg(test)]
    pub fn seed(&mut self, kind: ResourceType, items: Vec<Value>) {
        self.detail.insert(kind, items);
    }

    /// Forget a cached listing so the next access re-fetches it
    pub fn invalidate(&mut self, kind: ResourceType) {
        self.detail.remove(&kind);
    }

    /// Full records of a type
    ///
    /// Types without a `detail/` endpoint answer their summary listing, which
    /// already carries every field.
    pub async fn detailed(&mut self, kind: ResourceType) -> Result<&[Value]> {
        if !self.detail.contains_key(&kind) {
            let items = if kind.has_detail_listing() {
                self.client.list_detail(kind).await?
            } else {
                self.client.list(kind).await?
            };
            tracing::debug!("cached {} {} records", items.len(), kind);
            self.detail.insert(kind, items);
        }
        Ok(self.detail.get(&kind).map(Vec::as_slice).unwrap_or_default())
    }

    /// First record whose uuid or name equals the query
    pub async fn find(&mut self, kind: ResourceType, query: &str) -> Result<&Value> {
        let items = self.detailed(kind).await?;
        items
            .iter()
            .find(|item| Record::new(kind, item).matches(query))
            .ok_or_else(|| CliError::not_found(kind.label(), query).into())
    }

    /// Owned copy of a record, for callers that modify and send it back
    pub async fn find_owned(&mut self, kind: ResourceType, query: &str) -> Result<Value> {
        self.find(kind, query).await.cloned()
    }

    /// Display name of the resource with the given uuid
    ///
    /// Unnamed resources resolve to `<unnamed_{type}>`; a uuid that matches
    /// nothing is an error.
    pub async fn resolve_name(&mut self, uuid: &str, kind: ResourceType) -> Result<String> {
        if kind == ResourceType::Capabilities {
            return Err(CliError::parameter(format!("unknown resource type {}", kind)).into());
        }
        let record = self.find(kind, uuid).await?;
        Ok(Record::new(kind, record)
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| kind.unnamed()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::is_not_found;
    use serde_json::json;

    /// Client pointing at an unroutable endpoint; seeded catalogs never use it
    pub fn offline_client() -> CloudSigmaClient {
        let config = ClientConfig::new("test", "user", "pw").with_api_endpoint("http://127.0.0.1:9/");
        CloudSigmaClient::new(config).unwrap()
    }

    fn seeded(client: &CloudSigmaClient) -> Catalog<'_> {
        let mut catalog = Catalog::new(client);
        catalog.seed(
            ResourceType::Server,
            vec![
                json!({"uuid": "s-1", "name": "web"}),
                json!({"uuid": "s-2", "name": ""}),
            ],
        );
        catalog.seed(
            ResourceType::Vlan,
            vec![json!({"uuid": "v-1", "meta": {"name": "backplane"}})],
        );
        catalog.seed(ResourceType::Subscription, vec![json!({"uuid": "sub-1"})]);
        catalog
    }

    #[tokio::test]
    async fn test_find_by_uuid_and_name() {
        let client = offline_client();
        let mut catalog = seeded(&client);

        let by_uuid = catalog.find_owned(ResourceType::Server, "s-1").await.unwrap();
        let by_name = catalog.find_owned(ResourceType::Server, "web").await.unwrap();
        assert_eq!(by_uuid, by_name);

        let vlan = catalog.find_owned(ResourceType::Vlan, "backplane").await.unwrap();
        assert_eq!(vlan["uuid"], "v-1");
    }

    #[test]
    fn test_seeded_listing_is_served_from_cache() {
        let client = offline_client();
        let mut catalog = seeded(&client);

        let servers = tokio_test::block_on(catalog.detailed(ResourceType::Server)).unwrap();
        assert_eq!(servers.len(), 2);

        catalog.invalidate(ResourceType::Vlan);
        assert!(!catalog.detail.contains_key(&ResourceType::Vlan));
    }

    #[tokio::test]
    async fn test_find_unknown_is_not_found() {
        let client = offline_client();
        let mut catalog = seeded(&client);

        let err = catalog.find(ResourceType::Server, "db").await.unwrap_err();
        assert!(is_not_found(&err));
        assert_eq!(err.to_string(), "unknown server db");
    }

    #[tokio::test]
    async fn test_resolve_name_with_placeholders() {
        let client = offline_client();
        let mut catalog = seeded(&client);

        assert_eq!(
            catalog.resolve_name("s-1", ResourceType::Server).await.unwrap(),
            "web"
        );
        assert_eq!(
            catalog.resolve_name("s-2", ResourceType::Server).await.unwrap(),
            "<unnamed_server>"
        );
        assert_eq!(
            catalog.resolve_name("v-1", ResourceType::Vlan).await.unwrap(),
            "backplane"
        );
        assert_eq!(
            catalog
                .resolve_name("sub-1", ResourceType::Subscription)
                .await
                .unwrap(),
            "<unnamed_subscription>"
        );
    }

    #[tokio::test]
    async fn test_resolve_name_dangling_reference_propagates() {
        let client = offline_client();
        let mut catalog = seeded(&client);

        let err = catalog
            .resolve_name("s-404", ResourceType::Server)
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }
}
