//! Resource Registry
//!
//! The closed set of CloudSigma resource types and the per-type facts the rest
//! of the crate dispatches on: REST collection, display-name field and which
//! list formats the type supports.

use crate::error::CliError;
use std::fmt;
use std::str::FromStr;

/// A CloudSigma resource collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Server,
    Drive,
    Vlan,
    Ip,
    Subscription,
    Capabilities,
}

/// Output mode of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFormat {
    /// Summary records exactly as the API returns them
    #[default]
    Raw,
    /// Detailed records exactly as the API returns them
    Detail,
    /// `{uuid: null}` per resource
    Uuid,
    /// Ordered name/value projection per resource
    Brief,
    /// Aligned text lines per resource
    Text,
}

impl ResourceType {
    /// Types included in the aggregate `list all` view
    pub const PRIMARY: [ResourceType; 4] = [
        ResourceType::Server,
        ResourceType::Drive,
        ResourceType::Vlan,
        ResourceType::Ip,
    ];

    /// Singular label used in messages and placeholders
    pub fn label(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Drive => "drive",
            Self::Vlan => "vlan",
            Self::Ip => "ip",
            Self::Subscription => "subscription",
            Self::Capabilities => "capabilities",
        }
    }

    /// REST collection name, also the key of per-type listings
    pub fn collection(self) -> &'static str {
        match self {
            Self::Server => "servers",
            Self::Drive => "drives",
            Self::Vlan => "vlans",
            Self::Ip => "ips",
            Self::Subscription => "subscriptions",
            Self::Capabilities => "capabilities",
        }
    }

    /// Dot path of the display name inside a record
    pub fn name_path(self) -> Option<&'static str> {
        match self {
            Self::Server | Self::Drive => Some("name"),
            Self::Vlan | Self::Ip => Some("meta.name"),
            Self::Subscription | Self::Capabilities => None,
        }
    }

    /// Whether the collection has a `detail/` listing
    pub fn has_detail_listing(self) -> bool {
        !matches!(self, Self::Subscription | Self::Capabilities)
    }

    /// Whether records of this type can be created, updated or deleted
    pub fn is_mutable(self) -> bool {
        self != Self::Capabilities
    }

    /// Formats a listing of this type may be requested in
    pub fn supports_format(self, format: ListFormat) -> bool {
        match self {
            Self::Subscription => matches!(
                format,
                ListFormat::Raw | ListFormat::Uuid | ListFormat::Detail
            ),
            Self::Capabilities => matches!(format, ListFormat::Raw | ListFormat::Detail),
            _ => true,
        }
    }

    /// Placeholder shown for resources without a name
    pub fn unnamed(self) -> String {
        format!("<unnamed_{}>", self.label())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceType {
    type Err = CliError;

    /// Accepts singular and plural spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" | "servers" => Ok(Self::Server),
            "drive" | "drives" => Ok(Self::Drive),
            "vlan" | "vlans" => Ok(Self::Vlan),
            "ip" | "ips" => Ok(Self::Ip),
            "subscription" | "subscriptions" => Ok(Self::Subscription),
            "capabilities" | "capability" => Ok(Self::Capabilities),
            _ => Err(CliError::parameter(format!("unknown resource type {}", s))),
        }
    }
}

impl ListFormat {
    /// Whether the format post-processes detailed records
    pub fn wants_detail(self) -> bool {
        self != Self::Raw
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "none",
            Self::Detail => "detail",
            Self::Uuid => "uuid",
            Self::Brief => "brief",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ListFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" | "raw" => Ok(Self::Raw),
            "detail" => Ok(Self::Detail),
            "uuid" => Ok(Self::Uuid),
            "brief" => Ok(Self::Brief),
            "text" => Ok(Self::Text),
            _ => Err(CliError::parameter(format!("unknown list_format {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_parses_singular_and_plural() {
        assert_eq!("servers".parse::<ResourceType>(), Ok(ResourceType::Server));
        assert_eq!("VLAN".parse::<ResourceType>(), Ok(ResourceType::Vlan));
        assert_eq!("ip".parse::<ResourceType>(), Ok(ResourceType::Ip));
        assert!(matches!(
            "bucket".parse::<ResourceType>(),
            Err(CliError::Parameter(_))
        ));
    }

    #[test]
    fn test_name_paths() {
        assert_eq!(ResourceType::Server.name_path(), Some("name"));
        assert_eq!(ResourceType::Ip.name_path(), Some("meta.name"));
        assert_eq!(ResourceType::Subscription.name_path(), None);
    }

    #[test]
    fn test_format_restrictions() {
        assert!(ResourceType::Subscription.supports_format(ListFormat::Uuid));
        assert!(!ResourceType::Subscription.supports_format(ListFormat::Brief));
        assert!(!ResourceType::Subscription.supports_format(ListFormat::Text));
        assert!(ResourceType::Capabilities.supports_format(ListFormat::Detail));
        assert!(!ResourceType::Capabilities.supports_format(ListFormat::Uuid));
        for kind in ResourceType::PRIMARY {
            assert!(kind.supports_format(ListFormat::Text));
        }
    }

    #[test]
    fn test_unknown_list_format_names_value() {
        let err = "human".parse::<ListFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unknown list_format human");
    }

    #[test]
    fn test_unnamed_placeholder() {
        assert_eq!(ResourceType::Vlan.unnamed(), "<unnamed_vlan>");
    }
}
