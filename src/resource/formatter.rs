//! Resource Formatter
//!
//! Projects one detailed record onto the handful of fields worth showing for
//! its type, resolving referenced servers and drives to their names, and
//! renders the projection either as an ordered list of single-key objects
//! (`brief`) or as a block of equal-width text lines (`text`).

use super::catalog::Catalog;
use super::record::Record;
use super::registry::{ListFormat, ResourceType};
use super::size::format_size;
use crate::error::CliError;
use anyhow::Result;
use serde_json::{json, Map, Value};

const ASSIGNED_ON_BOOT: &str = "<assigned-on-boot>";
const OS_CONFIGURED: &str = "<os-configured>";

/// How a NIC obtains its address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NicConfig {
    Dhcp,
    Static,
    Manual,
    Vlan,
}

impl NicConfig {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dhcp => "dhcp",
            Self::Static => "static",
            Self::Manual => "manual",
            Self::Vlan => "vlan",
        }
    }
}

/// One server NIC as displayed
#[derive(Debug, Clone, PartialEq)]
pub struct NicSummary {
    pub mac: String,
    pub config: NicConfig,
    pub ip: String,
}

/// A displayed field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    List(Vec<String>),
    Nics(Vec<NicSummary>),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(Some(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(Some(value.to_string()))
    }
}

impl From<Option<&str>> for FieldValue {
    fn from(value: Option<&str>) -> Self {
        Self::Text(value.map(str::to_string))
    }
}

/// Ordered fields of one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub uuid: String,
    pub fields: Vec<(&'static str, FieldValue)>,
}

impl Projection {
    fn new(uuid: &str) -> Self {
        Self {
            uuid: uuid.to_string(),
            fields: Vec::new(),
        }
    }

    fn push(&mut self, key: &'static str, value: impl Into<FieldValue>) {
        self.fields.push((key, value.into()));
    }

    /// `[{key: value}, ...]` in field order
    pub fn to_brief(&self) -> Value {
        let items = self
            .fields
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    FieldValue::Text(text) => json!(text),
                    FieldValue::List(items) => json!(items),
                    FieldValue::Nics(nics) => Value::Array(
                        nics.iter()
                            .map(|nic| {
                                json!({ nic.mac.as_str(): { "config": nic.config.as_str(), "ip": nic.ip } })
                            })
                            .collect(),
                    ),
                };
                let mut entry = Map::new();
                entry.insert(key.to_string(), rendered);
                Value::Object(entry)
            })
            .collect();
        Value::Array(items)
    }

    /// Text lines, all right-padded to the width of the longest
    ///
    /// Scalars share a line separated by two spaces. `nics` opens a bracketed
    /// block with one indented line per NIC; other lists take a line of their
    /// own. A scalar after a list continues the last line.
    pub fn to_text_lines(&self) -> Vec<String> {
        let mut lines = vec![String::new()];

        for (key, value) in &self.fields {
            match value {
                FieldValue::Text(text) => {
                    let pair = format!("{}={}", key, text.as_deref().unwrap_or(""));
                    match lines.last_mut() {
                        Some(current) if !current.is_empty() => {
                            current.push_str("  ");
                            current.push_str(&pair);
                        }
                        Some(current) => current.push_str(&pair),
                        None => lines.push(pair),
                    }
                }
                FieldValue::List(items) => {
                    lines.push(format!("{}=[{}]", key, items.join(", ")));
                }
                FieldValue::Nics(nics) => {
                    lines.push(format!("{}=[", key));
                    for nic in nics {
                        lines.push(format!(
                            "  {} config={} ip={}",
                            nic.mac,
                            nic.config.as_str(),
                            nic.ip
                        ));
                    }
                    lines.push("]".to_string());
                }
            }
        }

        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        lines
            .into_iter()
            .map(|line| {
                let pad = width - line.chars().count();
                format!("{}{}", line, " ".repeat(pad))
            })
            .collect()
    }
}

/// Format one detailed record as `{uuid: data}`
pub async fn format_resource(
    catalog: &mut Catalog<'_>,
    kind: ResourceType,
    item: &Value,
    format: ListFormat,
) -> Result<Value> {
    let projection = project(catalog, kind, item).await?;
    let data = match format {
        ListFormat::Brief => projection.to_brief(),
        ListFormat::Text => json!(projection.to_text_lines()),
        other => {
            return Err(CliError::parameter(format!("cannot format resources as {}", other)).into())
        }
    };
    let mut wrapped = Map::new();
    wrapped.insert(projection.uuid, data);
    Ok(Value::Object(wrapped))
}

/// Build the displayed fields for a record
pub async fn project(catalog: &mut Catalog<'_>, kind: ResourceType, item: &Value) -> Result<Projection> {
    let record = Record::new(kind, item);
    match kind {
        ResourceType::Server => project_server(catalog, record).await,
        ResourceType::Drive => project_drive(catalog, record).await,
        ResourceType::Vlan => project_vlan(catalog, record).await,
        ResourceType::Ip => project_ip(catalog, record).await,
        ResourceType::Subscription => project_subscription(catalog, record).await,
        ResourceType::Capabilities => {
            Err(CliError::parameter(format!("Unknown resource: {}", kind)).into())
        }
    }
}

async fn project_server(catalog: &mut Catalog<'_>, record: Record<'_>) -> Result<Projection> {
    let uuid = record.uuid()?;
    let count = record.u64_field("smp")?;
    if count == 0 {
        return Err(CliError::parameter(format!("server {} has smp=0", uuid)).into());
    }
    let speed = record.f64_field("cpu")? / count as f64;
    let smp = if record.flag("cpus_instead_of_cores")? {
        "cpu"
    } else {
        "core"
    };

    let mut drives = Vec::new();
    for (index, _) in record.list("drives")?.iter().enumerate() {
        let drive_uuid = record.str_field(&format!("drives.{}.drive.uuid", index))?;
        drives.push(catalog.resolve_name(drive_uuid, ResourceType::Drive).await?);
    }

    let nics = (0..record.list("nics")?.len())
        .map(|index| summarize_nic(record, index))
        .collect::<Result<Vec<_>, _>>()?;

    let mut projection = Projection::new(uuid);
    projection.push("name", catalog.resolve_name(uuid, ResourceType::Server).await?);
    projection.push("status", record.opt_str("status"));
    projection.push("cpu", count.to_string());
    projection.push("clock", format!("{}Ghz", float_repr(speed / 1000.0)));
    projection.push("smp", smp);
    projection.push("memory", format_size(record.f64_field("mem")?));
    projection.push("drives", FieldValue::List(drives));
    projection.push("nics", FieldValue::Nics(nics));
    Ok(projection)
}

/// Derive the config mode and displayed address of `nics.{index}`
fn summarize_nic(record: Record<'_>, index: usize) -> Result<NicSummary, CliError> {
    let path = |field: &str| format!("nics.{}.{}", index, field);
    let mac = record.str_field(&path("mac"))?.to_string();
    let runtime_ip = record.opt_str(&path("runtime.ip_v4.uuid"));

    let (config, ip) = if record.get(&path("vlan")).is_some() {
        (NicConfig::Vlan, OS_CONFIGURED.to_string())
    } else {
        match record.str_field(&path("ip_v4_conf.conf"))? {
            "static" => {
                let ip = match runtime_ip {
                    Some(ip) => ip,
                    None => record.str_field(&path("ip_v4_conf.ip.uuid"))?,
                };
                (NicConfig::Static, ip.to_string())
            }
            "dhcp" => (
                NicConfig::Dhcp,
                runtime_ip.unwrap_or(ASSIGNED_ON_BOOT).to_string(),
            ),
            "manual" => (NicConfig::Manual, OS_CONFIGURED.to_string()),
            other => {
                return Err(CliError::parameter(format!("unknown nic conf value {}", other)))
            }
        }
    };

    Ok(NicSummary { mac, config, ip })
}

async fn project_drive(catalog: &mut Catalog<'_>, record: Record<'_>) -> Result<Projection> {
    let uuid = record.uuid()?;

    let mut mounted = Vec::new();
    for (index, _) in record.list("mounted_on")?.iter().enumerate() {
        let server_uuid = record.str_field(&format!("mounted_on.{}.uuid", index))?;
        mounted.push(catalog.resolve_name(server_uuid, ResourceType::Server).await?);
    }

    let mut projection = Projection::new(uuid);
    projection.push("name", catalog.resolve_name(uuid, ResourceType::Drive).await?);
    projection.push("size", format_size(record.f64_field("size")?));
    projection.push("media", record.opt_str("media"));
    projection.push("storage_type", record.opt_str("storage_type"));
    projection.push("mounted", FieldValue::List(mounted));
    Ok(projection)
}

async fn project_vlan(catalog: &mut Catalog<'_>, record: Record<'_>) -> Result<Projection> {
    let uuid = record.uuid()?;
    let mut projection = Projection::new(uuid);
    projection.push("name", catalog.resolve_name(uuid, ResourceType::Vlan).await?);
    projection.push("description", record.opt_str("meta.description"));
    Ok(projection)
}

async fn project_ip(catalog: &mut Catalog<'_>, record: Record<'_>) -> Result<Projection> {
    let uuid = record.uuid()?;
    let server = match record.opt_str("server.uuid") {
        Some(server_uuid) => catalog.resolve_name(server_uuid, ResourceType::Server).await?,
        None => "unassigned".to_string(),
    };

    let mut projection = Projection::new(uuid);
    projection.push("name", catalog.resolve_name(uuid, ResourceType::Ip).await?);
    projection.push("server", FieldValue::List(vec![server]));
    projection.push("description", record.opt_str("meta.description"));
    Ok(projection)
}

async fn project_subscription(catalog: &mut Catalog<'_>, record: Record<'_>) -> Result<Projection> {
    let uuid = record.uuid()?;
    let mut projection = Projection::new(uuid);
    projection.push("name", catalog.resolve_name(uuid, ResourceType::Subscription).await?);
    projection.push("detail", "");
    Ok(projection)
}

/// Render a float the way a dynamic language prints it: `2.0`, `2.5`, `0.333…`
fn float_repr(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
