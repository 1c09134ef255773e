//! VLAN and IP commands
//!
//! Both resources come into existence through a subscription and keep their
//! editable attributes under `meta`.

use super::confirm;
use crate::error::CliError;
use crate::resource::record::Record;
use crate::resource::{Catalog, ResourceType};
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodUnit {
    Hour,
    Day,
    Month,
    Year,
}

impl PeriodUnit {
    fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SubscribedAction {
    /// Subscribe to a new resource
    Create {
        #[arg(short, long, default_value_t = 1)]
        duration: u32,
        #[arg(short, long, value_enum, default_value_t = PeriodUnit::Day)]
        units: PeriodUnit,
        #[arg(short, long)]
        auto_renew: bool,
    },
    /// Display attributes
    Show,
    /// Change name or description
    Modify {
        #[arg(short, long)]
        rename: Option<String>,
        #[arg(short = 'D', long)]
        description: Option<String>,
    },
    /// Delete (refused while subscribed)
    Destroy {
        /// Suppress confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Subscription period such as `1 day` or `3 months`
pub fn period(duration: u32, unit: PeriodUnit) -> String {
    let plural = if duration > 1 { "s" } else { "" };
    format!("{} {}{}", duration, unit.as_str(), plural)
}

/// Run a VLAN or IP action against the resource called (or with uuid) `name`
pub async fn execute(
    catalog: &mut Catalog<'_>,
    kind: ResourceType,
    name: &str,
    action: SubscribedAction,
) -> Result<Value> {
    let client = catalog.client();
    let label = kind.label().to_uppercase();
    match action {
        SubscribedAction::Create {
            duration,
            units,
            auto_renew,
        } => {
            let params = json!({
                "resource": kind.label(),
                "amount": 1,
                "period": period(duration, units),
                "auto_renew": auto_renew,
            });
            tracing::info!("subscribing {} {} for {}", label, name, params["period"]);
            client.create(ResourceType::Subscription, params).await
        }
        SubscribedAction::Show => catalog.find_owned(kind, name).await,
        SubscribedAction::Modify {
            rename,
            description,
        } => {
            let mut record = catalog.find_owned(kind, name).await?;
            apply_meta(&mut record, rename.as_deref(), description.as_deref());
            let uuid = Record::new(kind, &record).uuid()?.to_string();
            client.update(kind, &uuid, &record).await
        }
        SubscribedAction::Destroy { force } => {
            let record = catalog.find_owned(kind, name).await?;
            if !confirm(&record, kind, "destruction", &label, force)? {
                return Ok(super::averted("destruction"));
            }
            Err(CliError::parameter(format!(
                "{} {} cannot be deleted while subscribed (verify autorenew status)",
                label, name
            ))
            .into())
        }
    }
}

fn apply_meta(record: &mut Value, rename: Option<&str>, description: Option<&str>) {
    if rename.is_none() && description.is_none() {
        return;
    }
    if !record.get("meta").is_some_and(Value::is_object) {
        record["meta"] = json!({});
    }
    if let Some(rename) = rename {
        record["meta"]["name"] = json!(rename);
    }
    if let Some(description) = description {
        record["meta"]["description"] = json!(description);
    }
}
