//! Drive commands

use super::server::MIN_DISK;
use super::{averted, confirm};
use crate::resource::record::Record;
use crate::resource::size::parse_size;
use crate::resource::{Catalog, ResourceType};
use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Media {
    Disk,
    Cdrom,
}

impl Media {
    fn as_str(self) -> &'static str {
        match self {
            Self::Disk => "disk",
            Self::Cdrom => "cdrom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Multimount {
    Enable,
    Disable,
}

impl Multimount {
    fn allowed(self) -> bool {
        self == Self::Enable
    }
}

/// Storage class offered on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageType {
    Ssd,
    Magnetic,
}

impl StorageType {
    /// Storage type name used by the API
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Ssd => "dssd",
            Self::Magnetic => "zadara",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum DriveAction {
    /// Create a drive
    Create {
        #[arg(short, long, default_value = MIN_DISK)]
        size: String,
        #[arg(short, long, value_enum, default_value_t = Media::Disk)]
        media: Media,
        #[arg(short = 'M', long, value_enum, default_value_t = Multimount::Disable)]
        multimount: Multimount,
        #[arg(short = 't', long, value_enum, default_value_t = StorageType::Ssd)]
        storage_type: StorageType,
    },
    /// Display drive attributes
    Show,
    /// Delete the drive
    Destroy {
        /// Suppress confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Change drive characteristics
    Modify {
        #[arg(short, long)]
        rename: Option<String>,
        #[arg(short, long, value_enum)]
        media: Option<Media>,
        #[arg(short = 'M', long, value_enum)]
        multimount: Option<Multimount>,
        #[arg(short = 't', long, value_enum)]
        storage_type: Option<StorageType>,
    },
    /// Resize an unmounted drive
    Resize {
        #[arg(short, long)]
        size: String,
        #[arg(short, long)]
        force: bool,
    },
    /// Upload a raw disk image or ISO file as a new drive
    Upload {
        #[arg(value_name = "DRIVE_IMAGE")]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Media::Disk)]
        media: Media,
        #[arg(short = 'M', long, value_enum, default_value_t = Multimount::Disable)]
        multimount: Multimount,
    },
}

/// Run a drive action against the drive called (or with uuid) `name`
pub async fn execute(catalog: &mut Catalog<'_>, name: &str, action: DriveAction) -> Result<Value> {
    let client = catalog.client();
    match action {
        DriveAction::Create {
            size,
            media,
            multimount,
            storage_type,
        } => create_drive(catalog, name, &size, media.as_str(), multimount.allowed(), storage_type).await,
        DriveAction::Show => catalog.find_owned(ResourceType::Drive, name).await,
        DriveAction::Destroy { force } => {
            let drive = catalog.find_owned(ResourceType::Drive, name).await?;
            let uuid = Record::new(ResourceType::Drive, &drive).uuid()?.to_string();
            if !confirm(&drive, ResourceType::Drive, "destruction", "drive", force)? {
                return Ok(averted("destruction"));
            }
            let result = client.delete(ResourceType::Drive, &uuid, None).await?;
            if result.is_null() {
                Ok(json!(format!("drive {} '{}' destroyed", uuid, name)))
            } else {
                Ok(result)
            }
        }
        DriveAction::Modify {
            rename,
            media,
            multimount,
            storage_type,
        } => {
            let mut drive = catalog.find_owned(ResourceType::Drive, name).await?;
            apply_changes(&mut drive, rename.as_deref(), media, multimount, storage_type);
            let uuid = Record::new(ResourceType::Drive, &drive).uuid()?.to_string();
            client.update(ResourceType::Drive, &uuid, &drive).await
        }
        DriveAction::Resize { size, force } => {
            let mut drive = catalog.find_owned(ResourceType::Drive, name).await?;
            let uuid = Record::new(ResourceType::Drive, &drive).uuid()?.to_string();
            if !confirm(&drive, ResourceType::Drive, "resize", "drive", force)? {
                return Ok(averted("resize"));
            }
            drive["size"] = json!(parse_size(&size)?);
            client.action(ResourceType::Drive, &uuid, "resize", Some(&drive)).await
        }
        DriveAction::Upload {
            input,
            media,
            multimount,
        } => {
            let image = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let uuid = client.upload_drive_image(image).await?;

            catalog.invalidate(ResourceType::Drive);
            let mut drive = catalog.find_owned(ResourceType::Drive, &uuid).await?;
            apply_changes(&mut drive, Some(name), Some(media), Some(multimount), None);
            client.update(ResourceType::Drive, &uuid, &drive).await
        }
    }
}

/// Create a drive of `size` (memory-size notation)
pub async fn create_drive(
    catalog: &mut Catalog<'_>,
    name: &str,
    size: &str,
    media: &str,
    multimount: bool,
    storage_type: StorageType,
) -> Result<Value> {
    let params = json!({
        "name": name,
        "size": parse_size(size)?,
        "media": media,
        "storage_type": storage_type.api_name(),
        "allow_multimount": multimount,
    });
    let created = catalog.client().create(ResourceType::Drive, params).await?;
    catalog.invalidate(ResourceType::Drive);
    Ok(created)
}

fn apply_changes(
    drive: &mut Value,
    rename: Option<&str>,
    media: Option<Media>,
    multimount: Option<Multimount>,
    storage_type: Option<StorageType>,
) {
    if let Some(rename) = rename {
        drive["name"] = json!(rename);
    }
    if let Some(media) = media {
        drive["media"] = json!(media.as_str());
    }
    if let Some(multimount) = multimount {
        drive["allow_multimount"] = json!(multimount.allowed());
    }
    if let Some(storage_type) = storage_type {
        drive["storage_type"] = json!(storage_type.api_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_api_names() {
        assert_eq!(StorageType::Ssd.api_name(), "dssd");
        assert_eq!(StorageType::Magnetic.api_name(), "zadara");
    }

    #[test]
    fn test_apply_changes_only_touches_given_fields() {
        let mut drive = json!({"uuid": "d-1", "name": "data", "media": "disk", "allow_multimount": false});
        apply_changes(&mut drive, None, Some(Media::Cdrom), Some(Multimount::Enable), None);
        assert_eq!(
            drive,
            json!({"uuid": "d-1", "name": "data", "media": "cdrom", "allow_multimount": true})
        );

        apply_changes(&mut drive, Some("iso"), None, None, Some(StorageType::Magnetic));
        assert_eq!(drive["name"], "iso");
        assert_eq!(drive["storage_type"], "zadara");
    }
}
