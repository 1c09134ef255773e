//! Server commands

use super::{averted, confirm, mkpasswd, PASSWORD_LEN};
use crate::error::CliError;
use crate::resource::record::Record;
use crate::resource::size::parse_size;
use crate::resource::{Catalog, ResourceType};
use crate::shell;
use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const MIN_CPU: u64 = 1;
const MIN_MHZ: u64 = 1000;
const MIN_RAM: &str = "256M";
pub const MIN_DISK: &str = "512M";

/// Pause between status checks while waiting
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Whether SMP is presented as cores of one CPU or as separate CPUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SmpMode {
    Cpu,
    Core,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
    Virtio,
    Ide,
}

impl DeviceKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Virtio => "virtio",
            Self::Ide => "ide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NicAction {
    Add,
    Delete,
    Modify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NicMode {
    Dhcp,
    Static,
    Manual,
    Vlan,
}

#[derive(Subcommand, Debug)]
pub enum ServerAction {
    /// Create a server, optionally creating or attaching a drive and a boot cdrom
    Create {
        /// SMP CPU count
        #[arg(short, long, value_name = "CPU_COUNT", default_value_t = MIN_CPU)]
        cpu: u64,
        /// MHz per CPU
        #[arg(short, long, value_name = "CPU_MHZ", default_value_t = MIN_MHZ)]
        speed: u64,
        /// Memory size (supports K, M, G and T suffixes)
        #[arg(short, long, value_name = "SIZE", default_value = MIN_RAM)]
        memory: String,
        /// VNC password (generated when omitted)
        #[arg(short, long)]
        password: Option<String>,
        /// Drive name or uuid to attach as the system disk
        #[arg(short, long, value_name = "NAME")]
        attach_drive: Option<String>,
        /// Size of the system disk to create when none is attached
        #[arg(short = 'd', long, value_name = "SIZE", default_value = MIN_DISK)]
        create_drive: String,
        /// Boot cdrom drive name or uuid
        #[arg(short, long, value_name = "NAME")]
        boot_cdrom: Option<String>,
        /// Present SMP as multiple CPUs or as multiple cores
        #[arg(short = 'S', long, value_enum)]
        smp: Option<SmpMode>,
    },
    /// Delete the server, optionally preserving its drives
    Destroy {
        #[arg(short, long)]
        keep_drives: bool,
        /// Suppress confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Power on
    Start,
    /// Power off
    Stop,
    /// ACPI shutdown (soft power switch)
    Shutdown,
    /// Display server attributes
    Show,
    /// Display server runtime data
    Runtime,
    /// Open or close a console TTY port
    Tty {
        /// Close the TTY port
        #[arg(short, long)]
        close: bool,
        /// Execute COMMAND ADDRESS PORT against the opened console
        #[arg(short, long = "exec", value_name = "COMMAND")]
        exec_command: Option<String>,
        /// Pipe the VNC password to stdin of the --exec command
        #[arg(short, long)]
        password: bool,
    },
    /// Open or close a VNC session
    Vnc {
        #[arg(short, long)]
        close: bool,
    },
    /// Wait for the server to reach a status
    Wait {
        #[arg(short, long, default_value = "started")]
        status: String,
        /// Timeout in seconds, 0 waits forever
        #[arg(short, long, default_value_t = 15)]
        timeout: u64,
    },
    /// Attach a drive
    Attach {
        /// Drive name or uuid
        drive: String,
        #[arg(short = 'c', long, default_value = "0:0")]
        dev_channel: String,
        #[arg(short, long, value_enum, default_value_t = DeviceKind::Virtio)]
        device: DeviceKind,
    },
    /// Detach a drive
    Detach {
        /// Drive name or uuid
        drive: String,
    },
    /// Add, delete or modify network interfaces
    Nic {
        #[arg(value_enum, default_value_t = NicAction::Add)]
        action: NicAction,
        #[arg(short, long, value_enum, default_value_t = NicMode::Dhcp)]
        config: NicMode,
        #[arg(long)]
        model: Option<String>,
        /// Subscribed IP (static config)
        #[arg(short, long)]
        ip: Option<String>,
        /// MAC address of the NIC to delete or modify
        #[arg(short, long)]
        mac: Option<String>,
        /// Subscribed VLAN name or uuid (vlan config)
        #[arg(long)]
        vlan: Option<String>,
    },
    /// Modify server attributes
    Modify {
        #[arg(short, long)]
        rename: Option<String>,
        #[arg(short, long, value_name = "CPU_COUNT")]
        cpu: Option<u64>,
        #[arg(short, long, value_name = "CPU_MHZ")]
        speed: Option<u64>,
        #[arg(short, long, value_name = "SIZE")]
        memory: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
        #[arg(short = 'S', long, value_enum)]
        smp: Option<SmpMode>,
    },
}

/// Run a server action against the server called (or with uuid) `name`
pub async fn execute(catalog: &mut Catalog<'_>, name: &str, action: ServerAction) -> Result<Value> {
    let client = catalog.client();
    match action {
        ServerAction::Create {
            cpu,
            speed,
            memory,
            password,
            attach_drive,
            create_drive,
            boot_cdrom,
            smp,
        } => {
            let password = password.unwrap_or_else(|| mkpasswd(PASSWORD_LEN));
            let params = json!({
                "name": name,
                "cpu": total_mhz(cpu, speed)?,
                "smp": cpu,
                "mem": parse_size(&memory)?,
                "vnc_password": password,
                "cpus_instead_of_cores": smp == Some(SmpMode::Cpu),
            });

            let mut drives = Vec::new();
            if let Some(cdrom) = boot_cdrom {
                let cdrom = Record::new(ResourceType::Drive, catalog.find(ResourceType::Drive, &cdrom).await?);
                if cdrom.opt_str("media") != Some("cdrom") {
                    return Err(CliError::parameter(format!(
                        "failed boot cdrom attach; {} media must be cdrom",
                        cdrom.uuid()?
                    ))
                    .into());
                }
                drives.push(attachment(cdrom.uuid()?, 2, "0:0", DeviceKind::Ide));
            }

            let system_drive = match attach_drive {
                Some(query) => {
                    let drive = Record::new(ResourceType::Drive, catalog.find(ResourceType::Drive, &query).await?);
                    if drive.opt_str("media") != Some("disk") {
                        return Err(CliError::parameter(format!(
                            "failed drive attach; {} must be a disk drive",
                            query
                        ))
                        .into());
                    }
                    if drive.opt_str("status") != Some("unmounted") {
                        return Err(CliError::parameter(format!(
                            "failed drive attach; {} must be unmounted",
                            query
                        ))
                        .into());
                    }
                    Some(drive.uuid()?.to_string())
                }
                None => {
                    parse_size(&create_drive)?;
                    None
                }
            };

            let mut server = client.create(ResourceType::Server, params).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();

            let system_uuid = match system_drive {
                Some(existing) => existing,
                None => {
                    let created = super::drive::create_drive(
                        catalog,
                        &format!("{}-system", name),
                        &create_drive,
                        "disk",
                        false,
                        super::drive::StorageType::Ssd,
                    )
                    .await?;
                    Record::new(ResourceType::Drive, &created).uuid()?.to_string()
                }
            };
            drives.push(attachment(&system_uuid, 1, "0:0", DeviceKind::Virtio));
            server["drives"] = Value::Array(drives);
            server["nics"] = json!([{
                "ip_v4_conf": {"conf": "dhcp", "ip": null},
                "model": "virtio",
                "vlan": null
            }]);
            client.update(ResourceType::Server, &uuid, &server).await
        }
        ServerAction::Destroy { keep_drives, force } => {
            let server = catalog.find_owned(ResourceType::Server, name).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();
            if !confirm(&server, ResourceType::Server, "destruction", "server", force)? {
                return Ok(averted("destruction"));
            }
            let recurse = (!keep_drives).then_some("disks");
            let result = client.delete(ResourceType::Server, &uuid, recurse).await?;
            Ok(or_message(result, format!("server {} '{}' destroyed", uuid, name)))
        }
        ServerAction::Start => server_action(catalog, name, "start").await,
        ServerAction::Stop => server_action(catalog, name, "stop").await,
        ServerAction::Shutdown => server_action(catalog, name, "acpi_shutdown").await,
        ServerAction::Show => catalog.find_owned(ResourceType::Server, name).await,
        ServerAction::Runtime => {
            let uuid = server_uuid(catalog, name).await?;
            client.server_runtime(&uuid).await
        }
        ServerAction::Tty {
            close,
            exec_command,
            password,
        } => {
            if close {
                return server_action(catalog, name, "close_console").await;
            }
            let opened = server_action(catalog, name, "open_console").await?;
            let Some(command) = exec_command else {
                return Ok(opened);
            };
            let url = opened
                .get("console_url")
                .and_then(|u| u.as_str())
                .ok_or_else(|| anyhow::anyhow!("Console open returned no console_url"))?;
            let (host, port) = shell::console_endpoint(url)?;
            let vnc_password = if password {
                let server = catalog.find(ResourceType::Server, name).await?;
                Some(Record::new(ResourceType::Server, server).str_field("vnc_password")?.to_string())
            } else {
                None
            };
            let result = shell::exec_console(&command, &host, &port, vnc_password.as_deref());
            if let shell::ShellResult::Error(message) = &result {
                return Err(anyhow::anyhow!(message.clone()));
            }
            Ok(json!(format!("subprocess returned {}", result.exit_code())))
        }
        ServerAction::Vnc { close } => {
            let action = if close { "close_vnc" } else { "open_vnc" };
            server_action(catalog, name, action).await
        }
        ServerAction::Wait { status, timeout } => wait_for_status(catalog, name, &status, timeout).await,
        ServerAction::Attach {
            drive,
            dev_channel,
            device,
        } => {
            let drive_uuid = Record::new(ResourceType::Drive, catalog.find(ResourceType::Drive, &drive).await?)
                .uuid()?
                .to_string();
            let mut server = catalog.find_owned(ResourceType::Server, name).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();
            let boot_order = Record::new(ResourceType::Server, &server).list("drives")?.len() + 1;
            push_list(&mut server, "drives", attachment(&drive_uuid, boot_order, &dev_channel, device));
            client.update(ResourceType::Server, &uuid, &server).await
        }
        ServerAction::Detach { drive } => {
            let drive_uuid = Record::new(ResourceType::Drive, catalog.find(ResourceType::Drive, &drive).await?)
                .uuid()?
                .to_string();
            let mut server = catalog.find_owned(ResourceType::Server, name).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();
            if !detach_drive(&mut server, &drive_uuid) {
                return Err(CliError::parameter(format!(
                    "server {} has no attached drive {}",
                    name, drive
                ))
                .into());
            }
            client.update(ResourceType::Server, &uuid, &server).await
        }
        ServerAction::Nic {
            action,
            config,
            model,
            ip,
            mac,
            vlan,
        } => {
            let ip_uuid = match (config, ip) {
                (NicMode::Static, Some(ip)) => Some(subscribed_uuid(catalog, ResourceType::Ip, &ip).await?),
                _ => None,
            };
            let vlan_uuid = match (config, vlan) {
                (NicMode::Vlan, Some(vlan)) => Some(subscribed_uuid(catalog, ResourceType::Vlan, &vlan).await?),
                _ => None,
            };
            let new_nic = build_nic(config, model.as_deref(), ip_uuid.as_deref(), vlan_uuid.as_deref())?;

            let mut server = catalog.find_owned(ResourceType::Server, name).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();
            apply_nic_action(&mut server, name, action, new_nic, mac.as_deref())?;
            client.update(ResourceType::Server, &uuid, &server).await
        }
        ServerAction::Modify {
            rename,
            cpu,
            speed,
            memory,
            password,
            smp,
        } => {
            let mut server = catalog.find_owned(ResourceType::Server, name).await?;
            let uuid = Record::new(ResourceType::Server, &server).uuid()?.to_string();

            if cpu.is_some() || speed.is_some() {
                let current = Record::new(ResourceType::Server, &server);
                let count = match cpu {
                    Some(count) => count,
                    None => current.u64_field("smp")?.max(1),
                };
                let mhz = match speed {
                    Some(mhz) => mhz,
                    None => (current.f64_field("cpu")? / current.u64_field("smp")?.max(1) as f64) as u64,
                };
                server["cpu"] = json!(total_mhz(count, mhz)?);
                server["smp"] = json!(count);
            }
            if let Some(rename) = rename {
                server["name"] = json!(rename);
            }
            if let Some(memory) = memory {
                server["mem"] = json!(parse_size(&memory)?);
            }
            if let Some(password) = password {
                server["vnc_password"] = json!(password);
            }
            if let Some(smp) = smp {
                server["cpus_instead_of_cores"] = json!(smp == SmpMode::Cpu);
            }
            client.update(ResourceType::Server, &uuid, &server).await
        }
    }
}

async fn server_uuid(catalog: &mut Catalog<'_>, name: &str) -> Result<String> {
    let server = catalog.find(ResourceType::Server, name).await?;
    Ok(Record::new(ResourceType::Server, server).uuid()?.to_string())
}

async fn server_action(catalog: &mut Catalog<'_>, name: &str, action: &str) -> Result<Value> {
    let uuid = server_uuid(catalog, name).await?;
    catalog
        .client()
        .action(ResourceType::Server, &uuid, action, None)
        .await
}

async fn subscribed_uuid(catalog: &mut Catalog<'_>, kind: ResourceType, query: &str) -> Result<String> {
    let record = catalog.find(kind, query).await?;
    Ok(Record::new(kind, record).uuid()?.to_string())
}

/// Poll the server until it reports `status`; `timeout` 0 waits forever
pub async fn wait_for_status(catalog: &mut Catalog<'_>, name: &str, status: &str, timeout: u64) -> Result<Value> {
    let deadline = (timeout > 0).then(|| Instant::now() + Duration::from_secs(timeout));

    loop {
        catalog.invalidate(ResourceType::Server);
        let server = Record::new(ResourceType::Server, catalog.find(ResourceType::Server, name).await?);
        let current = server.opt_str("status").unwrap_or_default();
        tracing::debug!("server {} status {} (want {})", name, current, status);

        if current == status {
            return Ok(json!({"uuid": server.uuid()?, "status": current}));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(anyhow::anyhow!(
                "Timeout waiting for server {} status {}",
                name,
                status
            ));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Server `cpu` field: CPU count times MHz per CPU
fn total_mhz(count: u64, mhz: u64) -> Result<u64, CliError> {
    count
        .checked_mul(mhz)
        .ok_or_else(|| CliError::parameter(format!("cpu {} x {} MHz is out of range", count, mhz)))
}

fn attachment(drive_uuid: &str, boot_order: usize, dev_channel: &str, device: DeviceKind) -> Value {
    json!({
        "boot_order": boot_order,
        "dev_channel": dev_channel,
        "device": device.as_str(),
        "drive": drive_uuid,
    })
}

/// Append to a list field, creating it when absent
fn push_list(record: &mut Value, key: &str, item: Value) {
    match record.get_mut(key).and_then(|v| v.as_array_mut()) {
        Some(items) => items.push(item),
        None => record[key] = Value::Array(vec![item]),
    }
}

/// Remove the attachment of `drive_uuid`; false when it was not attached
fn detach_drive(server: &mut Value, drive_uuid: &str) -> bool {
    let Some(drives) = server.get_mut("drives").and_then(|v| v.as_array_mut()) else {
        return false;
    };
    let attached = |entry: &Value| {
        entry
            .get("drive")
            .map(|d| d.get("uuid").unwrap_or(d))
            .and_then(|d| d.as_str())
            == Some(drive_uuid)
    };
    match drives.iter().position(attached) {
        Some(index) => {
            drives.remove(index);
            true
        }
        None => false,
    }
}

fn build_nic(mode: NicMode, model: Option<&str>, ip: Option<&str>, vlan: Option<&str>) -> Result<Value, CliError> {
    let mut nic = json!({});
    if let Some(model) = model {
        nic["model"] = json!(model);
    }
    match mode {
        NicMode::Dhcp => nic["ip_v4_conf"] = json!({"conf": "dhcp"}),
        NicMode::Static => {
            let ip = ip.ok_or_else(|| CliError::parameter("static config requires --ip option (subscribed IP)"))?;
            nic["ip_v4_conf"] = json!({"conf": "static", "ip": ip});
        }
        NicMode::Manual => nic["ip_v4_conf"] = json!({"conf": "manual"}),
        NicMode::Vlan => {
            let vlan = vlan.ok_or_else(|| CliError::parameter("vlan config requires --vlan option (subscribed VLAN)"))?;
            nic["vlan"] = json!(vlan);
        }
    }
    Ok(nic)
}

fn apply_nic_action(
    server: &mut Value,
    name: &str,
    action: NicAction,
    mut new_nic: Value,
    mac: Option<&str>,
) -> Result<(), CliError> {
    if action == NicAction::Add {
        push_list(server, "nics", new_nic);
        return Ok(());
    }

    let label = match action {
        NicAction::Delete => "delete",
        _ => "modify",
    };
    let mac = mac.ok_or_else(|| CliError::parameter(format!("{} action requires --mac option", label)))?;
    let not_found = || CliError::parameter(format!("{} mac addr {} not found on server {}", label, mac, name));

    let nics = server
        .get_mut("nics")
        .and_then(|v| v.as_array_mut())
        .ok_or_else(not_found)?;
    let matches: Vec<usize> = nics
        .iter()
        .enumerate()
        .filter(|(_, nic)| nic.get("mac").and_then(|m| m.as_str()) == Some(mac))
        .map(|(index, _)| index)
        .collect();
    let &[index] = matches.as_slice() else {
        return Err(not_found());
    };

    if action == NicAction::Delete {
        nics.remove(index);
    } else {
        new_nic["mac"] = json!(mac);
        nics[index] = new_nic;
    }
    Ok(())
}

/// The API answers some deletes with an empty body
fn or_message(result: Value, message: String) -> Value {
    if result.is_null() {
        json!(message)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_with_nics() -> Value {
        json!({
            "uuid": "s-1",
            "name": "web",
            "drives": [
                {"boot_order": 1, "dev_channel": "0:0", "device": "virtio", "drive": {"uuid": "d-1"}},
                {"boot_order": 2, "dev_channel": "0:1", "device": "virtio", "drive": "d-2"}
            ],
            "nics": [
                {"mac": "22:aa", "ip_v4_conf": {"conf": "dhcp"}},
                {"mac": "22:bb", "ip_v4_conf": {"conf": "manual"}}
            ]
        })
    }

    #[test]
    fn test_build_nic_requirements() {
        assert_eq!(
            build_nic(NicMode::Dhcp, Some("virtio"), None, None).unwrap(),
            json!({"model": "virtio", "ip_v4_conf": {"conf": "dhcp"}})
        );
        assert_eq!(
            build_nic(NicMode::Static, None, Some("185.1.1.1"), None).unwrap(),
            json!({"ip_v4_conf": {"conf": "static", "ip": "185.1.1.1"}})
        );
        assert!(build_nic(NicMode::Static, None, None, None).is_err());
        assert!(build_nic(NicMode::Vlan, None, None, None).is_err());
        assert_eq!(
            build_nic(NicMode::Vlan, None, None, Some("v-1")).unwrap(),
            json!({"vlan": "v-1"})
        );
    }

    #[test]
    fn test_nic_add_delete_modify() {
        let mut server = server_with_nics();
        let manual = build_nic(NicMode::Manual, None, None, None).unwrap();

        apply_nic_action(&mut server, "web", NicAction::Add, manual.clone(), None).unwrap();
        assert_eq!(server["nics"].as_array().unwrap().len(), 3);

        apply_nic_action(&mut server, "web", NicAction::Delete, manual.clone(), Some("22:aa")).unwrap();
        assert_eq!(server["nics"][0]["mac"], "22:bb");

        apply_nic_action(&mut server, "web", NicAction::Modify, manual.clone(), Some("22:bb")).unwrap();
        assert_eq!(server["nics"][0], json!({"ip_v4_conf": {"conf": "manual"}, "mac": "22:bb"}));
    }

    #[test]
    fn test_nic_delete_requires_matching_mac() {
        let mut server = server_with_nics();
        let nic = json!({});

        let err = apply_nic_action(&mut server, "web", NicAction::Delete, nic.clone(), None).unwrap_err();
        assert_eq!(err.to_string(), "delete action requires --mac option");

        let err = apply_nic_action(&mut server, "web", NicAction::Modify, nic, Some("ff:ff")).unwrap_err();
        assert_eq!(err.to_string(), "modify mac addr ff:ff not found on server web");
    }

    #[test]
    fn test_detach_drive_matches_object_and_string_refs() {
        let mut server = server_with_nics();
        assert!(detach_drive(&mut server, "d-2"));
        assert!(detach_drive(&mut server, "d-1"));
        assert!(!detach_drive(&mut server, "d-1"));
        assert_eq!(server["drives"], json!([]));
    }

    #[test]
    fn test_total_mhz_rejects_overflow() {
        assert_eq!(total_mhz(4, 2000).unwrap(), 8000);
        let err = total_mhz(u64::MAX, 2).unwrap_err();
        assert!(matches!(err, CliError::Parameter(_)));
    }

    #[test]
    fn test_push_list_creates_missing_field() {
        let mut server = json!({"uuid": "s-1"});
        push_list(&mut server, "drives", attachment("d-9", 1, "0:0", DeviceKind::Ide));
        assert_eq!(
            server["drives"],
            json!([{"boot_order": 1, "dev_channel": "0:0", "device": "ide", "drive": "d-9"}])
        );
    }

    #[test]
    fn test_or_message_only_replaces_empty_results() {
        assert_eq!(or_message(Value::Null, "gone".to_string()), json!("gone"));
        assert_eq!(or_message(json!({"ok": 1}), "gone".to_string()), json!({"ok": 1}));
    }
}
