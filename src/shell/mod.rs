//! Shell Integration
//!
//! Runs a user-supplied console client against an opened server console.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Result of a shell operation
#[derive(Debug, PartialEq, Eq)]
pub enum ShellResult {
    /// Command completed successfully
    Success,
    /// Command failed with exit code
    Failed(i32),
    /// Error launching command
    Error(String),
}

impl ShellResult {
    /// Exit code as reported to the user
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed(code) => *code,
            Self::Error(_) => -1,
        }
    }
}

/// Host and port of a console URL such as `tcp://direct.zrh.cloudsigma.com:40013`
pub fn console_endpoint(url: &str) -> Result<(String, String)> {
    let authority = url
        .split('/')
        .nth(2)
        .with_context(|| format!("Console url {} has no host", url))?;
    let (host, port) = authority
        .rsplit_once(':')
        .with_context(|| format!("Console url {} has no port", url))?;
    Ok((host.to_string(), port.to_string()))
}

/// Run `{command} {host} {port}` through the shell, optionally feeding a
/// password line to its stdin
pub fn exec_console(command: &str, host: &str, port: &str, password: Option<&str>) -> ShellResult {
    let line = format!("{} {} {}", command, host, port);
    tracing::info!("Executing: {}", line);

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(&line)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd.stdin(if password.is_some() {
        Stdio::piped()
    } else {
        Stdio::inherit()
    });

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ShellResult::Error(format!("Failed to execute {}: {}", command, e)),
    };

    if let (Some(password), Some(mut stdin)) = (password, child.stdin.take()) {
        if let Err(e) = writeln!(stdin, "{}", password) {
            tracing::warn!("Failed to pass password to console command: {}", e);
        }
    }

    match child.wait() {
        Ok(status) if status.success() => ShellResult::Success,
        Ok(status) => ShellResult::Failed(status.code().unwrap_or(-1)),
        Err(e) => ShellResult::Error(format!("Failed to wait for process: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_endpoint() {
        let (host, port) = console_endpoint("tcp://direct.zrh.cloudsigma.com:40013").unwrap();
        assert_eq!(host, "direct.zrh.cloudsigma.com");
        assert_eq!(port, "40013");
        assert!(console_endpoint("nonsense").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_console_reports_exit_code() {
        assert_eq!(exec_console("true", "host", "1", None), ShellResult::Success);
        assert_eq!(exec_console("exit 3 #", "host", "1", None).exit_code(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_console_pipes_password() {
        let result = exec_console("read pw; test \"$pw\" = secret #", "host", "1", Some("secret"));
        assert_eq!(result, ShellResult::Success);
    }
}
