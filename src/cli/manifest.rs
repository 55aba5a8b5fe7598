use std::{fmt::Display, path::PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use super::host_path::to_host_path;

/// Name the extension passes to `chrome.runtime.connectNative`.
pub const HOST_NAME: &str = "com.tabtally.host";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    Chrome,
    Firefox,
}

impl Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Browser::Chrome => write!(f, "chrome"),
            Browser::Firefox => write!(f, "firefox"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ManifestCommand {
    #[arg(long = "extension-id", help = "Id of the tabtally extension allowed to start the host")]
    extension_id: String,
    #[arg(long, default_value_t = Browser::Chrome, help = "Browser family the manifest is written for")]
    browser: Browser,
    #[arg(
        long = "host-path",
        help = "Absolute path of tabtally-host. By default the one next to this executable"
    )]
    host_path: Option<PathBuf>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct HostManifest {
    name: &'static str,
    description: &'static str,
    path: PathBuf,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_extensions: Option<Vec<String>>,
}

impl HostManifest {
    pub fn new(browser: Browser, extension_id: &str, path: PathBuf) -> Self {
        let (allowed_origins, allowed_extensions) = match browser {
            Browser::Chrome => (Some(vec![format!("chrome-extension://{extension_id}/")]), None),
            Browser::Firefox => (None, Some(vec![extension_id.to_string()])),
        };
        Self {
            name: HOST_NAME,
            description: "Measures time spent on browser tabs",
            path,
            kind: "stdio",
            allowed_origins,
            allowed_extensions,
        }
    }
}

pub fn process_manifest_command(
    ManifestCommand {
        extension_id,
        browser,
        host_path,
    }: ManifestCommand,
) -> Result<()> {
    let extension_id = extension_id.trim();
    if extension_id.is_empty() {
        return Err(anyhow!("Extension id can't be empty"));
    }
    let path = match host_path {
        Some(path) => path,
        None => to_host_path(std::env::current_exe()?),
    };
    let manifest = HostManifest::new(browser, extension_id, path);
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::{Browser, HostManifest};

    #[test]
    fn test_chrome_manifest() {
        let manifest =
            HostManifest::new(Browser::Chrome, "abcdef", PathBuf::from("/opt/tabtally-host"));
        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            json!({
                "name": "com.tabtally.host",
                "description": "Measures time spent on browser tabs",
                "path": "/opt/tabtally-host",
                "type": "stdio",
                "allowed_origins": ["chrome-extension://abcdef/"],
            })
        );
    }

    #[test]
    fn test_firefox_manifest() {
        let manifest = HostManifest::new(
            Browser::Firefox,
            "tabtally@example.org",
            PathBuf::from("/opt/tabtally-host"),
        );
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["allowed_extensions"], json!(["tabtally@example.org"]));
        assert!(value.get("allowed_origins").is_none());
    }
}
