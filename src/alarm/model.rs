use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;

/// Single request slot: scheduling again replaces whatever is pending.
pub const REQUEST_ID: u32 = 1;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarm {
    pub request_id: u32,
    pub fire_at: DateTime<Local>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSettings {
    pub exact_alarm_permission_required: bool,
    pub exact_alarm_granted: bool,
    pub use_24h: bool,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            exact_alarm_permission_required: true,
            exact_alarm_granted: false,
            use_24h: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmStore {
    pub settings: PlatformSettings,
    pub pending: Option<PendingAlarm>,
}

/// Missing files read as an empty store; anything else must parse.
pub fn load_alarm_store(path: &Path) -> Result<AlarmStore> {
    if !path.exists() {
        return Ok(AlarmStore::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read alarm store {}", path.display()))?;
    parse_alarm_store_text(&content)
}

pub fn parse_alarm_store_text(content: &str) -> Result<AlarmStore> {
    let raw = serde_json::from_str::<AlarmStoreFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != STORE_VERSION {
        bail!(
            "unsupported alarm store version {}; expected version {STORE_VERSION}",
            raw.version
        );
    }

    let pending = match raw.pending {
        Some(pending) => {
            if pending.request_id != REQUEST_ID {
                bail!(
                    "pending alarm has request id {}; only {REQUEST_ID} is supported",
                    pending.request_id
                );
            }
            let fire_at = DateTime::parse_from_rfc3339(&pending.fire_at)
                .with_context(|| {
                    format!(
                        "invalid fire_at '{}', expected RFC 3339 timestamp",
                        pending.fire_at
                    )
                })?
                .with_timezone(&Local);
            Some(PendingAlarm {
                request_id: pending.request_id,
                fire_at,
                payload: pending.payload,
            })
        }
        None => None,
    };

    Ok(AlarmStore {
        settings: PlatformSettings {
            exact_alarm_permission_required: raw.settings.exact_alarm_permission_required,
            exact_alarm_granted: raw.settings.exact_alarm_granted,
            use_24h: raw.settings.use_24h,
        },
        pending,
    })
}

pub fn save_alarm_store(path: &Path, store: &AlarmStore) -> Result<()> {
    let pending = store.pending.as_ref().map(|pending| {
        json!({
            "request_id": pending.request_id,
            "fire_at": pending.fire_at.to_rfc3339(),
            "payload": pending.payload,
        })
    });

    let document = json!({
        "version": STORE_VERSION,
        "settings": {
            "exact_alarm_permission_required": store.settings.exact_alarm_permission_required,
            "exact_alarm_granted": store.settings.exact_alarm_granted,
            "use_24h": store.settings.use_24h,
        },
        "pending": pending,
    });
    let text = serde_json::to_string_pretty(&document)?;
    let dir = ensure_parent_dir(path)?;

    // Readers in other processes only ever see the old or the new document.
    let mut staged = NamedTempFile::new_in(&dir)
        .with_context(|| format!("unable to stage alarm store in {}", dir.display()))?;
    staged
        .write_all(format!("{text}\n").as_bytes())
        .and_then(|()| staged.as_file().sync_all())
        .with_context(|| format!("unable to write alarm store {}", path.display()))?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("unable to replace alarm store {}", path.display()))?;
    Ok(())
}

/// Exclusive hold on `<store>.lock`; released when dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

/// Blocks until no other handle, in this process or another, is between a read
/// and a save of the store at `path`.
pub fn lock_alarm_store(path: &Path) -> Result<StoreLock> {
    ensure_parent_dir(path)?;
    let lock_path = lock_path_for(path);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("unable to open lock file {}", lock_path.display()))?;
    FileExt::lock_exclusive(&file)
        .with_context(|| format!("unable to lock {}", lock_path.display()))?;
    Ok(StoreLock { _file: file })
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

fn ensure_parent_dir(path: &Path) -> Result<PathBuf> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create directory {}", parent.display()))?;
            Ok(parent.to_path_buf())
        }
        _ => Ok(PathBuf::from(".")),
    }
}

#[derive(Debug, Deserialize)]
struct AlarmStoreFile {
    version: u32,
    #[serde(default)]
    settings: PlatformSettingsFile,
    #[serde(default)]
    pending: Option<PendingAlarmFile>,
}

#[derive(Debug, Deserialize)]
struct PlatformSettingsFile {
    #[serde(default = "default_true")]
    exact_alarm_permission_required: bool,
    #[serde(default)]
    exact_alarm_granted: bool,
    #[serde(default = "default_true")]
    use_24h: bool,
}

impl Default for PlatformSettingsFile {
    fn default() -> Self {
        Self {
            exact_alarm_permission_required: true,
            exact_alarm_granted: false,
            use_24h: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PendingAlarmFile {
    #[serde(default = "default_request_id")]
    request_id: u32,
    fire_at: String,
    payload: Payload,
}

fn default_true() -> bool {
    true
}

fn default_request_id() -> u32 {
    REQUEST_ID
}
