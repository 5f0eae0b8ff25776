//! Cookie and web storage state capture and restore.
//!
//! The manager picks its backend per call:
//!
//! | Connectivity | Cookies | Web storage |
//! |--------------|---------|-------------|
//! | BiDi connected | `storage.*` commands on the current context partition | Classic script |
//! | Classic only | Classic script over `document.cookie` | Classic script |
//!
//! A cookie with `sameSite: None` that is not `secure` is rejected by
//! browsers; it is written as `Lax` instead.
//!
//! Web storage is captured and restored for the current origin only.
//! Entries for other origins in a snapshot are skipped with a warning.
//!
//! Without BiDi, cookies are only reachable through `document.cookie`, so
//! `httpOnly` cookies can be neither read nor cleared, and cookies scoped to
//! a path the current page is not under are invisible to the clear.
//!
//! # Snapshot File
//!
//! ```json
//! {
//!   "version": 1,
//!   "cookies": [{ "name": "sid", "value": "42", "domain": "shop.test", "path": "/", ... }],
//!   "localStorage": { "https://shop.test": { "cart": "[1,2]" } },
//!   "sessionStorage": {}
//! }
//! ```
//!
//! # Example
//!
//! ```ignore
//! let storage = session.storage();
//!
//! storage.save_state("state.json", &StateOptions::default()).await?;
//! storage.clear_cookies().await?;
//! storage.load_state("state.json", &StateOptions::default()).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::session::{Cookie, SameSite, Session};
use crate::error::{Error, Result};
use crate::identifiers::BrowsingContextId;
use crate::protocol::{
    BytesValue, Command, PartialCookie, PartitionDescriptor, StorageCommand, WireCookie,
};
use crate::transport::BidiConnection;

// ============================================================================
// Constants
// ============================================================================

/// Snapshot format version written by this crate.
pub const STATE_VERSION: u32 = 1;

/// Reads the current origin and the requested storage areas.
const DUMP_STORAGE_SCRIPT: &str = r"
const dump = (s) => {
  const out = {};
  for (let i = 0; i < s.length; i++) {
    const k = s.key(i);
    out[k] = s.getItem(k);
  }
  return out;
};
return {
  origin: location.origin,
  local: arguments[0] ? dump(localStorage) : null,
  session: arguments[1] ? dump(sessionStorage) : null,
};
";

/// Writes key/value maps into local and session storage.
const RESTORE_STORAGE_SCRIPT: &str = r"
const [local, session] = arguments;
if (local) for (const [k, v] of Object.entries(local)) localStorage.setItem(k, v);
if (session) for (const [k, v] of Object.entries(session)) sessionStorage.setItem(k, v);
";

const READ_COOKIES_SCRIPT: &str = "return [document.cookie, location.hostname];";

const WRITE_COOKIES_SCRIPT: &str = "for (const c of arguments[0]) document.cookie = c;";

/// Expires every visible cookie at each path prefix of the page and on each
/// parent domain of the host.
const CLEAR_COOKIES_SCRIPT: &str = r"
const paths = ['/'];
let prefix = '';
for (const segment of location.pathname.split('/').filter(Boolean)) {
  prefix += '/' + segment;
  paths.push(prefix);
}
const labels = location.hostname.split('.');
const domains = [''];
for (let i = 0; i < labels.length - 1; i++) domains.push('; domain=' + labels.slice(i).join('.'));
for (const c of document.cookie.split(';')) {
  const name = c.split('=')[0].trim();
  if (!name) continue;
  for (const path of paths) {
    for (const domain of domains) document.cookie = name + '=; max-age=0; path=' + path + domain;
  }
}
";

// ============================================================================
// Types
// ============================================================================

/// Key/value pairs of one storage area, keyed by origin.
pub type OriginStorage = BTreeMap<String, BTreeMap<String, String>>;

/// What to capture or restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateOptions {
    /// Cookies.
    pub cookies: bool,
    /// `localStorage` of the current origin.
    pub local_storage: bool,
    /// `sessionStorage` of the current origin.
    pub session_storage: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            cookies: true,
            local_storage: true,
            session_storage: false,
        }
    }
}

/// Serializable browser state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Cookies.
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// `localStorage` by origin.
    #[serde(default)]
    pub local_storage: OriginStorage,
    /// `sessionStorage` by origin.
    #[serde(default)]
    pub session_storage: OriginStorage,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            cookies: Vec::new(),
            local_storage: OriginStorage::new(),
            session_storage: OriginStorage::new(),
        }
    }
}

impl StateSnapshot {
    /// Reads a snapshot file.
    ///
    /// # Errors
    ///
    /// - IO and JSON errors
    /// - [`Error::InvalidArgument`] for a version newer than [`STATE_VERSION`]
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;

        if snapshot.version > STATE_VERSION {
            return Err(Error::invalid_argument(format!(
                "state file version {} is newer than supported version {STATE_VERSION}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Writes the snapshot atomically: a temporary file in the target
    /// directory is renamed over `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

// ============================================================================
// StateManager
// ============================================================================

/// Captures and restores cookies and web storage for one session.
///
/// Obtain it with [`Session::storage`].
#[derive(Debug, Clone)]
pub struct StateManager {
    session: Session,
}

impl StateManager {
    /// Creates a manager for `session`.
    #[inline]
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    // ========================================================================
    // Cookies
    // ========================================================================

    /// Returns all cookies of the current document.
    pub async fn get_cookies(&self) -> Result<Vec<Cookie>> {
        let cookies = match self.session.active_bidi() {
            Some(bidi) => {
                let partition = self.partition().await?;
                let result = bidi
                    .send_command(Command::Storage(StorageCommand::GetCookies {
                        filter: None,
                        partition: Some(partition),
                    }))
                    .await?;
                let wire: Vec<WireCookie> = serde_json::from_value(
                    result.get("cookies").cloned().unwrap_or_else(|| json!([])),
                )?;
                wire.into_iter().map(from_wire).collect()
            }
            None => {
                let value = self
                    .session
                    .execute_script(READ_COOKIES_SCRIPT, vec![])
                    .await?;
                let raw = value.get(0).and_then(Value::as_str).unwrap_or_default();
                let host = value.get(1).and_then(Value::as_str).unwrap_or_default();
                parse_document_cookie(raw, host)
            }
        };

        debug!(session_id = %self.session.id(), count = cookies.len(), "Read cookies");
        Ok(cookies)
    }

    /// Writes cookies. Cookies without a domain get the current host.
    pub async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        debug!(session_id = %self.session.id(), count = cookies.len(), "Writing cookies");

        match self.session.active_bidi() {
            Some(bidi) => self.set_cookies_bidi(&bidi, cookies).await,
            None => {
                let host = self.current_host_if_needed(cookies).await?;
                let lines: Vec<Value> = cookies
                    .iter()
                    .map(|c| Value::String(document_cookie_line(c, host.as_deref())))
                    .collect();
                if cookies.iter().any(|c| c.http_only) {
                    warn!("httpOnly cannot be set from script; written as regular cookies");
                }
                self.session
                    .execute_script(WRITE_COOKIES_SCRIPT, vec![Value::Array(lines)])
                    .await?;
                Ok(())
            }
        }
    }

    /// Deletes all cookies of the current document.
    ///
    /// Over Classic this expires each cookie visible to the page at every
    /// path prefix of the page and on every parent domain. `httpOnly`
    /// cookies survive.
    pub async fn clear_cookies(&self) -> Result<()> {
        debug!(session_id = %self.session.id(), "Clearing cookies");

        match self.session.active_bidi() {
            Some(bidi) => {
                let partition = self.partition().await?;
                bidi.send_command(Command::Storage(StorageCommand::DeleteCookies {
                    filter: None,
                    partition: Some(partition),
                }))
                .await?;
            }
            None => {
                self.session
                    .execute_script(CLEAR_COOKIES_SCRIPT, vec![])
                    .await?;
            }
        }
        Ok(())
    }

    async fn set_cookies_bidi(&self, bidi: &BidiConnection, cookies: &[Cookie]) -> Result<()> {
        let partition = self.partition().await?;
        let host = self.current_host_if_needed(cookies).await?;

        for cookie in cookies {
            let domain = cookie
                .domain
                .clone()
                .or_else(|| host.clone())
                .unwrap_or_default();

            bidi.send_command(Command::Storage(StorageCommand::SetCookie {
                cookie: to_partial(cookie, domain),
                partition: Some(partition.clone()),
            }))
            .await?;
        }
        Ok(())
    }

    /// Partition of the current top-level context.
    async fn partition(&self) -> Result<PartitionDescriptor> {
        let handle = self.session.window_handle().await?;
        Ok(PartitionDescriptor::Context {
            context: BrowsingContextId::new(handle),
        })
    }

    async fn current_host_if_needed(&self, cookies: &[Cookie]) -> Result<Option<String>> {
        if cookies.iter().all(|c| c.domain.is_some()) {
            return Ok(None);
        }
        let url = self.session.current_url().await?;
        Ok(Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string)))
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Captures a snapshot of the current document's state.
    pub async fn get_state(&self, options: &StateOptions) -> Result<StateSnapshot> {
        let mut snapshot = StateSnapshot::default();

        if options.cookies {
            snapshot.cookies = self.get_cookies().await?;
        }

        if options.local_storage || options.session_storage {
            let dump = self
                .session
                .execute_script(
                    DUMP_STORAGE_SCRIPT,
                    vec![json!(options.local_storage), json!(options.session_storage)],
                )
                .await?;
            let origin = dump
                .get("origin")
                .and_then(Value::as_str)
                .unwrap_or("null")
                .to_string();

            if origin == "null" {
                debug!("Opaque origin, web storage not captured");
            } else {
                if let Some(local) = storage_map(dump.get("local")) {
                    snapshot.local_storage.insert(origin.clone(), local);
                }
                if let Some(session) = storage_map(dump.get("session")) {
                    snapshot.session_storage.insert(origin, session);
                }
            }
        }

        debug!(
            session_id = %self.session.id(),
            cookies = snapshot.cookies.len(),
            origins = snapshot.local_storage.len(),
            "Captured state"
        );
        Ok(snapshot)
    }

    /// Applies a snapshot to the current document.
    ///
    /// Existing cookies are kept; snapshot cookies overwrite those with the
    /// same name, domain and path.
    pub async fn set_state(&self, snapshot: &StateSnapshot, options: &StateOptions) -> Result<()> {
        if options.cookies {
            self.set_cookies(&snapshot.cookies).await?;
        }

        let wants_local = options.local_storage && !snapshot.local_storage.is_empty();
        let wants_session = options.session_storage && !snapshot.session_storage.is_empty();
        if !wants_local && !wants_session {
            return Ok(());
        }

        let origin = self
            .session
            .execute_script("return location.origin;", vec![])
            .await?;
        let origin = origin.as_str().unwrap_or("null");

        let pick = |enabled: bool, areas: &OriginStorage, area: &str| -> Value {
            if !enabled {
                return Value::Null;
            }
            for other in areas.keys().filter(|o| o.as_str() != origin) {
                warn!(origin = %other, current = %origin, area, "Skipping cross-origin storage");
            }
            areas.get(origin).map_or(Value::Null, |m| json!(m))
        };
        let local = pick(wants_local, &snapshot.local_storage, "localStorage");
        let session = pick(wants_session, &snapshot.session_storage, "sessionStorage");

        if local.is_null() && session.is_null() {
            return Ok(());
        }
        self.session
            .execute_script(RESTORE_STORAGE_SCRIPT, vec![local, session])
            .await?;
        Ok(())
    }

    /// Captures state and writes it to `path`.
    pub async fn save_state(
        &self,
        path: impl AsRef<Path>,
        options: &StateOptions,
    ) -> Result<StateSnapshot> {
        let snapshot = self.get_state(options).await?;
        let path = path.as_ref().to_path_buf();

        let written = snapshot.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || written.write_to(&target))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))??;

        info!(path = %path.display(), cookies = snapshot.cookies.len(), "State saved");
        Ok(snapshot)
    }

    /// Reads a snapshot from `path` and applies it.
    pub async fn load_state(
        &self,
        path: impl AsRef<Path>,
        options: &StateOptions,
    ) -> Result<StateSnapshot> {
        let path = path.as_ref().to_path_buf();
        let source = path.clone();
        let snapshot = tokio::task::spawn_blocking(move || StateSnapshot::read_from(&source))
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))??;

        self.set_state(&snapshot, options).await?;

        info!(path = %path.display(), cookies = snapshot.cookies.len(), "State loaded");
        Ok(snapshot)
    }
}

// ============================================================================
// Conversions
// ============================================================================

/// `None` without `secure` is not accepted by browsers; use `Lax`.
fn effective_same_site(cookie: &Cookie) -> Option<SameSite> {
    match cookie.same_site {
        Some(SameSite::None) if !cookie.secure => {
            debug!(name = %cookie.name, "sameSite=None without secure, using Lax");
            Some(SameSite::Lax)
        }
        other => other,
    }
}

fn to_partial(cookie: &Cookie, domain: String) -> PartialCookie {
    PartialCookie {
        name: cookie.name.clone(),
        value: BytesValue::string(cookie.value.clone()),
        domain,
        path: Some(cookie.path.clone().unwrap_or_else(|| "/".to_string())),
        http_only: Some(cookie.http_only),
        secure: Some(cookie.secure),
        same_site: effective_same_site(cookie).map(|s| s.bidi_name().to_string()),
        expiry: cookie.expiry,
    }
}

fn from_wire(wire: WireCookie) -> Cookie {
    let value = match wire.value {
        BytesValue::String(s) => s,
        BytesValue::Base64(b64) => Base64Standard
            .decode(b64.as_bytes())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
    };

    Cookie {
        name: wire.name,
        value,
        domain: Some(wire.domain),
        path: Some(wire.path),
        secure: wire.secure,
        http_only: wire.http_only,
        expiry: wire.expiry,
        same_site: wire.same_site.as_deref().and_then(SameSite::parse),
    }
}

/// Parses `document.cookie` (`a=1; b=2`). Entries without `=` are skipped.
fn parse_document_cookie(raw: &str, host: &str) -> Vec<Cookie> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| {
            let cookie = Cookie::new(name.trim(), value).with_path("/");
            if host.is_empty() {
                cookie
            } else {
                cookie.with_domain(host)
            }
        })
        .collect()
}

/// Formats a `document.cookie` assignment.
fn document_cookie_line(cookie: &Cookie, fallback_host: Option<&str>) -> String {
    let mut line = format!(
        "{}={}; path={}",
        cookie.name,
        cookie.value,
        cookie.path.as_deref().unwrap_or("/")
    );

    if let Some(domain) = cookie.domain.as_deref().or(fallback_host) {
        line.push_str("; domain=");
        line.push_str(domain);
    }
    if let Some(expiry) = cookie.expiry {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        line.push_str(&format!("; max-age={}", expiry.saturating_sub(now)));
    }
    if cookie.secure {
        line.push_str("; secure");
    }
    if let Some(same_site) = effective_same_site(cookie) {
        line.push_str("; samesite=");
        line.push_str(same_site.bidi_name());
    }
    line
}

fn storage_map(value: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let object = value?.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
    )
}

// ============================================================================
// Tests
// ============================================================================
