use crate::env::{env_non_empty, DD_HOSTNAME_ENV};

/// Hostname reported when nothing else can be determined.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Resolve the hostname attached to every entry.
///
/// Tried in order: `DD_HOSTNAME`, `HOSTNAME`, the OS hostname, then
/// [`UNKNOWN_HOSTNAME`]. Called once per handler.
pub fn resolve_hostname() -> String {
    if let Some(hostname) = env_non_empty(DD_HOSTNAME_ENV) {
        return hostname;
    }
    if let Some(hostname) = env_non_empty("HOSTNAME") {
        return hostname;
    }
    system_hostname().unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string())
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name.into_string().ok().filter(|s| !s.is_empty()),
        Err(e) => {
            tracing::debug!("failed to read system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
