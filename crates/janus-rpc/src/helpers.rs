//! Small helpers shared by the session and poll loop.

use crate::protocol::{Id, PLUGIN_NAMESPACE_PREFIX};

/// Strip exactly one trailing slash from a gateway URI.
#[must_use]
pub fn normalize_uri(uri: &str) -> &str {
    uri.strip_suffix('/').unwrap_or(uri)
}

/// Resolve a plugin name into `(namespace, short_name)`.
///
/// Names without a `.` are taken as short names and prefixed with
/// [`PLUGIN_NAMESPACE_PREFIX`]. The short name is always the last
/// dot-separated segment of the resulting namespace.
#[must_use]
pub fn qualify_namespace(namespace: &str) -> (String, String) {
    let namespace = if namespace.contains('.') {
        namespace.to_string()
    } else {
        format!("{PLUGIN_NAMESPACE_PREFIX}{namespace}")
    };

    let short_name = namespace
        .rsplit('.')
        .next()
        .unwrap_or(namespace.as_str())
        .to_string();

    (namespace, short_name)
}

/// Build a command target: base, then session id, then handle path.
#[must_use]
pub fn command_uri(base: &str, session: Option<&Id>, path: Option<&Id>) -> String {
    match (session, path) {
        (Some(session), Some(path)) => format!("{base}/{session}/{path}"),
        (Some(session), None) => format!("{base}/{session}"),
        // Handle paths only make sense under a session
        (None, _) => base.to_string(),
    }
}

/// Build the long-poll URI for a session.
///
/// `rid` is a millisecond timestamp that defeats intermediate caches.
#[must_use]
pub fn poll_uri(base: &str, session: &Id) -> String {
    let rid = chrono::Utc::now().timestamp_millis();
    format!("{base}/{session}?rid={rid}")
}
