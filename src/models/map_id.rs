// Reserved map identifiers. Sentinels share the `SYS_` prefix and mark non-gameplay states.

/// Prefix shared by every sentinel identifier.
pub const SENTINEL_PREFIX: &str = "SYS_";

/// Identifier of the pseudo-session that is open before the first successful query.
pub const BOOTSTRAP: &str = "SYS_INIT";

/// Identifier substituted for the map name when a status query fails.
pub const QUERY_ERROR: &str = "SYS_QUERYERROR";

/// Identifier written in place of the real map name while an event is running.
pub const EVENT: &str = "SYS_EVENT";

/// Default marker: event maps keep a formatting code in their name after extraction.
pub const DEFAULT_EVENT_MARKER: &str = "§";

pub fn is_sentinel(name: &str) -> bool {
    name.starts_with(SENTINEL_PREFIX)
}
