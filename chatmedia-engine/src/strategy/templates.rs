//! Locator address templates
//!
//! Every backend address is the configured origin joined with a fixed path.
//! Kind-specific templates differ only in the kind's folder segment.

use chatmedia_common::MediaKind;
use url::Url;

/// Internal path prefixes the backend serves, and where each one is mounted
pub const INTERNAL_PREFIXES: &[(&str, &str)] = &[
    ("/media/", "/media/"),
    ("media/", "/media/"),
    ("/uploads/", "/static/uploads/"),
    ("uploads/", "/static/uploads/"),
    ("/static/", "/static/"),
    ("static/", "/static/"),
];

const ABSOLUTE_SCHEMES: &[&str] = &["http", "https", "data", "blob"];

/// True if `path` starts with one of [`INTERNAL_PREFIXES`]
pub fn has_internal_prefix(path: &str) -> bool {
    INTERNAL_PREFIXES
        .iter()
        .any(|(prefix, _)| path.starts_with(prefix))
}

/// True if `address` is already a loadable absolute address
pub fn is_absolute(address: &str) -> bool {
    Url::parse(address)
        .map(|url| ABSOLUTE_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}

/// Address builders bound to one backend origin (and optional provider origin)
#[derive(Debug, Clone)]
pub struct LocatorTemplates {
    origin: Option<Url>,
    provider: Option<Url>,
}

impl LocatorTemplates {
    /// Origins that fail to parse disable every template that needs them
    pub fn new(backend_origin: &str, provider_origin: Option<&str>) -> Self {
        Self {
            origin: parse_origin(backend_origin),
            provider: provider_origin.and_then(parse_origin),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// `{origin}/api/media/{folder}/smart/{id}`
    pub fn smart_endpoint(&self, kind: MediaKind, message_id: &str) -> Option<String> {
        join_segments(
            self.origin.as_ref()?,
            &["api", "media", kind.folder(), "smart", message_id],
        )
    }

    /// `{origin}/api/chats/{chat}/messages/{id}/media`
    pub fn chat_scoped_endpoint(&self, chat_id: &str, message_id: &str) -> Option<String> {
        join_segments(
            self.origin.as_ref()?,
            &["api", "chats", chat_id, "messages", message_id, "media"],
        )
    }

    /// `{origin}/api/media/{folder}/by-message/{secondary}`
    pub fn secondary_id_endpoint(&self, kind: MediaKind, secondary_id: &str) -> Option<String> {
        join_segments(
            self.origin.as_ref()?,
            &["api", "media", kind.folder(), "by-message", secondary_id],
        )
    }

    /// `{origin}/static/{folder}/{file name}`
    pub fn static_file(&self, kind: MediaKind, file_name: &str) -> Option<String> {
        join_segments(self.origin.as_ref()?, &["static", kind.folder(), file_name])
    }

    /// `{provider}/{folder}/{file name}`
    pub fn provider_file(&self, kind: MediaKind, file_name: &str) -> Option<String> {
        join_segments(self.provider.as_ref()?, &[kind.folder(), file_name])
    }

    /// `{origin}/api/media/{id}`
    pub fn generic_by_id(&self, message_id: &str) -> Option<String> {
        join_segments(self.origin.as_ref()?, &["api", "media", message_id])
    }

    /// Rewrite a recognized internal path onto the origin
    ///
    /// `/uploads/a/b.png` becomes `{origin}/static/uploads/a/b.png`. Paths
    /// without a recognized prefix yield `None`.
    pub fn rewrite_internal_path(&self, path: &str) -> Option<String> {
        let (prefix, mount) = INTERNAL_PREFIXES
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix))?;
        let rest = &path[prefix.len()..];
        join_raw(self.origin.as_ref()?, &format!("{}{}", mount, rest))
    }

    /// `{origin}/{path}` for relative paths the backend does not mount
    pub fn relative_path(&self, path: &str) -> Option<String> {
        let trimmed = path.trim_start_matches("./").trim_start_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        join_raw(self.origin.as_ref()?, &format!("/{}", trimmed))
    }
}

fn parse_origin(origin: &str) -> Option<Url> {
    let url = Url::parse(origin.trim()).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    Some(url)
}

/// Append percent-encoded path segments to the origin's path
fn join_segments(origin: &Url, segments: &[&str]) -> Option<String> {
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    let mut url = origin.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url.into())
}

/// Append an already-formed path (may carry its own query) to the origin
fn join_raw(origin: &Url, path: &str) -> Option<String> {
    let base = origin.as_str().trim_end_matches('/');
    let joined = Url::parse(&format!("{}{}", base, path)).ok()?;
    Some(joined.into())
}
