//! Image reference repair.
//!
//! Resolution never fails: anything that cannot be turned into a usable URL
//! degrades to the fallback asset or to the trimmed input string.

use url::Url;

use crate::products::ImageRef;

/// Asset path shown when a product has no usable image.
pub const DEFAULT_FALLBACK_IMAGE: &str = "/images/no-image.png";

/// Turns [`ImageRef`]s and stored image strings into display URLs.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    origin: Option<Url>,
    fallback: String,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self {
            origin: None,
            fallback: DEFAULT_FALLBACK_IMAGE.to_owned(),
        }
    }
}

impl ImageResolver {
    /// Creates a resolver that joins root-relative paths onto `app_origin`.
    ///
    /// An unparseable origin is logged and ignored; root-relative paths are
    /// then returned as-is.
    #[must_use]
    pub fn new(app_origin: &str, fallback: &str) -> Self {
        let origin = Url::parse(app_origin)
            .map_err(|e| {
                tracing::warn!(
                    app_origin,
                    error = %e,
                    "could not parse application origin; relative image paths will not be expanded"
                );
            })
            .ok();
        Self {
            origin,
            fallback: fallback.to_owned(),
        }
    }

    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Resolves an optional image reference into a display URL.
    ///
    /// `None`, [`ImageRef::Sentinel`], `"false"` and empty strings all yield
    /// the fallback. String values may also be JSON-array artifacts such as
    /// `["https://cdn/x.png"]`; those are unwrapped first.
    #[must_use]
    pub fn resolve(&self, raw: Option<&ImageRef>) -> String {
        match raw {
            None | Some(ImageRef::Sentinel) => self.fallback.clone(),
            Some(ImageRef::Url(s) | ImageRef::Legacy { src: s }) => {
                self.resolve_stored(Some(s))
            }
        }
    }

    /// Resolves an image string as returned by the persistence layer: either
    /// a bare string or a JSON-array-encoded string.
    #[must_use]
    pub fn resolve_stored(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return self.fallback.clone();
        };
        match unwrap_array_string(raw) {
            Some(Some(first)) => self.resolve_plain(&first),
            Some(None) => self.fallback.clone(),
            None => self.resolve_plain(raw),
        }
    }

    fn resolve_plain(&self, raw: &str) -> String {
        let trimmed = raw.trim().trim_matches('"');
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("false") {
            return self.fallback.clone();
        }

        if has_scheme(trimmed) {
            return trimmed.to_owned();
        }

        if let Some(rest) = trimmed.strip_prefix("//") {
            return format!("https://{rest}");
        }

        if trimmed.starts_with('/') {
            return match &self.origin {
                Some(origin) => origin
                    .join(trimmed)
                    .map_or_else(|_| trimmed.to_owned(), |u| u.to_string()),
                None => trimmed.to_owned(),
            };
        }

        if trimmed.contains('.') {
            let candidate = format!("https://{trimmed}");
            if Url::parse(&candidate).is_ok() {
                return candidate;
            }
        }

        tracing::debug!(image = trimmed, "image reference could not be repaired");
        trimmed.to_owned()
    }
}

/// Schemes whose URLs carry no `//` authority part.
const OPAQUE_SCHEMES: [&str; 2] = ["data", "blob"];

/// `true` when `s` starts with a URL scheme such as `https://` or `data:`.
///
/// A bare `host:port/path` also splits on `:`, so hierarchical schemes must
/// be followed by `//`.
fn has_scheme(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let opaque = OPAQUE_SCHEMES
        .iter()
        .any(|known| scheme.eq_ignore_ascii_case(known));
    well_formed && (opaque || rest.starts_with("//")) && Url::parse(s).is_ok()
}

/// Unwraps a JSON-array-encoded image string.
///
/// Returns `None` when `raw` is not array-shaped, `Some(None)` for an empty
/// array, and `Some(Some(first))` otherwise.
pub(crate) fn unwrap_array_string(raw: &str) -> Option<Option<String>> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }

    // Doubly-escaped payloads arrive as `[\"https:\\/\\/cdn\\/x.png\"]`.
    let unescaped = trimmed.replace("\\\\", "\\").replace("\\\"", "\"");

    let parsed = serde_json::from_str::<Vec<serde_json::Value>>(trimmed)
        .or_else(|_| serde_json::from_str::<Vec<serde_json::Value>>(&unescaped));
    if let Ok(items) = parsed {
        let first = items.into_iter().find_map(|item| match item {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("src")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            _ => None,
        });
        return Some(first);
    }

    // Not valid JSON; split by hand.
    let inner = &unescaped[1..unescaped.len() - 1];
    let first = inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').replace("\\/", "/"))
        .find(|part| !part.is_empty());
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ImageResolver {
        ImageResolver::new("https://tienda.test", DEFAULT_FALLBACK_IMAGE)
    }

    fn url(s: &str) -> ImageRef {
        ImageRef::Url(s.to_owned())
    }

    #[test]
    fn every_sentinel_encoding_resolves_to_fallback() {
        let r = resolver();
        let from_false: ImageRef = serde_json::from_str("false").unwrap();
        assert_eq!(r.resolve(Some(&from_false)), DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve(None), DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve(Some(&url("false"))), DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve(Some(&ImageRef::Sentinel)), DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve(Some(&url("  "))), DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve_stored(None), DEFAULT_FALLBACK_IMAGE);
    }

    #[test]
    fn absolute_urls_pass_through() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some(&url("https://cdn.test/a.png?w=300"))),
            "https://cdn.test/a.png?w=300"
        );
        assert_eq!(
            r.resolve(Some(&url("data:image/png;base64,AAAA"))),
            "data:image/png;base64,AAAA"
        );
    }

    #[test]
    fn root_relative_paths_resolve_against_origin() {
        assert_eq!(
            resolver().resolve(Some(&url("/uploads/a.png"))),
            "https://tienda.test/uploads/a.png"
        );
    }

    #[test]
    fn root_relative_paths_stay_relative_without_origin() {
        let r = ImageResolver::new("::not a url::", DEFAULT_FALLBACK_IMAGE);
        assert_eq!(r.resolve(Some(&url("/uploads/a.png"))), "/uploads/a.png");
    }

    #[test]
    fn protocol_relative_urls_get_https() {
        assert_eq!(
            resolver().resolve(Some(&url("//cdn.test/a.png"))),
            "https://cdn.test/a.png"
        );
    }

    #[test]
    fn bare_hosts_get_default_scheme() {
        assert_eq!(
            resolver().resolve(Some(&url("cdn.test/a.png"))),
            "https://cdn.test/a.png"
        );
    }

    #[test]
    fn bare_host_with_port_gets_default_scheme() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some(&url("cdn.test:8080/a.png"))),
            "https://cdn.test:8080/a.png"
        );
        assert_eq!(
            r.resolve(Some(&url("localhost:3000/x.png"))),
            "https://localhost:3000/x.png"
        );
    }

    #[test]
    fn opaque_schemes_pass_through() {
        assert_eq!(
            resolver().resolve(Some(&url("blob:https://tienda.test/1f2e"))),
            "blob:https://tienda.test/1f2e"
        );
    }

    #[test]
    fn legacy_objects_recurse_on_src() {
        let legacy = ImageRef::Legacy {
            src: "/uploads/b.png".to_owned(),
        };
        assert_eq!(
            resolver().resolve(Some(&legacy)),
            "https://tienda.test/uploads/b.png"
        );
    }

    #[test]
    fn unrepairable_input_is_returned_trimmed() {
        assert_eq!(resolver().resolve(Some(&url("  no-image  "))), "no-image");
    }

    #[test]
    fn stored_array_string_is_unwrapped() {
        let r = resolver();
        assert_eq!(
            r.resolve_stored(Some(r#"["https://cdn.test/a.png"]"#)),
            "https://cdn.test/a.png"
        );
        assert_eq!(
            r.resolve_stored(Some(r#"[\"https:\\/\\/cdn.test\\/a.png\"]"#)),
            "https://cdn.test/a.png"
        );
    }

    #[test]
    fn stored_array_string_through_image_ref() {
        let r = resolver();
        assert_eq!(
            r.resolve(Some(&url(r#"["/uploads/c.png", "/uploads/d.png"]"#))),
            "https://tienda.test/uploads/c.png"
        );
    }

    #[test]
    fn empty_stored_array_is_fallback() {
        assert_eq!(resolver().resolve_stored(Some("[]")), DEFAULT_FALLBACK_IMAGE);
    }

    #[test]
    fn malformed_stored_array_is_split_by_hand() {
        assert_eq!(
            resolver().resolve_stored(Some("[https://cdn.test/a.png, x]")),
            "https://cdn.test/a.png"
        );
    }

    #[test]
    fn custom_fallback_is_used() {
        let r = ImageResolver::new("https://tienda.test", "/static/empty.svg");
        assert_eq!(r.fallback(), "/static/empty.svg");
        assert_eq!(r.resolve(None), "/static/empty.svg");
    }
}
