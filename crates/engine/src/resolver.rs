use crate::error::TransformError;
use std::fmt::Debug;

/// Turns the href of a streamed document into the reference handed to the
/// resource provider.
pub trait UriResolver: Send + Sync + Debug {
    fn resolve(&self, href: &str, base_uri: Option<&str>) -> Result<String, TransformError>;
}

/// Hands the href through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughResolver;

impl UriResolver for PassThroughResolver {
    fn resolve(&self, href: &str, _base_uri: Option<&str>) -> Result<String, TransformError> {
        Ok(href.to_string())
    }
}

/// Resolves relative hrefs against the directory of the static base URI.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseUriResolver;

impl UriResolver for BaseUriResolver {
    fn resolve(&self, href: &str, base_uri: Option<&str>) -> Result<String, TransformError> {
        Ok(resolve_uri(href, base_uri))
    }
}

pub fn resolve_uri(href: &str, base_uri: Option<&str>) -> String {
    if href.starts_with('/') || href.contains("://") {
        return href.to_string();
    }

    match base_uri {
        Some(base) => {
            let (authority, path) = split_authority(base);
            let base_dir = path.rfind('/').map_or("", |i| &path[..=i]);
            let resolved = normalize_path(&format!("{}{}", base_dir, href));
            if authority.is_empty() || resolved.starts_with('/') {
                format!("{}{}", authority, resolved)
            } else {
                format!("{}/{}", authority, resolved)
            }
        }
        None => href.to_string(),
    }
}

/// Splits `scheme://authority` off the front of `uri`; only the remaining
/// path takes part in normalization.
fn split_authority(uri: &str) -> (&str, &str) {
    match uri.find("://") {
        Some(scheme_end) => {
            let after = scheme_end + 3;
            let path_start = uri[after..].find('/').map_or(uri.len(), |i| after + i);
            uri.split_at(path_start)
        }
        None => ("", uri),
    }
}

fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    if path.starts_with('/') {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        let resolved = PassThroughResolver.resolve("data/in.xml", Some("/base/main.xsl"));
        assert_eq!(resolved.unwrap(), "data/in.xml");
    }

    #[test]
    fn test_resolve_uri_absolute() {
        assert_eq!(resolve_uri("/abs/feed.xml", Some("/base/x.xsl")), "/abs/feed.xml");
        assert_eq!(
            resolve_uri("http://example.com/feed.xml", None),
            "http://example.com/feed.xml"
        );
    }

    #[test]
    fn test_resolve_uri_relative() {
        assert_eq!(
            resolve_uri("feed.xml", Some("/transforms/main.xsl")),
            "/transforms/feed.xml"
        );
        assert_eq!(
            resolve_uri("../data/./feed.xml", Some("jobs/nightly/main.xsl")),
            "jobs/data/feed.xml"
        );
        assert_eq!(resolve_uri("feed.xml", None), "feed.xml");
    }

    #[test]
    fn test_resolve_uri_keeps_scheme_authority() {
        assert_eq!(
            resolve_uri("feed.xml", Some("file:///srv/xsl/main.xsl")),
            "file:///srv/xsl/feed.xml"
        );
        assert_eq!(
            resolve_uri("../data/feed.xml", Some("https://example.com/xsl/main.xsl")),
            "https://example.com/data/feed.xml"
        );
        assert_eq!(
            resolve_uri("feed.xml", Some("https://example.com")),
            "https://example.com/feed.xml"
        );
        let resolved = BaseUriResolver.resolve("in.xml", Some("file:///jobs/run.xsl"));
        assert_eq!(resolved.unwrap(), "file:///jobs/in.xml");
    }
}
