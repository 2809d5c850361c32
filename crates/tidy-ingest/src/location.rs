//! Path and URL normalization.

use std::path::{Component, Path, PathBuf};

use tidy_model::Location;
use url::Url;

/// A location after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLocation {
    /// Absolute local path.
    File(PathBuf),
    /// Remote URL, untouched.
    Url(Url),
}

impl ResolvedLocation {
    /// Name used in progress messages: the file name, or the full URL.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            Self::Url(url) => url.to_string(),
        }
    }

    /// The local path, if this is a file.
    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Url(_) => None,
        }
    }

    /// File name extension, including for URLs.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        match self {
            Self::File(path) => path.extension().map(|e| e.to_string_lossy().into_owned()),
            Self::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(|last| Path::new(last).extension())
                .map(|e| e.to_string_lossy().into_owned()),
        }
    }
}

/// Normalizes a user-supplied location.
///
/// Empty input is returned unchanged. `file://` URLs become local paths,
/// other URLs are kept as they are, and everything else is treated as a
/// filesystem path with `~` expanded and made absolute. Never fails.
#[must_use]
pub fn normalize_location(location: Option<&Location>) -> Option<ResolvedLocation> {
    let location = location?;
    if location.is_empty() {
        return None;
    }
    match location {
        Location::Path(path) => Some(ResolvedLocation::File(resolve_path(path))),
        Location::Text(text) => {
            if text.contains("://")
                && let Ok(url) = Url::parse(text)
            {
                if url.scheme() == "file" {
                    let path = url
                        .to_file_path()
                        .unwrap_or_else(|()| PathBuf::from(url.path()));
                    return Some(ResolvedLocation::File(resolve_path(&path)));
                }
                return Some(ResolvedLocation::Url(url));
            }
            Some(ResolvedLocation::File(resolve_path(Path::new(text))))
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Absolute, canonical when the path exists, lexically cleaned otherwise.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if let Ok(canonical) = std::fs::canonicalize(&expanded) {
        return canonical;
    }
    let absolute = std::path::absolute(&expanded).unwrap_or(expanded);
    clean(&absolute)
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_passes_through() {
        assert_eq!(normalize_location(None), None);
        assert_eq!(normalize_location(Some(&Location::from(""))), None);
    }

    #[test]
    fn test_file_url_matches_path() {
        let from_url = normalize_location(Some(&Location::from("file:///tmp/x.csv")));
        let from_path = normalize_location(Some(&Location::from("/tmp/x.csv")));
        assert_eq!(from_url, from_path);
    }

    #[test]
    fn test_remote_url_unchanged() {
        let text = "https://example.com/data/file.csv?x=1";
        let resolved = normalize_location(Some(&Location::from(text))).unwrap();
        assert_eq!(resolved, ResolvedLocation::Url(Url::parse(text).unwrap()));
        assert_eq!(resolved.extension().as_deref(), Some("csv"));
    }

    #[test]
    fn test_home_expansion() {
        if dirs::home_dir().is_none() {
            return;
        }
        let resolved = normalize_location(Some(&Location::from("~/no-such-dir/data.csv")));
        let path = resolved.unwrap().as_path().unwrap().to_path_buf();
        assert!(path.ends_with("no-such-dir/data.csv"));
        assert!(path.is_absolute());
        assert!(!path.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_other_user_home_not_expanded() {
        let resolved = normalize_location(Some(&Location::from("~someone/data.csv"))).unwrap();
        let path = resolved.as_path().unwrap();
        assert!(path.ends_with("~someone/data.csv"));
    }

    #[test]
    fn test_lexical_cleanup() {
        assert_eq!(
            clean(Path::new("/a/b/../c/./d.csv")),
            PathBuf::from("/a/c/d.csv")
        );
    }

    #[test]
    fn test_display_name() {
        let resolved = ResolvedLocation::File(PathBuf::from("/data/survey.sav"));
        assert_eq!(resolved.display_name(), "survey.sav");
    }
}
