//! Pack references as typed by a user.
//!
//! A pack can be named by numeric project id, by slug, or by one of the
//! catalog website URLs:
//!
//! - `https://www.curseforge.com/projects/<ID>`
//! - `https://www.curseforge.com/minecraft/modpacks/<SLUG>`
//! - `https://www.curseforge.com/minecraft/modpacks/<SLUG>/files/<RELEASE-ID>`
//! - `https://www.curseforge.com/minecraft/modpacks/<SLUG>/download/<RELEASE-ID>`

use std::fmt;

use thiserror::Error;

/// Failure to understand a pack reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The input looks like a URL but not one of the supported forms.
    #[error(
        "unable to parse the URL {0:?}; expected one of:\n  \
         https://www.curseforge.com/projects/<ID>\n  \
         https://www.curseforge.com/minecraft/modpacks/<MODPACK>\n  \
         https://www.curseforge.com/minecraft/modpacks/<MODPACK>/files/<RELEASE-ID>"
    )]
    UnsupportedUrl(String),

    /// The input is neither an id, a slug, nor a URL.
    #[error("invalid pack reference {0:?}")]
    Invalid(String),
}

/// How the pack project is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackTarget {
    /// Numeric catalog project id.
    Id(u64),
    /// Project slug, resolved through a catalog search.
    Slug(String),
}

impl fmt::Display for PackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// A pack project plus, optionally, the release to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRef {
    /// The pack project.
    pub target: PackTarget,
    /// Specific release; the latest release is used when absent.
    pub release_id: Option<u64>,
}

impl PackRef {
    /// Parse a pack reference from user input.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();

        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            return parse_id(input).map(|id| Self::project(PackTarget::Id(id)));
        }

        let mut segments: Vec<&str> = input.split('/').collect();
        if segments.len() >= 2 {
            if segments.last() == Some(&"") {
                segments.pop();
            }
            return parse_url_segments(input, &segments);
        }

        if input.starts_with("http") {
            return Err(ReferenceError::UnsupportedUrl(input.to_string()));
        }

        if !input.is_empty() && slugify(input) == input {
            return Ok(Self::project(PackTarget::Slug(input.to_string())));
        }

        Err(ReferenceError::Invalid(input.to_string()))
    }

    /// Use a specific release, replacing any parsed from the input.
    pub fn with_release(mut self, release_id: Option<u64>) -> Self {
        if release_id.is_some() {
            self.release_id = release_id;
        }
        self
    }

    fn project(target: PackTarget) -> Self {
        Self {
            target,
            release_id: None,
        }
    }
}

fn parse_id(value: &str) -> Result<u64, ReferenceError> {
    value
        .parse()
        .map_err(|_| ReferenceError::Invalid(value.to_string()))
}

fn parse_url_segments(input: &str, segments: &[&str]) -> Result<PackRef, ReferenceError> {
    let unsupported = || ReferenceError::UnsupportedUrl(input.to_string());
    let n = segments.len();
    if n < 2 {
        return Err(unsupported());
    }

    let last = segments[n - 1];
    match segments[n - 2] {
        "modpacks" if !last.is_empty() => Ok(PackRef::project(PackTarget::Slug(last.to_string()))),
        "projects" => {
            let id = last.parse().map_err(|_| unsupported())?;
            Ok(PackRef::project(PackTarget::Id(id)))
        }
        "files" | "download" if n >= 3 && !segments[n - 3].is_empty() => {
            let release_id = last.parse().map_err(|_| unsupported())?;
            Ok(PackRef {
                target: PackTarget::Slug(segments[n - 3].to_string()),
                release_id: Some(release_id),
            })
        }
        _ => Err(unsupported()),
    }
}

/// Reduce text to a lowercase ASCII slug.
///
/// Alphanumerics are kept, apostrophes are dropped, and every other run of
/// characters becomes a single `-`. Leading and trailing separators are
/// trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if c != '\'' {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_numeric_id() {
        assert_eq!(
            PackRef::parse("389615").unwrap(),
            PackRef {
                target: PackTarget::Id(389615),
                release_id: None
            }
        );
    }

    #[test]
    fn test_parse_modpack_url() {
        let pack = PackRef::parse("https://www.curseforge.com/minecraft/modpacks/all-the-mods-6/")
            .unwrap();
        assert_eq!(pack.target, PackTarget::Slug("all-the-mods-6".to_string()));
        assert_eq!(pack.release_id, None);
    }

    #[test]
    fn test_parse_project_url() {
        let pack = PackRef::parse("https://www.curseforge.com/projects/389615").unwrap();
        assert_eq!(pack.target, PackTarget::Id(389615));
    }

    #[test]
    fn test_parse_files_url() {
        let pack = PackRef::parse(
            "https://www.curseforge.com/minecraft/modpacks/all-the-mods-6/files/3276934",
        )
        .unwrap();
        assert_eq!(pack.target, PackTarget::Slug("all-the-mods-6".to_string()));
        assert_eq!(pack.release_id, Some(3276934));
    }

    #[test]
    fn test_parse_download_url() {
        let pack = PackRef::parse(
            "https://www.curseforge.com/minecraft/modpacks/all-the-mods-6/download/3276934",
        )
        .unwrap();
        assert_eq!(pack.release_id, Some(3276934));
    }

    #[test]
    fn test_parse_unsupported_url() {
        assert!(matches!(
            PackRef::parse("https://www.curseforge.com/minecraft/texture-packs"),
            Err(ReferenceError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            PackRef::parse("https://www.curseforge.com/projects/abc"),
            Err(ReferenceError::UnsupportedUrl(_))
        ));
        assert!(matches!(
            PackRef::parse("http:"),
            Err(ReferenceError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_parse_bare_slug() {
        let pack = PackRef::parse("rlcraft").unwrap();
        assert_eq!(pack.target, PackTarget::Slug("rlcraft".to_string()));
    }

    #[test]
    fn test_parse_rejects_non_slug_words() {
        assert!(matches!(
            PackRef::parse("All The Mods"),
            Err(ReferenceError::Invalid(_))
        ));
        assert!(matches!(PackRef::parse(""), Err(ReferenceError::Invalid(_))));
    }

    #[test]
    fn test_with_release_overrides() {
        let pack = PackRef::parse("https://www.curseforge.com/minecraft/modpacks/atm6/files/1")
            .unwrap()
            .with_release(Some(2));
        assert_eq!(pack.release_id, Some(2));

        let pack = pack.with_release(None);
        assert_eq!(pack.release_id, Some(2));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("All the Mods 6"), "all-the-mods-6");
        assert_eq!(slugify("  RLCraft!! "), "rlcraft");
        assert_eq!(slugify("Roguelike Adventures and Dungeons"), "roguelike-adventures-and-dungeons");
        assert_eq!(slugify("Valhelsia 3-3.4.1a"), "valhelsia-3-3-4-1a");
        assert_eq!(slugify("It's Magic"), "its-magic");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_pack_target_display() {
        assert_eq!(PackTarget::Id(5).to_string(), "5");
        assert_eq!(PackTarget::Slug("atm6".to_string()).to_string(), "atm6");
    }

    proptest! {
        #[test]
        fn prop_slugify_is_idempotent(text in ".{0,40}") {
            let once = slugify(&text);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn prop_slug_charset(text in ".{0,40}") {
            let slug = slugify(&text);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn prop_slugs_parse_as_themselves(text in "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,8}){0,3}") {
            let pack = PackRef::parse(&text).unwrap();
            prop_assert_eq!(pack.target, PackTarget::Slug(text.clone()));
        }
    }
}
