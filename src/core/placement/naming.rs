//! Collision-safe alternate file names.
//!
//! Names are handled as `OsStr` so a file whose name is not valid UTF-8
//! keeps its exact bytes when it is placed or renamed.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Insert `suffix` between the stem and the extension.
///
/// `IMG_1.jpg` + `_x` becomes `IMG_1_x.jpg`; a name without an extension
/// (or a dotfile such as `.profile`) gets the suffix at the end.
pub fn append_before_extension(name: &OsStr, suffix: &str) -> OsString {
    let (stem, extension) = split_extension(name);
    let mut out = OsString::with_capacity(name.len() + suffix.len());
    out.push(stem);
    out.push(suffix);
    if let Some(extension) = extension {
        out.push(".");
        out.push(extension);
    }
    out
}

/// Split a name into stem and extension (without the dot)
pub fn split_extension(name: &OsStr) -> (&OsStr, Option<&OsStr>) {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), extension) => (stem, extension),
        (None, _) => (name, None),
    }
}

/// Alternate names for `name`, tagged with the current time in millis.
///
/// The first candidate is `<stem>_<tag>_<millis>.<ext>`; later ones add
/// a counter so a burst of collisions inside one millisecond still
/// finds a free name.
pub fn tagged_candidates<'a>(
    name: &'a OsStr,
    tag: &'a str,
    max_attempts: u32,
) -> impl Iterator<Item = OsString> + 'a {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    (0..max_attempts).map(move |attempt| {
        let suffix = if attempt == 0 {
            format!("_{}_{}", tag, millis)
        } else {
            format!("_{}_{}_{}", tag, millis, attempt)
        };
        append_before_extension(name, &suffix)
    })
}

/// True when `candidate` looks like an earlier tagged copy of `name`
pub fn is_tagged_variant(name: &OsStr, tag: &str, candidate: &OsStr) -> bool {
    let (stem, extension) = split_extension(name);
    let (candidate_stem, candidate_extension) = split_extension(candidate);
    if extension != candidate_extension {
        return false;
    }

    // Only ASCII is matched past the shared stem, so byte-level
    // comparison is safe on any platform encoding
    candidate_stem
        .as_encoded_bytes()
        .strip_prefix(stem.as_encoded_bytes())
        .and_then(|rest| rest.strip_prefix(b"_"))
        .and_then(|rest| rest.strip_prefix(tag.as_bytes()))
        .and_then(|rest| rest.strip_prefix(b"_"))
        .is_some_and(|token| {
            !token.is_empty() && token.iter().all(|b| b.is_ascii_digit() || *b == b'_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(name: &str) -> &OsStr {
        OsStr::new(name)
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(append_before_extension(os("IMG_1.jpg"), "_x"), "IMG_1_x.jpg");
        assert_eq!(
            append_before_extension(os("archive.tar.gz"), "_x"),
            "archive.tar_x.gz"
        );
    }

    #[test]
    fn names_without_extension_get_suffix_at_end() {
        assert_eq!(append_before_extension(os("README"), "_x"), "README_x");
        assert_eq!(append_before_extension(os(".profile"), "_x"), ".profile_x");
    }

    #[test]
    fn candidates_are_unique() {
        let names: Vec<String> = tagged_candidates(os("a.jpg"), "similar", 5)
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names[0].starts_with("a_similar_"));
        assert!(names.iter().all(|n| n.ends_with(".jpg")));

        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 5);
    }

    #[test]
    fn tagged_variants_are_recognised() {
        let name = os("a.jpg");
        assert!(is_tagged_variant(name, "similar", os("a_similar_1700000000000.jpg")));
        assert!(is_tagged_variant(name, "similar", os("a_similar_1700000000000_2.jpg")));
        assert!(!is_tagged_variant(name, "similar", os("a_similar_.jpg")));
        assert!(!is_tagged_variant(name, "similar", os("a_similar_1.png")));
        assert!(!is_tagged_variant(name, "similar", os("ab_similar_1.jpg")));
        assert!(!is_tagged_variant(name, "duplicate", os("a_similar_1.jpg")));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_keep_their_bytes() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let name = OsStr::from_bytes(b"caf\xe9.jpg");
        let renamed = append_before_extension(name, "_similar_1");

        assert_eq!(renamed.into_vec(), b"caf\xe9_similar_1.jpg".to_vec());
        assert!(is_tagged_variant(
            name,
            "similar",
            OsStr::from_bytes(b"caf\xe9_similar_1.jpg")
        ));
    }
}
