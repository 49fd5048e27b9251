//! Object key mapping
//!
//! Turns local file paths into remote object keys. Keys always use `/` as
//! separator and never contain `..`, empty or `.` segments.
//!
//! - single file: `prefix/<file name>`
//! - folder: `prefix/<path relative to the folder>`; the folder's own name is
//!   not part of the key, the prefix already names the destination.

use std::path::{Component, Path};

use crate::error::{Error, Result};

/// Key for a single-file upload: `prefix/basename(file)`
pub fn file_key(file: &Path, prefix: &str) -> Result<String> {
    let name = file
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", file.display())))?;
    let name = name
        .to_str()
        .ok_or_else(|| Error::InvalidPath(format!("{} is not valid UTF-8", file.display())))?;

    join_key(prefix, [name])
}

/// Key for a file found while walking `root`
///
/// When `file` is `root` itself (a single file handed to the folder upload),
/// the file name is used, same as [`file_key`].
pub fn folder_key(root: &Path, file: &Path, prefix: &str) -> Result<String> {
    let relative = file.strip_prefix(root).map_err(|_| {
        Error::PathTraversal(format!(
            "{} is not inside {}",
            file.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::InvalidPath(format!("{} is not valid UTF-8", file.display()))
                })?;
                segments.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal(format!(
                    "{} escapes {}",
                    file.display(),
                    root.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return file_key(file, prefix);
    }

    join_key(prefix, segments)
}

/// Join a prefix and path segments into an object key
///
/// The prefix is normalized: surrounding and repeated slashes and `.`
/// segments are dropped. A `..` segment anywhere is rejected.
pub fn join_key<'a>(prefix: &str, segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();

    let prefix_parts = prefix.split('/').map(str::to_string);
    let segment_parts = segments.into_iter().map(str::to_string);
    for part in prefix_parts.chain(segment_parts) {
        match part.as_str() {
            "" | "." => {}
            ".." => {
                return Err(Error::PathTraversal(format!(
                    "'..' is not allowed in object keys (prefix '{prefix}')"
                )));
            }
            _ => parts.push(part),
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath("object key cannot be empty".into()));
    }

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_file_key_with_prefix() {
        let key = file_key(Path::new("./build/app.zip"), "releases/v1").unwrap();
        assert_eq!(key, "releases/v1/app.zip");
    }

    #[test]
    fn test_file_key_without_prefix() {
        let key = file_key(Path::new("/tmp/app.zip"), "").unwrap();
        assert_eq!(key, "app.zip");
    }

    #[test]
    fn test_file_key_drops_directories() {
        let key = file_key(Path::new("a/b/c/app.zip"), "p").unwrap();
        assert_eq!(key, "p/app.zip");
    }

    #[test]
    fn test_prefix_is_normalized() {
        let key = file_key(Path::new("app.zip"), "/releases//v1/./").unwrap();
        assert_eq!(key, "releases/v1/app.zip");
    }

    #[test]
    fn test_prefix_with_parent_segment_is_rejected() {
        let err = file_key(Path::new("app.zip"), "releases/../secrets").unwrap_err();
        assert!(matches!(err, Error::PathTraversal(_)));
    }

    #[test]
    fn test_folder_key_preserves_structure() {
        let root = Path::new("dist");
        let file = root.join("assets").join("css").join("site.css");
        let key = folder_key(root, &file, "web").unwrap();
        assert_eq!(key, "web/assets/css/site.css");
    }

    #[test]
    fn test_folder_key_does_not_add_folder_name() {
        let key = folder_key(Path::new("./dist"), Path::new("./dist/index.html"), "v2").unwrap();
        assert_eq!(key, "v2/index.html");
    }

    #[test]
    fn test_folder_key_root_is_file() {
        let file = Path::new("dist/app.zip");
        let key = folder_key(file, file, "v2").unwrap();
        assert_eq!(key, "v2/app.zip");
    }

    #[test]
    fn test_folder_key_outside_root_is_rejected() {
        let err = folder_key(Path::new("dist"), Path::new("other/file.txt"), "p").unwrap_err();
        assert!(matches!(err, Error::PathTraversal(_)));
    }

    #[test]
    fn test_folder_key_parent_component_is_rejected() {
        let root = Path::new("dist");
        let file = PathBuf::from("dist/../etc/passwd");
        let err = folder_key(root, &file, "p").unwrap_err();
        assert!(matches!(err, Error::PathTraversal(_)));
    }

    #[test]
    fn test_folder_key_shape() {
        let root = Path::new("/srv/build");
        let files = [
            "/srv/build/a.txt",
            "/srv/build/x/y/z.bin",
            "/srv/build/./x/w.txt",
        ];
        for file in files {
            let key = folder_key(root, Path::new(file), "deploy").unwrap();
            assert!(key.starts_with("deploy/"));
            assert!(!key.contains('\\'));
            assert!(!key.split('/').any(|s| s == ".." || s == "." || s.is_empty()));
        }
    }

    #[test]
    fn test_folder_key_is_deterministic() {
        let root = Path::new("dist");
        let file = Path::new("dist/js/app.js");
        let first = folder_key(root, file, "p").unwrap();
        for _ in 0..10 {
            assert_eq!(folder_key(root, file, "p").unwrap(), first);
        }
    }

    #[test]
    fn test_join_key_empty_is_invalid() {
        assert!(matches!(
            join_key("", std::iter::empty()),
            Err(Error::InvalidPath(_))
        ));
    }
}
