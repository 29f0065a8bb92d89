//! Filename search-path resolution, grounded on `ps_path.c`.
//!
//! A definition name is split into directory/basename/extension; if it
//! carries no extension the default (`.def.json`) is appended. The name is
//! tried as-is, then — if relative and unresolved — against each directory
//! in the search list in order, joined with the name's own directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, RunResult};

struct PathParts {
    directory: String,
    basename: String,
    extension: String,
}

impl PathParts {
    fn split(name: &str) -> Self {
        let (directory, rest) = match name.rfind('/') {
            Some(i) => (&name[..=i], &name[i + 1..]),
            None => ("", name),
        };
        let (basename, extension) = match rest.find('.') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Self { directory: directory.to_owned(), basename: basename.to_owned(), extension: extension.to_owned() }
    }

    fn joined(&self) -> String {
        format!("{}{}{}", self.directory, self.basename, self.extension)
    }

    fn is_absolute(&self) -> bool {
        self.directory.starts_with('/')
    }
}

fn ensure_trailing_slash(dir: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        dir.to_owned()
    } else {
        format!("{dir}/")
    }
}

/// Resolves `name` to a readable file's contents, trying `name` as-is and
/// then each entry of `search` (joined with `name`'s own relative
/// directory), appending `default_ext` when `name` has no extension of its
/// own. Returns the file contents plus the path that actually resolved.
pub fn open_search(name: &str, default_ext: &str, search: &[String]) -> RunResult<(String, String)> {
    let mut parts = PathParts::split(name);
    if parts.extension.is_empty() {
        parts.extension = default_ext.to_owned();
    }

    let mut tried = Vec::new();
    let direct = parts.joined();
    tried.push(direct.clone());
    if let Ok(contents) = fs::read_to_string(&direct) {
        return Ok((contents, direct));
    }

    if !parts.is_absolute() {
        for dir in search {
            let candidate = PathParts {
                directory: format!("{}{}", ensure_trailing_slash(dir), parts.directory),
                basename: parts.basename.clone(),
                extension: parts.extension.clone(),
            };
            let joined = candidate.joined();
            tried.push(joined.clone());
            if let Ok(contents) = fs::read_to_string(&joined) {
                return Ok((contents, joined));
            }
        }
    }

    Err(CoreError::FileNotFound { name: name.to_owned(), tried })
}

/// True if `path` names an existing regular file without consulting the
/// search list — used by the CLI to validate a directly-given path.
pub fn exists(path: &str) -> bool {
    Path::new(path).is_file()
}

pub fn parent_dir(path: &str) -> PathBuf {
    Path::new(path).parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_separates_directory_basename_and_extension() {
        let p = PathParts::split("profiles/generic.def.json");
        assert_eq!(p.directory, "profiles/");
        assert_eq!(p.basename, "generic");
        assert_eq!(p.extension, ".def.json");
    }

    #[test]
    fn split_handles_a_bare_name_with_no_extension() {
        let p = PathParts::split("generic");
        assert_eq!(p.directory, "");
        assert_eq!(p.basename, "generic");
        assert_eq!(p.extension, "");
    }

    #[test]
    fn ensure_trailing_slash_is_idempotent() {
        assert_eq!(ensure_trailing_slash("a/b"), "a/b/");
        assert_eq!(ensure_trailing_slash("a/b/"), "a/b/");
        assert_eq!(ensure_trailing_slash(""), "");
    }

    #[test]
    fn open_search_reports_every_path_it_tried() {
        let err = open_search("definitely_missing", ".def.json", &["one".to_owned(), "two".to_owned()]).unwrap_err();
        match err {
            CoreError::FileNotFound { tried, .. } => {
                assert_eq!(tried, vec!["definitely_missing.def.json", "one/definitely_missing.def.json", "two/definitely_missing.def.json"]);
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }
}
