// Copyright 2024-2026 the Weft authors. MIT license.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
  #[error("relative import path \"{specifier}\" not prefixed with / or ./ or ../")]
  ImportPrefixMissing { specifier: String },
  #[error("module path \"{path}\" is not absolute")]
  NotAbsolute { path: String },
  #[error("import path \"{specifier}\" walks out of the root directory")]
  EscapesRoot { specifier: String },
}

/// The normalized absolute path identifying a module for its entire
/// lifetime. Paths always start with `/` and use `/` separators; `.` and
/// `..` segments are resolved away on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
  pub fn new(path: impl AsRef<str>) -> Result<Self, ResolveError> {
    let path = path.as_ref();
    if !path.starts_with('/') {
      return Err(ResolveError::NotAbsolute {
        path: path.to_string(),
      });
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
      match segment {
        "" | "." => {}
        ".." => {
          if segments.pop().is_none() {
            return Err(ResolveError::EscapesRoot {
              specifier: path.to_string(),
            });
          }
        }
        _ => segments.push(segment),
      }
    }
    Ok(ModulePath(format!("/{}", segments.join("/"))))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The directory containing this module, used for relative resolution
  /// and the `__dirname` binding.
  pub fn dir_path(&self) -> &str {
    match self.0.rfind('/') {
      Some(0) | None => "/",
      Some(idx) => &self.0[..idx],
    }
  }
}

impl fmt::Display for ModulePath {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    self.0.fmt(f)
  }
}

impl AsRef<str> for ModulePath {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

/// Resolves a specifier relative to the path of the importing module.
/// Absolute specifiers are taken as is, `./` and `../` specifiers are
/// joined onto the referrer's directory, and anything else is rejected.
pub fn resolve_import(
  specifier: &str,
  referrer: &ModulePath,
) -> Result<ModulePath, ResolveError> {
  if specifier.starts_with('/') {
    ModulePath::new(specifier)
  } else if specifier.starts_with("./") || specifier.starts_with("../") {
    ModulePath::new(format!("{}/{}", referrer.dir_path(), specifier)).map_err(
      |err| match err {
        ResolveError::EscapesRoot { .. } => ResolveError::EscapesRoot {
          specifier: specifier.to_string(),
        },
        other => other,
      },
    )
  } else {
    Err(ResolveError::ImportPrefixMissing {
      specifier: specifier.to_string(),
    })
  }
}

/// A trait which allows the loader to turn the specifier text found in
/// module source into the absolute path of the module it refers to. The
/// default resolution handles absolute and relative specifiers only; hosts
/// with richer policies (search paths, aliases) provide their own
/// implementation.
pub trait PathResolver: fmt::Debug {
  fn resolve(
    &self,
    specifier: &str,
    referrer: &ModulePath,
  ) -> Result<ModulePath, ResolveError> {
    resolve_import(specifier, referrer)
  }
}

/// The default resolver, exposing only the built in relative resolution.
#[derive(Debug, Default, Copy, Clone)]
pub struct RelativeResolver;

impl PathResolver for RelativeResolver {}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_new_normalizes() {
    let cases = [
      ("/a.weft", "/a.weft"),
      ("/app//main.weft", "/app/main.weft"),
      ("/app/./main.weft", "/app/main.weft"),
      ("/app/sub/../main.weft", "/app/main.weft"),
      ("/app/sub/", "/app/sub"),
    ];
    for (input, expected) in cases {
      let path = ModulePath::new(input).unwrap();
      assert_eq!(path.as_str(), expected, "{:?}", input);
    }
  }

  #[test]
  fn test_new_rejects() {
    assert_eq!(
      ModulePath::new("app/main.weft"),
      Err(ResolveError::NotAbsolute {
        path: "app/main.weft".to_string()
      })
    );
    assert_eq!(
      ModulePath::new("/../outside.weft"),
      Err(ResolveError::EscapesRoot {
        specifier: "/../outside.weft".to_string()
      })
    );
  }

  #[test]
  fn test_dir_path() {
    let cases = [
      ("/a.weft", "/"),
      ("/app/main.weft", "/app"),
      ("/app/sub/mod.weft", "/app/sub"),
    ];
    for (input, expected) in cases {
      let path = ModulePath::new(input).unwrap();
      assert_eq!(path.dir_path(), expected, "{:?}", input);
    }
  }

  #[test]
  fn test_resolve_import() {
    let referrer = ModulePath::new("/app/sub/main.weft").unwrap();
    let cases = [
      ("/lib/util.weft", "/lib/util.weft"),
      ("./sibling.weft", "/app/sub/sibling.weft"),
      ("../parent.weft", "/app/parent.weft"),
      ("../../top.weft", "/top.weft"),
      ("./a/./b.weft", "/app/sub/a/b.weft"),
    ];
    for (specifier, expected) in cases {
      let resolved = resolve_import(specifier, &referrer).unwrap();
      assert_eq!(resolved.as_str(), expected, "{:?}", specifier);
    }
  }

  #[test]
  fn test_resolve_import_errors() {
    let referrer = ModulePath::new("/app/main.weft").unwrap();
    assert_eq!(
      resolve_import("util", &referrer),
      Err(ResolveError::ImportPrefixMissing {
        specifier: "util".to_string()
      })
    );
    assert_eq!(
      resolve_import("../../escape.weft", &referrer),
      Err(ResolveError::EscapesRoot {
        specifier: "../../escape.weft".to_string()
      })
    );
  }

  #[test]
  fn test_default_resolver_delegates() {
    let referrer = ModulePath::new("/app/main.weft").unwrap();
    let resolved = RelativeResolver.resolve("./dep.weft", &referrer).unwrap();
    assert_eq!(resolved.as_str(), "/app/dep.weft");
  }
}
