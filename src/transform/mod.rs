// Copyright 2024-2026 the Weft authors. MIT license.

mod dependencies;
mod dynamic_import;
mod lower;

pub use dependencies::collect_dependencies;
pub use dynamic_import::rewrite_dynamic_imports;
pub use lower::LowerModules;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::loader::LoadError;
use crate::loader::LoaderContext;
use crate::module_path::ModulePath;
use crate::syntax;
use crate::syntax::emit_module;
use crate::syntax::EmitOptions;
use crate::syntax::Module;
use crate::syntax::ModuleKind;

/// The well known synchronous fetch binding lowered module code calls to
/// pull an already registered dependency.
pub const REQUIRE_FN: &str = "require";
/// The ordinary named call the reserved `import(...)` operator is
/// rewritten to.
pub const DYNAMIC_IMPORT_FN: &str = "__weft_import";
/// The export object binding exposed to executing module code.
pub const EXPORTS_BINDING: &str = "exports";
/// The module record binding wrapping the export object.
pub const MODULE_BINDING: &str = "module";
pub const FILENAME_BINDING: &str = "__filename";
pub const DIRNAME_BINDING: &str = "__dirname";

/// Matches the `// @weft-no-cache` pragma, which keeps a module's compiled
/// artifact out of the persistent cache.
static NO_CACHE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?m)^\s*//\s*@weft-no-cache\b").unwrap());

pub fn has_no_cache_pragma(source: &str) -> bool {
  NO_CACHE_RE.is_match(source)
}

/// The cacheable output of transforming one module: its static dependency
/// specifiers in source order (duplicates preserved) and the lowered
/// source text the instantiator executes. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
  pub dependencies: Vec<String>,
  pub text: Arc<str>,
}

/// A syntax tree rewrite. The built in [`LowerModules`] pass runs first;
/// passes configured on the loader run after it, in order, against the
/// already lowered tree.
pub trait SyntaxPass {
  fn name(&self) -> &'static str;
  fn run(&self, module: &mut Module);
}

/// Parses, rewrites and lowers one module to a [`CompiledArtifact`].
///
/// Parse failures are rendered against the source, reported through the
/// context's log sink at error level, and re-raised; they are fatal for
/// this module and, through dependency loading, for its dependents.
pub async fn transform_module(
  ctx: &LoaderContext,
  path: &ModulePath,
  source: &str,
  kind: ModuleKind,
) -> Result<CompiledArtifact, LoadError> {
  let mut module = match syntax::parse(path, source, kind) {
    Ok(module) => module,
    Err(diagnostic) => {
      ctx.log(log::Level::Error, &diagnostic.display_with_source(source));
      return Err(diagnostic.into());
    }
  };
  rewrite_dynamic_imports(&mut module);
  let dependencies = collect_dependencies(&module);
  LowerModules.run(&mut module);
  for pass in &ctx.options.passes {
    pass.run(&mut module);
  }
  let text = emit_module(
    &module,
    &EmitOptions {
      source_positions: ctx.options.emit_source_positions,
    },
  );
  Ok(CompiledArtifact {
    dependencies,
    text: text.into(),
  })
}
