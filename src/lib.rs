// Copyright 2024-2026 the Weft authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod cache;
mod diagnostics;
mod loader;
mod module_path;
mod registry;
mod runtime;
pub mod source;
pub mod syntax;
mod transform;

pub use cache::fingerprint;
pub use cache::with_cache;
pub use cache::CacheControl;
pub use cache::CacheKeyPart;
pub use cache::CacheStore;
pub use cache::CacheStoreError;
pub use cache::MemoryCacheStore;
pub use diagnostics::format_source_error;
pub use diagnostics::ParseDiagnostic;
pub use diagnostics::Position;
pub use loader::load_dependencies;
pub use loader::load_script_module;
pub use loader::LoadError;
pub use loader::LoaderContext;
pub use loader::LoaderOptions;
pub use module_path::resolve_import;
pub use module_path::ModulePath;
pub use module_path::PathResolver;
pub use module_path::RelativeResolver;
pub use module_path::ResolveError;
pub use registry::ModuleRecord;
pub use registry::ModuleRegistry;
pub use runtime::instantiate_module;
pub use runtime::EvalError;
pub use runtime::ObjectRef;
pub use runtime::Value;
pub use syntax::ModuleKind;
pub use transform::has_no_cache_pragma;
pub use transform::transform_module;
pub use transform::CompiledArtifact;
pub use transform::SyntaxPass;
pub use transform::DIRNAME_BINDING;
pub use transform::DYNAMIC_IMPORT_FN;
pub use transform::EXPORTS_BINDING;
pub use transform::FILENAME_BINDING;
pub use transform::MODULE_BINDING;
pub use transform::REQUIRE_FN;

/// Loads a module through the context's [`source::ModuleLoader`],
/// returning its export object. Loading is recursive: static dependencies
/// load before the module's body runs, and dynamic imports load when
/// evaluation reaches them.
pub async fn load_module(
  ctx: &LoaderContext,
  path: &ModulePath,
) -> Result<ObjectRef, LoadError> {
  ctx.loader.load(ctx, path).await
}
