// Copyright 2024-2026 the Weft authors. MIT license.

use std::rc::Rc;

use futures::future::join_all;
use thiserror::Error;

use crate::cache::with_cache;
use crate::cache::CacheKeyPart;
use crate::cache::CacheStore;
use crate::cache::CacheStoreError;
use crate::diagnostics::ParseDiagnostic;
use crate::module_path::ModulePath;
use crate::module_path::PathResolver;
use crate::module_path::RelativeResolver;
use crate::module_path::ResolveError;
use crate::registry::ModuleRegistry;
use crate::runtime::instantiate_module;
use crate::runtime::EvalError;
use crate::runtime::ObjectRef;
use crate::source::LogSink;
use crate::source::ModuleLoader;
use crate::source::StdLogSink;
use crate::syntax::ModuleKind;
use crate::transform::has_no_cache_pragma;
use crate::transform::transform_module;
use crate::transform::SyntaxPass;

#[derive(Debug, Clone, Error)]
pub enum LoadError {
  #[error(transparent)]
  Parse(#[from] ParseDiagnostic),
  #[error(transparent)]
  Resolve(#[from] ResolveError),
  #[error(transparent)]
  Store(#[from] CacheStoreError),
  #[error(transparent)]
  Eval(#[from] EvalError),
  #[error("module \"{path}\" has no registered source")]
  MissingSource { path: ModulePath },
}

/// Options affecting how modules are compiled and cached.
pub struct LoaderOptions {
  /// Participates in every cache key, so bumping it invalidates all
  /// previously stored artifacts. Defaults to this crate's version.
  pub version_tag: String,
  /// When true, emitted module text carries a position comment per
  /// statement pointing back at the original source.
  pub emit_source_positions: bool,
  /// Extra tree passes, run in order after module syntax lowering.
  pub passes: Vec<Rc<dyn SyntaxPass>>,
}

impl Default for LoaderOptions {
  fn default() -> Self {
    Self {
      version_tag: env!("CARGO_PKG_VERSION").to_string(),
      emit_source_positions: false,
      passes: Vec::new(),
    }
  }
}

/// Everything a load needs, bundled so the pipeline and the host's
/// [`ModuleLoader`] can hand one value back and forth across the
/// recursion. All collaborators default to their built in implementations;
/// replace the fields you need before the first load.
pub struct LoaderContext {
  pub loader: Rc<dyn ModuleLoader>,
  pub resolver: Rc<dyn PathResolver>,
  pub registry: Rc<ModuleRegistry>,
  pub maybe_cache: Option<Rc<dyn CacheStore>>,
  pub logger: Rc<dyn LogSink>,
  pub options: LoaderOptions,
}

impl LoaderContext {
  pub fn new(loader: Rc<dyn ModuleLoader>) -> Self {
    Self {
      loader,
      resolver: Rc::new(RelativeResolver),
      registry: Rc::new(ModuleRegistry::new()),
      maybe_cache: None,
      logger: Rc::new(StdLogSink),
      options: LoaderOptions::default(),
    }
  }

  pub(crate) fn log(&self, level: log::Level, message: &str) {
    self.logger.log(level, message);
  }
}

/// Loads every dependency of a module concurrently, resolving each
/// specifier against the referrer first. A specifier that fails to
/// resolve fails the whole call before any load starts; once loading
/// begins, the first load failure is reported after the in flight loads
/// settle.
pub async fn load_dependencies(
  ctx: &LoaderContext,
  referrer: &ModulePath,
  dependencies: &[String],
) -> Result<(), LoadError> {
  let mut resolved = Vec::with_capacity(dependencies.len());
  for specifier in dependencies {
    resolved.push(ctx.resolver.resolve(specifier, referrer)?);
  }
  let loads = resolved.iter().map(|path| ctx.loader.load(ctx, path));
  // every load runs to completion; a load dropped mid flight strands
  // the record it pre-registered
  for result in join_all(loads).await {
    result?;
  }
  Ok(())
}

/// Runs the full pipeline for one module: compile (through the cache when
/// one is configured), load dependencies, instantiate.
///
/// This does not consult the registry; deduplication of repeated loads is
/// the [`ModuleLoader`]'s responsibility. Hosts normally call their
/// loader and let it call back in here for paths it has not seen.
pub async fn load_script_module(
  ctx: &LoaderContext,
  path: &ModulePath,
  source: &str,
  kind: ModuleKind,
) -> Result<ObjectRef, LoadError> {
  let artifact = with_cache(
    ctx.maybe_cache.as_deref(),
    &[
      CacheKeyPart::Text(&ctx.options.version_tag),
      CacheKeyPart::Text(source),
      CacheKeyPart::Text(path.as_str()),
    ],
    |control| async move {
      if has_no_cache_pragma(source) {
        control.no_store();
      }
      transform_module(ctx, path, source, kind).await
    },
  )
  .await?;
  load_dependencies(ctx, path, &artifact.dependencies).await?;
  instantiate_module(ctx, path, &artifact.text).await
}
