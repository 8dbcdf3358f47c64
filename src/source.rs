// Copyright 2024-2026 the Weft authors. MIT license.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::loader::load_script_module;
use crate::loader::LoadError;
use crate::loader::LoaderContext;
use crate::module_path::ModulePath;
use crate::runtime::ObjectRef;
use crate::syntax::ModuleKind;

pub type ModuleLoadFuture<'a> =
  LocalBoxFuture<'a, Result<ObjectRef, LoadError>>;

/// The recursive load contract: given an absolute path, produce the
/// module's export object, loading and instantiating it if needed. The
/// pipeline calls back into this for every static dependency and every
/// dynamic import, so an implementation decides where source text comes
/// from and whether concurrent requests for one path share a single
/// in-flight load.
pub trait ModuleLoader {
  fn load<'a>(
    &'a self,
    ctx: &'a LoaderContext,
    path: &'a ModulePath,
  ) -> ModuleLoadFuture<'a>;
}

/// Destination for loader diagnostics, primarily rendered parse errors.
/// Levels follow the `log` crate.
pub trait LogSink: fmt::Debug {
  fn log(&self, level: log::Level, message: &str);
}

/// The default sink: forwards to the `log` macro facade, so whatever
/// logger the host process installed sees loader diagnostics.
#[derive(Debug, Default)]
pub struct StdLogSink;

impl LogSink for StdLogSink {
  fn log(&self, level: log::Level, message: &str) {
    log::log!(level, "{}", message);
  }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
  fn log(&self, _level: log::Level, _message: &str) {}
}

#[derive(Debug, Clone)]
struct StoredSource {
  text: Arc<str>,
  kind: ModuleKind,
}

/// A [`ModuleLoader`] whose sources are provided ahead of time. This is
/// useful for testing and for hosts that embed their module sources.
///
/// Loads are deduplicated through the registry: a path already registered
/// (loaded or still in flight) returns the registered export object
/// without running the pipeline again. The record for a load is
/// registered before the pipeline's first suspension point, so diamond
/// shaped imports share one instantiation and cyclic imports observe the
/// partially built exports of their importer instead of deadlocking. A
/// failed load takes its placeholder record back out, leaving the path
/// loadable again.
#[derive(Debug, Default)]
pub struct MemoryModuleLoader {
  sources: HashMap<ModulePath, StoredSource>,
}

impl MemoryModuleLoader {
  pub fn new<S: AsRef<str>>(sources: Vec<(S, S)>) -> Self {
    let mut loader = Self::default();
    for (path, text) in sources {
      loader.add_source(path, text);
    }
    loader
  }

  /// Registers module source at a path, replacing any previous source.
  pub fn add_source(&mut self, path: impl AsRef<str>, text: impl AsRef<str>) {
    self.sources.insert(
      ModulePath::new(path.as_ref()).unwrap(),
      StoredSource {
        text: text.as_ref().into(),
        kind: ModuleKind::Module,
      },
    );
  }

  /// Registers source that parses in script mode, for files that use the
  /// lowered convention directly.
  pub fn add_script_source(
    &mut self,
    path: impl AsRef<str>,
    text: impl AsRef<str>,
  ) {
    self.sources.insert(
      ModulePath::new(path.as_ref()).unwrap(),
      StoredSource {
        text: text.as_ref().into(),
        kind: ModuleKind::Script,
      },
    );
  }
}

impl ModuleLoader for MemoryModuleLoader {
  fn load<'a>(
    &'a self,
    ctx: &'a LoaderContext,
    path: &'a ModulePath,
  ) -> ModuleLoadFuture<'a> {
    async move {
      // registry check and placeholder registration stay on the
      // synchronous side of the first suspension point
      if let Some(record) = ctx.registry.get(path) {
        return Ok(record.exports);
      }
      ctx.registry.ensure(path);
      let Some(source) = self.sources.get(path).cloned() else {
        ctx.registry.remove(path);
        return Err(LoadError::MissingSource { path: path.clone() });
      };
      match load_script_module(ctx, path, &source.text, source.kind).await {
        Ok(exports) => Ok(exports),
        Err(err) => {
          ctx.registry.remove(path);
          Err(err)
        }
      }
    }
    .boxed_local()
  }
}

#[cfg(test)]
pub mod tests {
  use std::cell::RefCell;

  use super::*;

  /// A log sink that keeps everything it is handed, for asserting on
  /// reported diagnostics.
  #[derive(Debug, Default)]
  pub struct CapturingLogSink {
    entries: RefCell<Vec<(log::Level, String)>>,
  }

  impl CapturingLogSink {
    pub fn take(&self) -> Vec<(log::Level, String)> {
      self.entries.take()
    }
  }

  impl LogSink for CapturingLogSink {
    fn log(&self, level: log::Level, message: &str) {
      self.entries.borrow_mut().push((level, message.to_string()));
    }
  }
}
