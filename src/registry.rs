// Copyright 2024-2026 the Weft authors. MIT license.

use std::cell::RefCell;

use indexmap::IndexMap;

use crate::module_path::ModulePath;
use crate::runtime::ObjectRef;

/// One loaded module: its identity and the export object every importer
/// shares. Records are cheap to clone; the export object is a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
  pub path: ModulePath,
  pub exports: ObjectRef,
}

/// The process lifetime mapping from absolute module path to module
/// record, in registration order. At most one record exists per path and
/// the loading pipeline never evicts; removal exists so a loader can take
/// back a placeholder it registered for a load that then failed.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
  modules: RefCell<IndexMap<ModulePath, ModuleRecord>>,
}

impl ModuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, path: &ModulePath) -> Option<ModuleRecord> {
    self.modules.borrow().get(path).cloned()
  }

  pub fn contains(&self, path: &ModulePath) -> bool {
    self.modules.borrow().contains_key(path)
  }

  /// Returns the export object registered for `path`, inserting a record
  /// with a fresh empty export object if none exists. An existing record
  /// keeps its identity, which is what lets a placeholder registered
  /// before instantiation end up as the instantiated module's exports.
  pub fn ensure(&self, path: &ModulePath) -> ObjectRef {
    self
      .modules
      .borrow_mut()
      .entry(path.clone())
      .or_insert_with(|| ModuleRecord {
        path: path.clone(),
        exports: ObjectRef::new(),
      })
      .exports
      .clone()
  }

  pub fn remove(&self, path: &ModulePath) -> Option<ModuleRecord> {
    self.modules.borrow_mut().shift_remove(path)
  }

  pub fn len(&self) -> usize {
    self.modules.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.borrow().is_empty()
  }

  /// The registered paths in registration order.
  pub fn paths(&self) -> Vec<ModulePath> {
    self.modules.borrow().keys().cloned().collect()
  }
}
