use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::classify::StatementCategory;
use crate::error::SqlOpError;
use crate::operation::Operation;
use crate::preprocess::{StatementSource, compact};
use crate::translation::PlaceholderStyle;
use crate::types::SqlDialect;

enum Slot {
    Pending(StatementSource),
    Bound(Arc<Operation>),
}

/// How sources are turned into operations for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    pub dialect: SqlDialect,
    pub style: PlaceholderStyle,
}

impl Compiler {
    /// Compact, classify and synthesize `source`.
    ///
    /// # Errors
    /// Returns the preprocessing error (`ParseError`/`IoError`) for a bad source.
    pub fn compile(&self, name: &str, source: &StatementSource) -> Result<Operation, SqlOpError> {
        let compacted = compact(source, self.dialect)?;
        Operation::synthesize(name, &compacted, self.style)
    }
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Name to operation table. Lazy entries are synthesized on first access, under that
/// entry's own lock, so concurrent first lookups compile once.
pub struct OperationRegistry {
    compiler: Compiler,
    slots: RwLock<HashMap<String, Arc<Mutex<Slot>>>>,
    bound: AtomicUsize,
    cache_capacity: Option<usize>,
    over_capacity: AtomicBool,
}

impl OperationRegistry {
    #[must_use]
    pub fn new(compiler: Compiler, cache_capacity: Option<usize>) -> Self {
        Self {
            compiler,
            slots: RwLock::new(HashMap::new()),
            bound: AtomicUsize::new(0),
            cache_capacity,
            over_capacity: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn compiler(&self) -> Compiler {
        self.compiler
    }

    /// Record `source` under `name`, replacing any previous entry.
    ///
    /// # Errors
    /// When `lazy` is false, compilation errors surface here and the registry is left
    /// unchanged.
    pub fn register(
        &self,
        name: &str,
        source: StatementSource,
        lazy: bool,
    ) -> Result<(), SqlOpError> {
        let slot = if lazy {
            Slot::Pending(source)
        } else {
            Slot::Bound(Arc::new(self.compiler.compile(name, &source)?))
        };
        let now_bound = matches!(slot, Slot::Bound(_));

        let previous = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(Mutex::new(slot)));
        let was_bound = match previous {
            Some(previous) => {
                let guard = lock_slot(&previous);
                matches!(*guard, Slot::Bound(_))
            }
            None => false,
        };

        match (was_bound, now_bound) {
            (false, true) => {
                self.note_bound();
            }
            (true, false) => self.note_unbound(),
            _ => {}
        }
        debug!(operation = name, lazy, replaced = was_bound, "registered operation");
        Ok(())
    }

    /// Look up `name`, synthesizing it first if it is still pending.
    ///
    /// # Errors
    /// Returns `SqlOpError::UnknownOperationError` for unregistered names, or the
    /// compilation error of a pending source (which then stays pending).
    pub fn get(&self, name: &str) -> Result<Arc<Operation>, SqlOpError> {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SqlOpError::UnknownOperationError(name.to_string()))?;

        let mut guard = lock_slot(&slot);
        match &*guard {
            Slot::Bound(operation) => Ok(Arc::clone(operation)),
            Slot::Pending(source) => {
                let operation = Arc::new(self.compiler.compile(name, source)?);
                *guard = Slot::Bound(Arc::clone(&operation));
                self.note_bound();
                debug!(operation = name, category = %operation.category(), "bound lazy operation");
                Ok(operation)
            }
        }
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once `name` has been synthesized. Unknown names are not bound.
    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        let slot = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        slot.is_some_and(|slot| {
            let guard = lock_slot(&slot);
            matches!(*guard, Slot::Bound(_))
        })
    }

    /// Category of `name`, binding it if needed.
    ///
    /// # Errors
    /// Same as [`OperationRegistry::get`].
    pub fn category(&self, name: &str) -> Result<StatementCategory, SqlOpError> {
        Ok(self.get(name)?.category())
    }

    /// Forget `name`. Returns whether it was registered.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        match removed {
            Some(slot) => {
                let was_bound = {
                    let guard = lock_slot(&slot);
                    matches!(*guard, Slot::Bound(_))
                };
                if was_bound {
                    self.note_unbound();
                }
                true
            }
            None => false,
        }
    }

    /// Count one more bound operation. Returns whether this crossed the cache capacity.
    fn note_bound(&self) -> bool {
        let bound = self.bound.fetch_add(1, Ordering::SeqCst) + 1;
        let Some(capacity) = self.cache_capacity else {
            return false;
        };
        if bound > capacity && !self.over_capacity.swap(true, Ordering::SeqCst) {
            warn!(
                bound,
                capacity,
                "more operations than prepared statement cache slots; statements will be re-prepared"
            );
            return true;
        }
        false
    }

    fn note_unbound(&self) {
        let bound = self.bound.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        if self.cache_capacity.is_some_and(|capacity| bound <= capacity) {
            self.over_capacity.store(false, Ordering::SeqCst);
        }
    }
}
