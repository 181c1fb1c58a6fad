use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tracing::{debug, trace, warn};

use crate::backend::Backend;
use crate::error::SqlOpError;

/// Whether a scope currently holds the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Idle,
    Open,
}

/// Serializes access to one backend connection and wraps work in transaction scopes.
///
/// Other threads block until the current scope is released. The holding thread trying to
/// open a second scope gets [`SqlOpError::AlreadyInTransactionError`] instead of
/// deadlocking.
pub struct TransactionCoordinator<B> {
    backend: Mutex<B>,
    holder: Mutex<Option<ThreadId>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<B: Backend> TransactionCoordinator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
            holder: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> ScopeState {
        if lock(&self.holder).is_some() {
            ScopeState::Open
        } else {
            ScopeState::Idle
        }
    }

    fn lease(&self) -> Result<Lease<'_, B>, SqlOpError> {
        let me = thread::current().id();
        if *lock(&self.holder) == Some(me) {
            return Err(SqlOpError::AlreadyInTransactionError);
        }

        let backend = lock(&self.backend);
        *lock(&self.holder) = Some(me);
        Ok(Lease {
            _holder: HolderGuard {
                holder: &self.holder,
            },
            backend,
        })
    }

    /// Open a scope, blocking while another thread holds the connection.
    ///
    /// # Errors
    /// Returns `SqlOpError::AlreadyInTransactionError` if this thread already holds a scope,
    /// or the backend's error if a native `begin` fails.
    pub fn begin(&self) -> Result<TransactionScope<'_, B>, SqlOpError> {
        let mut lease = self.lease()?;
        if lease.backend.capabilities().native_transactions {
            lease.backend.begin()?;
        }
        trace!("transaction scope opened");
        Ok(TransactionScope {
            lease,
            finished: false,
        })
    }

    /// Run `f` inside one scope: commit on `Ok`, roll back on `Err` and return it unchanged.
    ///
    /// # Errors
    /// Returns the error from `f`, from opening the scope, or from the commit.
    pub fn run<T, F>(&self, f: F) -> Result<T, SqlOpError>
    where
        F: FnOnce(&mut B) -> Result<T, SqlOpError>,
    {
        let mut scope = self.begin()?;
        match f(scope.backend()) {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.rollback() {
                    warn!(error = %rollback_err, "rollback failed after error: {err}");
                }
                Err(err)
            }
        }
    }

    /// Borrow the backend outside any transaction, under the same locking rules as a scope.
    ///
    /// # Errors
    /// Returns `SqlOpError::AlreadyInTransactionError` if this thread already holds a scope.
    pub fn with_backend<T, F>(&self, f: F) -> Result<T, SqlOpError>
    where
        F: FnOnce(&mut B) -> T,
    {
        let mut lease = self.lease()?;
        Ok(f(&mut *lease.backend))
    }

    pub fn into_inner(self) -> B {
        self.backend
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

struct HolderGuard<'a> {
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Drop for HolderGuard<'_> {
    fn drop(&mut self) {
        *lock(self.holder) = None;
    }
}

// Field order matters: the holder is cleared before the connection is unlocked.
struct Lease<'a, B> {
    _holder: HolderGuard<'a>,
    backend: MutexGuard<'a, B>,
}

/// An open transaction scope. Dropping it without committing rolls back.
pub struct TransactionScope<'a, B: Backend> {
    lease: Lease<'a, B>,
    finished: bool,
}

impl<B: Backend> TransactionScope<'_, B> {
    pub fn backend(&mut self) -> &mut B {
        &mut self.lease.backend
    }

    /// # Errors
    /// Returns the backend's commit error; the scope is then rolled back on drop.
    pub fn commit(mut self) -> Result<(), SqlOpError> {
        self.lease.backend.commit()?;
        self.finished = true;
        trace!("transaction scope committed");
        Ok(())
    }

    /// # Errors
    /// Returns the backend's rollback error.
    pub fn rollback(mut self) -> Result<(), SqlOpError> {
        self.finished = true;
        debug!("rolling back transaction scope");
        self.lease.backend.rollback()
    }
}

impl<B: Backend> Drop for TransactionScope<'_, B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!("rolling back unfinished transaction scope");
        if let Err(err) = self.lease.backend.rollback() {
            warn!(error = %err, "rollback of unfinished scope failed");
        }
    }
}
