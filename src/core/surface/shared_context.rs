//=========================================================================
// Shared Context
//=========================================================================
//
// A GPU context shared by several views.
//
// The context lives behind its own mutex, independent of any view lock.
// It is created lazily by the first view that needs it, and only a view
// that is the sole remaining user may reset or destroy it.
//
//=========================================================================

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::lock;

/// Clonable handle to a context shared across views.
pub struct SharedContext<C> {
    inner: Arc<Mutex<Option<C>>>,
}

impl<C> SharedContext<C> {
    /// An empty handle; the first view to create a surface fills it.
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(None)) }
    }

    /// A handle around an already created context.
    pub fn with_context(context: C) -> Self {
        Self { inner: Arc::new(Mutex::new(Some(context))) }
    }

    /// Number of live handles, including the caller's.
    pub fn users(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<C>> {
        lock(&self.inner)
    }
}

impl<C> Clone for SharedContext<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C> Default for SharedContext<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for SharedContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("users", &self.users())
            .finish_non_exhaustive()
    }
}
