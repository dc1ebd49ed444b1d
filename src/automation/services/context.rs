//! Dependencies shared by the drivers running against one page.

use mockable::Clock;
use std::sync::Arc;

use super::InitGuard;
use crate::page::ports::Page;
use crate::task::{ports::KeyValueStore, services::TaskRecords};

/// One page context: its store, page, clock and initialization guard.
///
/// Drivers built from clones of the same context share the guard, so each
/// driver kind runs its page-load activation once per context.
#[derive(Debug)]
pub struct PageContext<S, P, C>
where
    S: KeyValueStore,
    P: Page,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    page: Arc<P>,
    clock: Arc<C>,
    init: Arc<InitGuard>,
}

impl<S, P, C> Clone for PageContext<S, P, C>
where
    S: KeyValueStore,
    P: Page,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            page: Arc::clone(&self.page),
            clock: Arc::clone(&self.clock),
            init: Arc::clone(&self.init),
        }
    }
}

impl<S, P, C> PageContext<S, P, C>
where
    S: KeyValueStore,
    P: Page,
    C: Clock + Send + Sync,
{
    /// Creates a context with a fresh [`InitGuard`].
    #[must_use]
    pub fn new(store: Arc<S>, page: Arc<P>, clock: Arc<C>) -> Self {
        Self {
            store,
            page,
            clock,
            init: Arc::new(InitGuard::new()),
        }
    }

    /// Returns typed access to the store.
    #[must_use]
    pub fn records(&self) -> TaskRecords<S> {
        TaskRecords::new(Arc::clone(&self.store))
    }

    /// Returns the store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the page.
    #[must_use]
    pub const fn page(&self) -> &Arc<P> {
        &self.page
    }

    /// Returns the clock.
    #[must_use]
    pub const fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    /// Returns the initialization guard.
    #[must_use]
    pub const fn init_guard(&self) -> &Arc<InitGuard> {
        &self.init
    }
}
