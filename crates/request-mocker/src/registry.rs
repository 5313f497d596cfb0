//! FilterRegistry - the ordered rule set consulted for every request.
//!
//! Registration replaces the whole set at once. Lookups scan in registration
//! order and the first filter whose match keys equal the request's wins.

use crate::filter::{MockRequest, RequestFilter};
use crate::metrics;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static GLOBAL_REGISTRY: Lazy<FilterRegistry> = Lazy::new(FilterRegistry::new);

/// Replace the filters of the process-wide registry
pub fn register_filters(filters: Vec<RequestFilter>) {
    GLOBAL_REGISTRY.register(filters);
}

/// Ordered collection of filters shared between the registering test and the
/// interception hook.
///
/// Cloning yields another handle to the same rule set.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    filters: RwLock<Vec<Arc<RequestFilter>>>,
    generation: AtomicU64,
}

impl FilterRegistry {
    /// Create an empty, independent registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the process-wide registry
    pub fn global() -> Self {
        GLOBAL_REGISTRY.clone()
    }

    /// Atomically replace the active rule set.
    ///
    /// Prior filters, and the state they accumulated, are dropped once no
    /// in-flight resolution still holds them.
    pub fn register(&self, filters: Vec<RequestFilter>) {
        let filters: Vec<Arc<RequestFilter>> = filters.into_iter().map(Arc::new).collect();
        let count = filters.len();

        {
            let mut active = self.inner.filters.write();
            *active = filters;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }

        metrics::record_registration();
        info!("Registered {} request filter(s)", count);
    }

    /// Remove every filter
    pub fn clear(&self) {
        {
            let mut active = self.inner.filters.write();
            active.clear();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }
        info!("Cleared request filters");
    }

    /// First filter, in registration order, whose host, path and method all
    /// equal the request's
    pub fn find_match(&self, request: &MockRequest) -> Option<Arc<RequestFilter>> {
        let filters = self.inner.filters.read();

        for (index, filter) in filters.iter().enumerate() {
            if filter.matches(request) {
                debug!(
                    "Request {} {}{} matched filter '{}' (index {})",
                    request.method,
                    request.host,
                    request.path,
                    filter.name(),
                    index
                );
                return Some(Arc::clone(filter));
            }
        }

        debug!(
            "No filter matches {} {}{}",
            request.method, request.host, request.path
        );
        None
    }

    /// Snapshot of the active filters, in registration order
    pub fn filters(&self) -> Vec<Arc<RequestFilter>> {
        self.inner.filters.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.filters.read().is_empty()
    }

    /// Number of replacements performed so far (registrations and clears)
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.len())
            .field("generation", &self.generation())
            .finish()
    }
}
