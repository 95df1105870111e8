//! Lifecycle of the backends a run needs.
//!
//! The pool starts one backend per required document family, hands out
//! shared references to them while tasks run, and shuts every one of them
//! down in [`BackendPool::release`]. Shutdown failures are logged and
//! counted but never stop the remaining backends from being quit.

use crate::backend::{Backend, BackendFactory};
use crate::error::{ConversionError, Result};
use crate::task::DocumentFamily;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, info, warn};

/// A started backend and how many documents it has converted.
struct Slot<B> {
    backend: B,
    conversions: u32,
}

/// Backends owned for the duration of one run, keyed by family.
///
/// Orderly shutdown only happens in [`BackendPool::release`], which is async
/// and cannot run from `Drop`. Dropping the pool, including dropping a
/// [`Converter::run`](crate::Converter::run) future mid-run (for example the
/// losing branch of `tokio::select!`), issues no `quit` or `terminate`: the
/// backends are simply dropped. To stop a run early and still shut down
/// cleanly, use [`CancelHandle`](crate::CancelHandle) instead.
pub struct BackendPool<'f, F: BackendFactory> {
    factory: &'f F,
    slots: HashMap<DocumentFamily, Slot<F::Backend>>,
    /// Conversions before a backend is recycled.
    max_docs_per_instance: u32,
}

impl<'f, F: BackendFactory> BackendPool<'f, F> {
    /// Start one backend for each family in `families`.
    ///
    /// If any backend fails to start, the ones already started are quit and
    /// the startup error is returned.
    pub async fn acquire(
        factory: &'f F,
        families: &BTreeSet<DocumentFamily>,
        max_docs_per_instance: u32,
    ) -> Result<Self> {
        let mut pool = Self {
            factory,
            slots: HashMap::with_capacity(families.len()),
            max_docs_per_instance: max_docs_per_instance.max(1),
        };

        for &family in families {
            match start_backend(factory, family).await {
                Ok(backend) => {
                    pool.slots.insert(
                        family,
                        Slot {
                            backend,
                            conversions: 0,
                        },
                    );
                }
                Err(e) => {
                    error!("Failed to start {} backend: {}", family, e);
                    pool.release().await;
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    /// Backend for `family`, if one was started.
    pub fn get(&self, family: DocumentFamily) -> Option<&F::Backend> {
        self.slots.get(&family).map(|slot| &slot.backend)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Count a finished conversion and recycle the backend once it has
    /// reached its document budget.
    pub async fn record_conversion(&mut self, family: DocumentFamily) {
        let Some(slot) = self.slots.get_mut(&family) else {
            return;
        };
        slot.conversions += 1;
        if slot.conversions < self.max_docs_per_instance {
            return;
        }

        info!(
            "{} backend reached {} documents, recycling",
            family, slot.conversions
        );
        if let Some(slot) = self.slots.remove(&family) {
            if let Err(e) = slot.backend.quit().await {
                error!("{}", e);
            }
        }
        self.restart(family).await;
    }

    /// Forcefully terminate the backend for `family` and start a fresh one.
    ///
    /// If the restart fails the family is left without a backend.
    pub async fn recycle(&mut self, family: DocumentFamily) -> Result<()> {
        if let Some(slot) = self.slots.remove(&family) {
            slot.backend.terminate().await;
        }
        if self.restart(family).await {
            Ok(())
        } else {
            Err(ConversionError::BackendNotInitialized { family })
        }
    }

    async fn restart(&mut self, family: DocumentFamily) -> bool {
        match start_backend(self.factory, family).await {
            Ok(backend) => {
                self.slots.insert(
                    family,
                    Slot {
                        backend,
                        conversions: 0,
                    },
                );
                true
            }
            Err(e) => {
                error!("Failed to restart {} backend: {}", family, e);
                false
            }
        }
    }

    /// Quit every backend. Returns the number of shutdown failures.
    pub async fn release(mut self) -> usize {
        let slots = std::mem::take(&mut self.slots);
        if slots.is_empty() {
            return 0;
        }

        info!("Closing {} backend(s)", slots.len());
        let shutdowns = slots.into_iter().map(|(family, slot)| async move {
            (family, slot.backend.quit().await)
        });

        let mut failures = 0;
        for (family, result) in join_all(shutdowns).await {
            match result {
                Ok(()) => debug!("{} backend quit", family),
                Err(e) => {
                    failures += 1;
                    error!("{}", e);
                }
            }
        }
        failures
    }
}

impl<F: BackendFactory> Drop for BackendPool<'_, F> {
    fn drop(&mut self) {
        if !self.slots.is_empty() {
            warn!(
                "Backend pool dropped without release, discarding {} backend(s)",
                self.slots.len()
            );
        }
    }
}

async fn start_backend<F: BackendFactory>(factory: &F, family: DocumentFamily) -> Result<F::Backend> {
    info!("Initializing {}...", family);
    let backend = factory.start(family).await?;
    if let Err(e) = backend.hide() {
        debug!("Could not hide {} backend: {}", family, e);
    }
    Ok(backend)
}
