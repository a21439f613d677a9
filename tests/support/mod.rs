use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Route `tracing` output to the test writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("classprop=debug")
        .with_test_writer()
        .try_init();
}

/// A shared call counter for producers.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    /// Record one call, returning how many calls there have been including it.
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
