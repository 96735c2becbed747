//! Source pooling — bounded-memory reuse under sustained draw rates

use log::debug;
use parking_lot::Mutex;

use crate::source::RandomSource;

/// Factory producing fresh sources when the idle set is empty
pub type SourceFactory = Box<dyn Fn() -> Box<dyn RandomSource> + Send + Sync>;

/// Recycles [`RandomSource`] instances to avoid allocation churn.
///
/// The idle set sits behind a single mutex held only for the push/pop,
/// never across game-engine calls. A checked-out instance has exactly one
/// owner until released.
pub struct SourcePool {
    idle: Mutex<Vec<Box<dyn RandomSource>>>,
    factory: SourceFactory,
}

impl SourcePool {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn RandomSource> + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::new()),
            factory: Box::new(factory),
        }
    }

    /// Reuse an idle instance if present, else construct one via the
    /// factory. Always returns with cleared recorded history.
    pub fn acquire(&self) -> Box<dyn RandomSource> {
        let reused = self.idle.lock().pop();
        let mut source = reused.unwrap_or_else(|| {
            debug!("source pool empty, constructing a fresh instance");
            (self.factory)()
        });
        source.clear_recorded();
        source
    }

    /// Return an instance to the idle set. Clearing happens on the next
    /// acquire, not here.
    pub fn release(&self, source: Box<dyn RandomSource>) {
        self.idle.lock().push(source);
    }

    /// Number of idle instances currently pooled
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}
