//! Wall-clock driver for the engine.
//!
//! The engine itself is a plain state machine that only moves when told what
//! time it is. `Runtime` owns it behind `Arc<Mutex<_>>` and runs one thread
//! that feeds it the elapsed time every `poll` period. API calls go through
//! the same lock, so a tick never sees a half-applied change.
//!
//! ```ignore
//! let runtime = Runtime::spawn(engine, Duration::from_millis(2))?;
//! runtime.with_engine(|engine| engine.start_global())?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::engine::TransportController;

pub struct Runtime {
    engine: Arc<Mutex<TransportController>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Start driving `engine` from the wall clock. The engine's epoch is the
    /// moment of this call.
    pub fn spawn(engine: TransportController, poll: Duration) -> std::io::Result<Self> {
        let engine = Arc::new(Mutex::new(engine));
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let engine = engine.clone();
            let running = running.clone();
            thread::Builder::new()
                .name("polyrobin-clock".to_string())
                .spawn(move || {
                    let start = Instant::now();
                    debug!(?poll, "Clock thread started");

                    while running.load(Ordering::Acquire) {
                        let elapsed = start.elapsed();
                        {
                            let mut engine = lock(&engine);
                            engine.skip_missed(elapsed);
                            engine.advance_to(elapsed);
                        }
                        thread::sleep(poll);
                    }

                    debug!("Clock thread stopped");
                })?
        };

        Ok(Self {
            engine,
            running,
            thread: Some(thread),
        })
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut TransportController) -> T) -> T {
        let mut engine = lock(&self.engine);
        f(&mut engine)
    }

    /// Shared handle for callers that want to hold the lock themselves.
    pub fn engine(&self) -> Arc<Mutex<TransportController>> {
        self.engine.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the clock thread and wait for it. Idempotent.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Clock thread panicked");
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lock the engine, recovering from a poisoned lock.
fn lock(engine: &Mutex<TransportController>) -> MutexGuard<'_, TransportController> {
    engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
