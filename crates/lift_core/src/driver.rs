//! Real-time engine loop. A dedicated thread fires a periodic ticker and
//! runs one tick per firing; command handlers share the engine through a
//! mutex, which serializes them against the tick step (a tick is atomic
//! with respect to commands, and command effects become visible no later
//! than the next tick).

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use parking_lot::Mutex;

use crate::engine::Engine;

pub struct EngineLoop {
    engine: Arc<Mutex<Engine>>,
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl EngineLoop {
    /// Move the engine behind a mutex and start ticking it every
    /// `tick_interval_ms` of wall time.
    pub fn spawn(engine: Engine, tick_interval_ms: u64) -> Self {
        let engine = Arc::new(Mutex::new(engine));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let worker = Arc::clone(&engine);
        let handle = thread::spawn(move || {
            let ticker = tick(Duration::from_millis(tick_interval_ms));
            loop {
                select! {
                    recv(ticker) -> _ => {
                        worker.lock().tick(tick_interval_ms as f64);
                    }
                    recv(shutdown_rx) -> _ => break,
                }
            }
        });
        Self {
            engine,
            shutdown: shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Shared engine handle for command handlers. Locking it blocks the
    /// ticker until the command completes, and vice versa.
    pub fn engine(&self) -> Arc<Mutex<Engine>> {
        Arc::clone(&self.engine)
    }

    /// Stop the ticker thread. The in-flight tick, if any, completes first.
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EngineLoop {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
