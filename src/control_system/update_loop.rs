// control_system/update_loop.rs
// Periodic tick driver around the shared store.

use crate::global_variables::MIN_TICK_PERIOD;
use crate::shared_data::TickReport;
use crate::store::TrafficStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// The store shared between the tick loop and command callers. The mutex is
/// the single writer lock: a tick or a command holds it for its whole update.
pub type SharedStore = Arc<Mutex<TrafficStore>>;

pub fn shared(store: TrafficStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Locks the store. A panic in another holder does not leave the state half
/// written (ticks swap in a complete working set), so a poisoned lock is reused.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, TrafficStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Called after every tick while the store is still locked.
pub trait TickObserver: Send {
    fn on_tick(&mut self, store: &TrafficStore, report: &TickReport);
}

/// Runs [`TrafficStore::tick`] on a fixed period until stopped.
pub struct TickDriver {
    store: SharedStore,
    period: Duration,
    observer: Option<Arc<Mutex<dyn TickObserver>>>,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<u64>>,
}

impl TickDriver {
    /// A zero period is raised to [`MIN_TICK_PERIOD`].
    pub fn new(store: SharedStore, period: Duration) -> Self {
        let period = if period.is_zero() {
            log::warn!("Tick period of zero requested, using {:?}", MIN_TICK_PERIOD);
            MIN_TICK_PERIOD
        } else {
            period
        };
        Self {
            store,
            period,
            observer: None,
            shutdown: None,
            handle: None,
        }
    }

    pub fn with_observer<O: TickObserver + 'static>(mut self, observer: O) -> Self {
        let observer: Arc<Mutex<dyn TickObserver>> = Arc::new(Mutex::new(observer));
        self.observer = Some(observer);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the tick loop on the current tokio runtime. Starting a running driver does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let (tx, mut rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let observer = self.observer.clone();
        let period = self.period;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately.
            ticker.tick().await;
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let mut guard = lock_store(&store);
                        let report = guard.tick();
                        if let Some(observer) = &observer {
                            observer
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .on_tick(&guard, &report);
                        }
                        ticks += 1;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            ticks
        });

        log::info!("Tick driver started with a {:?} period", self.period);
        self.shutdown = Some(tx);
        self.handle = Some(handle);
    }

    /// Stops scheduling ticks and waits for the loop to exit. A tick already
    /// in progress always completes. Returns the ticks run since `start`.
    pub async fn stop(&mut self) -> u64 {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        let ticks = match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                log::error!("Tick loop ended abnormally: {}", e);
                0
            }),
            None => 0,
        };
        log::info!("Tick driver stopped after {} ticks", ticks);
        ticks
    }
}
