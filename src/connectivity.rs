//! Network reachability tracking.
//!
//! `NetworkMonitor` owns a background observer task that probes the configured
//! address and flips a single flag; readers never wait on it.

use crate::core::config::ConnectivityConfig;
use crate::core::connectivity::Connectivity;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, instrument};

/// Connectivity flag driven by the embedding layer (or tests).
#[derive(Clone, Default)]
pub struct ManualConnectivity {
    connected: Arc<AtomicBool>,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Connectivity for ManualConnectivity {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Probes reachability with a TCP connect to `address`.
#[instrument(level = "debug", skip(probe_timeout))]
async fn probe(address: &str, probe_timeout: Duration) -> bool {
    match timeout(probe_timeout, TcpStream::connect(address)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "Reachability probe failed");
            false
        }
        Err(_) => {
            debug!("Reachability probe timed out");
            false
        }
    }
}

fn apply(connected: &AtomicBool, reachable: bool) {
    let previous = connected.swap(reachable, Ordering::SeqCst);
    if previous != reachable {
        info!(connected = reachable, "Network reachability changed");
    }
}

pub struct NetworkMonitor {
    config: ConnectivityConfig,
    connected: Arc<AtomicBool>,
    observer: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    /// Creates an idle monitor. It reports disconnected until monitoring starts.
    pub fn new(config: ConnectivityConfig) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            observer: None,
        }
    }

    /// Probes once, then keeps observing in the background.
    pub async fn start(config: ConnectivityConfig) -> Self {
        let mut monitor = Self::new(config);
        monitor.start_monitoring().await;
        monitor
    }

    pub async fn start_monitoring(&mut self) {
        self.stop_monitoring();

        let address = self.config.probe_address.clone();
        let probe_timeout = self.config.probe_timeout();
        apply(&self.connected, probe(&address, probe_timeout).await);

        let connected = Arc::clone(&self.connected);
        let period = self.config.check_interval();
        self.observer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately and the initial probe already ran
            ticker.tick().await;
            loop {
                ticker.tick().await;
                apply(&connected, probe(&address, probe_timeout).await);
            }
        }));
        debug!("Network monitoring started");
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.abort();
            debug!("Network monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.observer.is_some()
    }
}

impl Connectivity for NetworkMonitor {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
