//! Network reachability abstraction

/// Reports the last-known reachability state. Never blocks.
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}
