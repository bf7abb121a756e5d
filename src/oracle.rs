//! Oracle adapter boundary: the source of the native-per-USD quote.

use primitive_types::U256;
use std::sync::{Arc, Mutex, MutexGuard};

/// Price source consumed by the fee ledger.
///
/// `consult` returns the amount of native token (18 decimals) equal to one
/// USD unit. `refresh` asks the adapter to update its own state and reports
/// whether it succeeded.
pub trait PriceOracle: Send + Sync {
    /// Current native amount per USD unit.
    fn consult(&self) -> U256;

    /// Refreshes the adapter's quote.
    fn refresh(&mut self) -> bool;

    /// Human-friendly label for events and logging.
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct ManualState {
    price: U256,
    staged: Option<U256>,
    healthy: bool,
    refreshes: u64,
}

/// Oracle adapter driven by explicit price updates.
///
/// A staged price becomes visible only after [`PriceOracle::refresh`], which
/// mirrors adapters that pull a new observation on refresh. Clones share the
/// same quote, so an operator can keep a handle after installing the adapter
/// on a chain.
#[derive(Debug, Clone)]
pub struct ManualOracle {
    label: String,
    state: Arc<Mutex<ManualState>>,
}

impl ManualOracle {
    /// Creates an oracle quoting `price` native units per USD.
    pub fn new(label: impl Into<String>, price: U256) -> Self {
        Self {
            label: label.into(),
            state: Arc::new(Mutex::new(ManualState {
                price,
                staged: None,
                healthy: true,
                refreshes: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stages a price to be published by the next refresh.
    pub fn stage(&self, price: U256) {
        self.state().staged = Some(price);
    }

    /// Publishes `price` immediately.
    pub fn set_price(&self, price: U256) {
        let mut state = self.state();
        state.price = price;
        state.staged = None;
    }

    /// Makes subsequent refreshes fail (or succeed again).
    pub fn set_healthy(&self, healthy: bool) {
        self.state().healthy = healthy;
    }

    /// Number of refresh calls observed.
    pub fn refreshes(&self) -> u64 {
        self.state().refreshes
    }
}

impl PriceOracle for ManualOracle {
    fn consult(&self) -> U256 {
        self.state().price
    }

    fn refresh(&mut self) -> bool {
        let mut state = self.state();
        state.refreshes += 1;
        if !state.healthy {
            return false;
        }
        if let Some(price) = state.staged.take() {
            state.price = price;
        }
        true
    }

    fn name(&self) -> &str {
        &self.label
    }
}
