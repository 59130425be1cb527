//! Subscription view state
//!
//! Caller-owned slots the loader writes into. The handle is cheap to clone;
//! every clone sees the same state.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockWriteGuard};
use serde::Serialize;
use shared::{AvailablePlan, BankData, CustomerProfile, Invoice};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub profile: CustomerProfile,
    pub bank: BankData,
    pub invoices: Vec<Invoice>,
    pub plans: Vec<AvailablePlan>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Shared handle to the view state
///
/// A fresh view starts in the loading state until the first activation
/// settles or finds no customer to load.
#[derive(Debug, Clone)]
pub struct SubscriptionView {
    inner: Arc<RwLock<ViewState>>,
}

impl Default for SubscriptionView {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionView {
    pub fn new() -> Self {
        Self::with_profile(CustomerProfile::default())
    }

    /// Start from a profile that already carries the signed-in user's email
    pub fn with_profile(profile: CustomerProfile) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ViewState {
                profile,
                loading: true,
                ..ViewState::default()
            })),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ViewState {
        self.inner.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    pub fn profile(&self) -> CustomerProfile {
        self.inner.read().profile.clone()
    }

    pub fn bank(&self) -> BankData {
        self.inner.read().bank.clone()
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.inner.read().invoices.clone()
    }

    pub fn plans(&self) -> Vec<AvailablePlan> {
        self.inner.read().plans.clone()
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.inner.write().loading = loading;
    }

    /// Exclusive access; cancellation checks and merges happen under it
    pub(crate) fn lock(&self) -> RwLockWriteGuard<'_, ViewState> {
        self.inner.write()
    }
}
