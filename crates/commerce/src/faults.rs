//! Fault-injection policies.
//!
//! The storefront this engine models shipped with deliberate randomized
//! misbehaviour: a surprise surcharge on the grand total, duplicate order
//! numbers, a flaky "newest" sort, and searches that occasionally come back
//! empty. Each of those is an explicit [`FaultPolicy`] here, owned by the
//! component it perturbs and disabled unless configured.
//!
//! Tests force a fault with [`RandomFault::always`] and keep the rest of the
//! run deterministic with [`NeverInject`].

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

/// Error returned for a probability outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("fault probability must be between 0 and 1 (got {0})")]
pub struct InvalidProbability(pub f64);

/// Decides, per evaluation, whether a fault fires.
pub trait FaultPolicy: fmt::Debug + Send + Sync {
    /// Returns true if the fault should be injected into this evaluation.
    fn should_inject(&self) -> bool;

    /// Returns true if this policy can never fire.
    fn is_disabled(&self) -> bool {
        false
    }
}

/// A policy that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverInject;

impl FaultPolicy for NeverInject {
    fn should_inject(&self) -> bool {
        false
    }

    fn is_disabled(&self) -> bool {
        true
    }
}

/// Fires with a fixed probability on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomFault {
    probability: f64,
}

impl RandomFault {
    /// Create a policy firing with `probability`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidProbability`] unless `0 <= probability <= 1`.
    pub fn new(probability: f64) -> Result<Self, InvalidProbability> {
        if (0.0..=1.0).contains(&probability) {
            Ok(Self { probability })
        } else {
            Err(InvalidProbability(probability))
        }
    }

    /// A policy that fires on every evaluation.
    #[must_use]
    pub const fn always() -> Self {
        Self { probability: 1.0 }
    }

    /// A policy that never fires.
    #[must_use]
    pub const fn never() -> Self {
        Self { probability: 0.0 }
    }

    /// Callers guarantee `0 <= probability <= 1`.
    pub(crate) const fn with_probability(probability: f64) -> Self {
        Self { probability }
    }

    /// The configured probability.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }
}

impl FaultPolicy for RandomFault {
    fn should_inject(&self) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        rand::rng().random_bool(self.probability)
    }

    fn is_disabled(&self) -> bool {
        self.probability <= 0.0
    }
}

/// Shared handle to a policy.
pub type SharedFault = Arc<dyn FaultPolicy>;

/// Build a shared policy from a probability; zero yields [`NeverInject`].
///
/// # Errors
///
/// Returns [`InvalidProbability`] unless `0 <= probability <= 1`.
pub fn from_probability(probability: f64) -> Result<SharedFault, InvalidProbability> {
    RandomFault::new(probability).map(shared)
}

/// Share a validated policy; a zero probability yields [`NeverInject`].
#[must_use]
pub fn shared(policy: RandomFault) -> SharedFault {
    if policy.is_disabled() {
        disabled()
    } else {
        Arc::new(policy)
    }
}

/// A shared policy that never fires.
#[must_use]
pub fn disabled() -> SharedFault {
    Arc::new(NeverInject)
}

/// A shared policy that always fires.
#[must_use]
pub fn always() -> SharedFault {
    Arc::new(RandomFault::always())
}
