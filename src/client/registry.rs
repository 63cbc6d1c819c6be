//! Registry of subscriber clients

use std::sync::Arc;

use super::validator::{implements, Capabilities, REQUIRED_OPERATIONS};
use super::Client;

/// Outcome of offering a candidate to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    /// The same client is already registered
    Duplicate,
    /// The candidate lacks one of the required operations
    Invalid,
}

impl Admission {
    pub fn is_added(&self) -> bool {
        matches!(self, Admission::Added)
    }
}

/// Set of registered clients in insertion order
///
/// Membership is by `Arc` identity. Every member provided all required
/// operations when it was admitted.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Arc<Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a candidate against the required operations
    pub fn validate(candidate: Option<&Client>) -> bool {
        implements(
            candidate.map(|c| c as &dyn Capabilities),
            &REQUIRED_OPERATIONS,
        )
    }

    /// Check if this exact client is registered
    pub fn contains(&self, client: &Arc<Client>) -> bool {
        self.clients.iter().any(|c| Arc::ptr_eq(c, client))
    }

    /// Offer a candidate, reporting why it was refused
    pub fn admit(&mut self, candidate: &Arc<Client>) -> Admission {
        if self.contains(candidate) {
            return Admission::Duplicate;
        }
        if !Self::validate(Some(candidate.as_ref())) {
            return Admission::Invalid;
        }
        self.clients.push(Arc::clone(candidate));
        Admission::Added
    }

    /// Add a client, returning whether it was inserted
    pub fn add(&mut self, candidate: &Arc<Client>) -> bool {
        self.admit(candidate).is_added()
    }

    /// Remove a client, returning whether it was present
    pub fn remove(&mut self, client: &Arc<Client>) -> bool {
        match self.clients.iter().position(|c| Arc::ptr_eq(c, client)) {
            Some(index) => {
                self.clients.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the registered clients in insertion order
    pub fn all(&self) -> Vec<Arc<Client>> {
        self.clients.clone()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clear(&mut self) {
        self.clients.clear();
    }
}
