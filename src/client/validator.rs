//! Structural capability check for client candidates

/// Operations every client must provide
pub const REQUIRED_OPERATIONS: [&str; 4] = ["log", "info", "warn", "error"];

/// Something that can report which named operations it provides
pub trait Capabilities {
    fn provides(&self, operation: &str) -> bool;
}

/// Check that `candidate` is present and provides every operation in `required`
pub fn implements(candidate: Option<&dyn Capabilities>, required: &[&str]) -> bool {
    match candidate {
        Some(candidate) => required.iter().all(|op| candidate.provides(op)),
        None => false,
    }
}
