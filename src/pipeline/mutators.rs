//! Capability mutator chain.
//!
//! Mutators rewrite each candidate before matching, in registration order.
//! A mutator is a pure function of a capability set; it returns a new set
//! and never performs I/O.

use serde_json::Value;

use crate::capabilities::Capabilities;

use super::platform::Platform;

/// A pure capability-set rewriter.
pub trait CapabilityMutator: Send + Sync {
    fn mutate(&self, caps: &Capabilities) -> Capabilities;
}

/// Fill a default platform when the candidate requests none.
pub struct DefaultPlatform(pub Platform);

impl CapabilityMutator for DefaultPlatform {
    fn mutate(&self, caps: &Capabilities) -> Capabilities {
        if caps.platform_name().is_some() {
            caps.clone()
        } else {
            caps.with_entry("platformName", Value::String(self.0.name().to_string()))
        }
    }
}

/// Fill a default entry for an arbitrary key when absent.
pub struct DefaultEntry {
    pub key: String,
    pub value: Value,
}

impl CapabilityMutator for DefaultEntry {
    fn mutate(&self, caps: &Capabilities) -> Capabilities {
        if caps.contains_key(&self.key) {
            caps.clone()
        } else {
            caps.with_entry(&self.key, self.value.clone())
        }
    }
}

/// An ordered chain of mutators.
#[derive(Default)]
pub struct MutatorChain {
    mutators: Vec<Box<dyn CapabilityMutator>>,
}

impl MutatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mutator: Box<dyn CapabilityMutator>) {
        self.mutators.push(mutator);
    }

    /// Apply every mutator in registration order.
    pub fn apply(&self, caps: &Capabilities) -> Capabilities {
        let mut current = caps.clone();
        for mutator in &self.mutators {
            current = mutator.mutate(&current);
        }
        current
    }
}
