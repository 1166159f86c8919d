// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0

//! Step callbacks: hooks fired after each [`MemoryStep`] is appended, for
//! observers (a TUI, a JSONL transcript writer, test assertions) that want
//! to react to a run without the driver knowing anything about them.

use std::sync::Arc;

use crate::memory::MemoryStep;

pub type StepCallback = Arc<dyn Fn(&MemoryStep) + Send + Sync>;

#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: Vec<StepCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: StepCallback) {
        self.callbacks.push(callback);
    }

    pub fn fire(&self, step: &MemoryStep) {
        for callback in &self.callbacks {
            callback(step);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ActionStep, MemoryStep};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn fires_every_registered_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = CallbackRegistry::new();
        for _ in 0..3 {
            let count = count.clone();
            registry.register(Arc::new(move |_: &MemoryStep| {
                count.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let step = MemoryStep::Action(ActionStep::default());
        registry.fire(&step);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_registry_fires_nothing() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        registry.fire(&MemoryStep::Action(ActionStep::default()));
    }
}
