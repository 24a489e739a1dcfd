//! Placeholder for configuration tags that name a policy with no
//! implementation (ARC, HotRing).
//!
//! Accesses fail with [`SeparatorError::Unimplemented`]; nothing is ever
//! hot.
use std::fmt;

use crate::builder::SeparatorKind;
use crate::error::SeparatorError;
use crate::traits::HeatSeparator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotImplementedSeparator {
    kind: SeparatorKind,
}

impl NotImplementedSeparator {
    pub fn new(kind: SeparatorKind) -> Self {
        Self { kind }
    }
}

impl<K> HeatSeparator<K> for NotImplementedSeparator {
    fn put(&mut self, _key: &K) -> Result<(), SeparatorError> {
        Err(SeparatorError::Unimplemented(self.kind))
    }

    fn get(&mut self, _key: &K) -> Result<(), SeparatorError> {
        Err(SeparatorError::Unimplemented(self.kind))
    }

    fn is_hot_key(&self, _key: &K) -> bool {
        false
    }

    fn hot_keys(&self) -> Vec<K> {
        Vec::new()
    }

    fn write_diagnostics(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "{} (not implemented)", self.kind.tag())
    }

    fn kind(&self) -> SeparatorKind {
        self.kind
    }

    fn len(&self) -> usize {
        0
    }

    fn capacity(&self) -> Option<usize> {
        None
    }
}
