use pcanport_frame::Frame;
use pcanport_native::{bank_admits, AcceptanceRule, FilterMode};

/// The filter rules programmed on a channel, evaluated in software.
///
/// An empty set admits every frame, matching a controller with no filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptanceSet {
    rules: Vec<AcceptanceRule>,
}

impl AcceptanceSet {
    pub fn new(rules: Vec<AcceptanceRule>) -> Self {
        Self { rules }
    }

    /// Whether the controller would deliver this frame.
    pub fn admits(&self, frame: &Frame) -> bool {
        bank_admits(&self.rules, frame.id, frame.ext)
    }

    pub fn rules(&self) -> &[AcceptanceRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Identifier width of the set, if any rule is present.
    pub fn mode(&self) -> Option<FilterMode> {
        self.rules.first().map(AcceptanceRule::mode)
    }
}
