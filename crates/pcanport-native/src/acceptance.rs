use crate::params::FilterMode;

/// One rule of a controller's acceptance filter bank.
///
/// A bank with no rules admits everything. A bank with rules admits a message
/// when any rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceRule {
    /// Inclusive identifier range for one identifier width.
    Range { from: u32, to: u32, mode: FilterMode },
    /// Code and mask for one identifier width; mask bits set to 1 are compared.
    CodeMask { code: u32, mask: u32, mode: FilterMode },
}

impl AcceptanceRule {
    /// Identifier width this rule applies to.
    pub fn mode(&self) -> FilterMode {
        match self {
            Self::Range { mode, .. } | Self::CodeMask { mode, .. } => *mode,
        }
    }

    /// Whether this rule admits a message with the given identifier.
    pub fn admits(&self, id: u32, extended: bool) -> bool {
        if self.mode().is_extended() != extended {
            return false;
        }
        match *self {
            Self::Range { from, to, .. } => (from..=to).contains(&id),
            Self::CodeMask { code, mask, .. } => id & mask == code & mask,
        }
    }
}

/// Apply a bank of rules to a message.
pub fn bank_admits(rules: &[AcceptanceRule], id: u32, extended: bool) -> bool {
    rules.is_empty() || rules.iter().any(|rule| rule.admits(id, extended))
}
