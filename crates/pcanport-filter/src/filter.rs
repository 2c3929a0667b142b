use pcanport_native::{AcceptanceRule, FilterMode};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// One receive filter as written in configuration.
///
/// Exactly one format is used, checked in this order:
/// 1. `code` and `mask` both present: program the acceptance code and mask
/// 2. `fromID` and `toID` both present: admit the inclusive range
/// 3. `id` present: a hex range `"<from> <to>"` or a single hex id
///
/// Anything else is an invalid specification. `ext` selects the identifier
/// width for every format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Filter 29-bit identifiers instead of 11-bit ones.
    pub ext: bool,
    /// Textual hex range or single id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "fromID", skip_serializing_if = "Option::is_none")]
    pub from_id: Option<u32>,
    #[serde(rename = "toID", skip_serializing_if = "Option::is_none")]
    pub to_id: Option<u32>,
    /// Acceptance code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    /// Acceptance mask; bits set to 1 are compared against `code`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<u32>,
}

impl FilterSpec {
    /// Admit identifiers whose masked bits equal `code`.
    pub fn code_mask(code: u32, mask: u32, ext: bool) -> Self {
        Self {
            ext,
            code: Some(code),
            mask: Some(mask),
            ..Self::default()
        }
    }

    /// Admit the inclusive identifier range `from..=to`.
    pub fn range(from: u32, to: u32, ext: bool) -> Self {
        Self {
            ext,
            from_id: Some(from),
            to_id: Some(to),
            ..Self::default()
        }
    }

    /// Admit the range (or single id) described by hex text.
    pub fn id(text: impl Into<String>, ext: bool) -> Self {
        Self {
            ext,
            id: Some(text.into()),
            ..Self::default()
        }
    }

    /// Identifier width this filter programs.
    pub fn mode(&self) -> FilterMode {
        FilterMode::for_extended(self.ext)
    }

    /// Turn the specification into the rule the controller will apply.
    pub fn resolve(&self) -> Result<AcceptanceRule> {
        let mode = self.mode();

        if let (Some(code), Some(mask)) = (self.code, self.mask) {
            if code > mode.max_id() {
                return Err(FilterError::InvalidSpecification(format!(
                    "acceptance code 0x{code:X} exceeds 0x{:X}",
                    mode.max_id()
                )));
            }
            return Ok(AcceptanceRule::CodeMask { code, mask, mode });
        }

        if let (Some(from), Some(to)) = (self.from_id, self.to_id) {
            return range_rule(from, to, mode);
        }

        if let Some(text) = &self.id {
            let (from, to) = parse_id_text(text)?;
            return range_rule(from, to, mode);
        }

        Err(FilterError::InvalidSpecification(
            "unknown or unspecified filter format".to_string(),
        ))
    }
}

fn range_rule(from: u32, to: u32, mode: FilterMode) -> Result<AcceptanceRule> {
    if from > to {
        return Err(FilterError::InvalidSpecification(format!(
            "range start 0x{from:X} is above end 0x{to:X}"
        )));
    }
    if to > mode.max_id() {
        return Err(FilterError::InvalidSpecification(format!(
            "identifier 0x{to:X} exceeds 0x{:X}",
            mode.max_id()
        )));
    }
    Ok(AcceptanceRule::Range { from, to, mode })
}

/// Parse `"<from> <to>"` or `"<id>"`, hex with an optional `0x` prefix.
fn parse_id_text(text: &str) -> Result<(u32, u32)> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [id] => {
            let id = parse_hex(id)?;
            Ok((id, id))
        }
        [from, to] => Ok((parse_hex(from)?, parse_hex(to)?)),
        _ => Err(FilterError::InvalidSpecification(format!(
            "expected \"<from> <to>\" hex ids, got {text:?}"
        ))),
    }
}

fn parse_hex(token: &str) -> Result<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).map_err(|err| {
        FilterError::InvalidSpecification(format!("bad hex id {token:?}: {err}"))
    })
}
