use pcanport_native::{AcceptanceRule, CanDriver, ChannelHandle};
use tracing::debug;

use crate::acceptance::AcceptanceSet;
use crate::error::{FilterError, Result};
use crate::filter::FilterSpec;

/// Check a filter list without touching hardware.
///
/// Rejects lists that mix standard and extended filters, then resolves every
/// entry. The returned rules are in configuration order.
pub fn validate(specs: &[FilterSpec]) -> Result<Vec<AcceptanceRule>> {
    let extended = specs.iter().any(|spec| spec.ext);
    let standard = specs.iter().any(|spec| !spec.ext);
    if extended && standard {
        return Err(FilterError::MixedModes);
    }
    specs.iter().map(FilterSpec::resolve).collect()
}

/// Program a channel's acceptance filters.
///
/// Every specification is validated first, so a bad list programs nothing.
/// Ranges go through the controller's native range primitive; code and mask
/// pairs go to the 11-bit or 29-bit acceptance filter. An empty list programs
/// nothing and leaves the controller's default (everything admitted).
pub fn compile<D>(driver: &D, channel: ChannelHandle, specs: &[FilterSpec]) -> Result<AcceptanceSet>
where
    D: CanDriver + ?Sized,
{
    let rules = validate(specs)?;

    for rule in &rules {
        match *rule {
            AcceptanceRule::Range { from, to, mode } => {
                debug!(%channel, from, to, ?mode, "programming range filter");
                driver.filter_messages(channel, from, to, mode)?;
            }
            AcceptanceRule::CodeMask { code, mask, mode } => {
                debug!(%channel, code, mask, ?mode, "programming acceptance filter");
                if mode.is_extended() {
                    driver.acceptance_filter_29bit(channel, code, mask)?;
                } else {
                    driver.acceptance_filter_11bit(channel, code, mask)?;
                }
            }
        }
    }

    Ok(AcceptanceSet::new(rules))
}
