//! Display usability guard.
//!
//! The selection mechanism is bound to a single implicit default display.
//! With two or more displays attached there is no way to tell which
//! display's selection a request refers to, so the whole service is
//! switched off instead.

use crate::resolver::DisplayManager;

/// Whether selections can be used with the displays currently attached.
pub fn selection_usable(displays: &dyn DisplayManager) -> bool {
    let count = displays.list_displays().len();
    if count >= 2 {
        tracing::debug!(count, "multiple displays attached, selections disabled");
    }
    count < 2
}
