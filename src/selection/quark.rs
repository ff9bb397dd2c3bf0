//! Quark registry: stable storage keys for attaching payloads to owner
//! windows.
//!
//! A quark is a small integer interned from a static name. Each selection
//! slot gets two: one for the payload bytes and one for their length. The
//! registry is created once per process and never changes afterwards.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Mutex, OnceLock, PoisonError};

use super::SelectionSlot;

/// Opaque key identifying a piece of data attached to an owner window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quark(NonZeroU32);

/// Process-wide name → quark interner.
#[derive(Debug, Default)]
struct Interner {
    by_name: HashMap<&'static str, Quark>,
    names: Vec<&'static str>,
}

fn interner() -> &'static Mutex<Interner> {
    static INTERNER: OnceLock<Mutex<Interner>> = OnceLock::new();
    INTERNER.get_or_init(Mutex::default)
}

/// Intern `name`, returning the same quark for the same name every time.
pub fn quark_from_static_str(name: &'static str) -> Quark {
    let mut table = interner().lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(&quark) = table.by_name.get(name) {
        return quark;
    }
    table.names.push(name);
    let index = u32::try_from(table.names.len()).unwrap_or(u32::MAX);
    // Index is at least 1 after the push above.
    let quark = Quark(NonZeroU32::new(index).unwrap_or(NonZeroU32::MAX));
    table.by_name.insert(name, quark);
    quark
}

/// Name a quark was interned from, if it came from this interner.
#[cfg(test)]
pub fn quark_to_str(quark: Quark) -> Option<&'static str> {
    let table = interner().lock().unwrap_or_else(PoisonError::into_inner);
    table.names.get(quark.0.get() as usize - 1).copied()
}

/// The data/size key pair for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotQuarks {
    pub data: Quark,
    pub size: Quark,
}

/// Storage keys for every selection slot.
#[derive(Debug, PartialEq, Eq)]
pub struct QuarkRegistry {
    primary: SlotQuarks,
    secondary: SlotQuarks,
    clipboard: SlotQuarks,
}

impl QuarkRegistry {
    /// Return the process registry, creating the keys on first use.
    ///
    /// Safe to call any number of times; only the first call interns.
    pub fn initialize() -> &'static QuarkRegistry {
        static REGISTRY: OnceLock<QuarkRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = QuarkRegistry {
                primary: SlotQuarks {
                    data: quark_from_static_str("selection-primary-data"),
                    size: quark_from_static_str("selection-primary-size"),
                },
                secondary: SlotQuarks {
                    data: quark_from_static_str("selection-secondary-data"),
                    size: quark_from_static_str("selection-secondary-size"),
                },
                clipboard: SlotQuarks {
                    data: quark_from_static_str("selection-clipboard-data"),
                    size: quark_from_static_str("selection-clipboard-size"),
                },
            };
            tracing::debug!(?registry, "selection quarks initialized");
            registry
        })
    }

    pub fn keys(&self, slot: SelectionSlot) -> SlotQuarks {
        match slot {
            SelectionSlot::Primary => self.primary,
            SelectionSlot::Secondary => self.secondary,
            SelectionSlot::Clipboard => self.clipboard,
        }
    }
}
