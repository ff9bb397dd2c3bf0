//! In-memory windowing system for tests.
//!
//! [`MemoryClipboard`] keeps registrations in a table and lets a test play
//! the part of a foreign client: request a conversion, assert a slot from
//! "another process", or fire a loss notification at a scripted moment.
//! [`StaticDisplays`] reports a fixed, adjustable number of displays and
//! hands out owner windows with fresh ids.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::frame::OwnerWindow;
use crate::selection::{SelectionSlot, TargetType};

use super::{
    ClipboardService, DisplayDescriptor, DisplayManager, ResolverError, SelectionHandler,
    WindowProvider,
};

struct Registration {
    owner: Arc<OwnerWindow>,
    targets: Vec<TargetType>,
    handler: Arc<dyn SelectionHandler>,
}

#[derive(Default)]
pub struct MemoryClipboard {
    slots: Mutex<HashMap<SelectionSlot, Registration>>,
    foreign: Mutex<HashMap<SelectionSlot, Vec<u8>>>,
    refuse: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `set_with_owner` calls fail.
    pub fn refuse_ownership(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Relaxed);
    }

    /// Window id of the local owner of `slot`, if any.
    pub fn owner_xid(&self, slot: SelectionSlot) -> Option<u32> {
        self.slots.lock().unwrap().get(&slot).map(|r| r.owner.xid())
    }

    /// Another client takes `slot` with `data`; the local owner loses it.
    pub fn foreign_assert(&self, slot: SelectionSlot, data: &[u8]) {
        let previous = self.slots.lock().unwrap().remove(&slot);
        self.foreign.lock().unwrap().insert(slot, data.to_vec());
        if let Some(reg) = previous {
            reg.handler.lost(slot, &reg.owner);
        }
    }

    /// A foreign client asks for `slot` converted to `target`.
    pub fn foreign_request(&self, slot: SelectionSlot, target: &TargetType) -> Option<Vec<u8>> {
        let local = self
            .slots
            .lock()
            .unwrap()
            .get(&slot)
            .map(|r| (Arc::clone(&r.owner), r.targets.clone(), Arc::clone(&r.handler)));
        match local {
            Some((owner, targets, handler)) => {
                if targets.contains(target) {
                    handler.supply(slot, target, &owner)
                } else {
                    None
                }
            }
            None if target.is_text() => self.foreign.lock().unwrap().get(&slot).cloned(),
            None => None,
        }
    }

    /// Deliver a loss notification to the current local owner of `slot`
    /// without installing anyone else. Returns whether there was an owner.
    pub fn fire_lost(&self, slot: SelectionSlot) -> bool {
        let previous = self.slots.lock().unwrap().remove(&slot);
        match previous {
            Some(reg) => {
                reg.handler.lost(slot, &reg.owner);
                true
            }
            None => false,
        }
    }
}

impl ClipboardService for MemoryClipboard {
    fn set_with_owner(
        &self,
        slot: SelectionSlot,
        targets: &[TargetType],
        owner: &Arc<OwnerWindow>,
        handler: Arc<dyn SelectionHandler>,
    ) -> Result<(), ResolverError> {
        if self.refuse.load(Ordering::Relaxed) {
            return Err(ResolverError::Clipboard("ownership refused".into()));
        }
        let previous = self.slots.lock().unwrap().insert(
            slot,
            Registration {
                owner: Arc::clone(owner),
                targets: targets.to_vec(),
                handler,
            },
        );
        self.foreign.lock().unwrap().remove(&slot);
        if let Some(reg) = previous
            && !Arc::ptr_eq(&reg.owner, owner)
        {
            reg.handler.lost(slot, &reg.owner);
        }
        Ok(())
    }

    fn clear(
        &self,
        slot: SelectionSlot,
        _owner: &OwnerWindow,
        _time: Option<u32>,
    ) -> Result<(), ResolverError> {
        self.foreign.lock().unwrap().remove(&slot);
        self.fire_lost(slot);
        Ok(())
    }

    fn wait_is_text_available(
        &self,
        slot: SelectionSlot,
        _requestor: &OwnerWindow,
    ) -> Result<bool, ResolverError> {
        if let Some(reg) = self.slots.lock().unwrap().get(&slot) {
            return Ok(reg.targets.iter().any(TargetType::is_text));
        }
        Ok(self.foreign.lock().unwrap().contains_key(&slot))
    }

    fn wait_for_text(
        &self,
        slot: SelectionSlot,
        _requestor: &OwnerWindow,
        _time: Option<u32>,
    ) -> Result<Option<Vec<u8>>, ResolverError> {
        Ok(self.foreign_request(slot, &TargetType::Utf8String))
    }
}

/// A display manager with an adjustable display count.
pub struct StaticDisplays {
    count: AtomicUsize,
    next_xid: AtomicU32,
    pub destroyed: Mutex<Vec<u32>>,
}

impl StaticDisplays {
    pub fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            next_xid: AtomicU32::new(0x0040_0001),
            destroyed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_count(&self, count: usize) {
        self.count.store(count, Ordering::Relaxed);
    }
}

impl DisplayManager for StaticDisplays {
    fn list_displays(&self) -> Vec<DisplayDescriptor> {
        (0..self.count.load(Ordering::Relaxed))
            .map(|n| DisplayDescriptor {
                name: format!(":{n}"),
            })
            .collect()
    }
}

impl WindowProvider for StaticDisplays {
    fn create_owner(&self, _display: &str) -> Result<Arc<OwnerWindow>, ResolverError> {
        let xid = self.next_xid.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(OwnerWindow::new(xid)))
    }

    fn destroy_owner(&self, _display: &str, owner: &OwnerWindow) {
        self.destroyed.lock().unwrap().push(owner.xid());
    }
}
