//! X11 selection protocol: ownership, conversion requests, and replies.
//!
//! Runs single-threaded on the caller's thread. Incoming events are drained
//! by [`X11Clipboard::dispatch_pending`] (driven by the daemon's pump tick)
//! and, while a conversion is outstanding, by the wait loop itself. That
//! re-entrant pumping is what lets this process answer a request for a
//! selection it owns while it is the requestor too.
//!
//! INCR transfers and `MULTIPLE` requests are not supported: oversized
//! payloads are refused and `MULTIPLE` is always answered with a refusal.

use std::collections::HashMap;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    self, Atom, AtomEnum, EventMask, GetPropertyReply, PropMode, Property, SelectionClearEvent,
    SelectionNotifyEvent, SelectionRequestEvent, Timestamp, Window,
};
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::frame::OwnerWindow;
use crate::resolver::{ClipboardService, ResolverError, SelectionHandler};
use crate::selection::{SelectionSlot, TargetType};

use super::X11Shared;

/// Fixed part of a ChangeProperty request.
const CHANGE_PROPERTY_HEADER: usize = 24;

/// Upper bound on a single poll of the connection fd.
const POLL_SLICE: Duration = Duration::from_millis(100);

struct Registration {
    owner: Arc<OwnerWindow>,
    /// Server time ownership was taken at.
    acquired: Timestamp,
    targets: Vec<TargetType>,
    handler: Arc<dyn SelectionHandler>,
}

/// [`ClipboardService`] backed by one X11 display connection.
pub struct X11Clipboard {
    shared: Arc<X11Shared>,
    registrations: Mutex<HashMap<SelectionSlot, Registration>>,
    timeout: Duration,
}

/// Whether a `SelectionClear` stamped `clear` was caused by an ownership
/// change older than our own assertion at `acquired`. Server time wraps.
fn clear_predates(clear: Timestamp, acquired: Timestamp) -> bool {
    (clear.wrapping_sub(acquired) as i32) < 0
}

/// `STRING` replies are Latin-1; every byte maps to the code point of the
/// same value.
fn latin1_to_utf8(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|&b| char::from(b)).collect::<String>().into_bytes()
}

fn clip<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> ResolverError {
    move |e| ResolverError::Clipboard(format!("{what}: {e}"))
}

impl X11Clipboard {
    /// `timeout` bounds every blocking conversion request.
    pub fn new(shared: Arc<X11Shared>, timeout: Duration) -> Self {
        Self {
            shared,
            registrations: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn registrations(&self) -> std::sync::MutexGuard<'_, HashMap<SelectionSlot, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle every event already queued on the connection.
    pub fn dispatch_pending(&self) -> Result<(), ResolverError> {
        while let Some(event) = self
            .shared
            .conn
            .poll_for_event()
            .map_err(clip("poll_for_event"))?
        {
            self.handle_event(event);
        }
        Ok(())
    }

    fn handle_event(&self, event: Event) {
        match event {
            Event::SelectionRequest(req) => {
                if let Err(e) = self.answer_request(&req) {
                    tracing::warn!(error = %e, requestor = req.requestor, "selection reply failed");
                }
            }
            Event::SelectionClear(ev) => self.handle_clear(&ev),
            Event::SelectionNotify(ev) => {
                tracing::trace!(requestor = ev.requestor, "stale SelectionNotify dropped");
            }
            other => tracing::trace!(?other, "ignored X11 event"),
        }
    }

    fn handle_clear(&self, ev: &SelectionClearEvent) {
        let Some(slot) = self.shared.slot_for_atom(ev.selection) else {
            return;
        };
        let removed = {
            let mut regs = self.registrations();
            match regs.get(&slot) {
                Some(reg) if reg.owner.xid() == ev.owner => {
                    if clear_predates(ev.time, reg.acquired) {
                        tracing::debug!(
                            %slot,
                            owner = ev.owner,
                            clear_time = ev.time,
                            acquired = reg.acquired,
                            "stale SelectionClear ignored"
                        );
                        None
                    } else {
                        regs.remove(&slot)
                    }
                }
                _ => None,
            }
        };
        if let Some(reg) = removed {
            tracing::debug!(%slot, owner = ev.owner, "selection taken by another client");
            reg.handler.lost(slot, &reg.owner);
        }
    }

    /// Convert our selection for a requester and send it the notify event.
    fn answer_request(&self, req: &SelectionRequestEvent) -> Result<(), ResolverError> {
        // Obsolete clients pass None; the target doubles as the property.
        let property = if req.property == NONE {
            req.target
        } else {
            req.property
        };
        let answered = self.convert_for(req, property)?;

        let notify = SelectionNotifyEvent {
            response_type: xproto::SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: req.time,
            requestor: req.requestor,
            selection: req.selection,
            target: req.target,
            property: if answered { property } else { NONE },
        };
        xproto::send_event(
            &*self.shared.conn,
            false,
            req.requestor,
            EventMask::NO_EVENT,
            notify,
        )
        .map_err(clip("send_event"))?;
        self.shared.conn.flush().map_err(clip("flush"))?;
        Ok(())
    }

    fn convert_for(&self, req: &SelectionRequestEvent, property: Atom) -> Result<bool, ResolverError> {
        let Some(slot) = self.shared.slot_for_atom(req.selection) else {
            return Ok(false);
        };
        let registration = self
            .registrations()
            .get(&slot)
            .filter(|r| r.owner.xid() == req.owner)
            .map(|r| (Arc::clone(&r.owner), r.targets.clone(), Arc::clone(&r.handler)));
        let Some((owner, targets, handler)) = registration else {
            tracing::debug!(%slot, owner = req.owner, "request for a selection we do not own");
            return Ok(false);
        };

        let atoms = &self.shared.atoms;
        let conn = &*self.shared.conn;

        if req.target == atoms.targets {
            let mut list = vec![atoms.targets];
            list.extend(targets.iter().filter_map(|t| self.shared.target_atom(t)));
            conn.change_property32(
                PropMode::REPLACE,
                req.requestor,
                property,
                AtomEnum::ATOM,
                &list,
            )
            .map_err(clip("change_property TARGETS"))?;
            return Ok(true);
        }

        let Some(target) = self.shared.target_for_atom(req.target) else {
            tracing::debug!(%slot, target = req.target, "unsupported target requested");
            return Ok(false);
        };
        if target == TargetType::Multiple || !targets.contains(&target) {
            tracing::debug!(%slot, %target, "target refused");
            return Ok(false);
        }

        let Some(data) = handler.supply(slot, &target, &owner) else {
            return Ok(false);
        };
        if data.len() + CHANGE_PROPERTY_HEADER > conn.maximum_request_bytes() {
            tracing::warn!(%slot, size = data.len(), "selection too large without INCR, refused");
            return Ok(false);
        }

        // TEXT is answered in our preferred encoding.
        let type_atom = if target == TargetType::Text {
            atoms.utf8_string
        } else {
            req.target
        };
        conn.change_property8(PropMode::REPLACE, req.requestor, property, type_atom, &data)
            .map_err(clip("change_property"))?;
        Ok(true)
    }

    /// Pump events until `wanted` picks one out or the timeout runs out.
    /// Everything else is handled as usual, so requests addressed to us are
    /// answered while we wait.
    fn wait_for<T>(
        &self,
        mut wanted: impl FnMut(&Event) -> Option<T>,
    ) -> Result<Option<T>, ResolverError> {
        let conn = &self.shared.conn;
        let deadline = Instant::now() + self.timeout;
        let raw_fd = conn.stream().as_raw_fd();

        loop {
            while let Some(event) = conn.poll_for_event().map_err(clip("poll_for_event"))? {
                match wanted(&event) {
                    Some(found) => return Ok(Some(found)),
                    None => self.handle_event(event),
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let slice = remaining.min(POLL_SLICE).as_millis().max(1) as u16;

            // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
            let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
            let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(slice)) {
                Ok(_) | Err(nix::Error::EINTR) => continue,
                Err(e) => return Err(ResolverError::Clipboard(format!("poll on X11 fd: {e}"))),
            }
        }
    }

    fn wait_for_notify(
        &self,
        requestor: Window,
        selection: Atom,
    ) -> Result<Option<SelectionNotifyEvent>, ResolverError> {
        self.wait_for(|event| match event {
            Event::SelectionNotify(ev) if ev.requestor == requestor && ev.selection == selection => {
                Some(ev.clone())
            }
            _ => None,
        })
    }

    /// Current server time, read off the PropertyNotify caused by a
    /// zero-length append to a property on `window`.
    fn server_time(&self, window: Window) -> Result<Timestamp, ResolverError> {
        let conn = &*self.shared.conn;
        let atom = self.shared.atoms.timestamp;
        conn.change_property8(PropMode::APPEND, window, atom, AtomEnum::STRING, &[])
            .map_err(clip("change_property timestamp"))?;
        conn.flush().map_err(clip("flush"))?;

        self.wait_for(|event| match event {
            Event::PropertyNotify(ev)
                if ev.window == window && ev.atom == atom && ev.state == Property::NEW_VALUE =>
            {
                Some(ev.time)
            }
            _ => None,
        })?
        .ok_or_else(|| ResolverError::Clipboard("timed out waiting for server time".into()))
    }

    /// Ask the owner of `slot` to convert it to `target` and read the
    /// result off our transfer property.
    fn convert(
        &self,
        slot: SelectionSlot,
        target: Atom,
        requestor: &OwnerWindow,
        time: Option<u32>,
    ) -> Result<Option<GetPropertyReply>, ResolverError> {
        let conn = &*self.shared.conn;
        let window = requestor.xid();
        let selection = self.shared.slot_atom(slot);

        xproto::convert_selection(
            conn,
            window,
            selection,
            target,
            self.shared.atoms.transfer,
            time.unwrap_or(CURRENT_TIME),
        )
        .map_err(clip("convert_selection"))?;
        conn.flush().map_err(clip("flush"))?;

        let Some(notify) = self.wait_for_notify(window, selection)? else {
            tracing::debug!(%slot, target, "conversion timed out");
            return Ok(None);
        };
        if notify.property == NONE {
            tracing::debug!(%slot, target, "conversion refused by owner");
            return Ok(None);
        }

        let reply = xproto::get_property(
            conn,
            true,
            window,
            notify.property,
            AtomEnum::ANY,
            0,
            u32::MAX,
        )
        .map_err(clip("get_property"))?
        .reply()
        .map_err(clip("get_property reply"))?;

        if reply.type_ == self.shared.atoms.incr {
            tracing::warn!(%slot, "owner started an INCR transfer, not supported");
            return Ok(None);
        }
        Ok(Some(reply))
    }
}

impl ClipboardService for X11Clipboard {
    fn set_with_owner(
        &self,
        slot: SelectionSlot,
        targets: &[TargetType],
        owner: &Arc<OwnerWindow>,
        handler: Arc<dyn SelectionHandler>,
    ) -> Result<(), ResolverError> {
        let conn = &*self.shared.conn;
        let selection = self.shared.slot_atom(slot);
        let window = owner.xid();

        let acquired = self.server_time(window)?;
        xproto::set_selection_owner(conn, window, selection, acquired)
            .map_err(clip("set_selection_owner send"))?
            .check()
            .map_err(clip("set_selection_owner"))?;
        let current = xproto::get_selection_owner(conn, selection)
            .map_err(clip("get_selection_owner send"))?
            .reply()
            .map_err(clip("get_selection_owner"))?
            .owner;
        if current != window {
            return Err(ResolverError::Clipboard(format!(
                "server kept {slot} with window {current:#x}"
            )));
        }

        let previous = self.registrations().insert(
            slot,
            Registration {
                owner: Arc::clone(owner),
                acquired,
                targets: targets.to_vec(),
                handler,
            },
        );
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
        time: Option<u32>,
    ) -> Result<(), ResolverError> {
        let conn = &*self.shared.conn;
        xproto::set_selection_owner(
            conn,
            NONE,
            self.shared.slot_atom(slot),
            time.unwrap_or(CURRENT_TIME),
        )
        .map_err(clip("set_selection_owner send"))?
        .check()
        .map_err(clip("set_selection_owner"))?;

        let previous = self.registrations().remove(&slot);
        if let Some(reg) = previous {
            reg.handler.lost(slot, &reg.owner);
        }
        Ok(())
    }

    fn wait_is_text_available(
        &self,
        slot: SelectionSlot,
        requestor: &OwnerWindow,
    ) -> Result<bool, ResolverError> {
        let atoms = self.shared.atoms;
        let Some(reply) = self.convert(slot, atoms.targets, requestor, None)? else {
            return Ok(false);
        };
        Ok(reply.value32().is_some_and(|mut offered| {
            offered.any(|a| {
                self.shared
                    .target_for_atom(a)
                    .is_some_and(|target| target.is_text())
            })
        }))
    }

    fn wait_for_text(
        &self,
        slot: SelectionSlot,
        requestor: &OwnerWindow,
        time: Option<u32>,
    ) -> Result<Option<Vec<u8>>, ResolverError> {
        let atoms = self.shared.atoms;
        if let Some(reply) = self.convert(slot, atoms.utf8_string, requestor, time)? {
            return Ok(Some(reply.value));
        }
        // Owners that only speak STRING still yield text, re-encoded.
        Ok(self
            .convert(slot, atoms.string, requestor, time)?
            .map(|reply| latin1_to_utf8(&reply.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_from_before_assertion_is_stale() {
        assert!(clear_predates(999, 1000));
        assert!(!clear_predates(1000, 1000));
        assert!(!clear_predates(1001, 1000));
    }

    #[test]
    fn stale_check_survives_server_time_wrap() {
        let acquired = 5;
        assert!(clear_predates(u32::MAX - 10, acquired));
        assert!(!clear_predates(acquired.wrapping_add(20), acquired));
        assert!(!clear_predates(3, u32::MAX - 2));
    }

    #[test]
    fn latin1_bytes_become_utf8() {
        assert_eq!(latin1_to_utf8(b"plain"), b"plain".to_vec());
        assert_eq!(latin1_to_utf8(&[0x63, 0x61, 0x66, 0xe9]), "café".as_bytes().to_vec());
        assert_eq!(
            String::from_utf8(latin1_to_utf8(&[0xa9, 0xff])).unwrap(),
            "©ÿ"
        );
    }
}
