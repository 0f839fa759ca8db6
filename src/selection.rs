use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ulid::Ulid;

use crate::layout::{format_day, format_time};
use crate::model::{Slot, Stamp};

/// Receives the start time of a slot the user picked.
pub trait SelectionSink: Send + Sync {
    fn on_select(&self, slot_time: Stamp);
}

/// Route an activation to `sink` if the slot is eligible.
///
/// Returns whether the sink was called. Past or booked slots are a no-op.
pub fn activate(slot: &Slot, sink: &dyn SelectionSink) -> bool {
    if !slot.is_eligible() {
        tracing::debug!(time = %slot.time, state = ?slot.state(), "ignoring activation");
        return false;
    }
    sink.on_select(slot.time);
    true
}

// ── Booking handoff ──────────────────────────────────────────────

/// A prefilled appointment request. Nothing is persisted; the draft is
/// rendered into a message a human confirms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub reference: Ulid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub message: String,
}

impl BookingDraft {
    pub fn for_slot(slot_time: Stamp) -> Self {
        Self {
            reference: Ulid::new(),
            date: slot_time.date(),
            time: slot_time.time(),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            service: String::new(),
            message: String::new(),
        }
    }

    pub fn slot_time(&self) -> Stamp {
        self.date.and_time(self.time)
    }

    /// Fields the contact relay refuses to send without.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }

    pub fn subject(&self) -> String {
        let who = if self.name.trim().is_empty() {
            "website visitor"
        } else {
            self.name.trim()
        };
        format!(
            "Appointment request from {who} for {} at {}",
            format_day(self.date),
            format_time(self.slot_time())
        )
    }

    /// Plain-text body in the contact relay's `Key: value` layout.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Name: {}\nEmail: {}\nPhone: {}\nRequested: {} at {}\n",
            self.name,
            self.email,
            self.phone,
            format_day(self.date),
            format_time(self.slot_time()),
        );
        if !self.service.is_empty() {
            out.push_str(&format!("Service: {}\n", self.service));
        }
        out.push_str(&format!("Message: {}\nReference: {}", self.message, self.reference));
        out
    }
}

/// Sink that turns every selection into a [`BookingDraft`] on a channel.
#[derive(Debug, Clone)]
pub struct DraftSink {
    tx: mpsc::UnboundedSender<BookingDraft>,
}

impl DraftSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BookingDraft>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SelectionSink for DraftSink {
    fn on_select(&self, slot_time: Stamp) {
        // Nobody listening means the form was closed.
        let _ = self.tx.send(BookingDraft::for_slot(slot_time));
    }
}
