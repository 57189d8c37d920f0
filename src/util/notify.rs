//! Outcome notifications for the data-access layer.
//!
//! Every access object takes a [`Notifier`] when it is constructed. The presentation layer
//! decides what to do with the events; internal bookkeeping such as [`crate::State`] is
//! wired to a [`QuietNotifier`] so it never surfaces anything to the user.

use std::rc::Rc;
use std::sync::mpsc::Sender;
use serde::Serialize;
use crate::backend::column_type::SortOrder;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum Event {
    OperationSucceeded {
        table: String,
        message: String,
        id: String
    },
    OperationFailed {
        table: String,
        error: String
    },
    SortChanged {
        column: String,
        order: SortOrder
    },
    VisibleColumnsChanged {
        columns: Vec<String>
    },
    ModelReset,
}

/// Receives the events emitted by table access objects and models.
pub trait Notifier {
    fn notify(&self, event: &Event);
}

impl<F: Fn(&Event)> Notifier for F {
    fn notify(&self, event: &Event) {
        self(event);
    }
}

/// Swallows every event.
pub struct QuietNotifier;

impl Notifier for QuietNotifier {
    fn notify(&self, _event: &Event) {}
}

/// Forwards events through a channel, e.g. to the thread driving the UI.
pub struct ChannelNotifier {
    sender: Sender<Event>
}

impl ChannelNotifier {
    pub fn new(sender: Sender<Event>) -> Self {
        return Self { sender };
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &Event) {
        // A dropped receiver means nobody is listening anymore
        let _ = self.sender.send(event.clone());
    }
}

/// Shared handle to a notifier that swallows everything.
pub fn quiet() -> Rc<dyn Notifier> {
    return Rc::new(QuietNotifier);
}

/// The uniform fail/success convention shared by every table access object.
pub struct Reporter {
    table_name: String,
    last_error: String,
    notifier: Rc<dyn Notifier>
}

impl Reporter {
    pub fn new(table_name: &str, notifier: Rc<dyn Notifier>) -> Self {
        return Self {
            table_name: table_name.to_string(),
            last_error: String::new(),
            notifier
        };
    }

    /// Text of the last error, empty after a successful operation.
    pub fn error(&self) -> &str {
        return &self.last_error;
    }

    pub fn notifier(&self) -> &Rc<dyn Notifier> {
        return &self.notifier;
    }

    /// Records the error, logs it and emits a failure event. Always returns false.
    pub fn fail(&mut self, message: impl AsRef<str>) -> bool {
        self.last_error = format!("{} {}", self.table_name, message.as_ref());
        tracing::debug!("{}", self.last_error);
        self.notifier.notify(&Event::OperationFailed {
            table: self.table_name.clone(),
            error: self.last_error.clone()
        });
        return false;
    }

    /// Clears the last error, logs the message and emits a success event. Always returns true.
    pub fn success(&mut self, message: impl AsRef<str>, id: impl AsRef<str>) -> bool {
        self.last_error.clear();
        tracing::info!("{} {} {}", self.table_name, message.as_ref(), id.as_ref());
        self.notifier.notify(&Event::OperationSucceeded {
            table: self.table_name.clone(),
            message: message.as_ref().to_string(),
            id: id.as_ref().to_string()
        });
        return true;
    }

    /// Emits an event that is not a success/failure outcome.
    pub fn emit(&self, event: Event) {
        self.notifier.notify(&event);
    }
}
