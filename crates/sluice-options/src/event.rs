//! Observer notifications emitted by the option managers.

use std::fmt::{self, Debug, Formatter};

use crate::value::OptionValue;

/// Something observable happened to a manager's option set.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsEvent {
    /// A new option was registered with a default value.
    Added {
        /// Registered option name.
        option: String,
    },
    /// The effective value of an option changed.
    Changed {
        /// Option whose value changed.
        option: String,
        /// New effective value.
        value: OptionValue,
        /// Previous effective value, if the option was known.
        old: Option<OptionValue>,
    },
    /// Uncommitted edits were discarded.
    Reset,
}

type Listener = Box<dyn FnMut(&OptionsEvent) + Send>;

#[derive(Default)]
pub(crate) struct Listeners {
    listeners: Vec<Listener>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub(crate) fn emit(&mut self, event: &OptionsEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl Debug for Listeners {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
