//! Single-entity option tracking.
//!
//! # Design
//! - Two layers: the registry of defaults and an overlay of uncommitted edits.
//! - An option is never dirty with a value equal to its default; edits back to
//!   the default drop the overlay entry.
//! - Changed-notifications push values into bound fields, skipping the field
//!   that currently has focus so in-progress typing is not clobbered.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{OptionsError, OptionsResult};
use crate::event::{Listeners, OptionsEvent};
use crate::field::{Bindings, Field, FieldEvent, FieldId};
use crate::store::OptionStore;
use crate::value::{OptionValue, coerce};

/// Default and uncommitted values for one option set.
#[derive(Debug, Default)]
pub struct OptionsManager {
    options: BTreeMap<String, OptionValue>,
    changed: BTreeMap<String, OptionValue>,
    bindings: Bindings,
    listeners: Listeners,
}

impl OptionsManager {
    /// Empty manager with no registered options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager seeded with the given defaults.
    #[must_use]
    pub fn with_options<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OptionValue>,
    {
        Self {
            options: options
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Register defaults for options not yet known. Existing defaults win.
    pub fn add_options<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OptionValue>,
    {
        for (name, value) in options {
            let name: String = name.into();
            if self.options.contains_key(&name) {
                continue;
            }
            self.options.insert(name.clone(), value.into());
            self.listeners.emit(&OptionsEvent::Added { option: name });
        }
    }

    /// Overwrite the default for `option` (registering it if new), typically
    /// when fresh server state arrives.
    ///
    /// Bound fields and listeners receive the effective value: the new default,
    /// or a pending edit that still differs from it.
    pub fn set(&mut self, option: &str, value: impl Into<OptionValue>) {
        let value = value.into();
        let old = self.get(option);
        if self.changed.get(option) == Some(&value) {
            self.changed.remove(option);
        }
        let effective = self.changed.get(option).cloned().unwrap_or_else(|| value.clone());
        self.options.insert(option.to_string(), value);
        self.notify_changed(option, effective, old);
    }

    /// [`set`](Self::set) for several options.
    pub fn set_many<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OptionValue>,
    {
        for (name, value) in options {
            let name: String = name.into();
            self.set(&name, value);
        }
    }

    /// Registered option names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    fn notify_changed(&mut self, option: &str, value: OptionValue, old: Option<OptionValue>) {
        self.bindings.push(option, &value, true);
        self.listeners.emit(&OptionsEvent::Changed {
            option: option.to_string(),
            value,
            old,
        });
    }
}

impl OptionStore for OptionsManager {
    fn is_registered(&self, option: &str) -> bool {
        self.options.contains_key(option)
    }

    fn get(&self, option: &str) -> Option<OptionValue> {
        self.changed
            .get(option)
            .or_else(|| self.options.get(option))
            .cloned()
    }

    fn get_default(&self, option: &str) -> Option<OptionValue> {
        self.options.get(option).cloned()
    }

    fn get_dirty(&self) -> BTreeMap<String, OptionValue> {
        self.changed.clone()
    }

    fn is_dirty(&self, option: &str) -> bool {
        self.changed.contains_key(option)
    }

    fn has(&self, option: &str) -> bool {
        self.options.contains_key(option)
    }

    fn update(&mut self, option: &str, value: OptionValue) -> OptionsResult<bool> {
        let default = self
            .options
            .get(option)
            .cloned()
            .ok_or_else(|| OptionsError::UnknownOption {
                option: option.to_string(),
            })?;
        let value = coerce(default.kind(), &value).map_err(|source| OptionsError::Coercion {
            option: option.to_string(),
            expected: default.kind(),
            source,
        })?;

        let old = self.get(option);
        if old.as_ref() == Some(&value) {
            return Ok(false);
        }

        if value == default {
            self.changed.remove(option);
        } else {
            self.changed.insert(option.to_string(), value.clone());
        }
        tracing::trace!(option, value = %value, dirty = self.is_dirty(option), "option updated");
        self.notify_changed(option, value, old);
        Ok(true)
    }

    fn commit(&mut self) {
        let changed = std::mem::take(&mut self.changed);
        self.options.extend(changed);
    }

    fn reset(&mut self) {
        let reverted = std::mem::take(&mut self.changed);
        for option in reverted.keys() {
            if let Some(value) = self.options.get(option) {
                self.bindings.push(option, value, true);
            }
        }
        self.listeners.emit(&OptionsEvent::Reset);
    }

    fn bind(&mut self, option: &str, field: Arc<dyn Field>) -> FieldId {
        self.bindings.bind(option.to_string(), field)
    }

    fn unbind(&mut self, field: FieldId) -> bool {
        self.bindings.unbind(field)
    }

    fn handle_field_event(&mut self, field: FieldId, event: FieldEvent) -> OptionsResult<()> {
        if let Some((option, value)) = self.bindings.route(field, event)? {
            self.update(&option, value)?;
        }
        Ok(())
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&OptionsEvent) + Send>) {
        self.listeners.add(listener);
    }
}
