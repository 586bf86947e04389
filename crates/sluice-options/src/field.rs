//! The form-field seam and binding bookkeeping shared by both managers.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use crate::error::{OptionsError, OptionsResult};
use crate::value::OptionValue;

/// A live form control bound to an option.
///
/// Implementations own their interior mutability; the managers only read the
/// current value when the UI reports a change and push values on
/// changed-notifications.
pub trait Field: Send + Sync {
    /// Current value held by the control.
    fn value(&self) -> OptionValue;

    /// Replace the value shown by the control.
    fn set_value(&self, value: &OptionValue);
}

/// Handle returned by `bind`, used to route UI notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u64);

impl Display for FieldId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "field#{}", self.0)
    }
}

/// Notifications a bound control forwards to its manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    /// The control gained input focus.
    Focus,
    /// The control lost input focus.
    Blur,
    /// The user changed the value (change, check and spin all map here).
    Change,
}

struct BoundField {
    option: String,
    field: Arc<dyn Field>,
}

/// Bound controls per option plus the single focused control.
#[derive(Default)]
pub(crate) struct Bindings {
    next_id: u64,
    fields: HashMap<FieldId, BoundField>,
    by_option: HashMap<String, Vec<FieldId>>,
    focused: Option<FieldId>,
}

impl Bindings {
    /// Bind `field` to `option`. A control already bound elsewhere keeps its
    /// identifier and moves to the new option.
    pub(crate) fn bind(&mut self, option: String, field: Arc<dyn Field>) -> FieldId {
        let existing = self
            .fields
            .iter()
            .find(|(_, bound)| Arc::ptr_eq(&bound.field, &field))
            .map(|(id, _)| *id);

        let id = if let Some(id) = existing {
            self.detach(id);
            id
        } else {
            let id = FieldId(self.next_id);
            self.next_id += 1;
            id
        };

        self.by_option.entry(option.clone()).or_default().push(id);
        self.fields.insert(id, BoundField { option, field });
        id
    }

    pub(crate) fn unbind(&mut self, id: FieldId) -> bool {
        if self.focused == Some(id) {
            self.focused = None;
        }
        self.detach(id)
    }

    fn detach(&mut self, id: FieldId) -> bool {
        let Some(bound) = self.fields.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_option.get_mut(&bound.option) {
            ids.retain(|candidate| *candidate != id);
            if ids.is_empty() {
                self.by_option.remove(&bound.option);
            }
        }
        true
    }

    /// Translate a UI notification. `Change` yields the option and the value
    /// the control now holds so the caller can run its update path.
    pub(crate) fn route(
        &mut self,
        id: FieldId,
        event: FieldEvent,
    ) -> OptionsResult<Option<(String, OptionValue)>> {
        let bound = self
            .fields
            .get(&id)
            .ok_or(OptionsError::UnknownField { field: id })?;
        match event {
            FieldEvent::Focus => {
                self.focused = Some(id);
                Ok(None)
            }
            FieldEvent::Blur => {
                if self.focused == Some(id) {
                    self.focused = None;
                }
                Ok(None)
            }
            FieldEvent::Change => Ok(Some((bound.option.clone(), bound.field.value()))),
        }
    }

    #[cfg(test)]
    pub(crate) const fn focused(&self) -> Option<FieldId> {
        self.focused
    }

    pub(crate) fn is_bound(&self, option: &str) -> bool {
        self.by_option.contains_key(option)
    }

    /// Push `value` into every control bound to `option`. With
    /// `skip_focused`, the focused control keeps what the user is typing.
    pub(crate) fn push(&self, option: &str, value: &OptionValue, skip_focused: bool) {
        let Some(ids) = self.by_option.get(option) else {
            return;
        };
        for id in ids {
            if skip_focused && self.focused == Some(*id) {
                continue;
            }
            if let Some(bound) = self.fields.get(id) {
                bound.field.set_value(value);
            }
        }
    }
}

impl Debug for Bindings {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Bindings")
            .field("fields", &self.fields.len())
            .field("options", &self.by_option.len())
            .field("focused", &self.focused)
            .finish()
    }
}
