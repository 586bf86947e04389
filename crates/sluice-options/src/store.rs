//! Contract shared by the single- and multi-entity managers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{OptionsError, OptionsResult};
use crate::event::OptionsEvent;
use crate::field::{Field, FieldEvent, FieldId};
use crate::value::OptionValue;

/// Default-versus-edited option tracking with bound form fields.
///
/// Write paths fail with [`OptionsError::UnknownOption`] for names that were
/// never registered; read paths answer `None` or drop the name.
pub trait OptionStore {
    /// Whether `option` has a registered global default.
    fn is_registered(&self, option: &str) -> bool;

    /// Effective value: the uncommitted edit if there is one, else the default.
    fn get(&self, option: &str) -> Option<OptionValue>;

    /// Baseline value, never overlaid by uncommitted edits.
    fn get_default(&self, option: &str) -> Option<OptionValue>;

    /// Every uncommitted edit.
    fn get_dirty(&self) -> BTreeMap<String, OptionValue>;

    /// Whether `option` has an uncommitted edit.
    fn is_dirty(&self, option: &str) -> bool;

    /// Whether a baseline value is present for `option`.
    fn has(&self, option: &str) -> bool;

    /// Record a user edit. The value is coerced to the option's type; an edit
    /// back to the default clears the dirty entry. Returns `true` when the
    /// effective value changed and bound fields were notified.
    ///
    /// # Errors
    ///
    /// Fails for unregistered options and values that cannot be coerced.
    fn update(&mut self, option: &str, value: OptionValue) -> OptionsResult<bool>;

    /// Promote every uncommitted edit to the baseline.
    fn commit(&mut self);

    /// Discard every uncommitted edit.
    fn reset(&mut self);

    /// Bind a form control to `option`. No value is pushed into the control.
    fn bind(&mut self, option: &str, field: Arc<dyn Field>) -> FieldId;

    /// Drop a binding. Returns `false` if the field was not bound.
    fn unbind(&mut self, field: FieldId) -> bool;

    /// Forward a focus, blur or change notification from a bound control.
    ///
    /// # Errors
    ///
    /// Fails for unbound fields and for change events whose value the
    /// option rejects.
    fn handle_field_event(&mut self, field: FieldId, event: FieldEvent) -> OptionsResult<()>;

    /// Register an observer for [`OptionsEvent`]s.
    fn subscribe(&mut self, listener: Box<dyn FnMut(&OptionsEvent) + Send>);

    /// Effective values for the named options; unregistered names are skipped.
    fn get_many(&self, options: &[&str]) -> BTreeMap<String, OptionValue> {
        options
            .iter()
            .filter_map(|option| self.get(option).map(|value| ((*option).to_string(), value)))
            .collect()
    }

    /// Apply several edits. Every name is checked before any edit is applied.
    /// Returns how many edits changed an effective value.
    ///
    /// # Errors
    ///
    /// Fails on the first unregistered name (nothing applied) or on the first
    /// value that cannot be coerced (earlier edits stay applied).
    fn update_many<I>(&mut self, values: I) -> OptionsResult<usize>
    where
        I: IntoIterator<Item = (String, OptionValue)>,
        Self: Sized,
    {
        let values: Vec<(String, OptionValue)> = values.into_iter().collect();
        if let Some((option, _)) = values.iter().find(|(option, _)| !self.is_registered(option)) {
            return Err(OptionsError::UnknownOption {
                option: option.clone(),
            });
        }

        let mut changed = 0;
        for (option, value) in values {
            if self.update(&option, value)? {
                changed += 1;
            }
        }
        Ok(changed)
    }
}
