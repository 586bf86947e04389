//! Per-entity option tracking behind one set of bound fields.
//!
//! # Design
//! - Global defaults live in one registry; each entity id owns a partition of
//!   stored overrides and a partition of uncommitted edits.
//! - Exactly one id is active. Unqualified reads and writes address its
//!   partitions; switching ids never touches other partitions.
//! - `None` is a valid id. An id without partitions reads as all defaults,
//!   nothing dirty.
//! - Committed edits stay as the entity's stored overrides; `forget` drops an
//!   entity's partitions entirely.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::{OptionsError, OptionsResult};
use crate::event::{Listeners, OptionsEvent};
use crate::field::{Bindings, Field, FieldEvent, FieldId};
use crate::store::OptionStore;
use crate::value::{OptionValue, coerce};

type Partition = BTreeMap<String, OptionValue>;

/// Option tracking partitioned by entity id `K`.
#[derive(Debug)]
pub struct MultiOptionsManager<K = String> {
    options: Partition,
    stored: HashMap<Option<K>, Partition>,
    changed: HashMap<Option<K>, Partition>,
    current_id: Option<K>,
    bindings: Bindings,
    listeners: Listeners,
}

impl<K> Default for MultiOptionsManager<K> {
    fn default() -> Self {
        Self {
            options: Partition::new(),
            stored: HashMap::new(),
            changed: HashMap::new(),
            current_id: None,
            bindings: Bindings::default(),
            listeners: Listeners::default(),
        }
    }
}

impl<K> MultiOptionsManager<K>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Empty manager with no registered options and no active id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager seeded with the given global defaults.
    #[must_use]
    pub fn with_options<I, N, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
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

    /// Register global defaults for options not yet known. Existing defaults win.
    pub fn add_options<I, N, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
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

    /// Active entity id.
    #[must_use]
    pub const fn current_id(&self) -> Option<&K> {
        self.current_id.as_ref()
    }

    /// Registered option names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    /// Make `id` the active entity and return the previous one. Unless
    /// `quiet`, every bound field is refreshed with the new entity's values.
    pub fn change_id(&mut self, id: Option<K>, quiet: bool) -> Option<K> {
        let previous = std::mem::replace(&mut self.current_id, id);
        tracing::trace!(previous = ?previous, current = ?self.current_id, quiet, "active entity changed");
        if !quiet {
            self.refresh_fields();
        }
        previous
    }

    /// Run `inspect` with `id` active, then restore the previous id. Fields are
    /// not refreshed in either direction.
    pub fn with_entity<R>(&mut self, id: K, inspect: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.change_id(Some(id), true);
        let output = inspect(self);
        self.change_id(previous, true);
        output
    }

    /// Every registered option with its effective value for the active id.
    #[must_use]
    pub fn get_all(&self) -> BTreeMap<String, OptionValue> {
        self.options
            .keys()
            .filter_map(|option| self.get(option).map(|value| (option.clone(), value)))
            .collect()
    }

    /// Store a per-entity baseline for `option` under the active id, e.g. when
    /// the server reports an entity's current settings. Returns `true` when the
    /// effective value changed and bound fields were notified.
    ///
    /// # Errors
    ///
    /// Fails for unregistered options and values that cannot be coerced.
    pub fn set_default(&mut self, option: &str, value: impl Into<OptionValue>) -> OptionsResult<bool> {
        let old_default = self.checked_default(option)?;
        let value = coerce_for(option, &old_default, &value.into())?;
        if value == old_default {
            return Ok(false);
        }

        self.stored
            .entry(self.current_id.clone())
            .or_default()
            .insert(option.to_string(), value.clone());

        let dirty = self
            .changed_partition()
            .and_then(|changed| changed.get(option))
            .cloned();
        if let Some(dirty) = dirty {
            if dirty == value {
                self.remove_dirty(option);
            }
            return Ok(false);
        }

        self.notify_changed(option, value, Some(old_default));
        Ok(true)
    }

    /// [`set_default`](Self::set_default) for several options.
    ///
    /// # Errors
    ///
    /// Fails on the first unregistered name (nothing applied) or on the first
    /// value that cannot be coerced.
    pub fn set_defaults<I, N, V>(&mut self, values: I) -> OptionsResult<usize>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<OptionValue>,
    {
        let values: Vec<(String, OptionValue)> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        if let Some((option, _)) = values.iter().find(|(option, _)| !self.is_registered(option)) {
            return Err(OptionsError::UnknownOption {
                option: option.clone(),
            });
        }

        let mut changed = 0;
        for (option, value) in values {
            if self.set_default(&option, value)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Drop the active entity's stored overrides and uncommitted edits.
    pub fn forget(&mut self) {
        let stored = self.stored.remove(&self.current_id);
        let changed = self.changed.remove(&self.current_id);
        let mut touched: Vec<String> = stored.into_iter().flat_map(BTreeMap::into_keys).collect();
        touched.extend(changed.into_iter().flat_map(BTreeMap::into_keys));
        touched.sort();
        touched.dedup();
        for option in &touched {
            if let Some(value) = self.options.get(option) {
                self.bindings.push(option, value, true);
            }
        }
        self.listeners.emit(&OptionsEvent::Reset);
    }

    /// Drop every entity's partitions and clear the active id.
    pub fn reset_all(&mut self) {
        self.stored.clear();
        self.changed.clear();
        self.change_id(None, false);
        self.listeners.emit(&OptionsEvent::Reset);
    }

    fn checked_default(&self, option: &str) -> OptionsResult<OptionValue> {
        self.get_default(option)
            .ok_or_else(|| OptionsError::UnknownOption {
                option: option.to_string(),
            })
    }

    fn stored_partition(&self) -> Option<&Partition> {
        self.stored.get(&self.current_id)
    }

    fn changed_partition(&self) -> Option<&Partition> {
        self.changed.get(&self.current_id)
    }

    fn remove_dirty(&mut self, option: &str) {
        if let Some(changed) = self.changed.get_mut(&self.current_id) {
            changed.remove(option);
            if changed.is_empty() {
                self.changed.remove(&self.current_id);
            }
        }
    }

    fn refresh_fields(&self) {
        for option in self.options.keys() {
            if !self.bindings.is_bound(option) {
                continue;
            }
            if let Some(value) = self.get(option) {
                self.bindings.push(option, &value, false);
            }
        }
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

fn coerce_for(option: &str, baseline: &OptionValue, value: &OptionValue) -> OptionsResult<OptionValue> {
    coerce(baseline.kind(), value).map_err(|source| OptionsError::Coercion {
        option: option.to_string(),
        expected: baseline.kind(),
        source,
    })
}

impl<K> OptionStore for MultiOptionsManager<K>
where
    K: Clone + Eq + Hash + Debug,
{
    fn is_registered(&self, option: &str) -> bool {
        self.options.contains_key(option)
    }

    fn get(&self, option: &str) -> Option<OptionValue> {
        self.changed_partition()
            .and_then(|changed| changed.get(option))
            .cloned()
            .or_else(|| self.get_default(option))
    }

    fn get_default(&self, option: &str) -> Option<OptionValue> {
        self.stored_partition()
            .and_then(|stored| stored.get(option))
            .or_else(|| self.options.get(option))
            .cloned()
    }

    fn get_dirty(&self) -> BTreeMap<String, OptionValue> {
        self.changed_partition().cloned().unwrap_or_default()
    }

    fn is_dirty(&self, option: &str) -> bool {
        self.changed_partition()
            .is_some_and(|changed| changed.contains_key(option))
    }

    fn has(&self, option: &str) -> bool {
        self.stored_partition()
            .is_some_and(|stored| stored.contains_key(option))
    }

    fn update(&mut self, option: &str, value: OptionValue) -> OptionsResult<bool> {
        let default = self.checked_default(option)?;
        let value = coerce_for(option, &default, &value)?;

        let old = self.get(option);
        if old.as_ref() == Some(&value) {
            return Ok(false);
        }

        if value == default {
            self.remove_dirty(option);
        } else {
            self.changed
                .entry(self.current_id.clone())
                .or_default()
                .insert(option.to_string(), value.clone());
        }
        self.notify_changed(option, value, old);
        Ok(true)
    }

    fn commit(&mut self) {
        if let Some(changed) = self.changed.remove(&self.current_id) {
            self.stored
                .entry(self.current_id.clone())
                .or_default()
                .extend(changed);
        }
    }

    fn reset(&mut self) {
        if let Some(reverted) = self.changed.remove(&self.current_id) {
            for option in reverted.keys() {
                if let Some(value) = self.get_default(option) {
                    self.bindings.push(option, &value, true);
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::tests::RecordingField;

    fn torrent_options() -> MultiOptionsManager<String> {
        MultiOptionsManager::with_options([
            ("max_download_speed", OptionValue::Number(-1.0)),
            ("stop_at_ratio", OptionValue::Bool(false)),
            ("stop_ratio", OptionValue::Number(2.0)),
            ("move_completed_path", OptionValue::from("")),
        ])
    }

    fn id(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn edits_stay_with_their_entity() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), false);
        manager.update("stop_ratio", 1.5.into()).expect("registered");
        manager.change_id(id("b"), false);
        manager.update("stop_ratio", 3.into()).expect("registered");

        manager.change_id(id("a"), false);
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(1.5)));
        manager.change_id(id("b"), false);
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(3.0)));
        manager.change_id(id("c"), false);
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(2.0)));
        assert!(manager.get_dirty().is_empty());
    }

    #[test]
    fn change_id_refreshes_fields_unless_quiet() {
        let mut manager = torrent_options();
        let field = RecordingField::new(2.0);
        manager.bind("stop_ratio", field.clone());

        manager.change_id(id("a"), true);
        manager.set_default("stop_ratio", 4).expect("registered");
        assert_eq!(field.pushed(), vec![OptionValue::Number(4.0)]);

        let previous = manager.change_id(id("b"), true);
        assert_eq!(previous, id("a"));
        assert_eq!(field.pushed().len(), 1);

        manager.change_id(id("b"), false);
        assert_eq!(field.value(), OptionValue::Number(2.0));
        manager.change_id(id("a"), false);
        assert_eq!(field.value(), OptionValue::Number(4.0));
    }

    #[test]
    fn stored_overrides_win_over_global_defaults() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), true);
        assert!(!manager.has("max_download_speed"));

        manager
            .set_defaults([("max_download_speed", "100"), ("stop_at_ratio", "true")])
            .expect("registered");
        assert!(manager.has("max_download_speed"));
        assert_eq!(manager.get_default("max_download_speed"), Some(OptionValue::Number(100.0)));
        assert_eq!(manager.get("stop_at_ratio"), Some(OptionValue::Bool(true)));

        manager.update("max_download_speed", 100.into()).expect("registered");
        assert!(!manager.is_dirty("max_download_speed"));
        manager.update("max_download_speed", (-1).into()).expect("registered");
        assert!(manager.is_dirty("max_download_speed"));
    }

    #[test]
    fn set_default_does_not_clobber_dirty_fields() {
        let mut manager = torrent_options();
        let field = RecordingField::new(-1);
        manager.bind("max_download_speed", field.clone());
        manager.change_id(id("a"), true);
        manager.update("max_download_speed", 50.into()).expect("registered");

        assert_eq!(manager.set_default("max_download_speed", 70), Ok(false));
        assert_eq!(manager.get("max_download_speed"), Some(OptionValue::Number(50.0)));
        assert_eq!(field.pushed(), vec![OptionValue::Number(50.0)]);

        manager.set_default("max_download_speed", 50).expect("registered");
        assert!(!manager.is_dirty("max_download_speed"));
    }

    #[test]
    fn commit_keeps_values_as_entity_defaults() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), true);
        manager.update("move_completed_path", "/done".into()).expect("registered");

        manager.commit();
        assert!(manager.get_dirty().is_empty());
        assert_eq!(manager.get_default("move_completed_path"), Some(OptionValue::from("/done")));

        manager.with_entity("b".to_string(), |other| {
            assert_eq!(other.get("move_completed_path"), Some(OptionValue::from("")));
        });
        assert_eq!(manager.current_id(), Some(&"a".to_string()));
    }

    #[test]
    fn reset_only_discards_edits_and_forget_drops_everything() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), true);
        manager.set_default("stop_ratio", 5).expect("registered");
        manager.update("stop_ratio", 6.into()).expect("registered");

        manager.reset();
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(5.0)));

        manager.forget();
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(2.0)));
        assert!(!manager.has("stop_ratio"));
    }

    #[test]
    fn reset_all_clears_every_entity() {
        let mut manager = torrent_options();
        for entity in ["a", "b"] {
            manager.change_id(id(entity), true);
            manager.set_default("stop_at_ratio", true).expect("registered");
            manager.update("stop_ratio", 9.into()).expect("registered");
        }

        manager.reset_all();
        assert_eq!(manager.current_id(), None);
        for entity in ["a", "b"] {
            manager.change_id(id(entity), true);
            assert!(manager.get_dirty().is_empty());
            assert_eq!(manager.get("stop_at_ratio"), Some(OptionValue::Bool(false)));
        }
    }

    #[test]
    fn get_all_covers_every_registered_option() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), true);
        manager.update("stop_at_ratio", "on".into()).expect("registered");

        let all = manager.get_all();
        assert_eq!(all.len(), 4);
        assert_eq!(all.get("stop_at_ratio"), Some(&OptionValue::Bool(true)));
        assert_eq!(all.get("stop_ratio"), Some(&OptionValue::Number(2.0)));
    }

    #[test]
    fn writes_to_unknown_options_fail() {
        let mut manager = torrent_options();
        assert!(matches!(
            manager.set_default("file_priorities", "1"),
            Err(OptionsError::UnknownOption { .. })
        ));
        assert!(matches!(
            manager.set_defaults([("stop_ratio", "3"), ("bogus", "1")]),
            Err(OptionsError::UnknownOption { .. })
        ));
        assert_eq!(manager.get_default("stop_ratio"), Some(OptionValue::Number(2.0)));
    }

    #[test]
    fn non_finite_numbers_never_reach_an_entity() {
        let mut manager = torrent_options();
        manager.change_id(id("a"), true);
        assert!(matches!(
            manager.update("stop_ratio", OptionValue::Number(f64::NAN)),
            Err(OptionsError::Coercion { .. })
        ));
        assert!(matches!(
            manager.set_default("stop_ratio", f64::INFINITY),
            Err(OptionsError::Coercion { .. })
        ));
        assert!(manager.get_dirty().is_empty());
        assert_eq!(manager.get("stop_ratio"), Some(OptionValue::Number(2.0)));
    }
}
