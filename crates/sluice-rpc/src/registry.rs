//! Namespace to method index built from discovered method names.

use std::collections::{BTreeMap, BTreeSet};

/// Split `namespace.method` at the first dot. Both halves must be non-empty.
#[must_use]
pub fn split_method_name(name: &str) -> Option<(&str, &str)> {
    name.split_once('.')
        .filter(|(namespace, method)| !namespace.is_empty() && !method.is_empty())
}

/// Methods the server advertised, grouped by namespace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MethodRegistry {
    namespaces: BTreeMap<String, BTreeSet<String>>,
}

impl MethodRegistry {
    /// Build a registry from fully qualified names. Names without a
    /// namespace are skipped with a warning.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut namespaces: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let Some((namespace, method)) = split_method_name(name) else {
                tracing::warn!(method = name, "ignoring method name without a namespace");
                continue;
            };
            namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(method.to_string());
        }
        Self { namespaces }
    }

    /// Replace the contents with `next`, returning namespaces that disappeared.
    pub fn replace(&mut self, next: Self) -> Vec<String> {
        let removed = self
            .namespaces
            .keys()
            .filter(|namespace| !next.namespaces.contains_key(*namespace))
            .cloned()
            .collect();
        *self = next;
        removed
    }

    /// Known namespaces in order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    /// Methods exported by `namespace`, without the namespace prefix.
    #[must_use]
    pub fn methods(&self, namespace: &str) -> Option<Vec<String>> {
        self.namespaces
            .get(namespace)
            .map(|methods| methods.iter().cloned().collect())
    }

    /// Whether `namespace` has at least one method.
    #[must_use]
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Whether the fully qualified `name` was advertised.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        split_method_name(name).is_some_and(|(namespace, method)| {
            self.namespaces
                .get(namespace)
                .is_some_and(|methods| methods.contains(method))
        })
    }

    /// Every fully qualified name in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .flat_map(|(namespace, methods)| {
                methods.iter().map(move |method| format!("{namespace}.{method}"))
            })
            .collect()
    }

    /// Number of advertised methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeSet::len).sum()
    }

    /// Whether nothing has been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
