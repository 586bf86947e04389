//! Command handlers grouped by concern.

pub(crate) mod methods;
pub(crate) mod prefs;
pub(crate) mod torrents;
