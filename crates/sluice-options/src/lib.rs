#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    clippy::all,
    clippy::pedantic
)]

//! Option state tracking for settings forms.
//!
//! Two managers share one contract ([`OptionStore`]):
//! - [`OptionsManager`] keeps a registry of defaults and an overlay of
//!   uncommitted edits for a single logical entity (e.g. daemon preferences).
//! - [`MultiOptionsManager`] partitions defaults and edits per entity id
//!   (e.g. one bundle per torrent) and redirects the same bound fields to
//!   whichever entity is active.
//!
//! Layout:
//! - `value.rs`: typed values and the coercion applied on every write
//! - `field.rs`: the field seam and binding/focus bookkeeping
//! - `event.rs`: observer events emitted by both managers
//! - `store.rs`: the shared [`OptionStore`] trait
//! - `manager.rs` / `multi.rs`: the two managers

mod error;
mod event;
mod field;
mod manager;
mod multi;
mod store;
mod value;

pub use error::{CoercionError, OptionsError, OptionsResult};
pub use event::OptionsEvent;
pub use field::{Field, FieldEvent, FieldId};
pub use manager::OptionsManager;
pub use multi::MultiOptionsManager;
pub use store::OptionStore;
pub use value::{OptionType, OptionValue, coerce};
