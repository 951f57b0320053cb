//! txe-core: catalogue model, types.xml codec, edit engine and trader projection
//!
//! This crate focuses on a small, well-factored surface:
//! - `types.xml` reader/writer for the item-type catalogue shape only
//! - Record/Catalogue model with name-unique, document-ordered storage
//! - Edit engine: single, bulk and generation-mode patches, validated up front
//! - Trader JSON projection and trader document editing
//! - A `Session` holding the active documents, over a pluggable `FileStore`
//!
pub mod backup;
pub mod codec;
pub mod edit;
pub mod error;
pub mod files;
pub mod model;
pub mod scan;
pub mod session;
pub mod settings;
pub mod store;
pub mod trader;

pub use edit::{
    BulkReport, Generated, Patch, Progress, bulk_edit, edit_record, generate, split_name_list,
    validate_number,
};
pub use error::{Error, Result};
pub use files::{FileStore, LocalFs, MemoryFs};
pub use model::{Anchor, ExtraElement, FieldSet, Flag, Record, ScalarField};
pub use session::Session;
pub use settings::{JsonSettings, Settings};
pub use store::Catalogue;
pub use trader::{ItemField, ItemPatch, TraderDocument, TraderHeader, TraderItem};
