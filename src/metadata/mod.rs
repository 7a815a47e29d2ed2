//! Metadata value types and their merge/diff algebra and lookup collection.

mod error;
mod file;
mod location;
mod message;
mod metadata_document;
mod plugin_cleaning_data;
mod plugin_metadata;
mod tag;
pub mod yaml;

pub use error::{LoadMetadataError, MultilingualMessageContentsError, ParseMetadataError, WriteMetadataError};
pub use file::{File, Filename};
pub(crate) use file::strip_ghost_suffix;
pub use location::Location;
pub use message::{Message, MessageContent, MessageType};
pub use metadata_document::MetadataDocument;
pub use plugin_cleaning_data::PluginCleaningData;
pub use plugin_metadata::{Priority, PluginMetadata};
pub use tag::Tag;
