pub mod client;
pub mod index;

pub use client::{AssociatePayload, CmdbClient, ConfigItemFields, ConfigItemPayload};
pub use index::RemoteAssetIndex;
