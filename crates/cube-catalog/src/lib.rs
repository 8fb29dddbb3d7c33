//! Catalog access for the datacube-ogcapi layer.
//!
//! The external data cube is reached through the [`CatalogClient`] trait.
//! Everything that does not change between requests (products, datasets,
//! CRS and resolution sets, bounding boxes, the measurement table) is
//! normalized once into a [`MetadataStore`] and cached, both in process
//! and as an on-disk artifact. The [`Connector`] facade is the single
//! data-access seam the providers use.

pub mod client;
pub mod connector;
pub mod store;

pub use client::{ArrayData, CatalogClient, LoadParams, VarArray, VarValues};
pub use connector::Connector;
pub use store::MetadataStore;
