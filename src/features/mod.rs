//! Reading and decoding the metadata of single files.
pub mod container;
pub mod error;
pub mod gps;
pub mod location;
pub mod video;
