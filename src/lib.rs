//! Core readers and decoders for the 3D Tiles archive family: the 3TZ
//! container, GLB/subtree chunked binaries, and glTF
//! EXT_feature_metadata / EXT_structural_metadata property tables and
//! textures.
//!
//! Command-line front-ends, an HTTP server, full image pixel sampling, and
//! a distribution updater are deliberately left to callers; see
//! [`contract`] for the one seam this crate exposes toward an HTTP layer.

pub mod archive;
pub mod codec;
pub mod contract;
pub mod error;
pub mod glb;
pub mod gltf;
pub mod hash;
pub mod subtree;
pub mod zipfmt;

pub use archive::Archive;
pub use error::{Error, Result};
