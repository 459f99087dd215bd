//! evrtex library
//!
//! Locates, inspects, decodes and re-encodes GPU-compressed texture
//! payloads inside proprietary asset containers, for two platforms:
//! desktop DDS files with a real header, and mobile ASTC blobs that
//! carry no dimension metadata at all. The compression math itself
//! lives in external command-line tools; this crate frames, searches,
//! validates, caches, and patches around them.

pub mod astc;
pub mod cache;
pub mod codec;
pub mod dds;
pub mod error;
pub mod mapping;
pub mod replace;
pub mod resolve;

pub use cache::{DecodeParams, ParamCache};
pub use codec::{CliCodec, Codec, Quality};
pub use dds::{patch_descriptor_size, DdsInfo};
pub use error::{Result, TexError};
pub use mapping::{DimensionMapping, Dimensions};
pub use replace::{
    ReplaceOutcome, ReplaceRequest, ReplacementEngine, DESKTOP_STAGING, MOBILE_STAGING,
};
pub use resolve::{CancelToken, Resolver};
