//! Scene asset pipeline
//!
//! Text parsers for geometry (`.obj`) and material libraries (`.mtl`). Both
//! offer a typed `try_load_*` entry point and a `load_*` variant that logs the
//! failure and returns an empty list.

pub mod error;
pub mod mtl;
pub mod obj;

pub use error::{AssetError, ParseError};
pub use mtl::{load_mtl, parse_mtl, parse_mtl_with, try_load_mtl, MaterialRecord, MtlOptions};
pub use obj::{
    flatten, load_obj, parse_and_flatten, parse_obj, try_load_obj, FaceCorner, FlatMesh, RawMesh,
    VertexPools,
};
