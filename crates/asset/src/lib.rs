//! Asset loading/parsers (meshes, textures, shaders).
//! Meshes come from a strict OBJ subset and are packed into an interleaved
//! `(position, uv, normal)` float buffer ready for a vertex buffer upload.

pub mod error;
pub mod mesh;
pub mod obj;
pub mod shader;
pub mod texture;

pub use error::{Attribute, MeshError, MeshResult, ParseErrorKind};
pub use mesh::{Corner, Mesh, MeshStats, PackedVertex, packed_bytes};
pub use obj::{load_obj_from_path, load_obj_from_reader, load_obj_from_str, tally_obj, write_obj};
pub use shader::{ProgramBuilder, ShaderHandle, ShaderRegistry, ShaderSourceSpec, ShaderStageSources};
pub use texture::{TextureData, TextureFormat};
