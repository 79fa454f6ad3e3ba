//! Legacy mesh loading and preparation for rendering hosts.
//! Parser -> lookup table -> attribute deriver -> assembler.

pub mod assemble;
pub mod derive;
pub mod error;
pub mod legacy;
pub mod lut;
pub mod mesh;
pub mod pipeline;
pub mod sample;

pub use assemble::{MeshBuffers, PackedVertex, VertexMode};
pub use error::{BufferError, LutError, ParseError, ParseResult};
pub use legacy::{load_legacy_from_path, load_legacy_from_reader, load_legacy_from_str};
pub use lut::{LookupMode, LookupTable};
pub use mesh::Mesh;
pub use pipeline::{Conversion, ConvertOptions, convert_file, convert_mesh};
