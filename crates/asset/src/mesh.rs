//! CPU-side mesh representation produced by the OBJ loader.

use bytemuck::{Pod, Zeroable};

use crate::error::{MeshError, MeshResult};

/// Attribute and corner counts gathered by the tally pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Unique vertex positions (`v` lines).
    pub positions: u32,
    /// Unique normals (`vn` lines).
    pub normals: u32,
    /// Unique texture coordinates (`vt` lines).
    pub texcoords: u32,
    /// Triangle corners after quad splitting. Always a multiple of 3.
    pub vertices: u32,
}

impl MeshStats {
    /// Length of the flat attribute buffer: positions, then texcoords, then normals.
    pub fn attrib_floats(&self) -> usize {
        3 * self.positions as usize + 2 * self.texcoords as usize + 3 * self.normals as usize
    }

    /// Length of the flat index buffer (one triplet per corner).
    pub fn index_count(&self) -> usize {
        3 * self.vertices as usize
    }

    pub fn triangles(&self) -> u32 {
        self.vertices / 3
    }
}

/// One corner of a triangle, as 0-based indices into each attribute array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub position: u32,
    pub texcoord: u32,
    pub normal: u32,
}

/// Interleaved vertex as laid out in the packed buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}

impl PackedVertex {
    /// Floats per packed vertex.
    pub const STRIDE: usize = 8;
}

/// Parsed OBJ mesh. Immutable once loaded.
///
/// `attribs` holds every position (3 floats), then every texcoord (2 floats),
/// then every normal (3 floats). `indices` holds one `(position, texcoord,
/// normal)` triplet per corner. All indices are validated against the stats
/// before a `Mesh` is handed out, so lookups here never go out of bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    stats: MeshStats,
    attribs: Vec<f32>,
    indices: Vec<u32>,
}

impl Mesh {
    pub(crate) fn from_parts(stats: MeshStats, attribs: Vec<f32>, indices: Vec<u32>) -> Self {
        debug_assert_eq!(attribs.len(), stats.attrib_floats());
        debug_assert_eq!(indices.len(), stats.index_count());
        Self {
            stats,
            attribs,
            indices,
        }
    }

    #[inline]
    pub fn stats(&self) -> MeshStats {
        self.stats
    }

    #[inline]
    pub fn num_vertices(&self) -> u32 {
        self.stats.vertices
    }

    /// Floats needed to hold the packed vertex buffer.
    #[inline]
    pub fn num_floats(&self) -> usize {
        self.stats.vertices as usize * PackedVertex::STRIDE
    }

    pub fn is_empty(&self) -> bool {
        self.stats.vertices == 0
    }

    pub fn attribs(&self) -> &[f32] {
        &self.attribs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        let end = 3 * self.stats.positions as usize;
        bytemuck::cast_slice(&self.attribs[..end])
    }

    pub fn texcoords(&self) -> &[[f32; 2]] {
        let start = 3 * self.stats.positions as usize;
        let end = start + 2 * self.stats.texcoords as usize;
        bytemuck::cast_slice(&self.attribs[start..end])
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        let start = 3 * self.stats.positions as usize + 2 * self.stats.texcoords as usize;
        bytemuck::cast_slice(&self.attribs[start..])
    }

    /// Corners in index order; every three form a triangle.
    pub fn corners(&self) -> impl Iterator<Item = Corner> + '_ {
        self.indices.chunks_exact(3).map(|c| Corner {
            position: c[0],
            texcoord: c[1],
            normal: c[2],
        })
    }

    /// Gather the attributes a corner references.
    pub fn vertex(&self, corner: Corner) -> PackedVertex {
        PackedVertex {
            position: self.positions()[corner.position as usize],
            uv: self.texcoords()[corner.texcoord as usize],
            normal: self.normals()[corner.normal as usize],
        }
    }

    /// Flattened vertices, one per corner.
    pub fn vertices(&self) -> impl Iterator<Item = PackedVertex> + '_ {
        self.corners().map(|c| self.vertex(c))
    }

    /// Pack interleaved `(position, uv, normal)` vertices into `buffer`.
    ///
    /// `buffer` must hold at least [`Mesh::num_floats`] floats; anything past
    /// that is left untouched.
    pub fn pack_into(&self, buffer: &mut [f32]) -> MeshResult<()> {
        let expected = self.num_floats();
        if buffer.len() < expected {
            return Err(MeshError::BufferTooSmall {
                expected,
                actual: buffer.len(),
            });
        }
        for (dst, v) in buffer
            .chunks_exact_mut(PackedVertex::STRIDE)
            .zip(self.vertices())
        {
            dst.copy_from_slice(bytemuck::cast_ref::<PackedVertex, [f32; 8]>(&v));
        }
        Ok(())
    }

    /// Packed vertex buffer of length [`Mesh::num_floats`].
    pub fn pack(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.num_floats());
        for v in self.vertices() {
            out.extend_from_slice(bytemuck::cast_ref::<PackedVertex, [f32; 8]>(&v));
        }
        out
    }
}

/// View a packed float buffer as raw bytes for upload or storage.
pub fn packed_bytes(buffer: &[f32]) -> &[u8] {
    bytemuck::cast_slice(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> Mesh {
        let stats = MeshStats {
            positions: 3,
            normals: 1,
            texcoords: 2,
            vertices: 6,
        };
        #[rustfmt::skip]
        let attribs = vec![
            0.0, 0.0, 0.0,  1.0, 0.0, 0.0,  0.0, 1.0, 0.0,
            0.0, 0.0,  1.0, 1.0,
            0.0, 0.0, 1.0,
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 0, 0,  1, 1, 0,  2, 0, 0,
            2, 1, 0,  1, 0, 0,  0, 1, 0,
        ];
        Mesh::from_parts(stats, attribs, indices)
    }

    #[test]
    fn attribute_views_split_the_flat_buffer() {
        let mesh = two_triangles();
        assert_eq!(mesh.positions().len(), 3);
        assert_eq!(mesh.texcoords(), &[[0.0, 0.0], [1.0, 1.0]]);
        assert_eq!(mesh.normals(), &[[0.0, 0.0, 1.0]]);
        assert_eq!(mesh.corners().count(), 6);
    }

    #[test]
    fn pack_gathers_by_corner() {
        let mesh = two_triangles();
        let packed = mesh.pack();
        assert_eq!(packed.len(), mesh.num_floats());
        assert_eq!(packed.len(), 48);
        // corner 1: position 1, uv 1, normal 0
        assert_eq!(&packed[8..16], &[1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        // corner 3: position 2, uv 1
        assert_eq!(&packed[24..29], &[0.0, 1.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn pack_into_matches_pack_and_rejects_short_buffers() {
        let mesh = two_triangles();
        let mut buf = vec![-1.0; mesh.num_floats() + 2];
        mesh.pack_into(&mut buf).expect("buffer is large enough");
        assert_eq!(&buf[..mesh.num_floats()], mesh.pack().as_slice());
        assert_eq!(&buf[mesh.num_floats()..], &[-1.0, -1.0]);

        let mut short = vec![0.0; 8];
        let err = mesh.pack_into(&mut short).unwrap_err();
        assert!(matches!(
            err,
            MeshError::BufferTooSmall {
                expected: 48,
                actual: 8
            }
        ));
    }

    #[test]
    fn packed_bytes_views_native_floats() {
        let bytes = packed_bytes(&[1.0, -2.0]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_ne_bytes());
    }

    #[test]
    fn stats_sizes() {
        let stats = two_triangles().stats();
        assert_eq!(stats.attrib_floats(), 16);
        assert_eq!(stats.index_count(), 18);
        assert_eq!(stats.triangles(), 2);
    }
}
