//! Wavefront OBJ subset loader: `v`, `vt`, `vn` and `f a/b/c` faces.
//!
//! The file is scanned twice. The tally pass counts attributes and corners,
//! the parse pass fills buffers sized from those counts and validates every
//! face index against them. Either pass failing fails the whole load.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{
    error::{Attribute, MeshError, MeshResult, ParseErrorKind},
    mesh::{Mesh, MeshStats},
};

const MAX_FACE_CORNERS: usize = 4;

/// Load an OBJ mesh from a file path.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> MeshResult<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| {
        log::error!("Unable to open OBJ file {}: {}", path.display(), source);
        MeshError::Open {
            path: path.to_path_buf(),
            source,
        }
    })?;

    match load_obj_from_reader(BufReader::new(file)) {
        Ok(mesh) => {
            let stats = mesh.stats();
            log::info!(
                "Loaded {}: {} positions, {} texcoords, {} normals, {} vertices",
                path.display(),
                stats.positions,
                stats.texcoords,
                stats.normals,
                stats.vertices
            );
            Ok(mesh)
        }
        Err(err) => {
            log::error!("Unable to parse OBJ file {}: {}", path.display(), err);
            Err(err)
        }
    }
}

/// Load an OBJ mesh from a seekable reader.
///
/// The reader is rewound before each pass, so whatever position it had is
/// lost. Don't share one reader between concurrent loads.
pub fn load_obj_from_reader<R: BufRead + Seek>(mut reader: R) -> MeshResult<Mesh> {
    let stats = tally_obj(&mut reader)?;
    log::debug!("OBJ tally: {:?}", stats);
    parse_obj(&mut reader, stats)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str) -> MeshResult<Mesh> {
    load_obj_from_reader(io::Cursor::new(contents))
}

/// Count attributes and triangle corners without storing anything.
pub fn tally_obj<R: BufRead + Seek>(reader: &mut R) -> MeshResult<MeshStats> {
    let mut stats = MeshStats::default();
    scan_lines(reader, |line, text| {
        let (directive, parts) = split_directive(text);
        match directive {
            Directive::Position => stats.positions += 1,
            Directive::Normal => stats.normals += 1,
            Directive::Texcoord => stats.texcoords += 1,
            Directive::Face => {
                let face = parse_face(line, parts)?;
                // quads become two triangles in the parse pass
                stats.vertices += if face.len == 4 { 6 } else { 3 };
            }
            Directive::Other => {}
        }
        Ok(())
    })?;
    Ok(stats)
}

fn parse_obj<R: BufRead + Seek>(reader: &mut R, stats: MeshStats) -> MeshResult<Mesh> {
    let mut positions: Vec<f32> = Vec::with_capacity(3 * stats.positions as usize);
    let mut texcoords: Vec<f32> = Vec::with_capacity(2 * stats.texcoords as usize);
    let mut normals: Vec<f32> = Vec::with_capacity(3 * stats.normals as usize);
    let mut indices: Vec<u32> = Vec::with_capacity(stats.index_count());

    scan_lines(reader, |line, text| {
        let (directive, mut parts) = split_directive(text);
        match directive {
            Directive::Position => {
                positions.extend_from_slice(&parse_components(line, &mut parts, ["x", "y", "z"])?)
            }
            Directive::Normal => normals.extend_from_slice(&parse_components(
                line,
                &mut parts,
                ["nx", "ny", "nz"],
            )?),
            Directive::Texcoord => {
                texcoords.extend_from_slice(&parse_components(line, &mut parts, ["u", "v"])?)
            }
            Directive::Face => {
                let face = parse_face(line, parts)?;
                let corners = face.corners();
                for &corner in corners {
                    check_corner(line, corner, &stats)?;
                }
                emit_triangle(&mut indices, corners[0], corners[1], corners[2]);
                if corners.len() == 4 {
                    emit_triangle(&mut indices, corners[0], corners[2], corners[3]);
                }
            }
            Directive::Other => {}
        }
        Ok(())
    })?;

    let parsed = MeshStats {
        positions: (positions.len() / 3) as u32,
        normals: (normals.len() / 3) as u32,
        texcoords: (texcoords.len() / 2) as u32,
        vertices: (indices.len() / 3) as u32,
    };
    if parsed != stats {
        return Err(MeshError::Inconsistent {
            tallied: stats,
            parsed,
        });
    }

    let mut attribs = positions;
    attribs.reserve_exact(texcoords.len() + normals.len());
    attribs.extend_from_slice(&texcoords);
    attribs.extend_from_slice(&normals);

    Ok(Mesh::from_parts(stats, attribs, indices))
}

/// Write a mesh back out as OBJ text, one triangle per `f` line.
pub fn write_obj<W: Write>(mesh: &Mesh, mut writer: W) -> io::Result<()> {
    for [x, y, z] in mesh.positions() {
        writeln!(writer, "v {x:.6} {y:.6} {z:.6}")?;
    }
    for [u, v] in mesh.texcoords() {
        writeln!(writer, "vt {u:.6} {v:.6}")?;
    }
    for [x, y, z] in mesh.normals() {
        writeln!(writer, "vn {x:.6} {y:.6} {z:.6}")?;
    }
    for tri in mesh.indices().chunks_exact(9) {
        writeln!(
            writer,
            "f {}/{}/{} {}/{}/{} {}/{}/{}",
            tri[0] + 1,
            tri[1] + 1,
            tri[2] + 1,
            tri[3] + 1,
            tri[4] + 1,
            tri[5] + 1,
            tri[6] + 1,
            tri[7] + 1,
            tri[8] + 1
        )?;
    }
    writer.flush()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Directive {
    Position,
    Normal,
    Texcoord,
    Face,
    Other,
}

/// Raw 1-based `(position, texcoord, normal)` indices of one face corner.
type RawCorner = [u32; 3];

struct Face {
    corners: [RawCorner; MAX_FACE_CORNERS],
    len: usize,
}

impl Face {
    fn corners(&self) -> &[RawCorner] {
        &self.corners[..self.len]
    }
}

/// Rewind `reader` and feed every line to `visit` with its 1-based number.
fn scan_lines<R, F>(reader: &mut R, mut visit: F) -> MeshResult<()>
where
    R: BufRead + Seek,
    F: FnMut(usize, &str) -> MeshResult<()>,
{
    reader
        .seek(SeekFrom::Start(0))
        .map_err(|source| MeshError::Read { line: 0, source })?;

    // raw bytes: object and material names are often Latin-1, not UTF-8
    let mut buf = Vec::new();
    let mut line = 0;
    loop {
        buf.clear();
        line += 1;
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| MeshError::Read { line, source })?;
        if read == 0 {
            return Ok(());
        }
        visit(line, &String::from_utf8_lossy(&buf))?;
    }
}

fn split_directive(text: &str) -> (Directive, std::str::SplitWhitespace<'_>) {
    // `#` starts a comment anywhere on the line
    let text = text.split('#').next().unwrap_or_default();
    let mut parts = text.split_whitespace();
    let directive = match parts.next() {
        Some("v") => Directive::Position,
        Some("vn") => Directive::Normal,
        Some("vt") => Directive::Texcoord,
        Some("f") => Directive::Face,
        _ => Directive::Other,
    };
    (directive, parts)
}

fn parse_components<'a, const N: usize>(
    line: usize,
    parts: &mut impl Iterator<Item = &'a str>,
    names: [&'static str; N],
) -> MeshResult<[f32; N]> {
    let mut out = [0.0; N];
    for (slot, name) in out.iter_mut().zip(names) {
        let token = parts
            .next()
            .ok_or_else(|| MeshError::parse(line, ParseErrorKind::MissingComponent(name)))?;
        *slot = token.parse::<f32>().map_err(|_| {
            MeshError::parse(line, ParseErrorKind::InvalidNumber(token.to_string()))
        })?;
    }
    Ok(out)
}

fn parse_face<'a>(line: usize, tokens: impl IntoIterator<Item = &'a str>) -> MeshResult<Face> {
    let mut face = Face {
        corners: [[0; 3]; MAX_FACE_CORNERS],
        len: 0,
    };
    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        if face.len == MAX_FACE_CORNERS {
            let total = face.len + 1 + tokens.count();
            return Err(MeshError::parse(
                line,
                ParseErrorKind::UnsupportedCornerCount(total),
            ));
        }
        face.corners[face.len] = parse_corner(line, token)?;
        face.len += 1;
    }
    if face.len < 3 {
        return Err(MeshError::parse(
            line,
            ParseErrorKind::UnsupportedCornerCount(face.len),
        ));
    }
    Ok(face)
}

fn parse_corner(line: usize, token: &str) -> MeshResult<RawCorner> {
    let bad = || MeshError::parse(line, ParseErrorKind::BadFaceCorner(token.to_string()));
    let mut fields = token.split('/');
    let mut corner = [0; 3];
    for slot in &mut corner {
        let field = fields.next().ok_or_else(bad)?;
        *slot = field.parse::<u32>().map_err(|_| bad())?;
    }
    if fields.next().is_some() {
        return Err(bad());
    }
    Ok(corner)
}

fn check_corner(line: usize, corner: RawCorner, stats: &MeshStats) -> MeshResult<()> {
    let [position, texcoord, normal] = corner;
    for (attribute, index, count) in [
        (Attribute::Position, position, stats.positions),
        (Attribute::Texcoord, texcoord, stats.texcoords),
        (Attribute::Normal, normal, stats.normals),
    ] {
        if index == 0 || index > count {
            return Err(MeshError::parse(
                line,
                ParseErrorKind::IndexOutOfRange {
                    attribute,
                    index,
                    count,
                },
            ));
        }
    }
    Ok(())
}

/// Append one triangle, converting OBJ's 1-based indices to 0-based.
fn emit_triangle(indices: &mut Vec<u32>, a: RawCorner, b: RawCorner, c: RawCorner) {
    for corner in [a, b, c] {
        indices.extend(corner.iter().map(|i| i - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"
        v 0.0 0.0 0.0
        v 1.0 0.0 0.0
        v 0.0 1.0 0.0
        vn 0.0 0.0 1.0
        vt 0.0 0.0
        vt 1.0 0.0
        vt 0.0 1.0
        f 1/1/1 2/2/1 3/3/1
    "#;

    #[test]
    fn parse_simple_triangle() {
        let mesh = load_obj_from_str(TRIANGLE).expect("parse triangle");
        assert_eq!(
            mesh.stats(),
            MeshStats {
                positions: 3,
                normals: 1,
                texcoords: 3,
                vertices: 3,
            }
        );
        assert_eq!(mesh.indices(), &[0, 0, 0, 1, 1, 0, 2, 2, 0]);
        assert_eq!(
            &mesh.pack()[..8],
            &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn tally_counts_quads_as_six_corners() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\n\
                   f 1/1/1 2/1/1 3/1/1 4/1/1\nf 1/1/1 2/1/1 3/1/1\n";
        let stats = tally_obj(&mut io::Cursor::new(src)).expect("tally");
        assert_eq!(stats.positions, 4);
        assert_eq!(stats.vertices, 9);
    }

    #[test]
    fn tally_ignores_unknown_directives_and_comments() {
        let src = "# cube\nmtllib cube.mtl\no Cube\ng side\ns off\nusemtl red\nv 1 2 3 # trailing\n";
        let stats = tally_obj(&mut io::Cursor::new(src)).expect("tally");
        assert_eq!(
            stats,
            MeshStats {
                positions: 1,
                ..MeshStats::default()
            }
        );
    }

    #[test]
    fn tally_reports_face_line_number() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 1/1/1\n";
        let err = tally_obj(&mut io::Cursor::new(src)).unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(matches!(
            err,
            MeshError::Parse {
                kind: ParseErrorKind::UnsupportedCornerCount(2),
                ..
            }
        ));
    }

    #[test]
    fn faces_may_reference_attributes_declared_later() {
        let src = "vt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 3/1/1\nv 0 0 0\nv 1 0 0\nv 0 1 0\n";
        let mesh = load_obj_from_str(src).expect("forward references are in range");
        assert_eq!(mesh.num_vertices(), 3);
    }

    #[test]
    fn corner_parser_rejects_partial_triplets() {
        for token in ["1//1", "1/1", "1", "1/1/1/1", "a/1/1", "-1/1/1", ""] {
            assert!(parse_corner(1, token).is_err(), "accepted {token:?}");
        }
        assert_eq!(parse_corner(1, "12/3/4").unwrap(), [12, 3, 4]);
    }

    #[test]
    fn write_obj_emits_one_based_triangles() {
        let mesh = load_obj_from_str(TRIANGLE).unwrap();
        let mut out = Vec::new();
        write_obj(&mesh, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("v 0.000000 0.000000 0.000000\n"));
        assert!(text.contains("vn 0.000000 0.000000 1.000000\n"));
        assert!(text.ends_with("f 1/1/1 2/2/1 3/3/1\n"));
    }
}
