//! Geometry parser for the `.obj` scene description format
//!
//! Parsing happens in two steps. [`parse_obj`] scans the text into shared
//! attribute pools plus one [`RawMesh`] per object, keeping the per-corner
//! indices exactly as the file states them. [`flatten`] then resolves each
//! corner against the pools into a [`FlatMesh`], the per-corner buffer that is
//! uploaded to the GPU.
//!
//! Only triangulated input is accepted. Supported lines:
//!
//! ```text
//! o name          object boundary
//! usemtl name     material of the current object
//! v x y z         position (a trailing w or r g b is ignored)
//! vt u v          texture coordinate
//! vn x y z        normal
//! f a/b/c a/b/c a/b/c
//! ```
//!
//! Corners may omit the texture or normal index (`a`, `a/b`, `a//c`).
//! Text after `#` is a comment, also at the end of a line.

use std::{fs, path::Path, sync::Arc};

use log::{debug, error, info};

use super::error::{AssetError, ParseError, ParseResult};

/// Color written for every corner; materials supply color through uniforms.
pub const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Attribute dictionaries shared by every object of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexPools {
    pub positions: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

/// One triangle corner, with 0-based indices into the [`VertexPools`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceCorner {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

/// An object as written in the file, before flattening.
#[derive(Debug, Clone)]
pub struct RawMesh {
    name: Option<String>,
    material: Option<String>,
    pools: Arc<VertexPools>,
    corners: Vec<FaceCorner>,
}

impl RawMesh {
    /// Object name from the `o` line, `None` for geometry before any marker.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Last `usemtl` name given inside this object.
    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.pools.positions
    }

    pub fn texcoords(&self) -> &[[f32; 2]] {
        &self.pools.texcoords
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.pools.normals
    }

    /// Face corners in draw order, three per triangle.
    pub fn corners(&self) -> &[FaceCorner] {
        &self.corners
    }

    pub fn triangle_count(&self) -> usize {
        self.corners.len() / 3
    }
}

/// GPU-ready geometry: attributes duplicated per triangle corner.
///
/// The length invariants are checked once in [`FlatMesh::new`]:
/// `positions.len() == colors.len() == 3 * vertex_count()` and
/// `texcoords.len() == 2 * vertex_count()`, with whole triangles only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMesh {
    name: Option<String>,
    material: Option<String>,
    positions: Vec<f32>,
    colors: Vec<f32>,
    texcoords: Vec<f32>,
}

impl FlatMesh {
    pub fn new(
        name: Option<String>,
        positions: Vec<f32>,
        colors: Vec<f32>,
        texcoords: Vec<f32>,
    ) -> ParseResult<Self> {
        let corners = positions.len() / 3;
        let consistent = positions.len() % 3 == 0
            && corners % 3 == 0
            && colors.len() == positions.len()
            && texcoords.len() == corners * 2;

        if !consistent {
            return Err(ParseError::BufferLength {
                positions: positions.len(),
                colors: colors.len(),
                texcoords: texcoords.len(),
            });
        }

        Ok(Self {
            name,
            material: None,
            positions,
            colors,
            texcoords,
        })
    }

    /// Sets the material name the mesh asks for.
    pub fn with_material(mut self, material: Option<String>) -> Self {
        self.material = material;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn material(&self) -> Option<&str> {
        self.material.as_deref()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn texcoords(&self) -> &[f32] {
        &self.texcoords
    }

    /// Number of corners, i.e. the vertex count of the draw call.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Parses `.obj` text into one [`RawMesh`] per object, in file order.
///
/// The first `o` marker does not close a mesh; anything before it belongs to
/// the first object. The last object is always emitted at end of input, so a
/// file without markers gives exactly one mesh. Text with no geometry lines
/// at all gives none.
pub fn parse_obj(source: &str) -> ParseResult<Vec<RawMesh>> {
    let mut pools = VertexPools::default();
    let mut objects: Vec<(Option<String>, Option<String>, Vec<FaceCorner>)> = Vec::new();

    let mut name: Option<String> = None;
    let mut material: Option<String> = None;
    let mut corners: Vec<FaceCorner> = Vec::new();
    let mut first_marker = true;
    let mut has_geometry = false;

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut tokens = strip_comment(line).split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let values: Vec<&str> = tokens.collect();

        match keyword {
            "v" => {
                pools
                    .positions
                    .push(parse_components::<3>(&values, 3, "v", line_number)?);
            }
            "vt" => {
                pools
                    .texcoords
                    .push(parse_components::<2>(&values, 1, "vt", line_number)?);
            }
            "vn" => {
                pools
                    .normals
                    .push(parse_components::<3>(&values, 0, "vn", line_number)?);
            }
            "f" => {
                if values.len() != 3 {
                    return Err(ParseError::NotTriangulated {
                        line: line_number,
                        found: values.len(),
                    });
                }
                for corner in values {
                    corners.push(parse_corner(corner, &pools, line_number)?);
                }
            }
            "o" => {
                if first_marker {
                    first_marker = false;
                } else {
                    objects.push((name.take(), material.take(), std::mem::take(&mut corners)));
                }
                name = (!values.is_empty()).then(|| values.join(" "));
            }
            "usemtl" => {
                material = (!values.is_empty()).then(|| values.join(" "));
                continue;
            }
            other => {
                debug!("obj line {}: skipping `{}`", line_number, other);
                continue;
            }
        }
        has_geometry = true;
    }

    if has_geometry {
        objects.push((name, material, corners));
    }

    let pools = Arc::new(pools);
    Ok(objects
        .into_iter()
        .map(|(name, material, corners)| RawMesh {
            name,
            material,
            pools: Arc::clone(&pools),
            corners,
        })
        .collect())
}

/// Resolves every corner of `mesh` into a [`FlatMesh`].
///
/// Corners without a texture index get `[0.0, 0.0]`. Normals are validated
/// but not copied.
pub fn flatten(mesh: &RawMesh) -> ParseResult<FlatMesh> {
    let corner_count = mesh.corners.len();
    let mut positions = Vec::with_capacity(corner_count * 3);
    let mut texcoords = Vec::with_capacity(corner_count * 2);

    for corner in &mesh.corners {
        let position = lookup(mesh.positions(), corner.position, "position")?;
        positions.extend_from_slice(position);

        let texcoord = match corner.texcoord {
            Some(index) => *lookup(mesh.texcoords(), index, "texcoord")?,
            None => [0.0, 0.0],
        };
        texcoords.extend_from_slice(&texcoord);

        if let Some(index) = corner.normal {
            lookup(mesh.normals(), index, "normal")?;
        }
    }

    let colors = WHITE.repeat(corner_count);
    Ok(FlatMesh::new(mesh.name.clone(), positions, colors, texcoords)?
        .with_material(mesh.material.clone()))
}

/// Parses and flattens every object of `source`.
pub fn parse_and_flatten(source: &str) -> ParseResult<Vec<FlatMesh>> {
    parse_obj(source)?.iter().map(flatten).collect()
}

/// Loads an `.obj` file, reporting failures as typed errors.
pub fn try_load_obj(path: impl AsRef<Path>) -> Result<Vec<FlatMesh>, AssetError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let meshes = parse_and_flatten(&source).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded {} mesh(es) from {}", meshes.len(), path.display());
    Ok(meshes)
}

/// Loads an `.obj` file; any failure is logged and yields an empty list.
///
/// Callers must check for emptiness before indexing the result.
pub fn load_obj(path: impl AsRef<Path>) -> Vec<FlatMesh> {
    try_load_obj(path).unwrap_or_else(|err| {
        error!("{}", err);
        Vec::new()
    })
}

pub(crate) fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(code, _)| code)
}

fn lookup<'a, T>(pool: &'a [T], index: usize, stream: &'static str) -> ParseResult<&'a T> {
    pool.get(index).ok_or(ParseError::IndexOutOfRange {
        stream,
        index: index as i64 + 1,
        len: pool.len(),
    })
}

/// Parses `N` floats, tolerating up to `extra` trailing values (such as the
/// `w` component of `vt` or vertex colors after `v`), which are validated and
/// dropped.
pub(crate) fn parse_components<const N: usize>(
    values: &[&str],
    extra: usize,
    token: &'static str,
    line: usize,
) -> ParseResult<[f32; N]> {
    if values.len() < N || values.len() > N + extra {
        return Err(ParseError::Arity {
            line,
            token,
            expected: N,
            found: values.len(),
        });
    }

    let mut out = [0.0; N];
    for (i, value) in values.iter().enumerate() {
        let parsed: f32 = value.parse().map_err(|source| ParseError::Float {
            line,
            value: value.to_string(),
            source,
        })?;
        if i < N {
            out[i] = parsed;
        }
    }
    Ok(out)
}

fn parse_corner(corner: &str, pools: &VertexPools, line: usize) -> ParseResult<FaceCorner> {
    let invalid = || ParseError::Corner {
        line,
        corner: corner.to_string(),
    };

    let mut parts = corner.split('/');
    let position = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let texcoord = parts.next().filter(|s| !s.is_empty());
    let normal = parts.next().filter(|s| !s.is_empty());
    if parts.next().is_some() {
        return Err(invalid());
    }

    let resolve = |raw: &str, len: usize, stream: &'static str| -> ParseResult<usize> {
        let value: i64 = raw.parse().map_err(|_| invalid())?;
        match value {
            0 => Err(invalid()),
            v if v > 0 => Ok(v as usize - 1),
            // Negative indices count back from the last element defined so far.
            v => {
                let back = v.unsigned_abs() as usize;
                len.checked_sub(back)
                    .ok_or(ParseError::IndexOutOfRange { stream, index: v, len })
            }
        }
    };

    Ok(FaceCorner {
        position: resolve(position, pools.positions.len(), "position")?,
        texcoord: texcoord
            .map(|t| resolve(t, pools.texcoords.len(), "texcoord"))
            .transpose()?,
        normal: normal
            .map(|n| resolve(n, pools.normals.len(), "normal"))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

    fn assert_invariants(mesh: &FlatMesh) {
        let triangles = mesh.triangle_count();
        assert_eq!(mesh.positions().len(), 9 * triangles);
        assert_eq!(mesh.colors().len(), 9 * triangles);
        assert_eq!(mesh.texcoords().len(), 6 * triangles);
        assert_eq!(mesh.positions().len(), 3 * mesh.vertex_count());
        assert_eq!(mesh.texcoords().len(), 2 * mesh.vertex_count());
    }

    #[test]
    fn test_single_triangle_flattens_in_face_order() {
        let meshes = parse_and_flatten(TRIANGLE).unwrap();
        assert_eq!(meshes.len(), 1);

        let mesh = &meshes[0];
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(
            mesh.positions(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(mesh.texcoords(), &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert!(mesh.colors().iter().all(|&c| c == 1.0));
        assert_invariants(mesh);
    }

    #[test]
    fn test_empty_source_gives_no_meshes() {
        assert!(parse_obj("").unwrap().is_empty());
        assert!(parse_obj("# only a comment\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_no_object_marker_gives_one_mesh() {
        let meshes = parse_obj(TRIANGLE).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name(), None);
    }

    #[test]
    fn test_object_markers_split_meshes() {
        let source = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
f 1/1 2/1 3/1
o second
v 0 0 1
f 1/1 2/1 4/1
f 4/1 2/1 3/1
o third
f 3/1 2/1 1/1
";
        let raw = parse_obj(source).unwrap();
        let names: Vec<_> = raw.iter().map(|m| m.name()).collect();
        assert_eq!(names, [Some("first"), Some("second"), Some("third")]);

        let flat: Vec<FlatMesh> = raw.iter().map(|m| flatten(m).unwrap()).collect();
        let triangles: Vec<_> = flat.iter().map(|m| m.triangle_count()).collect();
        assert_eq!(triangles, [1, 2, 1]);
        flat.iter().for_each(assert_invariants);

        // Pools are shared: the second object sees vertices from the first.
        assert_eq!(&flat[1].positions()[6..9], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_faces_before_first_marker_join_first_object() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o named
f 3 2 1
";
        let meshes = parse_and_flatten(source).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name(), Some("named"));
        assert_eq!(meshes[0].triangle_count(), 2);
    }

    #[test]
    fn test_attribute_order_does_not_change_output() {
        let canonical = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0.25 0.5
vt 0.75 0.5
o tri
f 1/1 2/2 3/1
";
        let shuffled = "\
vt 0.25 0.5
v 0 0 0
vn 0 0 1
v 1 0 0
vt 0.75 0.5
v 0 1 0
o tri
f 1/1 2/2 3/1
";
        assert_eq!(
            parse_and_flatten(canonical).unwrap(),
            parse_and_flatten(shuffled).unwrap()
        );
    }

    #[test]
    fn test_partial_corners() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
";
        let raw = parse_obj(source).unwrap();
        let corner = raw[0].corners()[1];
        assert_eq!(corner.position, 1);
        assert_eq!(corner.texcoord, None);
        assert_eq!(corner.normal, Some(0));

        let flat = flatten(&raw[0]).unwrap();
        assert!(flat.texcoords().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
";
        let raw = parse_obj(source).unwrap();
        let positions: Vec<_> = raw[0].corners().iter().map(|c| c.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn test_malformed_input_is_reported() {
        assert!(matches!(
            parse_obj("vt 0.5\n"),
            Err(ParseError::Arity { line: 1, token: "vt", .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nv 1 x 0\n"),
            Err(ParseError::Float { line: 2, .. })
        ));
        assert!(matches!(
            parse_obj("v 0 0 0\nf 1 1 1 1\n"),
            Err(ParseError::NotTriangulated { line: 2, found: 4 })
        ));
        assert!(matches!(
            parse_obj("f /1 1 1\n"),
            Err(ParseError::Corner { line: 1, .. })
        ));
    }

    #[test]
    fn test_trailing_comments_and_vertex_colors() {
        let source = "\
v 0 0 0 # origin
v 1 0 0 1.0 0.0 0.0
v 0 1 0 0.0 1.0 0.0
f 1 2 3 # the only face
";
        let meshes = parse_and_flatten(source).unwrap();
        assert_eq!(meshes.len(), 1);
        assert_eq!(
            meshes[0].positions(),
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert!(matches!(
            parse_obj("v 0 0 0 1 1 1 1\n"),
            Err(ParseError::Arity { line: 1, token: "v", .. })
        ));
    }

    #[test]
    fn test_usemtl_is_recorded_per_object() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
usemtl early
o first
f 1 2 3
o second
usemtl red
f 1 2 3
usemtl green
o third
f 3 2 1
";
        let raw = parse_obj(source).unwrap();
        let materials: Vec<_> = raw.iter().map(|m| m.material()).collect();
        assert_eq!(materials, [Some("early"), Some("green"), None]);

        let flat = flatten(&raw[1]).unwrap();
        assert_eq!(flat.name(), Some("second"));
        assert_eq!(flat.material(), Some("green"));
    }

    #[test]
    fn test_out_of_range_index_fails_flatten() {
        let raw = parse_obj("v 0 0 0\nf 1 2 3\n").unwrap();
        assert!(matches!(
            flatten(&raw[0]),
            Err(ParseError::IndexOutOfRange {
                stream: "position",
                index: 2,
                len: 1
            })
        ));
    }

    #[test]
    fn test_flat_mesh_rejects_inconsistent_lengths() {
        let result = FlatMesh::new(None, vec![0.0; 9], vec![1.0; 6], vec![0.0; 6]);
        assert!(matches!(result, Err(ParseError::BufferLength { .. })));
    }

    #[test]
    fn test_missing_file_gives_empty_result() {
        assert!(load_obj("does/not/exist.obj").is_empty());
        assert!(matches!(
            try_load_obj("does/not/exist.obj"),
            Err(AssetError::Io { .. })
        ));
    }
}
