//! Material library parser for the `.mtl` format
//!
//! Records are positional: `newmtl` closes the record being accumulated
//! (except on its first occurrence) and the last record is closed at end of
//! input. Names are what `usemtl` statements in an object file refer to.
//!
//! By default the accumulator is *not* reset between records, so a record
//! that omits a field inherits the value of the previous record. Files
//! written by exporters that always emit every field are unaffected. Set
//! [`MtlOptions::inherit_fields`] to `false` to start each record from
//! [`MaterialRecord::default`] instead. Texture maps are never inherited:
//! `map_Kd` and `map_Ks` only apply to the record that names them.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, error, info};

use super::{
    error::{AssetError, ParseError, ParseResult},
    obj::{parse_components, strip_comment},
};

/// One material as described by the library file.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: Option<String>,
    /// `Ka`
    pub ambient: [f32; 3],
    /// `Kd`
    pub diffuse: [f32; 3],
    /// `Ks`
    pub specular: [f32; 3],
    /// `Ke`
    pub emissive: [f32; 3],
    /// `Ns`
    pub specular_exponent: f32,
    /// `d`
    pub opacity: f32,
    /// `map_Kd`
    pub diffuse_map: Option<PathBuf>,
    /// `map_Ks`
    pub specular_map: Option<PathBuf>,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            name: None,
            ambient: [0.0, 0.0, 0.0],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.5, 0.5, 0.5],
            emissive: [0.0, 0.0, 0.0],
            specular_exponent: 32.0,
            opacity: 1.0,
            diffuse_map: None,
            specular_map: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MtlOptions {
    /// Carry fields over from the previous record when a record omits them.
    pub inherit_fields: bool,
}

impl Default for MtlOptions {
    fn default() -> Self {
        Self {
            inherit_fields: true,
        }
    }
}

/// Parses `.mtl` text with the default (inheriting) options.
pub fn parse_mtl(source: &str) -> ParseResult<Vec<MaterialRecord>> {
    parse_mtl_with(source, MtlOptions::default())
}

pub fn parse_mtl_with(source: &str, options: MtlOptions) -> ParseResult<Vec<MaterialRecord>> {
    let mut records = Vec::new();
    let mut current = MaterialRecord::default();
    let mut first = true;
    let mut has_content = false;

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let mut tokens = strip_comment(line).split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let values: Vec<&str> = tokens.collect();

        match keyword {
            "newmtl" => {
                if first {
                    first = false;
                } else {
                    records.push(current.clone());
                    if options.inherit_fields {
                        current.diffuse_map = None;
                        current.specular_map = None;
                    } else {
                        current = MaterialRecord::default();
                    }
                }
                current.name = (!values.is_empty()).then(|| values.join(" "));
            }
            "Ka" => current.ambient = parse_components::<3>(&values, 0, "Ka", line_number)?,
            "Kd" => current.diffuse = parse_components::<3>(&values, 0, "Kd", line_number)?,
            "Ks" => current.specular = parse_components::<3>(&values, 0, "Ks", line_number)?,
            "Ke" => current.emissive = parse_components::<3>(&values, 0, "Ke", line_number)?,
            "Ns" => {
                let [exponent] = parse_components::<1>(&values, 0, "Ns", line_number)?;
                current.specular_exponent = exponent;
            }
            "d" => {
                let [opacity] = parse_components::<1>(&values, 0, "d", line_number)?;
                current.opacity = opacity;
            }
            "map_Kd" => current.diffuse_map = Some(map_path(&values, "map_Kd", line_number)?),
            "map_Ks" => current.specular_map = Some(map_path(&values, "map_Ks", line_number)?),
            other => {
                debug!("mtl line {}: skipping `{}`", line_number, other);
                continue;
            }
        }
        has_content = true;
    }

    if has_content {
        records.push(current);
    }

    Ok(records)
}

/// Loads an `.mtl` file, reporting failures as typed errors.
///
/// Relative texture map paths are resolved against the file's directory.
pub fn try_load_mtl(path: impl AsRef<Path>) -> Result<Vec<MaterialRecord>, AssetError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records = parse_mtl(&source).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(dir) = path.parent() {
        for record in &mut records {
            for map in [&mut record.diffuse_map, &mut record.specular_map] {
                if let Some(map) = map.as_mut().filter(|m| m.is_relative()) {
                    *map = dir.join(&*map);
                }
            }
        }
    }

    info!("Loaded {} material(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Loads an `.mtl` file; any failure is logged and yields an empty list.
pub fn load_mtl(path: impl AsRef<Path>) -> Vec<MaterialRecord> {
    try_load_mtl(path).unwrap_or_else(|err| {
        error!("{}", err);
        Vec::new()
    })
}

// Map statements may carry options (`-s 1 1 1 file.png`) ahead of the path.
// The path is everything after them, so file names may contain spaces.
fn map_path(values: &[&str], token: &'static str, line: usize) -> ParseResult<PathBuf> {
    let mut rest = values;
    while let Some((flag, tail)) = rest.split_first() {
        let Some(option) = flag.strip_prefix('-') else {
            break;
        };
        rest = match option {
            "o" | "s" | "t" => skip_numbers(tail, 3),
            "mm" => skip_numbers(tail, 2),
            "boost" | "texres" | "bm" => skip_numbers(tail, 1),
            "blendu" | "blendv" | "cc" | "clamp" | "imfchan" => tail.get(1..).unwrap_or(&[]),
            _ => tail,
        };
    }

    if rest.is_empty() {
        return Err(ParseError::Arity {
            line,
            token,
            expected: 1,
            found: 0,
        });
    }
    Ok(PathBuf::from(rest.join(" ")))
}

fn skip_numbers<'a, 'b>(values: &'a [&'b str], max: usize) -> &'a [&'b str] {
    let count = values
        .iter()
        .take(max)
        .take_while(|value| value.parse::<f32>().is_ok())
        .count();
    &values[count..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MATERIALS: &str = "\
# exported
newmtl Hull
Ns 96.0
Ka 0.1 0.1 0.1
Kd 0.6 0.2 0.2
Ks 0.9 0.8 0.7
Ke 0.0 0.0 0.0
d 1.0
illum 2

newmtl Glass
Kd 0.1 0.2 0.9
d 0.25
";

    #[test]
    fn test_records_in_file_order() {
        let records = parse_mtl(TWO_MATERIALS).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("Hull"));
        assert_eq!(records[0].specular_exponent, 96.0);
        assert_eq!(records[0].diffuse, [0.6, 0.2, 0.2]);
        assert_eq!(records[1].name.as_deref(), Some("Glass"));
        assert_eq!(records[1].diffuse, [0.1, 0.2, 0.9]);
        assert_eq!(records[1].opacity, 0.25);
    }

    #[test]
    fn test_omitted_fields_inherit_from_previous_record() {
        let records = parse_mtl(TWO_MATERIALS).unwrap();
        assert_eq!(records[1].specular, records[0].specular);
        assert_eq!(records[1].ambient, [0.1, 0.1, 0.1]);
        assert_eq!(records[1].specular_exponent, 96.0);
    }

    #[test]
    fn test_fresh_records_when_inheritance_disabled() {
        let options = MtlOptions {
            inherit_fields: false,
        };
        let records = parse_mtl_with(TWO_MATERIALS, options).unwrap();
        let default = MaterialRecord::default();
        assert_eq!(records[1].specular, default.specular);
        assert_eq!(records[1].specular_exponent, default.specular_exponent);
        assert_eq!(records[1].opacity, 0.25);
    }

    #[test]
    fn test_empty_library() {
        assert!(parse_mtl("").unwrap().is_empty());
        assert!(parse_mtl("# nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_fields_without_newmtl_form_one_record() {
        let records = parse_mtl("Kd 1 0 0\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, None);
        assert_eq!(records[0].diffuse, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_texture_maps() {
        let records = parse_mtl("newmtl a\nmap_Kd -s 2 2 1 wood.png\nmap_Ks spec.png\n").unwrap();
        assert_eq!(records[0].diffuse_map, Some(PathBuf::from("wood.png")));
        assert_eq!(records[0].specular_map, Some(PathBuf::from("spec.png")));
    }

    #[test]
    fn test_texture_maps_are_not_inherited() {
        let source = "newmtl wood\nmap_Kd wood.png\nnewmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\n";
        let records = parse_mtl(source).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].diffuse_map, Some(PathBuf::from("wood.png")));
        assert_eq!(records[1].name.as_deref(), Some("red"));
        assert_eq!(records[1].diffuse_map, None);
        assert_eq!(records[2].diffuse_map, None);
        // colors still carry over
        assert_eq!(records[2].specular, records[0].specular);
    }

    #[test]
    fn test_map_path_with_spaces_and_options() {
        let records = parse_mtl(
            "newmtl a\nmap_Kd -clamp on -mm 0 1 old oak.png\nmap_Ks -bm 0.5 my spec map.png\n",
        )
        .unwrap();
        assert_eq!(records[0].diffuse_map, Some(PathBuf::from("old oak.png")));
        assert_eq!(records[0].specular_map, Some(PathBuf::from("my spec map.png")));
    }

    #[test]
    fn test_map_without_path_is_reported() {
        assert!(matches!(
            parse_mtl("newmtl a\nmap_Kd -s 1 1 1\n"),
            Err(ParseError::Arity {
                line: 2,
                token: "map_Kd",
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_comment_is_ignored() {
        let records = parse_mtl("newmtl a # first\nKd 1 0 0 # red\n").unwrap();
        assert_eq!(records[0].name.as_deref(), Some("a"));
        assert_eq!(records[0].diffuse, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wrong_arity_is_reported() {
        assert!(matches!(
            parse_mtl("newmtl a\nKs 1 1\n"),
            Err(ParseError::Arity {
                line: 2,
                token: "Ks",
                expected: 3,
                found: 2
            })
        ));
    }
}
