use crate::core::io::traits::StructureFile;
use crate::core::models::builder::StructureBuilder;
use crate::core::models::chain::ChainType;
use crate::core::models::structure::Structure;
use crate::core::utils::identifiers::one_letter_code;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Non-coordinate records preserved from the input (`HEADER`, `TITLE`, `REMARK`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    pub header_lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

const HEADER_RECORDS: [&str; 6] = ["HEADER", "TITLE", "COMPND", "SOURCE", "REMARK", "CRYST1"];

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_coordinate(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.to_string(),
        },
    })
}

fn parse_optional_float(line: &str, start: usize, end: usize, default: f64) -> f64 {
    slice_and_trim(line, start, end).parse().unwrap_or(default)
}

pub struct PdbFile;

impl StructureFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    /// Reads the first model of a PDB file.
    ///
    /// Only the first alternate location of each atom is kept. Insertion codes are
    /// folded into the residue they follow.
    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut builder = StructureBuilder::new();
        let mut metadata = PdbMetadata::default();
        let mut current_chain: Option<char> = None;
        let mut current_residue: Option<isize> = None;
        let mut atom_count = 0usize;

        for (index, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = index + 1;
            let record = line.get(0..6).unwrap_or(&line).trim_end();

            match record {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".to_string(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain_id = line
                        .get(21..22)
                        .and_then(|s| s.chars().next())
                        .filter(|c| !c.is_whitespace())
                        .unwrap_or('A');
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let res_seq: isize = res_seq_str.parse().map_err(|_| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::InvalidInt {
                            columns: "23-26".to_string(),
                            value: res_seq_str.to_string(),
                        },
                    })?;
                    let x = parse_coordinate(&line, line_num, 30, 38)?;
                    let y = parse_coordinate(&line, line_num, 38, 46)?;
                    let z = parse_coordinate(&line, line_num, 46, 54)?;
                    let occupancy = parse_optional_float(&line, 54, 60, 1.0);
                    let b_factor = parse_optional_float(&line, 60, 66, 0.0);
                    let element = slice_and_trim(&line, 76, 78);

                    if current_chain != Some(chain_id) {
                        builder.start_chain(chain_id, ChainType::for_residue(res_name));
                        current_chain = Some(chain_id);
                        current_residue = None;
                    }
                    if current_residue != Some(res_seq) {
                        builder.start_residue(res_seq, res_name);
                        current_residue = Some(res_seq);
                    }
                    if builder.has_atom(name) {
                        continue;
                    }
                    if builder.add_atom(name, Point3::new(x, y, z), element, occupancy, b_factor) {
                        atom_count += 1;
                    }
                }
                "ENDMDL" => break,
                _ if HEADER_RECORDS.contains(&record) => {
                    metadata.header_lines.push(line.clone());
                }
                _ => {}
            }
        }

        if atom_count == 0 {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        Ok((builder.build(), metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        Self::write_structure_to(structure, writer)
    }

    fn write_structure_to(structure: &Structure, writer: &mut impl Write) -> Result<(), Self::Error> {
        writer.write_all(to_pdb_string(structure).as_bytes())?;
        Ok(())
    }
}

fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() < 4 && element.len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

/// Renders a structure as PDB text: `ATOM`/`HETATM` records, one `TER` per chain, `END`.
///
/// Atom serials are assigned sequentially, so two structures with the same content
/// always render to the same bytes.
pub fn to_pdb_string(structure: &Structure) -> String {
    let mut out = String::new();
    let mut serial = 1usize;

    for (_, chain) in structure.chains_iter() {
        let mut last: Option<(&str, isize)> = None;
        for &residue_id in chain.residues() {
            let Some(residue) = structure.residue(residue_id) else {
                continue;
            };
            let record = if one_letter_code(&residue.name).is_some() {
                "ATOM"
            } else {
                "HETATM"
            };
            for atom in structure.residue_atoms(residue_id) {
                out.push_str(&format!(
                    "{:<6}{:>5} {}{:1}{:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}\n",
                    record,
                    serial % 100_000,
                    format_atom_name(&atom.name, &atom.element),
                    "",
                    residue.name,
                    chain.id,
                    residue.number,
                    "",
                    atom.position.x,
                    atom.position.y,
                    atom.position.z,
                    atom.occupancy,
                    atom.b_factor,
                    atom.element,
                ));
                serial += 1;
            }
            last = Some((residue.name.as_str(), residue.number));
        }
        if let Some((res_name, res_seq)) = last {
            out.push_str(&format!(
                "TER   {:>5}      {:>3} {:1}{:>4}\n",
                serial % 100_000,
                res_name,
                chain.id,
                res_seq
            ));
            serial += 1;
        }
    }
    out.push_str("END\n");
    out
}

/// Serialized form used for byte-level structure comparison.
pub fn to_pdb_bytes(structure: &Structure) -> Vec<u8> {
    to_pdb_string(structure).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
HEADER    DE NOVO PROTEIN
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  CA BALA A   1      11.700   6.000  -5.100  0.50  0.00           C
ATOM      4  C   ALA A   1      13.159   5.948  -5.165  1.00  5.00           C
ATOM      5  N   GLY B   5      13.740   6.000  -3.970  1.00  0.00           N
ATOM      6  CA  GLY B   5      15.170   5.920  -3.860  1.00  0.00           C
ENDMDL
ATOM      7  CA  GLY B   6      99.000  99.000  99.000  1.00  0.00           C
";

    fn read(text: &str) -> Result<(Structure, PdbMetadata), PdbError> {
        PdbFile::read_from(&mut Cursor::new(text.as_bytes()))
    }

    #[test]
    fn reads_first_model_and_first_altloc() {
        let (structure, metadata) = read(SAMPLE).unwrap();
        assert_eq!(structure.chain_count(), 2);
        assert_eq!(structure.residue_count(), 2);
        assert_eq!(structure.atom_count(), 5);
        assert_eq!(metadata.header_lines.len(), 1);
        let cas = structure.ca_positions();
        assert!((cas[0].x - 11.639).abs() < 1e-9);
    }

    #[test]
    fn reads_b_factor_and_element() {
        let (structure, _) = read(SAMPLE).unwrap();
        let chain_id = structure.find_chain_by_id('A').unwrap();
        let residue_id = structure.find_residue_by_number(chain_id, 1).unwrap();
        let c = structure
            .residue_atoms(residue_id)
            .find(|a| a.name == "C")
            .unwrap();
        assert_eq!(c.b_factor, 5.0);
        assert_eq!(c.element, "C");
    }

    #[test]
    fn rejects_bad_coordinates_with_line_number() {
        let text = "ATOM      1  CA  ALA A   1      xx.xxx   6.071  -5.147  1.00  0.00           C\n";
        match read(text) {
            Err(PdbError::Parse { line, kind: PdbParseErrorKind::InvalidFloat { .. } }) => {
                assert_eq!(line, 1)
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_short_atom_line() {
        assert!(matches!(
            read("ATOM      1  CA  ALA A   1\n"),
            Err(PdbError::Parse { kind: PdbParseErrorKind::LineTooShort, .. })
        ));
    }

    #[test]
    fn rejects_file_without_atoms() {
        assert!(matches!(read("HEADER x\nEND\n"), Err(PdbError::MissingRecord(_))));
    }

    #[test]
    fn written_text_reads_back_identically() {
        let (structure, _) = read(SAMPLE).unwrap();
        let text = to_pdb_string(&structure);
        assert!(text.contains("ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00  0.00           C"));
        assert!(text.ends_with("END\n"));
        assert_eq!(text.matches("TER").count(), 2);

        let (again, _) = read(&text).unwrap();
        assert_eq!(to_pdb_bytes(&again), to_pdb_bytes(&structure));
    }

    #[test]
    fn write_to_path_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdb");
        let (structure, metadata) = read(SAMPLE).unwrap();
        PdbFile::write_to_path(&structure, &metadata, &path).unwrap();
        let (loaded, loaded_meta) = PdbFile::read_from_path(&path).unwrap();
        assert_eq!(loaded.atom_count(), structure.atom_count());
        assert_eq!(loaded_meta.header_lines, metadata.header_lines);
    }
}
