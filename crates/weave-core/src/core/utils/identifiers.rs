use phf::{Map, Set, phf_map, phf_set};

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    "N", "CA", "C", "O", "OXT", "NT", "OT1", "OT2",
};

static AMINO_ACID_CODES: Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "ARG" => 'R', "ASN" => 'N', "ASP" => 'D', "CYS" => 'C',
    "GLN" => 'Q', "GLU" => 'E', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LEU" => 'L', "LYS" => 'K', "MET" => 'M', "PHE" => 'F', "PRO" => 'P',
    "SER" => 'S', "THR" => 'T', "TRP" => 'W', "TYR" => 'Y', "VAL" => 'V',
    "HSD" => 'H', "HSE" => 'H', "HSP" => 'H', "HIE" => 'H', "HID" => 'H', "HIP" => 'H',
    "MSE" => 'M', "SEC" => 'U', "PYL" => 'O', "CYX" => 'C',
};

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

/// Hydrogen and deuterium names start (after any digits) with `H` or `D`.
pub fn is_heavy_atom(atom_name: &str) -> bool {
    let first_letter = atom_name
        .trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase());
    !matches!(first_letter, Some('H') | Some('D'))
}

/// Atoms always considered by steric screening, independent of key-residue retention.
pub fn is_clash_core_atom(atom_name: &str) -> bool {
    is_backbone_atom(atom_name) || atom_name.trim() == "CB"
}

pub fn one_letter_code(residue_name: &str) -> Option<char> {
    AMINO_ACID_CODES.get(residue_name.trim()).copied()
}
