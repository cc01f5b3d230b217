use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid number '{value}' in list '{list}'.")]
    InvalidNumber { value: String, list: String },

    #[error("Invalid key residue specification '{0}'. Expected 'CHAIN=I,J,...' (e.g., '1=0,4').")]
    InvalidKeyResidues(String),

    #[error("Invalid --set format: '{0}'. Expected KEY=VALUE.")]
    InvalidAssignment(String),
}

/// Parses a comma separated list of indices such as `2,1,0,3`.
///
/// Blank entries are ignored, so `16,,0` and `16,0,` parse the same as `16,0`.
pub fn parse_index_list(list: &str) -> Result<Vec<usize>, ParseError> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse().map_err(|_| ParseError::InvalidNumber {
                value: item.to_string(),
                list: list.to_string(),
            })
        })
        .collect()
}

/// Parses `CHAIN=I,J,...` into the chain index and its key residues.
pub fn parse_key_residues(spec: &str) -> Result<(usize, BTreeSet<usize>), ParseError> {
    let (chain, residues) = spec
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidKeyResidues(spec.to_string()))?;
    let chain = chain
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidKeyResidues(spec.to_string()))?;
    let residues = parse_index_list(residues)?;
    Ok((chain, residues.into_iter().collect()))
}

/// Splits `KEY=VALUE`, trimming both sides.
pub fn parse_assignment(pair: &str) -> Result<(&str, &str), ParseError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(ParseError::InvalidAssignment(pair.to_string())),
    }
}
