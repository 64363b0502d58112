//! Sequence text normalization and alphabet checks

use once_cell::sync::Lazy;
use regex::Regex;

/// Nucleotides accepted in nucleic-acid input (U is folded to T on normalization)
pub const NUCLEIC_ACID_ALPHABET: &str = "ACGTU";

/// The 20 standard amino acids plus the stop symbol
pub const AMINO_ACID_ALPHABET: &str = "ARNDCEQGHILKMFPSTWYV*";

static NUCLEIC_ACID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ACGTU]*$").expect("static nucleic acid pattern"));

static AMINO_ACID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ARNDCEQGHILKMFPSTWYV*]*$").expect("static amino acid pattern"));

/// Remove all whitespace and upper-case the sequence
///
/// ```
/// use ferro_mrna::sequence::normalize_sequence;
/// assert_eq!(normalize_sequence("aaa\nccc\tuuu\n"), "AAACCCUUU");
/// ```
pub fn normalize_sequence(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// [`normalize_sequence`] followed by mapping U to T
///
/// ```
/// use ferro_mrna::sequence::normalize_nucleic_acid;
/// assert_eq!(normalize_nucleic_acid("aaa\nccc\tuuu\n"), "AAACCCTTT");
/// ```
pub fn normalize_nucleic_acid(value: &str) -> String {
    normalize_sequence(value).replace('U', "T")
}

/// True if every character is in [`NUCLEIC_ACID_ALPHABET`]
pub fn is_nucleic_acid(value: &str) -> bool {
    NUCLEIC_ACID_PATTERN.is_match(value)
}

/// True if every character is in [`AMINO_ACID_ALPHABET`]
pub fn is_amino_acid(value: &str) -> bool {
    AMINO_ACID_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_whitespace_and_uppercases() {
        assert_eq!(normalize_sequence(" a c\r\ng "), "ACG");
        assert_eq!(normalize_sequence(""), "");
    }

    #[test]
    fn test_nucleic_acid_maps_u_to_t() {
        assert_eq!(normalize_nucleic_acid("augu"), "ATGT");
    }

    #[test]
    fn test_alphabets() {
        assert!(is_nucleic_acid("ACGTU"));
        assert!(!is_nucleic_acid("ACGN"));
        assert!(is_amino_acid("MKV*"));
        assert!(!is_amino_acid("MKB"));
        assert!(is_nucleic_acid(""));
    }
}
