mod smiles;
pub use smiles::*;

mod bracket;
pub use bracket::parse_bracket_atom;

/// The molecules predicted when the user supplies nothing.
pub const DEFAULT_SMILES_BLOCK: &str = "NCCCC\nCCC\nCN";

/// Split a free-text block into one SMILES per line.
///
/// Surrounding whitespace is trimmed and blank lines are dropped, so the
/// returned order is the order the molecules were written in.
pub fn read_smiles_block(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
