//! Tag image file naming.
//!
//! Names are derived from the garment attributes alone, so the same
//! attributes always map to the same file. Two attribute sets that normalize
//! identically share a file and the later render overwrites the earlier one.

use deunicode::deunicode;

/// Extension appended to every generated tag image.
pub const IMAGE_EXTENSION: &str = ".png";

/// Join the attributes into the label a file name is derived from.
pub fn composite_label(product: &str, size: &str, color: &str, fabric: &str) -> String {
    format!("{product}_{size}_{color}_{fabric}")
}

/// Transliterate to ASCII (dropping diacritics) and lowercase.
///
/// Idempotent: normalizing an already normalized label returns it unchanged.
pub fn normalize_label(label: &str) -> String {
    deunicode(label).to_ascii_lowercase()
}

/// Normalized label plus [`IMAGE_EXTENSION`]. Total over all inputs.
pub fn format_file_name(label: &str) -> String {
    let mut name = normalize_label(label);
    name.push_str(IMAGE_EXTENSION);
    name
}
