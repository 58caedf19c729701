//! Post-parse clean-up of names and orientation.
//!
//! These run once after all container parsers are done:
//!
//! 1. [`canonicalize_make`] rewrites vendor spellings ("NIKON CORPORATION",
//!    "OLYMPUS IMAGING CORP.") to one canonical name.
//! 2. [`strip_make_from_model`] drops a repeated make from the model
//!    ("Canon EOS 5D" becomes "EOS 5D").
//! 3. [`normalize_flip`] resolves the orientation code.

use super::metadata::TextField;

/// Canonical manufacturer names, matched as case-insensitive prefixes.
pub const CANONICAL_MAKES: [&str; 21] = [
    "AgfaPhoto",
    "Canon",
    "Casio",
    "Epson",
    "Fujifilm",
    "Mamiya",
    "Minolta",
    "Motorola",
    "Kodak",
    "Konica",
    "Leica",
    "Nikon",
    "Nokia",
    "Olympus",
    "Pentax",
    "Phase One",
    "Ricoh",
    "Samsung",
    "Sigma",
    "Sinar",
    "Sony",
];

/// Replace the make with its canonical spelling when one matches.
///
/// # Returns
/// Whether the make was rewritten.
pub fn canonicalize_make<const N: usize>(make: &mut TextField<N>) -> bool {
    match CANONICAL_MAKES
        .iter()
        .find(|corp| make.starts_with_ignore_case(corp.as_bytes()))
    {
        Some(corp) => {
            make.set(corp.as_bytes());
            true
        }
        None => false,
    }
}

/// Remove a leading "`make` " from the model.
///
/// The prefix compare ignores ASCII case, so "NIKON D3" loses its prefix
/// under the canonical make "Nikon". An empty make never matches.
pub fn strip_make_from_model<const N: usize, const M: usize>(
    make: &TextField<N>,
    model: &mut TextField<M>,
) -> bool {
    let make = make.as_bytes();
    if make.is_empty() {
        return false;
    }

    if model.starts_with_ignore_case(make) && model.as_bytes().get(make.len()) == Some(&b' ') {
        model.strip_prefix_len(make.len() + 1);
        true
    } else {
        false
    }
}

/// Resolve the final orientation code.
///
/// An orientation set directly by a vendor parser wins over the one taken
/// from the tagged directories; without either the image is upright. Values
/// expressed as angles are then mapped to codes: 270 to 5, 180 to 3 and 90
/// to 6. Everything else passes through.
pub fn normalize_flip(flip: Option<i32>, tiff_flip: Option<i32>) -> i32 {
    let flip = flip.or(tiff_flip).unwrap_or(0);
    match (flip as i64 + 3600).rem_euclid(360) {
        270 => 5,
        180 => 3,
        90 => 6,
        _ => flip,
    }
}
