//! ArUco-style square fiducial markers.
//!
//! Code tables are generated deterministically from a fixed seed per
//! dictionary and cached for the lifetime of the process. Generation follows
//! the usual greedy scheme for custom dictionaries: a candidate is accepted if
//! its Hamming distance to every accepted code, under all four rotations, and
//! to its own rotations is at least `tau`. `tau` is lowered whenever too many
//! candidates in a row are rejected.

use std::fmt;
use std::sync::OnceLock;

use clap::ValueEnum;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{MarkerError, MarkerResult, ModuleMatrix};

/// Number of consecutive rejected candidates before `tau` is lowered.
const MAX_UNPRODUCTIVE_CANDIDATES: usize = 2_000;

/// Predefined marker dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum ArucoDictionary {
    /// 4x4 payload bits, 1000 markers
    #[value(name = "4x4_1000")]
    #[serde(rename = "4x4_1000")]
    Dict4x4_1000,
    /// 5x5 payload bits, 1000 markers
    #[value(name = "5x5_1000")]
    #[serde(rename = "5x5_1000")]
    Dict5x5_1000,
    /// 6x6 payload bits, 1000 markers
    #[value(name = "6x6_1000")]
    #[serde(rename = "6x6_1000")]
    Dict6x6_1000,
}

impl ArucoDictionary {
    /// Payload bits per row.
    pub fn side(&self) -> usize {
        match self {
            ArucoDictionary::Dict4x4_1000 => 4,
            ArucoDictionary::Dict5x5_1000 => 5,
            ArucoDictionary::Dict6x6_1000 => 6,
        }
    }

    /// Number of markers in the dictionary.
    pub fn len(&self) -> usize {
        1000
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn seed(&self) -> u64 {
        match self {
            ArucoDictionary::Dict4x4_1000 => 0x4A52_0404_03E8,
            ArucoDictionary::Dict5x5_1000 => 0x4A52_0505_03E8,
            ArucoDictionary::Dict6x6_1000 => 0x4A52_0606_03E8,
        }
    }

    /// Starting inter-marker distance for generation.
    fn initial_tau(&self) -> u32 {
        (self.side() * self.side() / 3) as u32
    }

    /// Code table, generated on first use.
    pub fn codes(&self) -> &'static [u64] {
        static DICT_4X4: OnceLock<Vec<u64>> = OnceLock::new();
        static DICT_5X5: OnceLock<Vec<u64>> = OnceLock::new();
        static DICT_6X6: OnceLock<Vec<u64>> = OnceLock::new();

        let cell = match self {
            ArucoDictionary::Dict4x4_1000 => &DICT_4X4,
            ArucoDictionary::Dict5x5_1000 => &DICT_5X5,
            ArucoDictionary::Dict6x6_1000 => &DICT_6X6,
        };
        cell.get_or_init(|| {
            generate_codes(self.side(), self.len(), self.seed(), self.initial_tau())
        })
    }

    /// Code for a marker id.
    pub fn code(&self, id: usize) -> MarkerResult<u64> {
        self.codes()
            .get(id)
            .copied()
            .ok_or(MarkerError::InvalidId {
                id,
                dictionary: *self,
                len: self.len(),
            })
    }
}

impl fmt::Display for ArucoDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.side();
        write!(f, "DICT_{side}X{side}_{}", self.len())
    }
}

fn bit(code: u64, side: usize, x: usize, y: usize) -> bool {
    let bits = side * side;
    (code >> (bits - 1 - (y * side + x))) & 1 == 1
}

/// Rotate a `side x side` code by 90 degrees clockwise.
fn rotate_90(code: u64, side: usize) -> u64 {
    let bits = side * side;
    let mut out = 0u64;
    for y in 0..side {
        for x in 0..side {
            if bit(code, side, y, side - 1 - x) {
                out |= 1u64 << (bits - 1 - (y * side + x));
            }
        }
    }
    out
}

fn rotations(code: u64, side: usize) -> [u64; 4] {
    let r1 = rotate_90(code, side);
    let r2 = rotate_90(r1, side);
    let r3 = rotate_90(r2, side);
    [code, r1, r2, r3]
}

/// Smallest Hamming distance between `code` and any rotation of `other`.
#[cfg(test)]
fn rotated_distance(code: u64, other: u64, side: usize) -> u32 {
    rotations(other, side)
        .iter()
        .map(|r| (code ^ r).count_ones())
        .min()
        .unwrap_or(0)
}

/// Smallest Hamming distance between `code` and its own non-trivial rotations.
fn self_distance(code: u64, side: usize) -> u32 {
    rotations(code, side)[1..]
        .iter()
        .map(|r| (code ^ r).count_ones())
        .min()
        .unwrap_or(0)
}

fn generate_codes(side: usize, count: usize, seed: u64, initial_tau: u32) -> Vec<u64> {
    let bits = side * side;
    let mask = if bits == 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut codes: Vec<u64> = Vec::with_capacity(count);
    // All four rotations of every accepted code
    let mut rotated: Vec<u64> = Vec::with_capacity(count * 4);
    let mut tau = initial_tau.max(1);
    let mut unproductive = 0usize;

    while codes.len() < count {
        let candidate = rng.random::<u64>() & mask;

        let accepted = self_distance(candidate, side) >= tau
            && rotated
                .iter()
                .all(|&r| (candidate ^ r).count_ones() >= tau);

        if accepted {
            codes.push(candidate);
            rotated.extend_from_slice(&rotations(candidate, side));
            unproductive = 0;
        } else {
            unproductive += 1;
            if unproductive >= MAX_UNPRODUCTIVE_CANDIDATES && tau > 1 {
                tau -= 1;
                unproductive = 0;
            }
        }
    }

    tracing::debug!(side, count, final_tau = tau, "Generated ArUco dictionary");
    codes
}

/// Marker bits for `id` framed by `border_bits` black cells.
pub fn marker_bits(
    dictionary: ArucoDictionary,
    id: usize,
    border_bits: usize,
) -> MarkerResult<ModuleMatrix> {
    let code = dictionary.code(id)?;
    let side = dictionary.side();
    let grid = side + 2 * border_bits;

    let mut matrix = ModuleMatrix::new(grid, grid);
    for y in 0..side {
        for x in 0..side {
            matrix.set(x + border_bits, y + border_bits, bit(code, side, x, y));
        }
    }
    Ok(matrix)
}

/// Render marker `id` as a `side_pixels x side_pixels` grayscale tag.
pub fn generate_image_marker(
    dictionary: ArucoDictionary,
    id: usize,
    side_pixels: u32,
    border_bits: usize,
) -> MarkerResult<GrayImage> {
    let matrix = marker_bits(dictionary, id, border_bits)?;
    let grid = matrix.width() as u32;
    if side_pixels < grid {
        return Err(MarkerError::DoesNotFit {
            marker: (grid, grid).into(),
            window: (side_pixels, side_pixels).into(),
        });
    }

    let cells = GrayImage::from_fn(grid, grid, |x, y| {
        if matrix.get(x as usize, y as usize) {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    Ok(imageops::resize(
        &cells,
        side_pixels,
        side_pixels,
        FilterType::Nearest,
    ))
}

/// Look up the id and clockwise rotation (in quarter turns) of a payload grid.
///
/// `payload` must be the `side x side` interior of a marker, without border.
pub fn identify(dictionary: ArucoDictionary, payload: &ModuleMatrix) -> Option<(usize, usize)> {
    let side = dictionary.side();
    if payload.width() != side || payload.height() != side {
        return None;
    }

    let bits = side * side;
    let mut code = 0u64;
    for y in 0..side {
        for x in 0..side {
            if payload.get(x, y) {
                code |= 1u64 << (bits - 1 - (y * side + x));
            }
        }
    }

    dictionary.codes().iter().enumerate().find_map(|(id, &c)| {
        rotations(c, side)
            .iter()
            .position(|&r| r == code)
            .map(|rotation| (id, rotation))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rotation_has_period_four() {
        let code = 0b1000_0000_0000_0001u64;
        let [c0, c1, c2, c3] = rotations(code, 4);
        assert_eq!(rotate_90(c3, 4), c0);
        assert_ne!(c0, c1);
        assert_eq!(c0.count_ones(), c2.count_ones());
    }

    #[test]
    fn test_dictionary_is_deterministic_and_unique() {
        let dict = ArucoDictionary::Dict4x4_1000;
        let codes = dict.codes();
        assert_eq!(codes.len(), 1000);
        assert_eq!(
            generate_codes(4, 1000, dict.seed(), dict.initial_tau()),
            codes.to_vec()
        );

        // No two markers share an orbit under rotation
        let mut seen = HashSet::new();
        for &code in codes {
            for r in rotations(code, 4) {
                assert!(seen.insert(r), "rotation collision for code {code:#06x}");
            }
        }
    }

    #[test]
    fn test_larger_dictionaries_keep_distance() {
        let dict = ArucoDictionary::Dict6x6_1000;
        let codes = dict.codes();
        assert_eq!(codes.len(), 1000);
        // Rotated copies of the first code are far from every other marker
        for &other in &codes[1..50] {
            assert!(rotated_distance(codes[0], other, 6) >= 2);
        }
    }

    #[test]
    fn test_marker_bits_have_black_border() {
        let m = marker_bits(ArucoDictionary::Dict4x4_1000, 1, 1).unwrap();
        assert_eq!(m.width(), 6);
        for i in 0..6 {
            assert!(!m.get(i, 0));
            assert!(!m.get(i, 5));
            assert!(!m.get(0, i));
            assert!(!m.get(5, i));
        }
    }

    #[test]
    fn test_generate_image_marker_size_and_cells() {
        let tag = generate_image_marker(ArucoDictionary::Dict4x4_1000, 1, 300, 1).unwrap();
        assert_eq!(tag.dimensions(), (300, 300));

        // 6 cells of 50px each: border cell black, interior cell matches bits
        assert_eq!(tag.get_pixel(25, 25).0[0], 0);
        let bits = marker_bits(ArucoDictionary::Dict4x4_1000, 1, 1).unwrap();
        let expected = if bits.get(1, 1) { 255 } else { 0 };
        assert_eq!(tag.get_pixel(75, 75).0[0], expected);
    }

    #[test]
    fn test_identify_recovers_id_and_rotation() {
        let dict = ArucoDictionary::Dict5x5_1000;
        let framed = marker_bits(dict, 42, 1).unwrap();
        let mut payload = ModuleMatrix::new(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                payload.set(x, y, framed.get(x + 1, y + 1));
            }
        }
        assert_eq!(identify(dict, &payload), Some((42, 0)));
    }

    #[test]
    fn test_invalid_id() {
        let err = ArucoDictionary::Dict4x4_1000.code(1000).unwrap_err();
        assert!(matches!(err, MarkerError::InvalidId { id: 1000, .. }));
        assert!(err.to_string().contains("DICT_4X4_1000"));
    }
}
