//! Dot markers.
//!
//! A DotCode-style layout: dots may only sit on checkerboard cells where
//! `(x + y)` is even, so no two dots ever touch edge-to-edge. Every such cell
//! on the outer ring carries a dot and forms the finder frame. The interior
//! cells carry a length byte followed by the payload bytes, most significant
//! bit first in row-major order; left-over cells alternate on/off.

use super::{MarkerError, MarkerResult, ModuleMatrix};

/// Smallest grid side; keeps at least a 5x5 interior.
const MIN_SIDE: usize = 7;

/// Longest payload that fits the one-byte length prefix.
pub const MAX_PAYLOAD_BYTES: usize = u8::MAX as usize;

fn is_dot_cell(x: usize, y: usize) -> bool {
    (x + y) % 2 == 0
}

fn interior_capacity(side: usize) -> usize {
    let inner = side - 2;
    (inner * inner).div_ceil(2)
}

/// Smallest odd side whose interior holds `bits` bits.
fn side_for_bits(bits: usize) -> usize {
    let mut side = MIN_SIDE;
    while interior_capacity(side) < bits {
        side += 2;
    }
    side
}

fn interior_cells(side: usize) -> impl Iterator<Item = (usize, usize)> {
    (1..side - 1).flat_map(move |y| {
        (1..side - 1)
            .filter(move |&x| is_dot_cell(x, y))
            .map(move |x| (x, y))
    })
}

fn is_ring(side: usize, x: usize, y: usize) -> bool {
    x == 0 || y == 0 || x == side - 1 || y == side - 1
}

/// Encode `payload` as a dot marker.
pub fn encode(payload: &str) -> MarkerResult<ModuleMatrix> {
    let bytes = payload.as_bytes();
    if bytes.is_empty() {
        return Err(MarkerError::EmptyPayload);
    }
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(MarkerError::PayloadTooLong {
            kind: "dot",
            len: bytes.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    let mut data = Vec::with_capacity(bytes.len() + 1);
    data.push(bytes.len() as u8);
    data.extend_from_slice(bytes);

    let side = side_for_bits(data.len() * 8);
    let mut matrix = ModuleMatrix::new(side, side);

    for y in 0..side {
        for x in 0..side {
            if is_ring(side, x, y) && is_dot_cell(x, y) {
                matrix.set(x, y, true);
            }
        }
    }

    let data_bits = data
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1));
    let filler = (0..).map(|k: usize| k % 2 == 0);

    for ((x, y), on) in interior_cells(side).zip(data_bits.chain(filler)) {
        matrix.set(x, y, on);
    }

    Ok(matrix)
}

/// Recover the payload of a dot marker.
///
/// Returns `None` when the grid is not a well-formed dot marker.
pub fn decode(matrix: &ModuleMatrix) -> Option<String> {
    let side = matrix.width();
    if side != matrix.height() || side < MIN_SIDE || side % 2 == 0 {
        return None;
    }

    for y in 0..side {
        for x in 0..side {
            let on = matrix.get(x, y);
            if !is_dot_cell(x, y) && on {
                return None;
            }
            if is_ring(side, x, y) && is_dot_cell(x, y) && !on {
                return None;
            }
        }
    }

    let bits: Vec<bool> = interior_cells(side).map(|(x, y)| matrix.get(x, y)).collect();
    let mut bytes = bits.chunks_exact(8).map(|chunk| {
        chunk
            .iter()
            .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit))
    });

    let len = bytes.next()? as usize;
    if len == 0 {
        return None;
    }
    let payload: Vec<u8> = bytes.take(len).collect();
    if payload.len() != len {
        return None;
    }
    String::from_utf8(payload).ok()
}
