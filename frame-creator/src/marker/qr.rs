//! QR code markers.

use qrcode::{Color, EcLevel, QrCode};

use super::{MarkerError, MarkerResult, ModuleMatrix};

/// Encode `payload` as a QR code with error correction level H.
///
/// Dark QR modules become on (white) modules, so the rendered marker is the
/// negative of a printed QR code: white modules on a black border.
pub fn encode(payload: &str) -> MarkerResult<ModuleMatrix> {
    if payload.is_empty() {
        return Err(MarkerError::EmptyPayload);
    }

    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)
        .map_err(|e| MarkerError::Qr(e.to_string()))?;
    let width = code.width();
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();

    ModuleMatrix::from_modules(width, width, modules)
        .ok_or_else(|| MarkerError::Qr("module count does not match symbol width".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_symbol_size() {
        // Version 1 symbols are 21x21, larger payloads grow by 4 modules per version
        let m = encode("1").unwrap();
        assert_eq!(m.width(), 21);
        assert_eq!(m.height(), 21);
        assert_eq!((m.width() - 17) % 4, 0);

        let long = encode(&"x".repeat(100)).unwrap();
        assert!(long.width() > m.width());
    }

    #[test]
    fn test_finder_pattern_corner_is_on() {
        let m = encode("0 - terminal").unwrap();
        // The top-left finder pattern has a dark 7x7 outer ring
        for i in 0..7 {
            assert!(m.get(i, 0));
            assert!(m.get(0, i));
        }
        // Separator around the finder is light
        assert!(!m.get(7, 0));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(encode(""), Err(MarkerError::EmptyPayload)));
    }
}
