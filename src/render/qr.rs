use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;

/// Minimum rendered edge of the code, in SVG pixels
const QR_MIN_SIZE: u32 = 160;

/// `text` as a QR code in an `image/svg+xml` data URI, ready for an `<img src>`.
/// `None` when the text does not fit in a QR code.
pub fn qr_code_data_uri(text: &str) -> Option<String> {
    let code = match QrCode::new(text.as_bytes()) {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!("Cannot encode {} bytes as a QR code: {}", text.len(), e);
            return None;
        }
    };
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(QR_MIN_SIZE, QR_MIN_SIZE)
        .quiet_zone(true)
        .build();
    Some(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}
