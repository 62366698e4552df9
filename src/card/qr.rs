//! QR payload encoding.
//!
//! A record is flattened to `Key: Value` lines in a fixed field order, encoded in
//! byte mode at error-correction level L with the smallest version that fits, and
//! rasterized to the square bitmap pasted on the card.

use image::{imageops, GrayImage, Luma};
use qrcode::bits::Bits;
use qrcode::{Color, EcLevel, QrCode, Version};

use super::CardError;
use crate::models::EmployeeRecord;

/// Edge length of the QR block on the card.
pub const QR_SIZE: u32 = 200;
/// Pixels per module before resampling.
const BOX_SIZE: u32 = 10;
/// Quiet zone, in modules.
const BORDER: u32 = 4;

/// The grid of dark/light cells produced by QR encoding.
#[derive(Debug, Clone)]
pub struct ModuleMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl ModuleMatrix {
    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark[y * self.width + x]
    }
}

/// Labeled card fields, in card and payload order. The photo reference is not a field.
pub fn fields(record: &EmployeeRecord) -> [(&'static str, String); 7] {
    [
        ("Name", record.name.clone()),
        ("CNIC", record.national_id_number.clone()),
        ("Age", record.age.to_string()),
        ("Role", record.role.as_str().to_string()),
        ("Unique ID", record.id.clone()),
        ("City", record.city.clone()),
        ("Shift", record.shift.as_str().to_string()),
    ]
}

/// Flatten a record into the text carried by its QR code.
pub fn payload(record: &EmployeeRecord) -> String {
    fields(record)
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Encode a payload in byte mode, picking the smallest version that holds it.
pub fn to_matrix(payload: &str) -> Result<ModuleMatrix, CardError> {
    let data = payload.as_bytes();

    for version in 1..=40 {
        let mut bits = Bits::new(Version::Normal(version));
        if bits.push_byte_data(data).is_err() || bits.push_terminator(EcLevel::L).is_err() {
            continue;
        }

        let code = QrCode::with_bits(bits, EcLevel::L)
            .map_err(|e| CardError::Encoding(e.to_string()))?;
        let dark = code
            .to_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();

        return Ok(ModuleMatrix {
            width: code.width(),
            dark,
        });
    }

    Err(CardError::EncodingCapacityExceeded {
        payload_len: data.len(),
    })
}

/// Draw the matrix with a quiet zone, one `BOX_SIZE` square per module.
pub fn rasterize(matrix: &ModuleMatrix) -> GrayImage {
    let modules = matrix.width() as u32 + 2 * BORDER;
    let side = modules * BOX_SIZE;

    GrayImage::from_fn(side, side, |px, py| {
        let mx = (px / BOX_SIZE) as i64 - BORDER as i64;
        let my = (py / BOX_SIZE) as i64 - BORDER as i64;
        let inside = (0..matrix.width() as i64).contains(&mx)
            && (0..matrix.width() as i64).contains(&my);

        if inside && matrix.is_dark(mx as usize, my as usize) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Payload → matrix → bitmap resampled to `QR_SIZE`×`QR_SIZE`.
pub fn render(record: &EmployeeRecord) -> Result<GrayImage, CardError> {
    let matrix = to_matrix(&payload(record))?;
    let raster = rasterize(&matrix);
    Ok(imageops::resize(
        &raster,
        QR_SIZE,
        QR_SIZE,
        imageops::FilterType::Nearest,
    ))
}
