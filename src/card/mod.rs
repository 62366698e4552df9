//! Card compositor.
//!
//! Lays out the fixed 1054×640 card: header band with title and logo, photo or
//! placeholder, seven labeled field rows, the QR block and a footer rule.
//! Logo and photo problems never fail a card; they come back as [`CardWarning`]s.

pub mod qr;
pub mod text;

use std::io::Cursor;

use image::{imageops, DynamicImage, GenericImageView, ImageFormat, Pixel, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::Serialize;

use crate::models::EmployeeRecord;
use text::CardFont;

pub const CARD_WIDTH: u32 = 1054;
pub const CARD_HEIGHT: u32 = 640;

const HEADER_HEIGHT: u32 = 85;
const TITLE_Y: i32 = 24;
const LOGO_SIZE: u32 = 80;
const LOGO_POS: (i64, i64) = (50, 2);
pub const PHOTO_WIDTH: u32 = 300;
pub const PHOTO_HEIGHT: u32 = 400;
pub const PHOTO_X: u32 = CARD_WIDTH - 350;
pub const PHOTO_Y: u32 = 150;
const ROWS_Y: i32 = 150;
const ROW_HEIGHT: i32 = 60;
const LABEL_X: i32 = 50;
const VALUE_X: i32 = 200;
pub const QR_X: u32 = (CARD_WIDTH - qr::QR_SIZE) / 2;
pub const QR_Y: u32 = CARD_HEIGHT - 250;
const FOOTER_Y: u32 = CARD_HEIGHT - 50;
const FOOTER_THICKNESS: u32 = 5;

const TITLE_SIZE: f32 = 40.0;
const LABEL_SIZE: f32 = 30.0;
const VALUE_SIZE: f32 = 35.0;

const PRIMARY: Rgb<u8> = Rgb([31, 97, 141]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const PLACEHOLDER_FILL: Rgb<u8> = Rgb([211, 211, 211]);
const PLACEHOLDER_TEXT: Rgb<u8> = Rgb([128, 128, 128]);

/// Fatal card rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("QR payload of {payload_len} bytes exceeds the code capacity")]
    EncodingCapacityExceeded { payload_len: usize },
    #[error("QR encoding failed: {0}")]
    Encoding(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Optional card element that can degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardElement {
    Logo,
    Photo,
}

/// A logo or photo that could not be used; the card rendered without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardWarning {
    pub element: CardElement,
    pub message: String,
}

impl std::fmt::Display for CardWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let element = match self.element {
            CardElement::Logo => "logo",
            CardElement::Photo => "photo",
        };
        write!(f, "{}: {}", element, self.message)
    }
}

/// Image source handed to the compositor.
#[derive(Debug, Clone, Copy)]
pub enum ImageInput<'a> {
    /// Encoded PNG/JPEG bytes
    Bytes(&'a [u8]),
    /// A referenced image that could not be fetched
    Missing(&'a str),
}

/// A rendered card plus the non-fatal problems met while drawing it.
pub struct ComposedCard {
    pub image: RgbImage,
    pub warnings: Vec<CardWarning>,
}

impl ComposedCard {
    /// Encode the card as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, CardError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Logo and photo decoded and sized for the card, plus any warnings met on the way.
pub struct PreparedImages {
    logo: Option<DynamicImage>,
    photo: Option<RgbImage>,
    pub warnings: Vec<CardWarning>,
}

/// Renders employee cards.
pub struct CardCompositor {
    font: CardFont,
    title: String,
    default_logo: Option<Vec<u8>>,
}

impl CardCompositor {
    pub fn new(font: CardFont, title: impl Into<String>) -> Self {
        Self {
            font,
            title: title.into(),
            default_logo: None,
        }
    }

    /// Logo drawn when a card gets none of its own.
    pub fn with_default_logo(mut self, logo: Vec<u8>) -> Self {
        self.default_logo = Some(logo);
        self
    }

    /// Compose the card for `record`.
    ///
    /// Only QR encoding can fail; logo and photo problems are reported as warnings.
    pub fn compose(
        &self,
        record: &EmployeeRecord,
        logo: Option<ImageInput<'_>>,
        photo: Option<ImageInput<'_>>,
    ) -> Result<ComposedCard, CardError> {
        let images = self.prepare(logo, photo);
        self.compose_prepared(record, &images)
    }

    /// Decode the logo and photo and fit them to their slots.
    ///
    /// This is the expensive half of [`compose`](Self::compose) and needs no record.
    pub fn prepare(
        &self,
        logo: Option<ImageInput<'_>>,
        photo: Option<ImageInput<'_>>,
    ) -> PreparedImages {
        let mut warnings = Vec::new();

        let logo = logo
            .or(self.default_logo.as_deref().map(ImageInput::Bytes))
            .and_then(|input| match decode(input) {
                Ok(image) => Some(image.resize_exact(
                    LOGO_SIZE,
                    LOGO_SIZE,
                    imageops::FilterType::Triangle,
                )),
                Err(message) => {
                    warnings.push(degrade(CardElement::Logo, message));
                    None
                }
            });

        let photo = photo.and_then(|input| match decode(input) {
            Ok(image) => Some(crop_to_aspect(&image, PHOTO_WIDTH, PHOTO_HEIGHT).to_rgb8()),
            Err(message) => {
                warnings.push(degrade(CardElement::Photo, message));
                None
            }
        });

        PreparedImages {
            logo,
            photo,
            warnings,
        }
    }

    /// Draw the card for `record` around already prepared images.
    pub fn compose_prepared(
        &self,
        record: &EmployeeRecord,
        images: &PreparedImages,
    ) -> Result<ComposedCard, CardError> {
        // Encode first so an oversized payload fails before any drawing
        let qr_block = qr::render(record)?;

        let mut card = RgbImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, WHITE);

        self.draw_header(&mut card);

        if let Some(logo) = &images.logo {
            paste_logo(&mut card, logo);
        }

        match &images.photo {
            Some(photo) => imageops::replace(&mut card, photo, PHOTO_X as i64, PHOTO_Y as i64),
            None => self.draw_placeholder(&mut card),
        }

        self.draw_fields(&mut card, record);

        let qr_rgb = DynamicImage::ImageLuma8(qr_block).to_rgb8();
        imageops::replace(&mut card, &qr_rgb, QR_X as i64, QR_Y as i64);

        draw_filled_rect_mut(
            &mut card,
            Rect::at(0, FOOTER_Y as i32).of_size(CARD_WIDTH, FOOTER_THICKNESS),
            PRIMARY,
        );

        Ok(ComposedCard {
            image: card,
            warnings: images.warnings.clone(),
        })
    }

    fn draw_header(&self, card: &mut RgbImage) {
        draw_filled_rect_mut(card, Rect::at(0, 0).of_size(CARD_WIDTH, HEADER_HEIGHT), PRIMARY);

        let (title_width, _) = self.font.measure(TITLE_SIZE, &self.title);
        let title_x = (CARD_WIDTH as i32 - title_width as i32).max(0) / 2;
        self.font
            .draw(card, WHITE, title_x, TITLE_Y, TITLE_SIZE, &self.title);
    }

    fn draw_placeholder(&self, card: &mut RgbImage) {
        let region = Rect::at(PHOTO_X as i32, PHOTO_Y as i32).of_size(PHOTO_WIDTH, PHOTO_HEIGHT);
        draw_filled_rect_mut(card, region, PLACEHOLDER_FILL);
        draw_hollow_rect_mut(card, region, BLACK);

        let (width, height) = self.font.measure(LABEL_SIZE, "PHOTO");
        let x = PHOTO_X as i32 + (PHOTO_WIDTH as i32 - width as i32) / 2;
        let y = PHOTO_Y as i32 + (PHOTO_HEIGHT as i32 - height as i32) / 2;
        self.font
            .draw(card, PLACEHOLDER_TEXT, x, y, LABEL_SIZE, "PHOTO");
    }

    fn draw_fields(&self, card: &mut RgbImage, record: &EmployeeRecord) {
        for (index, (label, value)) in qr::fields(record).iter().enumerate() {
            let y = ROWS_Y + index as i32 * ROW_HEIGHT;
            self.font
                .draw(card, PRIMARY, LABEL_X, y, LABEL_SIZE, &format!("{}:", label));
            self.font.draw(card, BLACK, VALUE_X, y, VALUE_SIZE, value);
        }
    }
}

/// Center-crop `image` to the `target_width`:`target_height` ratio, then resize to exactly that size.
///
/// Never produces an empty crop, so 1×1 and other degenerate sources are fine.
pub fn crop_to_aspect(image: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (tw, th) = (target_width as u64, target_height as u64);

    // width / height > tw / th, without floats
    let (crop_width, crop_height) = if width as u64 * th > height as u64 * tw {
        let w = (height as u64 * tw / th).clamp(1, width as u64) as u32;
        (w, height)
    } else {
        let h = (width as u64 * th / tw).clamp(1, height as u64) as u32;
        (width, h)
    };

    let left = (width - crop_width) / 2;
    let top = (height - crop_height) / 2;

    image
        .crop_imm(left, top, crop_width, crop_height)
        .resize_exact(target_width, target_height, imageops::FilterType::Triangle)
}

fn decode(input: ImageInput<'_>) -> Result<DynamicImage, String> {
    match input {
        ImageInput::Bytes(bytes) => image::load_from_memory(bytes).map_err(|e| e.to_string()),
        ImageInput::Missing(key) => Err(format!("image {} is not available", key)),
    }
}

fn degrade(element: CardElement, message: String) -> CardWarning {
    let warning = CardWarning { element, message };
    tracing::warn!("Card rendered without {}", warning);
    warning
}

/// Paste the 80×80 logo into the header, blending through its alpha channel when it has one.
fn paste_logo(card: &mut RgbImage, logo: &DynamicImage) {
    if !logo.color().has_alpha() {
        imageops::replace(card, &logo.to_rgb8(), LOGO_POS.0, LOGO_POS.1);
        return;
    }

    for (x, y, pixel) in logo.to_rgba8().enumerate_pixels() {
        let (cx, cy) = (LOGO_POS.0 as u32 + x, LOGO_POS.1 as u32 + y);
        if cx >= card.width() || cy >= card.height() {
            continue;
        }

        let mut base = card.get_pixel(cx, cy).to_rgba();
        base.blend(pixel);
        card.put_pixel(cx, cy, base.to_rgb());
    }
}
