use crate::{
    bitmap::BitmapPayload,
    error::{FixtureError, FixtureResult},
};

/// Twips per pixel, the SWF native spatial unit.
pub const TWIPS_PER_PIXEL: i32 = 20;

/// Signed 16.16 fixed-point number (matrix coefficients).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sfixed16P16(pub i32);

impl Sfixed16P16 {
    pub fn from_value(value: f64) -> Self {
        Self((value * 65536.0).round() as i32)
    }

    pub fn to_value(self) -> f64 {
        f64::from(self.0) / 65536.0
    }
}

/// Unsigned 8.8 fixed-point number (frame rate).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ufixed8P8(pub u16);

impl Ufixed8P8 {
    pub fn from_value(value: f64) -> Self {
        Self((value * 256.0).round() as u16)
    }

    pub fn to_value(self) -> f64 {
        f64::from(self.0) / 256.0
    }
}

/// Axis-aligned rectangle in twips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Matrix {
    pub scale_x: Sfixed16P16,
    pub scale_y: Sfixed16P16,
    pub rotate_skew0: Sfixed16P16,
    pub rotate_skew1: Sfixed16P16,
    pub translate_x: i32,
    pub translate_y: i32,
}

impl Matrix {
    /// Pure scale, no rotation/skew/translation.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            scale_x: Sfixed16P16::from_value(sx),
            scale_y: Sfixed16P16::from_value(sy),
            rotate_skew0: Sfixed16P16::from_value(0.0),
            rotate_skew1: Sfixed16P16::from_value(0.0),
            translate_x: 0,
            translate_y: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileAttributes {
    pub use_network: bool,
    pub use_relative_urls: bool,
    pub no_cross_domain_caching: bool,
    pub use_as3: bool,
    pub has_metadata: bool,
    pub use_gpu: bool,
    pub use_direct_blit: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FillStyle {
    Bitmap {
        bitmap_id: u16,
        matrix: Matrix,
        repeating: bool,
        smoothed: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeRecord {
    /// Selects the right fill style by 1-based index (0 = none).
    StyleChange { right_fill: u32 },
    /// Straight edge, delta in twips.
    Edge { dx: i32, dy: i32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeDef {
    pub id: u16,
    pub bounds: Rect,
    pub fills: Vec<FillStyle>,
    pub records: Vec<ShapeRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub character_id: u16,
    pub depth: u16,
    pub is_update: bool,
}

/// Opaque embedded program (DoAbc tag body); its entry class runs when the
/// movie loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapProgram {
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolBinding {
    pub id: u16,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolClass {
    pub symbols: Vec<SymbolBinding>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Tag {
    FileAttributes(FileAttributes),
    DefineBitmap(BitmapPayload),
    DefineShape(ShapeDef),
    PlaceObject(Placement),
    DoAbc(BootstrapProgram),
    SymbolClass(SymbolClass),
    ShowFrame,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub version: u8,
    pub frame_size: Rect,
    pub frame_rate: Ufixed8P8,
    pub frame_count: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub header: Header,
    pub tags: Vec<Tag>,
}

impl Document {
    /// Checks the fixture document invariants: every referenced character
    /// id must be defined by an earlier tag (id 0 is the implicit root
    /// timeline), and the document must contain exactly one ShowFrame.
    pub fn validate(&self) -> FixtureResult<()> {
        let mut defined: Vec<u16> = Vec::new();
        let mut show_frames = 0usize;

        for tag in &self.tags {
            match tag {
                Tag::DefineBitmap(bitmap) => defined.push(bitmap.id),
                Tag::DefineShape(shape) => {
                    for fill in &shape.fills {
                        let FillStyle::Bitmap { bitmap_id, .. } = fill;
                        if !defined.contains(bitmap_id) {
                            return Err(FixtureError::document(format!(
                                "shape {} fill references undefined bitmap id {}",
                                shape.id, bitmap_id
                            )));
                        }
                    }
                    defined.push(shape.id);
                }
                Tag::PlaceObject(place) => {
                    if !defined.contains(&place.character_id) {
                        return Err(FixtureError::document(format!(
                            "placement at depth {} references undefined character id {}",
                            place.depth, place.character_id
                        )));
                    }
                }
                Tag::SymbolClass(symbol) => {
                    for binding in &symbol.symbols {
                        if binding.id != 0 && !defined.contains(&binding.id) {
                            return Err(FixtureError::document(format!(
                                "symbol binding '{}' references undefined character id {}",
                                binding.name, binding.id
                            )));
                        }
                    }
                }
                Tag::ShowFrame => show_frames += 1,
                Tag::FileAttributes(_) | Tag::DoAbc(_) => {}
            }
        }

        if show_frames != 1 {
            return Err(FixtureError::document(format!(
                "fixture document must contain exactly one ShowFrame, found {show_frames}"
            )));
        }

        Ok(())
    }
}
