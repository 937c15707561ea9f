use crate::{
    bitmap::BitmapPayload,
    error::{FixtureError, FixtureResult},
    model::{
        BootstrapProgram, Document, FileAttributes, FillStyle, Header, Matrix, Placement, Rect,
        ShapeDef, ShapeRecord, SymbolBinding, SymbolClass, TWIPS_PER_PIXEL, Tag, Ufixed8P8,
    },
};

/// Character id the caller's bitmap payload is re-tagged with.
pub const BITMAP_CHARACTER_ID: u16 = 1;

/// Character id of the synthesized display shape.
pub const SHAPE_CHARACTER_ID: u16 = 2;

/// Symbol name the bootstrap program's entry class is bound to on the root
/// timeline, so it runs automatically on load.
pub const BOOT_SYMBOL_NAME: &str = "boot_ef59";

const FRAME_RATE: f64 = 30.0;
const SWF_VERSION: u8 = 17;

/// Builds the capture movie for one bitmap payload.
///
/// The topology is fixed: file attributes, the re-tagged bitmap, a
/// rectangle shape tiling it at 1:1 pixel scale, a placement at depth 1,
/// the bootstrap program, the root symbol binding, and one frame. Tag
/// order matters: definitions precede every reference.
pub fn assemble(bitmap: &BitmapPayload, bootstrap: &BootstrapProgram) -> Document {
    let width_twips = i32::from(bitmap.width) * TWIPS_PER_PIXEL;
    let height_twips = i32::from(bitmap.height) * TWIPS_PER_PIXEL;
    let bounds = Rect {
        x_min: 0,
        x_max: width_twips,
        y_min: 0,
        y_max: height_twips,
    };

    // The renderer refuses outbound requests unless the movie declares
    // network use up front.
    let attributes = FileAttributes {
        use_network: true,
        use_relative_urls: false,
        no_cross_domain_caching: false,
        use_as3: true,
        has_metadata: false,
        use_gpu: false,
        use_direct_blit: false,
    };

    let bitmap = bitmap.clone().with_id(BITMAP_CHARACTER_ID);

    // One bitmap pixel maps to a 20x20 twip cell, so the shape shows the
    // bitmap at exactly 1:1 pixel scale.
    let shape = ShapeDef {
        id: SHAPE_CHARACTER_ID,
        bounds,
        fills: vec![FillStyle::Bitmap {
            bitmap_id: BITMAP_CHARACTER_ID,
            matrix: Matrix::scale(f64::from(TWIPS_PER_PIXEL), f64::from(TWIPS_PER_PIXEL)),
            repeating: false,
            smoothed: false,
        }],
        records: vec![
            ShapeRecord::StyleChange { right_fill: 1 },
            ShapeRecord::Edge {
                dx: width_twips,
                dy: 0,
            },
            ShapeRecord::Edge {
                dx: 0,
                dy: height_twips,
            },
            ShapeRecord::Edge {
                dx: -width_twips,
                dy: 0,
            },
            ShapeRecord::Edge {
                dx: 0,
                dy: -height_twips,
            },
        ],
    };

    let place = Placement {
        character_id: SHAPE_CHARACTER_ID,
        depth: 1,
        is_update: false,
    };

    let symbol = SymbolClass {
        symbols: vec![SymbolBinding {
            id: 0,
            name: BOOT_SYMBOL_NAME.to_string(),
        }],
    };

    let header = Header {
        version: SWF_VERSION,
        frame_size: bounds,
        frame_rate: Ufixed8P8::from_value(FRAME_RATE),
        frame_count: 1,
    };

    Document {
        header,
        tags: vec![
            Tag::FileAttributes(attributes),
            Tag::DefineBitmap(bitmap),
            Tag::DefineShape(shape),
            Tag::PlaceObject(place),
            Tag::DoAbc(bootstrap.clone()),
            Tag::SymbolClass(symbol),
            Tag::ShowFrame,
        ],
    }
}

/// Extracts the bootstrap program from a decoded template movie. Fails
/// with [`FixtureError::BootstrapNotFound`] when the template carries no
/// DoAbc tag; that is a fatal construction error, never retried.
pub fn extract_bootstrap(template: &Document) -> FixtureResult<BootstrapProgram> {
    for tag in &template.tags {
        if let Tag::DoAbc(program) = tag {
            return Ok(program.clone());
        }
    }
    Err(FixtureError::BootstrapNotFound)
}
