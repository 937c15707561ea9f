#![forbid(unsafe_code)]

pub mod assemble;
pub mod bitmap;
pub mod capture;
pub mod container;
pub mod error;
pub mod invoke;
pub mod model;
pub mod pipeline;
pub mod pixel;
pub mod request;

pub use assemble::{
    BITMAP_CHARACTER_ID, BOOT_SYMBOL_NAME, SHAPE_CHARACTER_ID, assemble, extract_bootstrap,
};
pub use bitmap::{BitmapPayload, read_tag_json, write_tag_json};
pub use capture::{CROSSDOMAIN_XML, CaptureConfig, capture};
pub use container::{CompressionMode, ContainerCodec};
pub use error::{FixtureError, FixtureResult};
pub use invoke::{FlashPlayerInvoker, RendererInvoker};
pub use model::{BootstrapProgram, Document, Header, Tag};
pub use pipeline::{BuildOptions, BuildStats, FixtureCase, FixturePipeline};
pub use pixel::{PixelBuffer, decode_argb};
pub use request::CaptureRequest;
