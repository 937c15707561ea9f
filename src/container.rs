use crate::{error::FixtureResult, model::Document};

/// Container compression mode. Capture movies are always emitted
/// uncompressed so the renderer can be pointed at the raw file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionMode {
    #[default]
    None,
    Zlib,
    Lzma,
}

/// Seam to the external SWF codec.
///
/// The binary tag layout is out of scope for this crate; callers supply an
/// implementation (tests use stubs). `encode` serializes an assembled
/// [`Document`], `decode` is used once per pipeline to extract the
/// bootstrap program from the template movie.
pub trait ContainerCodec {
    fn encode(&self, document: &Document, compression: CompressionMode) -> FixtureResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> FixtureResult<Document>;
}
