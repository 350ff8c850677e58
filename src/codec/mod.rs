//! # Block Codecs
//!
//! Capability set for compressing storage blocks, plus a registry mapping
//! a codec tag to one implementation. The MVCC layer never compresses
//! anything itself; it only routes a tag carried in file metadata to the
//! matching capability set, so the surface is three plain function
//! pointers and no dynamic dispatch.
//!
//! The crate ships the identity codec. Real codecs live with the storage
//! engine build that links them, registered here by tag.

use std::str::FromStr;

use eyre::{bail, ensure, Result};

/// Capability set of one block codec.
pub struct Codec {
    /// Tag name, as stored in file metadata.
    pub name: &'static str,
    /// Compress `input` into a fresh buffer.
    pub compress: fn(input: &[u8]) -> Vec<u8>,
    /// Decompress `input`, validating the caller-supplied uncompressed
    /// length recorded alongside the block.
    pub decompress: fn(input: &[u8], expected_len: usize) -> Result<Vec<u8>>,
    /// Upper bound on the compressed size of `n` input bytes.
    pub max_compressed_length: fn(n: usize) -> usize,
}

/// Codec tags understood by this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Identity codec: blocks are stored as-is.
    Plain,
}

impl CodecKind {
    pub fn name(self) -> &'static str {
        codec_for(self).name
    }
}

impl FromStr for CodecKind {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" | "none" => Ok(CodecKind::Plain),
            other => bail!("unknown block codec {other:?}"),
        }
    }
}

/// Look up the capability set registered for `kind`.
pub fn codec_for(kind: CodecKind) -> &'static Codec {
    match kind {
        CodecKind::Plain => &PLAIN,
    }
}

static PLAIN: Codec = Codec {
    name: "plain",
    compress: plain_compress,
    decompress: plain_decompress,
    max_compressed_length: plain_max_compressed_length,
};

fn plain_compress(input: &[u8]) -> Vec<u8> {
    input.to_vec()
}

fn plain_decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    ensure!(
        input.len() == expected_len,
        "corrupt plain block: {} bytes stored, {expected_len} expected",
        input.len()
    );
    Ok(input.to_vec())
}

fn plain_max_compressed_length(n: usize) -> usize {
    n
}
