//! GLB container framing.

use crate::error::{Error, Result};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A; // "JSON"
const CHUNK_BIN: u32 = 0x004E_4942; // "BIN\0"

/// Whether `bytes` starts with the GLB magic.
#[must_use]
pub fn is_glb(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
}

/// Frame a JSON document and binary buffer as a GLB file.
///
/// # Errors
/// Returns an error if the result would exceed the 4 GiB GLB limit.
pub fn write_glb(json: &[u8], bin: &[u8]) -> Result<Vec<u8>> {
    let json_padding = (4 - (json.len() % 4)) % 4;
    let json_chunk_len = json.len() + json_padding;

    let bin_padding = (4 - (bin.len() % 4)) % 4;
    let bin_chunk_len = bin.len() + bin_padding;

    let has_bin = !bin.is_empty();
    let total_len = 12 + 8 + json_chunk_len + if has_bin { 8 + bin_chunk_len } else { 0 };
    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|_| Error::ExportFailed {
            message: format!("GLB too large ({n} bytes)"),
        })
    };

    let mut output = Vec::with_capacity(total_len);

    // GLB header
    output.extend_from_slice(GLB_MAGIC);
    output.extend_from_slice(&2u32.to_le_bytes());
    output.extend_from_slice(&to_u32(total_len)?.to_le_bytes());

    // JSON chunk, padded with spaces
    output.extend_from_slice(&to_u32(json_chunk_len)?.to_le_bytes());
    output.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    output.extend_from_slice(json);
    output.resize(output.len() + json_padding, b' ');

    // Binary chunk, padded with zeros
    if has_bin {
        output.extend_from_slice(&to_u32(bin_chunk_len)?.to_le_bytes());
        output.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        output.extend_from_slice(bin);
        output.resize(output.len() + bin_padding, 0);
    }

    Ok(output)
}
