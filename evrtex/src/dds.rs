//! DDS container header parsing and descriptor size patching.
//!
//! Desktop texture payloads are plain DDS files: a 4-byte `"DDS "`
//! signature followed by a 124-byte header, plus an optional 20-byte
//! DX10 extension when the fourCC asks for one. Offsets below are
//! relative to the start of the 124-byte header.

use std::fs;
use std::path::Path;

use crate::error::{Result, TexError};

pub const DDS_MAGIC: &[u8; 4] = b"DDS ";

/// Minimum file length for a parseable header (magic + 124-byte header).
pub const DDS_HEADER_LEN: usize = 128;

/// Byte offset of the payload-size field inside a descriptor blob.
pub const DESCRIPTOR_SIZE_OFFSET: usize = 244;

/// Minimum descriptor length required to carry the size field.
pub const DESCRIPTOR_MIN_LEN: usize = DESCRIPTOR_SIZE_OFFSET + 4;

/// DXGI format codes seen in DX10 extension headers.
const DXGI_FORMAT_NAMES: &[(u32, &str)] = &[
    (0, "DXGI_FORMAT_UNKNOWN"),
    (26, "DXGI_FORMAT_R11G11B10_FLOAT"),
    (61, "DXGI_FORMAT_R8_UNORM"),
    (71, "DXGI_FORMAT_BC1_UNORM"),
    (77, "DXGI_FORMAT_BC3_UNORM"),
    (80, "DXGI_FORMAT_BC4_UNORM"),
    (83, "DXGI_FORMAT_BC5_UNORM"),
    (87, "DXGI_FORMAT_B8G8R8A8_TYPELESS"),
    (91, "DXGI_FORMAT_B8G8R8A8_UNORM_SRGB"),
];

/// Codes that cannot be loaded directly by common image decoders and
/// must round-trip through the external converter instead.
const UNSUPPORTED_DIRECT_LOAD: &[u32] = &[26, 72, 78, 87];

/// Parsed DDS header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsInfo {
    pub width: u32,
    pub height: u32,
    pub mipmap_count: u32,
    pub format_name: String,
    /// DXGI code from the DX10 extension, when present.
    pub format_code: Option<u32>,
    /// True when the format must route through external conversion.
    pub needs_external_decode: bool,
}

impl DdsInfo {
    /// Parse a DDS header from a raw byte buffer.
    ///
    /// Returns `None` if the buffer is under 128 bytes or does not
    /// start with the `"DDS "` signature.
    pub fn parse(bytes: &[u8]) -> Option<DdsInfo> {
        if bytes.len() < DDS_HEADER_LEN || &bytes[0..4] != DDS_MAGIC {
            return None;
        }

        let header = &bytes[4..DDS_HEADER_LEN];
        let height = u32_at(header, 8);
        let width = u32_at(header, 12);
        let mipmap_count = u32_at(header, 24);
        let pixel_format_flags = u32_at(header, 76);
        let four_cc = &header[80..84];

        let mut format_code = None;
        let mut needs_external_decode = false;

        let format_name = match four_cc {
            b"DXT1" => "BC1/DXT1".to_string(),
            b"DXT3" => "BC2/DXT3".to_string(),
            b"DXT5" => "BC3/DXT5".to_string(),
            b"DX10" => {
                // 20-byte extension follows the header; first 4 bytes
                // carry the DXGI format code.
                if bytes.len() < DDS_HEADER_LEN + 20 {
                    return None;
                }
                let code = u32_at(&bytes[DDS_HEADER_LEN..], 0);
                format_code = Some(code);
                needs_external_decode = UNSUPPORTED_DIRECT_LOAD.contains(&code);
                dxgi_format_name(code)
            }
            _ if pixel_format_flags & 0x40 != 0 => "RGB".to_string(),
            _ => "Unknown".to_string(),
        };

        Some(DdsInfo {
            width,
            height,
            mipmap_count,
            format_name,
            format_code,
            needs_external_decode,
        })
    }

    /// Parse the header of a DDS file on disk.
    pub fn parse_file(path: &Path) -> Result<Option<DdsInfo>> {
        let bytes = fs::read(path).map_err(|e| TexError::io(path, e))?;
        Ok(DdsInfo::parse(&bytes))
    }
}

fn dxgi_format_name(code: u32) -> String {
    DXGI_FORMAT_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("DXGI Format {code}"))
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Patch the 4-byte little-endian payload-size field at offset 244 of
/// a descriptor blob on disk.
///
/// The whole file is read, patched in memory, and written back, so a
/// failure never leaves a partially written descriptor behind.
pub fn patch_descriptor_size(path: &Path, new_size: u32) -> Result<()> {
    let mut data = fs::read(path).map_err(|e| TexError::io(path, e))?;
    if data.len() < DESCRIPTOR_MIN_LEN {
        return Err(TexError::DescriptorPatch(format!(
            "{} is {} bytes, need at least {}",
            path.display(),
            data.len(),
            DESCRIPTOR_MIN_LEN
        )));
    }

    data[DESCRIPTOR_SIZE_OFFSET..DESCRIPTOR_SIZE_OFFSET + 4]
        .copy_from_slice(&new_size.to_le_bytes());
    fs::write(path, &data).map_err(|e| TexError::io(path, e))?;

    tracing::debug!(
        "Patched descriptor {} size field to {} bytes",
        path.display(),
        new_size
    );
    Ok(())
}

/// Decode a DDS file to PNG.
///
/// Formats flagged unsupported-for-direct-load skip straight to the
/// external converter; everything else is tried natively first, with
/// the converter as a fallback for whatever the native decoder cannot
/// handle.
pub fn decode_to_png(src: &Path, out_png: &Path, codec: &dyn crate::codec::Codec) -> Result<()> {
    let info = DdsInfo::parse_file(src)?.ok_or_else(|| {
        TexError::FormatParse(format!("{} is not a parseable DDS container", src.display()))
    })?;

    if !info.needs_external_decode {
        if let Ok(img) = image::open(src) {
            return img.save(out_png).map_err(|e| {
                TexError::FormatParse(format!("cannot write {}: {e}", out_png.display()))
            });
        }
        tracing::debug!(
            "Native decode of {} failed, falling back to external converter",
            src.display()
        );
    }

    codec.decode_dds(src, out_png)?;
    if !out_png.is_file() {
        return Err(TexError::ToolInvocation(
            "DDS decode produced no output file".to_string(),
        ));
    }
    Ok(())
}
