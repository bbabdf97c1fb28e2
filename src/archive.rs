//! Deterministic in-memory ZIP assembly.
//!
//! Writes the classic ZIP layout directly: one Local File Header + deflated
//! body per member, followed by the Central Directory and the End of Central
//! Directory record, all little-endian.
//!
//! ## Determinism
//!
//! The same ordered input list must produce byte-identical archives so the
//! result can be cached by content. Member order follows input order, names
//! derive only from ordinal position and image metadata, and every member
//! carries the same fixed DOS timestamp instead of the build time.
//!
//! ## Limits
//!
//! No ZIP64: a single-response in-memory archive never legitimately crosses
//! 65 535 members or the 4 GiB offset horizon, so crossing them is reported
//! as an internal invariant violation rather than silently truncated.

use crate::error::HarvestError;
use crate::output::AnalyzedImage;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::io::{self, Write};

/// Local File Header signature ("PK\x03\x04").
const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
/// Central Directory File Header signature ("PK\x01\x02").
const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
/// End of Central Directory signature ("PK\x05\x06").
const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";

const VERSION_MADE_BY: u16 = 20;
const VERSION_NEEDED: u16 = 20;
const METHOD_DEFLATE: u16 = 8;

/// Fixed modification stamp: 1980-01-01 00:00:00 in DOS packing
/// (day 1, month 1, year offset 0).
const FIXED_DOS_TIME: u16 = 0;
const FIXED_DOS_DATE: u16 = 0x0021;

/// One member to be written: name plus uncompressed content.
struct ArchiveEntry {
    name: String,
    bytes: Vec<u8>,
}

/// Central-directory bookkeeping for a written member.
struct MemberRecord {
    name: String,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    lfh_offset: u32,
}

/// Package the given images into a single ZIP byte stream.
///
/// Member naming per item *i* (1-based), base `{i}_{width}x{height}`:
/// a `{base}_description.txt` sibling whenever the description status
/// carries text, then the image itself as `{base}.jpg` / `{base}.png` /
/// `{base}.bin` by mime type.
pub fn build_archive(images: &[AnalyzedImage]) -> Result<Vec<u8>, HarvestError> {
    let entries = member_entries(images);
    encode_zip(&entries).map_err(|e| HarvestError::ArchiveBuild {
        detail: e.to_string(),
    })
}

fn member_entries(images: &[AnalyzedImage]) -> Vec<ArchiveEntry> {
    let mut entries = Vec::new();
    for (i, item) in images.iter().enumerate() {
        let base = format!("{}_{}x{}", i + 1, item.image.width, item.image.height);

        if let Some(text) = item.description.text() {
            let body = format!(
                "Source URL: {}\nDimensions: {}x{} pixels\nDescription:\n{}\n",
                item.image.source_url, item.image.width, item.image.height, text
            );
            entries.push(ArchiveEntry {
                name: format!("{base}_description.txt"),
                bytes: body.into_bytes(),
            });
        }

        let ext = match item.image.mime_type.as_str() {
            "image/jpeg" => ".jpg",
            "image/png" => ".png",
            _ => ".bin",
        };
        entries.push(ArchiveEntry {
            name: format!("{base}{ext}"),
            bytes: item.image.raw_bytes.clone(),
        });
    }
    entries
}

fn encode_zip(entries: &[ArchiveEntry]) -> io::Result<Vec<u8>> {
    if entries.len() > u16::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("too many archive members: {}", entries.len()),
        ));
    }

    let mut out: Vec<u8> = Vec::new();
    let mut records: Vec<MemberRecord> = Vec::with_capacity(entries.len());

    // ── Local file headers + deflated bodies ─────────────────────────────
    for entry in entries {
        let lfh_offset = as_u32(out.len())?;

        let mut crc = Crc::new();
        crc.update(&entry.bytes);
        let crc32 = crc.sum();

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&entry.bytes)?;
        let compressed = encoder.finish()?;

        let compressed_size = as_u32(compressed.len())?;
        let uncompressed_size = as_u32(entry.bytes.len())?;
        let name = entry.name.as_bytes();

        out.write_all(LFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(0)?; // general purpose flags
        out.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        out.write_u16::<LittleEndian>(FIXED_DOS_TIME)?;
        out.write_u16::<LittleEndian>(FIXED_DOS_DATE)?;
        out.write_u32::<LittleEndian>(crc32)?;
        out.write_u32::<LittleEndian>(compressed_size)?;
        out.write_u32::<LittleEndian>(uncompressed_size)?;
        out.write_u16::<LittleEndian>(name.len() as u16)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_all(name)?;
        out.write_all(&compressed)?;

        records.push(MemberRecord {
            name: entry.name.clone(),
            crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
        });
    }

    // ── Central directory ────────────────────────────────────────────────
    let cd_offset = as_u32(out.len())?;
    for rec in &records {
        let name = rec.name.as_bytes();
        out.write_all(CDFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(0)?; // general purpose flags
        out.write_u16::<LittleEndian>(METHOD_DEFLATE)?;
        out.write_u16::<LittleEndian>(FIXED_DOS_TIME)?;
        out.write_u16::<LittleEndian>(FIXED_DOS_DATE)?;
        out.write_u32::<LittleEndian>(rec.crc32)?;
        out.write_u32::<LittleEndian>(rec.compressed_size)?;
        out.write_u32::<LittleEndian>(rec.uncompressed_size)?;
        out.write_u16::<LittleEndian>(name.len() as u16)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_u16::<LittleEndian>(0)?; // file comment length
        out.write_u16::<LittleEndian>(0)?; // disk number start
        out.write_u16::<LittleEndian>(0)?; // internal attributes
        out.write_u32::<LittleEndian>(0)?; // external attributes
        out.write_u32::<LittleEndian>(rec.lfh_offset)?;
        out.write_all(name)?;
    }
    let cd_size = as_u32(out.len())? - cd_offset;

    // ── End of central directory ─────────────────────────────────────────
    let total_entries = records.len() as u16;
    out.write_all(EOCD_SIGNATURE)?;
    out.write_u16::<LittleEndian>(0)?; // disk number
    out.write_u16::<LittleEndian>(0)?; // disk with central directory
    out.write_u16::<LittleEndian>(total_entries)?;
    out.write_u16::<LittleEndian>(total_entries)?;
    out.write_u32::<LittleEndian>(cd_size)?;
    out.write_u32::<LittleEndian>(cd_offset)?;
    out.write_u16::<LittleEndian>(0)?; // comment length

    Ok(out)
}

fn as_u32(len: usize) -> io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "archive exceeds the 4 GiB ZIP offset limit",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DescriptionStatus, FetchedImage};

    fn sample(
        ordinal_bytes: &[u8],
        width: u32,
        height: u32,
        mime: &str,
        description: DescriptionStatus,
    ) -> AnalyzedImage {
        AnalyzedImage {
            image: FetchedImage {
                source_url: format!("https://x.test/{width}x{height}"),
                raw_bytes: ordinal_bytes.to_vec(),
                width,
                height,
                encoded_payload: String::new(),
                mime_type: mime.to_string(),
            },
            description,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn eocd_total_entries(archive: &[u8]) -> u16 {
        let eocd = &archive[archive.len() - 22..];
        assert_eq!(&eocd[0..4], EOCD_SIGNATURE);
        u16::from_le_bytes([eocd[10], eocd[11]])
    }

    #[test]
    fn same_input_produces_identical_bytes() {
        let images = vec![
            sample(b"png-bytes", 400, 400, "image/png", DescriptionStatus::Pending),
            sample(
                b"jpg-bytes",
                800,
                600,
                "image/jpeg",
                DescriptionStatus::Done("a harbour at dusk".into()),
            ),
        ];
        let a = build_archive(&images).unwrap();
        let b = build_archive(&images).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn member_names_follow_ordinal_and_dimensions() {
        let images = vec![
            sample(b"one", 400, 400, "image/jpeg", DescriptionStatus::Pending),
            sample(b"two", 800, 600, "image/png", DescriptionStatus::Pending),
        ];
        let archive = build_archive(&images).unwrap();
        assert!(contains(&archive, b"1_400x400.jpg"));
        assert!(contains(&archive, b"2_800x600.png"));
        assert_eq!(eocd_total_entries(&archive), 2);
    }

    #[test]
    fn description_member_written_for_terminal_statuses_only() {
        let images = vec![
            sample(b"a", 100, 100, "image/png", DescriptionStatus::Pending),
            sample(
                b"b",
                200,
                200,
                "image/png",
                DescriptionStatus::Done("two cats".into()),
            ),
            sample(
                b"c",
                300,
                300,
                "image/png",
                DescriptionStatus::Failed("HTTP 400".into()),
            ),
        ];
        let archive = build_archive(&images).unwrap();
        assert!(!contains(&archive, b"1_100x100_description.txt"));
        assert!(contains(&archive, b"2_200x200_description.txt"));
        assert!(contains(&archive, b"3_300x300_description.txt"));
        // 3 images + 2 description members
        assert_eq!(eocd_total_entries(&archive), 5);
    }

    #[test]
    fn description_body_carries_url_dimensions_and_text() {
        let images = vec![sample(
            b"a",
            640,
            480,
            "image/jpeg",
            DescriptionStatus::Done("a lighthouse".into()),
        )];
        let archive = build_archive(&images).unwrap();
        // Deflate with default settings stores short unique strings
        // verbatim often enough that we check the decompressed body via a
        // fresh compression of the expected text instead: re-derive the
        // member and compare its CRC against the archive's.
        let expected = "Source URL: https://x.test/640x480\nDimensions: 640x480 pixels\nDescription:\na lighthouse\n";
        let mut crc = Crc::new();
        crc.update(expected.as_bytes());
        assert!(contains(&archive, &crc.sum().to_le_bytes()));
    }

    #[test]
    fn unknown_mime_falls_back_to_bin() {
        let images = vec![sample(
            b"x",
            10,
            10,
            "application/octet-stream",
            DescriptionStatus::Pending,
        )];
        let archive = build_archive(&images).unwrap();
        assert!(contains(&archive, b"1_10x10.bin"));
    }

    #[test]
    fn empty_input_yields_valid_empty_archive() {
        let archive = build_archive(&[]).unwrap();
        assert_eq!(archive.len(), 22);
        assert_eq!(eocd_total_entries(&archive), 0);
    }
}
