//! Tagged-chunk container decoder for SimCity 2000 save files.
//!
//! A save is an IFF-style stream: a `FORM` magic, a big-endian total
//! length, a `SCDH` map-type magic, then chunk records (4-byte tag,
//! big-endian payload length, payload) until end of stream. Most chunk
//! payloads are run-length compressed; a small fixed set is stored raw.

use std::collections::HashMap;
use std::fmt;
use std::io::{ErrorKind, Read};

use log::debug;

use crate::error::DecodeError;
use crate::terrain::TerrainMap;

/// Container magic at byte 0.
pub const CONTAINER_MAGIC: ChunkTag = ChunkTag(*b"FORM");

/// Map-type magic following the container length.
pub const MAP_MAGIC: ChunkTag = ChunkTag(*b"SCDH");

/// Per-tile altitude words, 2 bytes per tile, stored raw.
pub const TAG_ALTITUDE: ChunkTag = ChunkTag(*b"ALTM");

/// Per-tile terrain-type codes, compressed.
pub const TAG_TERRAIN: ChunkTag = ChunkTag(*b"XTER");

/// Building/structure data, compressed; consumed by the structure decoder.
pub const TAG_STRUCTURES: ChunkTag = ChunkTag(*b"XBLD");

/// Tags whose payloads are stored without compression. Every tag not
/// listed here is treated as RLE-compressed.
const RAW_TAGS: [ChunkTag; 2] = [TAG_ALTITUDE, ChunkTag(*b"CNAM")];

// Sanity caps for declared lengths; real saves are well under 200 KiB.
const MAX_CONTAINER_SIZE: usize = 16 << 20;
const MAX_SEGMENT_SIZE: usize = 4 << 20;

/// A 4-byte ASCII chunk tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChunkTag(pub [u8; 4]);

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// One decoded chunk. Immutable once built; identity is the tag.
pub struct Segment {
    tag: ChunkTag,
    raw: Vec<u8>,
    decompressed: Option<Vec<u8>>,
}

impl Segment {
    pub fn tag(&self) -> ChunkTag {
        self.tag
    }

    /// Payload bytes as stored in the file.
    pub fn raw_data(&self) -> &[u8] {
        &self.raw
    }

    /// Usable payload: the decompressed bytes for compressed tags, the
    /// stored bytes otherwise.
    pub fn data(&self) -> &[u8] {
        self.decompressed.as_deref().unwrap_or(&self.raw)
    }

    pub fn raw_size(&self) -> usize {
        self.raw.len()
    }

    pub fn is_compressed(&self) -> bool {
        self.decompressed.is_some()
    }
}

/// A fully decoded save: the segment table plus the eagerly built
/// terrain map. Construction fails unless every required chunk decoded
/// cleanly; there is no partial map.
pub struct CityMap {
    declared_size: u32,
    segments: HashMap<ChunkTag, Segment>,
    terrain: TerrainMap,
}

impl CityMap {
    /// Decode a save from a byte stream.
    pub fn load<R: Read>(mut reader: R) -> Result<CityMap, DecodeError> {
        check_magic(&mut reader, CONTAINER_MAGIC)?;

        let declared_size = read_u32(&mut reader)?;
        if declared_size as usize > MAX_CONTAINER_SIZE {
            return Err(DecodeError::InvalidSize {
                tag: CONTAINER_MAGIC,
                size: declared_size as usize,
            });
        }

        check_magic(&mut reader, MAP_MAGIC)?;

        let mut segments: HashMap<ChunkTag, Segment> = HashMap::new();
        while let Some(tag) = read_tag(&mut reader)? {
            let size = read_u32(&mut reader)? as usize;
            if size > MAX_SEGMENT_SIZE {
                return Err(DecodeError::InvalidSize { tag, size });
            }

            let mut raw = vec![0u8; size];
            reader.read_exact(&mut raw)?;

            let decompressed = if is_compressed(tag) {
                Some(decompress_rle(tag, &raw)?)
            } else {
                None
            };

            match &decompressed {
                Some(d) => debug!("segment '{}': {} bytes ({} compressed)", tag, d.len(), size),
                None => debug!("segment '{}': {} bytes raw", tag, size),
            }

            // duplicate tags: last write wins
            segments.insert(tag, Segment { tag, raw, decompressed });
        }

        let altm = require(&segments, TAG_ALTITUDE)?;
        let xter = require(&segments, TAG_TERRAIN)?;
        require(&segments, TAG_STRUCTURES)?;

        let terrain = TerrainMap::new(altm.data(), xter.data())?;

        Ok(CityMap {
            declared_size,
            segments,
            terrain,
        })
    }

    /// Container length as declared in the file header.
    pub fn declared_size(&self) -> u32 {
        self.declared_size
    }

    pub fn segment(&self, tag: ChunkTag) -> Option<&Segment> {
        self.segments.get(&tag)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    /// Decompressed structure chunk, for the external structure decoder.
    /// Presence is validated at load time.
    pub fn structure_data(&self) -> &[u8] {
        self.segments[&TAG_STRUCTURES].data()
    }
}

fn is_compressed(tag: ChunkTag) -> bool {
    !RAW_TAGS.contains(&tag)
}

fn require(
    segments: &HashMap<ChunkTag, Segment>,
    tag: ChunkTag,
) -> Result<&Segment, DecodeError> {
    segments.get(&tag).ok_or(DecodeError::MissingSegment(tag))
}

/// Decode an RLE-compressed chunk payload.
///
/// Control byte `c`: `1..=127` copies the next `c` bytes literally;
/// `129..=255` repeats the following byte `c - 127` times; `0` and `128`
/// are invalid. The whole payload slice must be consumed exactly.
pub fn decompress_rle(tag: ChunkTag, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;

    while pos < data.len() {
        let control = data[pos];
        let control_pos = pos;
        pos += 1;

        match control {
            0 | 128 => {
                return Err(DecodeError::CorruptSegment {
                    tag,
                    offset: control_pos,
                })
            }
            1..=127 => {
                let run = control as usize;
                let end = pos + run;
                if end > data.len() {
                    return Err(DecodeError::CorruptSegment {
                        tag,
                        offset: control_pos,
                    });
                }
                out.extend_from_slice(&data[pos..end]);
                pos = end;
            }
            _ => {
                let run = control as usize - 127;
                let val = *data.get(pos).ok_or(DecodeError::CorruptSegment {
                    tag,
                    offset: control_pos,
                })?;
                pos += 1;
                out.resize(out.len() + run, val);
            }
        }
    }

    Ok(out)
}

/// Read a 4-byte tag, or `None` on a clean end of stream. A partial tag
/// is a truncation error.
fn read_tag<R: Read>(reader: &mut R) -> Result<Option<ChunkTag>, DecodeError> {
    let mut buf = [0u8; 4];
    let mut filled = 0;

    while filled < 4 {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    match filled {
        0 => Ok(None),
        4 => Ok(Some(ChunkTag(buf))),
        _ => Err(DecodeError::Truncated),
    }
}

fn check_magic<R: Read>(reader: &mut R, expected: ChunkTag) -> Result<(), DecodeError> {
    let found = read_tag(reader)?.ok_or(DecodeError::Truncated)?;
    if found != expected {
        return Err(DecodeError::BadMagic { expected, found });
    }
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, DecodeError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a container stream from (tag, payload) pairs.
    fn build_container(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"SCDH");
        for (tag, payload) in chunks {
            body.extend_from_slice(*tag);
            body.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            body.extend_from_slice(payload);
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// RLE stream expanding to `len` copies of `val`.
    fn rle_fill(len: usize, val: u8) -> Vec<u8> {
        let mut out = Vec::new();
        let mut remaining = len;
        while remaining > 0 {
            let run = remaining.min(128);
            if run == 1 {
                out.extend_from_slice(&[1, val]);
            } else {
                out.extend_from_slice(&[(run + 127) as u8, val]);
            }
            remaining -= run;
        }
        out
    }

    fn valid_chunks() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let altm = vec![0u8; 128 * 128 * 2];
        let xter = rle_fill(128 * 128, 0x00);
        let xbld = rle_fill(128 * 128, 0x00);
        (altm, xter, xbld)
    }

    #[test]
    fn test_load_valid_container() {
        let (altm, xter, xbld) = valid_chunks();
        let data = build_container(&[
            (b"ALTM", &altm),
            (b"XTER", &xter),
            (b"XBLD", &xbld),
        ]);

        let map = CityMap::load(&data[..]).unwrap();
        assert_eq!(map.segments().count(), 3);
        assert_eq!(map.terrain().get_terrain_altitude(0, 0), 0);
        assert_eq!(map.structure_data().len(), 128 * 128);
        assert!(map.segment(TAG_ALTITUDE).unwrap().raw_size() > 0);
        assert!(!map.segment(TAG_ALTITUDE).unwrap().is_compressed());
        assert!(map.segment(TAG_TERRAIN).unwrap().is_compressed());
    }

    #[test]
    fn test_missing_terrain_chunk() {
        let (altm, _, xbld) = valid_chunks();
        let data = build_container(&[(b"ALTM", &altm), (b"XBLD", &xbld)]);

        match CityMap::load(&data[..]) {
            Err(DecodeError::MissingSegment(tag)) => assert_eq!(tag, TAG_TERRAIN),
            other => panic!("expected MissingSegment, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_bad_container_magic() {
        let mut data = build_container(&[]);
        data[0..4].copy_from_slice(b"JUNK");

        assert!(matches!(
            CityMap::load(&data[..]),
            Err(DecodeError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_bad_map_magic() {
        let mut data = build_container(&[]);
        data[8..12].copy_from_slice(b"MINE");

        assert!(matches!(
            CityMap::load(&data[..]),
            Err(DecodeError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = build_container(&[]);
        // declare a 16-byte chunk but end the stream after 4 payload bytes
        data.extend_from_slice(b"XLAB");
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3, 4]);

        assert!(matches!(
            CityMap::load(&data[..]),
            Err(DecodeError::Truncated)
        ));
    }

    #[test]
    fn test_oversized_declared_chunk() {
        let mut data = build_container(&[]);
        data.extend_from_slice(b"XLAB");
        data.extend_from_slice(&(u32::MAX).to_be_bytes());

        assert!(matches!(
            CityMap::load(&data[..]),
            Err(DecodeError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_rle_maximal_runs_roundtrip() {
        // maximal literal run: control 127 followed by 127 distinct bytes
        let literal: Vec<u8> = (0..127).collect();
        let mut encoded = vec![127u8];
        encoded.extend_from_slice(&literal);
        // maximal repeat run: control 255 repeats one byte 128 times
        encoded.extend_from_slice(&[255, 0xAB]);

        let decoded = decompress_rle(ChunkTag(*b"TEST"), &encoded).unwrap();
        let mut expected = literal;
        expected.extend(std::iter::repeat(0xAB).take(128));
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_rle_rejects_control_zero() {
        let err = decompress_rle(ChunkTag(*b"TEST"), &[0, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptSegment { offset: 0, .. }));
    }

    #[test]
    fn test_rle_rejects_control_128() {
        let err = decompress_rle(ChunkTag(*b"TEST"), &[2, 9, 9, 128, 5]).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptSegment { offset: 3, .. }));
    }

    #[test]
    fn test_rle_literal_overrun_is_corrupt() {
        // control byte promises 5 literal bytes but only 2 remain
        let err = decompress_rle(ChunkTag(*b"TEST"), &[5, 1, 2]).unwrap_err();
        assert!(matches!(err, DecodeError::CorruptSegment { offset: 0, .. }));
    }

    #[test]
    fn test_duplicate_tag_last_write_wins() {
        let (altm, xter, xbld) = valid_chunks();
        let data = build_container(&[
            (b"CNAM", b"OLD NAME"),
            (b"ALTM", &altm),
            (b"XTER", &xter),
            (b"XBLD", &xbld),
            (b"CNAM", b"NEW NAME"),
        ]);

        let map = CityMap::load(&data[..]).unwrap();
        assert_eq!(map.segment(ChunkTag(*b"CNAM")).unwrap().data(), b"NEW NAME");
    }

    #[test]
    fn test_empty_stream_is_truncated() {
        assert!(matches!(
            CityMap::load(&[][..]),
            Err(DecodeError::Truncated)
        ));
    }
}
