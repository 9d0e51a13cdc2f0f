//! Just enough of the JPEG container to swap its Exif segment.
//!
//! The header segments up to start-of-scan are split into `(marker, data)` pairs. Everything from
//! the start-of-scan marker onward is kept as one opaque block, so re-serialising a layout only
//! touches the segment that was replaced.

use crate::error::AppError;
use nom::{
    bytes::complete::{tag, take, take_while1},
    combinator::{map, verify},
    error::{context, VerboseError, VerboseErrorKind},
    number::complete::{be_u16, be_u8},
    sequence::preceded,
};

pub type Input<'a> = &'a [u8];
pub type ParseResult<'a, O> = nom::IResult<Input<'a>, O, VerboseError<Input<'a>>>;

const SOI: u16 = 0xFFD8;
const EOI: u16 = 0xFFD9;
const SOS: u16 = 0xFFDA;
const TEM: u16 = 0xFF01;
const APP0: u16 = 0xFFE0;
const APP1: u16 = 0xFFE1;

/// Identifier that opens an Exif APP1 payload, ahead of the TIFF header.
pub const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Largest data section a length-prefixed segment can carry.
const MAX_SEGMENT_DATA: usize = 0xFFFF - 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    pub marker: u16,
    pub data: &'a [u8],
}

impl<'a> Segment<'a> {
    /// Restart markers and TEM stand alone without a length field.
    fn is_standalone(marker: u16) -> bool {
        marker == TEM || (0xFFD0..=0xFFD7).contains(&marker)
    }

    pub fn is_exif(&self) -> bool {
        self.marker == APP1 && self.data.starts_with(EXIF_HEADER)
    }

    fn parse(i: Input<'a>) -> ParseResult<'a, Self> {
        let (i, marker) = parse_marker(i)?;
        if Self::is_standalone(marker) {
            return Ok((i, Segment { marker, data: &i[0..0] }));
        }

        // The stored size counts its own two bytes.
        let (i, size) = parse_size(i)?;
        let (i, data) = parse_data(i, size as usize - 2)?;
        Ok((i, Segment { marker, data }))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        write_segment(out, self.marker, self.data);
    }
}

/// Any run of 0xFF fill bytes may precede the marker code.
fn parse_marker(i: Input) -> ParseResult<u16> {
    context(
        "Segment marker",
        map(
            preceded(take_while1(|b: u8| b == 0xFF), verify(be_u8, |c: &u8| *c != 0x00)),
            |code| 0xFF00 | code as u16,
        ),
    )(i)
}

fn parse_size(i: Input) -> ParseResult<u16> {
    context("Segment size", verify(be_u16, |s: &u16| *s >= 2))(i)
}

fn parse_data(i: Input, size: usize) -> ParseResult<Input> {
    context("Segment data", take(size))(i)
}

fn parse_soi(i: Input) -> ParseResult<Input> {
    context("Start of image", tag(&SOI.to_be_bytes()[..]))(i)
}

fn write_segment(out: &mut Vec<u8>, marker: u16, data: &[u8]) {
    out.extend_from_slice(&marker.to_be_bytes());
    if !Segment::is_standalone(marker) {
        out.extend_from_slice(&((data.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(data);
    }
}

/// A JPEG file split into header segments and the opaque scan data that follows them.
#[derive(Debug)]
pub struct JpegLayout<'a> {
    pub segments: Vec<Segment<'a>>,
    /// Everything from the start-of-scan (or end-of-image) marker to the end of the file.
    pub scan: &'a [u8],
}

impl<'a> JpegLayout<'a> {
    pub fn parse(i: Input<'a>) -> ParseResult<'a, Self> {
        let (mut i, _) = parse_soi(i)?;
        let mut segments = Vec::new();

        loop {
            let (_, marker) = parse_marker(i)?;
            if marker == SOS || marker == EOI {
                break;
            }
            let (rest, segment) = context("Header segment", Segment::parse)(i)?;
            segments.push(segment);
            i = rest;
        }

        let scan = i;
        Ok((&i[i.len()..], JpegLayout { segments, scan }))
    }

    /// Parse a whole file, turning nom's error into a readable message.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, AppError> {
        match Self::parse(data) {
            Ok((_, layout)) => Ok(layout),
            Err(e) => Err(AppError::MalformedJpeg(describe_error(e))),
        }
    }

    /// The TIFF structure inside the Exif segment, if there is one.
    pub fn exif_payload(&self) -> Option<&'a [u8]> {
        self.segments
            .iter()
            .find(|s| s.is_exif())
            .map(|s| &s.data[EXIF_HEADER.len()..])
    }

    /// Serialise the file with `tiff` as its Exif payload. An existing Exif segment is replaced
    /// in place; otherwise the new one goes right after any leading APP0 segments so JFIF files
    /// keep their APP0 first.
    pub fn with_exif(&self, tiff: &[u8]) -> Result<Vec<u8>, AppError> {
        let payload_len = EXIF_HEADER.len() + tiff.len();
        if payload_len > MAX_SEGMENT_DATA {
            return Err(AppError::ExifTooLarge(payload_len));
        }
        let mut payload = Vec::with_capacity(payload_len);
        payload.extend_from_slice(EXIF_HEADER);
        payload.extend_from_slice(tiff);

        let mut out = Vec::with_capacity(2 + self.header_len() + payload_len + 4 + self.scan.len());
        out.extend_from_slice(&SOI.to_be_bytes());

        let replacing = self.has_exif();
        let mut written = false;
        for segment in &self.segments {
            if segment.is_exif() {
                if !written {
                    write_segment(&mut out, APP1, &payload);
                    written = true;
                }
                continue;
            }
            if !written && !replacing && segment.marker != APP0 {
                write_segment(&mut out, APP1, &payload);
                written = true;
            }
            segment.write_to(&mut out);
        }
        if !written {
            write_segment(&mut out, APP1, &payload);
        }

        out.extend_from_slice(self.scan);
        Ok(out)
    }

    fn has_exif(&self) -> bool {
        self.segments.iter().any(|s| s.is_exif())
    }

    fn header_len(&self) -> usize {
        self.segments.iter().map(|s| s.data.len() + 4).sum()
    }
}

/// Render the context stack of a nom error, outermost first.
fn describe_error(e: nom::Err<VerboseError<Input>>) -> String {
    match e {
        nom::Err::Incomplete(_) => "unexpected end of data".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let contexts: Vec<&str> = e
                .errors
                .iter()
                .rev()
                .filter_map(|(_, kind)| match kind {
                    VerboseErrorKind::Context(c) => Some(*c),
                    _ => None,
                })
                .collect();
            if contexts.is_empty() {
                "unrecognised structure".to_string()
            } else {
                format!("failed at {}", contexts.join(" > "))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{JpegLayout, EXIF_HEADER};
    use crate::error::AppError;
    use crate::test_support::bare_jpeg;

    #[test]
    fn test_parse_header_segments() {
        let data = bare_jpeg();
        let layout = JpegLayout::from_bytes(&data).unwrap();
        let markers: Vec<u16> = layout.segments.iter().map(|s| s.marker).collect();
        assert_eq!(markers, vec![0xFFE0, 0xFFDB]);
        assert_eq!(&layout.scan[..2], &[0xFF, 0xDA]);
        assert!(layout.exif_payload().is_none());
    }

    #[test]
    fn test_insert_exif_after_app0() {
        let data = bare_jpeg();
        let layout = JpegLayout::from_bytes(&data).unwrap();
        let out = layout.with_exif(b"II*\0fake").unwrap();

        let reparsed = JpegLayout::from_bytes(&out).unwrap();
        let markers: Vec<u16> = reparsed.segments.iter().map(|s| s.marker).collect();
        assert_eq!(markers, vec![0xFFE0, 0xFFE1, 0xFFDB]);
        assert_eq!(reparsed.exif_payload(), Some(&b"II*\0fake"[..]));
        assert_eq!(reparsed.scan, layout.scan);
        assert_eq!(out.len(), data.len() + 4 + EXIF_HEADER.len() + 8);
    }

    #[test]
    fn test_replace_existing_exif() {
        let data = bare_jpeg();
        let first = JpegLayout::from_bytes(&data).unwrap().with_exif(b"old payload").unwrap();
        let second = JpegLayout::from_bytes(&first).unwrap().with_exif(b"new").unwrap();

        let layout = JpegLayout::from_bytes(&second).unwrap();
        assert_eq!(layout.segments.iter().filter(|s| s.is_exif()).count(), 1);
        assert_eq!(layout.exif_payload(), Some(&b"new"[..]));
        assert_eq!(layout.segments[1].marker, 0xFFE1);
    }

    #[test]
    fn test_reject_non_jpeg() {
        match JpegLayout::from_bytes(b"\x89PNG\r\n\x1a\n") {
            Err(AppError::MalformedJpeg(msg)) => assert!(msg.contains("Start of image"), "{}", msg),
            other => panic!("expected MalformedJpeg, got {:?}", other.map(|l| l.segments.len())),
        }
    }

    #[test]
    fn test_reject_truncated_segment() {
        let mut data = bare_jpeg();
        data.truncate(8);
        assert!(JpegLayout::from_bytes(&data).is_err());
    }

    #[test]
    fn test_oversized_exif_is_refused() {
        let data = bare_jpeg();
        let layout = JpegLayout::from_bytes(&data).unwrap();
        match layout.with_exif(&vec![0u8; 0xFFFF]) {
            Err(AppError::ExifTooLarge(_)) => {}
            other => panic!("expected ExifTooLarge, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_fill_bytes_before_marker() {
        let bare = bare_jpeg();
        // Two extra 0xFF in front of the DQT marker.
        let data = [&bare[..20], &[0xFF, 0xFF][..], &bare[20..]].concat();

        let layout = JpegLayout::from_bytes(&data).unwrap();
        let markers: Vec<u16> = layout.segments.iter().map(|s| s.marker).collect();
        assert_eq!(markers, vec![0xFFE0, 0xFFDB]);

        let out = layout.with_exif(b"II*\0fake").unwrap();
        let reparsed = JpegLayout::from_bytes(&out).unwrap();
        assert_eq!(reparsed.exif_payload(), Some(&b"II*\0fake"[..]));
        assert_eq!(reparsed.scan, layout.scan);
    }
}
