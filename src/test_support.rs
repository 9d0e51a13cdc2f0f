//! Synthetic photo and track fixtures shared by the unit tests.

use crate::jpeg::JpegLayout;
use exif::experimental::Writer;
use exif::{Exif, Field, In, Reader, Tag, Value};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// Smallest byte stream the JPEG layer and the Exif reader accept: SOI, a JFIF APP0, one
/// quantisation table stub, a start-of-scan with two bytes of scan data, EOI.
pub fn bare_jpeg() -> Vec<u8> {
    vec![
        0xFF, 0xD8, // SOI
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
        0x00, 0x01, 0x00, 0x00, // APP0
        0xFF, 0xDB, 0x00, 0x04, 0x00, 0x00, // DQT
        0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34, // SOS + scan
        0xFF, 0xD9, // EOI
    ]
}

/// A bare JPEG whose Exif block holds `fields`, with an IFD1 thumbnail when one is given.
pub fn jpeg_with_fields(fields: &[Field], thumbnail: Option<&[u8]>, little_endian: bool) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    if let Some(jpeg) = thumbnail {
        writer.set_jpeg(jpeg, In::THUMBNAIL);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, little_endian).unwrap();

    let base = bare_jpeg();
    JpegLayout::from_bytes(&base).unwrap().with_exif(tiff.get_ref()).unwrap()
}

pub fn ascii_field(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

/// A bare JPEG carrying an Exif block with `DateTimeOriginal` and a camera make.
pub fn jpeg_with_capture_time(datetime: &str) -> Vec<u8> {
    let fields = vec![
        ascii_field(Tag::Make, "TestCam"),
        ascii_field(Tag::DateTimeOriginal, datetime),
    ];
    jpeg_with_fields(&fields, None, false)
}

/// A JPEG whose Exif segment announces a five-entry IFD and then ends.
pub fn jpeg_with_truncated_exif() -> Vec<u8> {
    let tiff = b"II*\0\x08\0\0\0\x05\0";
    let base = bare_jpeg();
    JpegLayout::from_bytes(&base).unwrap().with_exif(tiff).unwrap()
}

/// Every Exif field of the photo at `path`.
pub fn read_exif(path: &Path) -> Exif {
    let file = File::open(path).unwrap();
    Reader::new().read_from_container(&mut BufReader::new(file)).unwrap()
}

/// A one-track GPX document with a point per `(time, lat, lon)`.
pub fn gpx_document(points: &[(&str, f64, f64)]) -> String {
    let mut body = String::new();
    for (time, lat, lon) in points {
        body.push_str(&format!(
            "      <trkpt lat=\"{}\" lon=\"{}\"><time>{}</time></trkpt>\n",
            lat, lon, time
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
{}    </trkseg>
  </trk>
</gpx>"#,
        body
    )
}
