// src/metadata.rs

use crate::coords::{hemisphere_ref, Dms, LATITUDE_REFS, LONGITUDE_REFS};
use crate::error::AppError;
use crate::jpeg::JpegLayout;
use chrono::NaiveDateTime;
use exif::experimental::Writer;
use exif::{Exif, Field, In, Rational, Reader, Tag, Value};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Textual layout of Exif date-time fields.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// GPS tags this crate rewrites. Every other Exif field passes through untouched.
const REPLACED_TAGS: [Tag; 4] = [
    Tag::GPSLatitudeRef,
    Tag::GPSLatitude,
    Tag::GPSLongitudeRef,
    Tag::GPSLongitude,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// The parts of a photo's metadata the geotagger cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub path: PathBuf,
    pub capture_time: Option<NaiveDateTime>,
    pub gps: Option<GpsPosition>,
}

impl PhotoRecord {
    fn bare(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            capture_time: None,
            gps: None,
        }
    }
}

/// Read capture time and any existing GPS position. A photo without an Exif block is not an
/// error; it comes back with both fields empty.
pub fn read_photo(path: &Path) -> Result<PhotoRecord, AppError> {
    log::trace!("Extracting EXIF data for image: {:?}", path);
    let file = File::open(path)?;
    let mut buf_reader = BufReader::new(file);

    let exif = match Reader::new().read_from_container(&mut buf_reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data found for {:?}", path);
            return Ok(PhotoRecord::bare(path));
        }
        Err(e) => return Err(e.into()),
    };

    let record = PhotoRecord {
        path: path.to_path_buf(),
        capture_time: capture_time(&exif),
        gps: gps_position(&exif),
    };
    log::trace!("Metadata for {:?}: {:?}", path, record);
    Ok(record)
}

fn capture_time(exif: &Exif) -> Option<NaiveDateTime> {
    let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY)?;
    let text = match field.value {
        Value::Ascii(ref parts) => std::str::from_utf8(parts.first()?).ok()?,
        _ => return None,
    };
    match parse_capture_time(text) {
        Some(time) => Some(time),
        None => {
            log::debug!("Ignoring unparsable DateTimeOriginal {:?}", text);
            None
        }
    }
}

/// Parse the `YYYY:MM:DD HH:MM:SS` form, tolerating NUL padding.
pub fn parse_capture_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(text, EXIF_DATETIME_FORMAT).ok()
}

fn gps_position(exif: &Exif) -> Option<GpsPosition> {
    let latitude = signed_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, LATITUDE_REFS.1)?;
    let longitude =
        signed_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, LONGITUDE_REFS.1)?;
    Some(GpsPosition { latitude, longitude })
}

fn signed_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let dms = match exif.get_field(value_tag, In::PRIMARY)?.value {
        Value::Rational(ref parts) => dms_from_rationals(parts)?,
        _ => return None,
    };
    let reference = match exif.get_field(ref_tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(parts)) => parts
            .first()
            .and_then(|p| p.first())
            .map(|b| *b as char)
            .unwrap_or(' '),
        _ => ' ',
    };
    Some(dms.to_signed_decimal(reference, negative))
}

/// Degrees and minutes as whole rationals, seconds as hundredths.
pub fn dms_to_rationals(dms: &Dms) -> Vec<Rational> {
    vec![
        Rational { num: dms.degrees, denom: 1 },
        Rational { num: dms.minutes, denom: 1 },
        Rational { num: (dms.seconds * 100.0) as u32, denom: 100 },
    ]
}

fn dms_from_rationals(parts: &[Rational]) -> Option<Dms> {
    if parts.len() != 3 || parts.iter().any(|r| r.denom == 0) {
        return None;
    }
    // Cameras sometimes store fractional minutes; fold them into seconds.
    let minutes = parts[1].to_f64();
    Some(Dms {
        degrees: parts[0].to_f64() as u32,
        minutes: minutes.trunc() as u32,
        seconds: minutes.fract() * 60.0 + parts[2].to_f64(),
    })
}

fn ascii(text: char) -> Value {
    Value::Ascii(vec![vec![text as u8]])
}

fn gps_fields(position: GpsPosition) -> Vec<Field> {
    let (north, south) = LATITUDE_REFS;
    let (east, west) = LONGITUDE_REFS;
    vec![
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii(hemisphere_ref(position.latitude, north, south)),
        },
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(dms_to_rationals(&Dms::from_decimal(position.latitude))),
        },
        Field {
            tag: Tag::GPSLongitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii(hemisphere_ref(position.longitude, east, west)),
        },
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: Value::Rational(dms_to_rationals(&Dms::from_decimal(position.longitude))),
        },
    ]
}

fn version_field() -> Field {
    Field {
        tag: Tag::GPSVersionID,
        ifd_num: In::PRIMARY,
        value: Value::Byte(vec![2, 3, 0, 0]),
    }
}

/// Thumbnail bytes referenced from IFD1, so the rewritten block can carry them along.
fn thumbnail(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(length)?)
}

/// Rewrite the photo's GPS latitude and longitude in place. All other segments of the file are
/// copied byte for byte; the other Exif fields are re-encoded with their original values.
pub fn write_gps(path: &Path, position: GpsPosition) -> Result<(), AppError> {
    let is_jpeg = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    if !is_jpeg {
        return Err(AppError::UnsupportedContainer(format!(
            "cannot embed Exif GPS data in {:?}",
            path
        )));
    }

    let data = std::fs::read(path)?;
    let layout = JpegLayout::from_bytes(&data)?;
    let existing = match layout.exif_payload() {
        Some(tiff) => Some(Reader::new().read_raw(tiff.to_vec())?),
        None => None,
    };

    let new_fields = gps_fields(position);
    let version = version_field();
    let mut writer = Writer::new();
    let mut little_endian = false;
    let mut has_version = false;

    if let Some(exif) = &existing {
        little_endian = exif.little_endian();
        let mut kept = 0usize;
        for field in exif.fields() {
            if REPLACED_TAGS.contains(&field.tag) && field.ifd_num == In::PRIMARY {
                continue;
            }
            if let Value::Unknown(..) = field.value {
                log::debug!("Dropping field {} of unknown type from {:?}", field.tag, path);
                continue;
            }
            has_version |= field.tag == Tag::GPSVersionID;
            writer.push_field(field);
            kept += 1;
        }
        if let Some(jpeg) = thumbnail(exif) {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }
        log::trace!("Carrying over {} existing Exif fields for {:?}", kept, path);
    }
    if !has_version {
        writer.push_field(&version);
    }
    for field in &new_fields {
        writer.push_field(field);
    }

    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, little_endian)?;
    let out = layout.with_exif(tiff.get_ref())?;

    std::fs::write(path, out)?;
    log::debug!("Wrote GPS position {:?} to {:?}", position, path);
    Ok(())
}
