use crate::error::AppError;
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One timestamped position from a recorded track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSample {
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
}

/// Every timestamped point of a track, in file order.
#[derive(Debug, Clone, Default)]
pub struct TrackCollection {
    samples: Vec<TrackSample>,
}

impl TrackCollection {
    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest and latest timestamp, independent of file order.
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.samples.first()?.timestamp;
        Some(self.samples.iter().fold((first, first), |(lo, hi), s| {
            (lo.min(s.timestamp), hi.max(s.timestamp))
        }))
    }
}

impl From<Vec<TrackSample>> for TrackCollection {
    fn from(samples: Vec<TrackSample>) -> Self {
        Self { samples }
    }
}

pub fn load_track(path: &Path) -> Result<TrackCollection, AppError> {
    log::info!("Loading track from {:?}", path);
    let file = File::open(path)?;
    let track = parse_track(BufReader::new(file))?;

    match track.time_span() {
        Some((start, end)) => log::info!(
            "Loaded {} track samples spanning {} to {}",
            track.len(),
            start,
            end
        ),
        None => log::warn!("Track {:?} holds no timestamped points", path),
    }
    Ok(track)
}

/// Flatten every track and segment of a GPX document into samples. Points without a time cannot
/// be matched against a photo and are dropped.
///
/// The GPX reader converts every `<time>` to UTC, so a point written with an explicit offset
/// lands on its UTC reading. `Z` times keep their digits unchanged.
pub fn parse_track<R: Read>(reader: R) -> Result<TrackCollection, AppError> {
    let gpx = gpx::read(reader).map_err(|e| AppError::Gpx(e.to_string()))?;

    let mut samples = Vec::new();
    let mut untimed = 0usize;
    for track in gpx.tracks {
        log::trace!("Reading track {:?} with {} segments", track.name, track.segments.len());
        for segment in track.segments {
            for point in segment.points {
                let time = match point.time {
                    Some(time) => time,
                    None => {
                        untimed += 1;
                        continue;
                    }
                };
                let iso = time
                    .format()
                    .map_err(|e| AppError::TrackTimestamp(e.to_string()))?;
                let location = point.point();
                samples.push(TrackSample {
                    timestamp: parse_timestamp(&iso)?,
                    latitude: location.y(),
                    longitude: location.x(),
                });
            }
        }
    }

    if untimed > 0 {
        log::debug!("Dropped {} track points without a timestamp", untimed);
    }
    Ok(TrackCollection::from(samples))
}

/// Parse an RFC 3339 instant into a naive UTC date-time.
pub fn parse_timestamp(iso: &str) -> Result<NaiveDateTime, AppError> {
    DateTime::parse_from_rfc3339(iso)
        .map(|t| t.naive_utc())
        .map_err(|e| AppError::TrackTimestamp(format!("{}: {}", iso, e)))
}
