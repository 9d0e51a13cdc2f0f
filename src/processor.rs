use crate::config::AppConfig;
use crate::coords::{hemisphere_ref, Dms, LATITUDE_REFS, LONGITUDE_REFS};
use crate::error::AppError;
use crate::matcher::find_nearest;
use crate::metadata::{self, GpsPosition};
use crate::track::{self, TrackCollection, TrackSample};
use crate::walker;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingCaptureTime,
    UnreadableMetadata { message: String },
    BeyondMaxGap { gap_secs: i64, max_secs: i64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::MissingCaptureTime => write!(f, "no capture time in metadata"),
            SkipReason::UnreadableMetadata { message } => write!(f, "unreadable metadata: {}", message),
            SkipReason::BeyondMaxGap { gap_secs, max_secs } => write!(
                f,
                "nearest track point is {}s away (limit {}s)",
                gap_secs, max_secs
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhotoOutcome {
    Tagged {
        capture_time: NaiveDateTime,
        sample: TrackSample,
        gap_secs: i64,
        /// The photo already had a position that was overwritten.
        replaced: Option<GpsPosition>,
        written: bool,
    },
    Skipped(SkipReason),
    Failed { message: String },
}

impl fmt::Display for PhotoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PhotoOutcome::Tagged { sample, gap_secs, written, .. } => {
                let (n, s) = LATITUDE_REFS;
                let (e, w) = LONGITUDE_REFS;
                let lat = Dms::from_decimal(sample.latitude);
                let lon = Dms::from_decimal(sample.longitude);
                write!(
                    f,
                    "{} {}°{}'{:.2}\"{} {}°{}'{:.2}\"{} (track point {}, {}s away)",
                    if *written { "tagged" } else { "would tag" },
                    lat.degrees,
                    lat.minutes,
                    lat.seconds,
                    hemisphere_ref(sample.latitude, n, s),
                    lon.degrees,
                    lon.minutes,
                    lon.seconds,
                    hemisphere_ref(sample.longitude, e, w),
                    sample.timestamp,
                    gap_secs
                )
            }
            PhotoOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            PhotoOutcome::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhotoReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: PhotoOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub track_samples: usize,
    pub photos: Vec<PhotoReport>,
}

impl BatchReport {
    pub fn tagged(&self) -> usize {
        self.count(|o| matches!(o, PhotoOutcome::Tagged { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PhotoOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PhotoOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&PhotoOutcome) -> bool) -> usize {
        self.photos.iter().filter(|p| pred(&p.outcome)).count()
    }
}

/// Geotag every photo under `photo_path` from the track at `track_path`.
///
/// Problems with the photo path or the track abort the run with an error. Problems with a single
/// photo are recorded in its report entry and the batch moves on.
pub fn run(config: &AppConfig, track_path: &Path, photo_path: &Path) -> Result<BatchReport, AppError> {
    let photos = walker::resolve_photos(config, photo_path)?;

    let track = track::load_track(track_path)?;
    if track.is_empty() {
        return Err(AppError::EmptyTrack);
    }

    log::info!("Processing {} photos against {} track samples", photos.len(), track.len());
    let mut report = BatchReport {
        track_samples: track.len(),
        photos: Vec::with_capacity(photos.len()),
    };

    for path in photos {
        log::debug!("Processing photo {:?}", path);
        let outcome = process_photo(config, &track, &path);
        match &outcome {
            PhotoOutcome::Tagged { .. } => log::info!("{:?}: {}", path, outcome),
            PhotoOutcome::Skipped(_) | PhotoOutcome::Failed { .. } => {
                log::warn!("{:?}: {}", path, outcome)
            }
        }
        report.photos.push(PhotoReport { path, outcome });
    }

    log::info!(
        "All photos processed: {} tagged, {} skipped, {} failed",
        report.tagged(),
        report.skipped(),
        report.failed()
    );
    Ok(report)
}

fn process_photo(config: &AppConfig, track: &TrackCollection, path: &Path) -> PhotoOutcome {
    let record = match metadata::read_photo(path) {
        Ok(record) => record,
        Err(e) => {
            return PhotoOutcome::Skipped(SkipReason::UnreadableMetadata {
                message: e.to_string(),
            })
        }
    };
    let capture_time = match record.capture_time {
        Some(time) => time,
        None => return PhotoOutcome::Skipped(SkipReason::MissingCaptureTime),
    };

    let nearest = match find_nearest(capture_time, track.samples()) {
        Ok(nearest) => nearest,
        Err(e) => return PhotoOutcome::Failed { message: e.to_string() },
    };
    log::debug!(
        "Photo taken {} matched track point {} ({}s apart)",
        capture_time,
        nearest.sample.timestamp,
        nearest.gap.num_seconds()
    );
    if let Some(max_secs) = config.max_time_gap_secs {
        if nearest.exceeds(max_secs) {
            return PhotoOutcome::Skipped(SkipReason::BeyondMaxGap {
                gap_secs: nearest.gap.num_seconds(),
                max_secs,
            });
        }
    }

    if let Some(existing) = record.gps {
        log::debug!("Overwriting existing position {:?} on {:?}", existing, record.path);
    }

    let sample = *nearest.sample;
    if !config.dry_run {
        let position = GpsPosition {
            latitude: sample.latitude,
            longitude: sample.longitude,
        };
        if let Err(e) = metadata::write_gps(path, position) {
            return PhotoOutcome::Failed { message: e.to_string() };
        }
    }

    PhotoOutcome::Tagged {
        capture_time,
        sample,
        gap_secs: nearest.gap.num_seconds(),
        replaced: record.gps,
        written: !config.dry_run,
    }
}
