use crate::error::AppError;
use crate::track::TrackSample;
use chrono::{Duration, NaiveDateTime};

/// The track sample closest in time to a photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    pub sample: &'a TrackSample,
    /// Absolute distance between the sample and the photo.
    pub gap: Duration,
}

impl Match<'_> {
    /// Whether the gap is longer than `max_gap_secs`. Compared in whole seconds so any `i64`
    /// limit is accepted.
    pub fn exceeds(&self, max_gap_secs: i64) -> bool {
        self.gap.num_seconds() > max_gap_secs
    }
}

/// Find the sample whose timestamp is closest to `target`.
///
/// Samples are scanned linearly, so the input does not have to be sorted. On a tie the sample seen
/// first wins. There is no distance cutoff here; callers that want one check [`Match::exceeds`].
pub fn find_nearest(target: NaiveDateTime, samples: &[TrackSample]) -> Result<Match<'_>, AppError> {
    let mut best: Option<Match> = None;

    for sample in samples {
        let delta = sample.timestamp.signed_duration_since(target);
        let gap = if delta < Duration::zero() { -delta } else { delta };

        // Strictly closer only, so the earlier of two equal gaps stays.
        if best.map_or(true, |current| gap < current.gap) {
            best = Some(Match { sample, gap });
        }
    }

    best.ok_or(AppError::EmptyTrack)
}
