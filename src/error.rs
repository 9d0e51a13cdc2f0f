use exif::Error as ExifError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("EXIF error: {0}")]
    Exif(#[from] ExifError),

    #[error("GPX error: {0}")]
    Gpx(String),

    #[error("Invalid track timestamp: {0}")]
    TrackTimestamp(String),

    #[error("Track contains no timestamped points")]
    EmptyTrack,

    #[error("Photo path does not exist: {}", .0.display())]
    PhotoPathNotFound(PathBuf),

    #[error("Malformed JPEG: {0}")]
    MalformedJpeg(String),

    #[error("Unsupported photo container: {0}")]
    UnsupportedContainer(String),

    #[error("Exif payload of {0} bytes does not fit in a single APP1 segment")]
    ExifTooLarge(usize),
}
