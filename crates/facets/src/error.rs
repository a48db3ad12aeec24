use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaintError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Processing was cancelled")]
    Cancelled,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Image contains {0} distinct colors after clustering, at most 256 are supported")]
    TooManyColors(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, PaintError>;
