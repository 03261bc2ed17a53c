#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("URL is required")]
    MissingUrl,

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}
