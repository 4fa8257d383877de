pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid roster payload: {message}")]
    InvalidRoster { message: String },

    #[error("Coordinate store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Render error: {0}")]
    Render(#[from] std::fmt::Error),
}

impl Error {
    pub fn invalid_roster(message: impl Into<String>) -> Self {
        Error::InvalidRoster {
            message: message.into(),
        }
    }
}
