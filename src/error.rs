pub type MaquetteResult<T> = Result<T, MaquetteError>;

#[derive(thiserror::Error, Debug)]
pub enum MaquetteError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error("missing view image: {0}")]
    MissingViewImage(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MaquetteError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn missing_view_image(view: impl Into<String>) -> Self {
        Self::MissingViewImage(view.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
