pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("floor plan is not well-formed XML: {message}")]
    Xml { message: String },

    #[error("floor plan has no <svg> root element")]
    MissingSvgRoot,

    #[error("extraction JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<roxmltree::Error> for Error {
    fn from(value: roxmltree::Error) -> Self {
        Self::Xml {
            message: value.to_string(),
        }
    }
}
