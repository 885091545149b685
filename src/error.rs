use thiserror::Error;

/// Problems with the shortcut catalog or a definition pulled from it.
///
/// All of these are configuration defects: they are raised before any timer
/// is armed and never in response to user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown challenge id: {0}")]
    NotFound(String),

    #[error("challenge {id} has a sequence of {len} key(s); at least 2 are required")]
    DegenerateSequence { id: String, len: usize },

    #[error("challenge {id} is neither a primary-modifier chord nor a secondary-modifier sequence")]
    UnsupportedShape { id: String },

    #[error("challenge id {0} is registered more than once")]
    DuplicateId(String),

    #[error("unable to parse shortcut catalog: {0}")]
    Parse(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] CatalogError),

    #[error("challenge count must be between 2 and {max}, got {requested}")]
    ChallengeCount { requested: usize, max: usize },

    #[error("a session needs at least one challenge")]
    Empty,

    #[error("{what} of {millis}ms is out of range")]
    DurationOutOfRange { what: &'static str, millis: u128 },
}
