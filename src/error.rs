use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub authentication failed. Please check your access token.")]
    Unauthorized,

    #[error("GitHub API rate limit exceeded or access denied.")]
    Forbidden,

    #[error("GitHub resource not found.")]
    NotFound,

    #[error("GitHub API error: {0}")]
    Api(String),

    #[error("GitHub API request failed: {0}")]
    Request(#[source] octocrab::Error),

    #[error(transparent)]
    Header(#[from] http::header::InvalidHeaderValue),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl GitHubError {
    /// Classifies the message of a GitHub error response.
    ///
    /// octocrab drops the status code of error responses, so 403 bodies are recognized by their
    /// wording. Unrecognized 403 phrasings end up as [`GitHubError::Api`].
    pub fn from_message(message: &str) -> Self {
        let lowercase = message.to_lowercase();
        match message {
            "Not Found" => Self::NotFound,
            "Bad credentials" | "Requires authentication" => Self::Unauthorized,
            _ if lowercase.contains("rate limit")
                || lowercase.contains("resource not accessible")
                || lowercase.contains("forbidden")
                || lowercase.contains("admin rights")
                || lowercase.contains("saml")
                || lowercase.contains("must have push access") =>
            {
                Self::Forbidden
            }
            _ => Self::Api(message.to_owned()),
        }
    }
}

impl From<octocrab::Error> for GitHubError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => Self::from_message(&source.message),
            err => Self::Request(err),
        }
    }
}
