use serde_json::Value;

pub type PluginResult<T> = Result<T, PluginError>;

/// Failure taxonomy shared by the gallery fetcher, the host client and the
/// dispatcher.
///
/// An empty gallery is never an error; only the cases below are.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// Non-success status, or the request never produced a response.
    #[error("{target} request failed ({status}): {body}{}", describe_query(.query, .variables))]
    Transport {
        target: String,
        status: u16,
        body: String,
        query: Option<String>,
        variables: Option<Value>,
    },

    /// Well-formed error payload returned by the host's query endpoint.
    #[error("GraphQL error: {0}")]
    Application(String),

    /// Response body did not have the expected shape.
    #[error("{0}")]
    Parse(String),

    #[error("unsupported mode '{0}'")]
    UnsupportedMode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PluginError {
    pub fn transport(target: &str, status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            target: target.to_string(),
            status,
            body: body.into(),
            query: None,
            variables: None,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

fn describe_query(query: &Option<String>, variables: &Option<Value>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    let variables = variables
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| "null".to_string());
    format!(". Query: {}. Variables: {variables}", query.trim())
}
