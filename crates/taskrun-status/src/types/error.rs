#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("parsing message json: {0}")]
  DecodeError(String),

  #[error("{0}")]
  InvalidResult(String),

  #[error("invalid string {0} : expected something that looks like <stepName>.<resultName>")]
  InvalidResultName(String),

  #[error("invalid value for result {name:?}: {message}")]
  InvalidResultValue { name: String, message: String },

  #[error("invalid result reference {0:?}: expected $(steps.<stepName>.results.<resultName>)")]
  InvalidResultReference(String),

  #[error("results size exceeds configured limit of {0} bytes")]
  SizeExceeded(usize),

  #[error("results are not ready yet: {0}")]
  NotReady(String),

  #[error("Kubernetes API error: {0}")]
  ClusterApi(String),

  #[error("Invalid configuration: {0}")]
  ConfigError(String),

  #[error("Failed to initialize: {0}")]
  InitError(String),

  #[error("{} errors occurred: {}", .0.len(), join_errors(.0))]
  Multiple(Vec<Error>),
}

fn join_errors(errors: &[Error]) -> String {
  errors
    .iter()
    .map(|e| e.to_string())
    .collect::<Vec<_>>()
    .join("; ")
}

impl Error {
  pub fn decode_error<T: ToString>(message: T) -> Self {
    Self::DecodeError(message.to_string())
  }

  pub fn invalid_result<T: ToString>(message: T) -> Self {
    Self::InvalidResult(message.to_string())
  }

  pub fn invalid_result_name<T: ToString>(key: T) -> Self {
    Self::InvalidResultName(key.to_string())
  }

  pub fn invalid_result_value<N: ToString, M: ToString>(name: N, message: M) -> Self {
    Self::InvalidResultValue {
      name: name.to_string(),
      message: message.to_string(),
    }
  }

  pub fn invalid_result_reference<T: ToString>(reference: T) -> Self {
    Self::InvalidResultReference(reference.to_string())
  }

  pub fn size_exceeded(limit: usize) -> Self {
    Self::SizeExceeded(limit)
  }

  pub fn not_ready<T: ToString>(message: T) -> Self {
    Self::NotReady(message.to_string())
  }

  pub fn cluster_api<T: ToString>(message: T) -> Self {
    Self::ClusterApi(message.to_string())
  }

  pub fn config_error<T: ToString>(message: T) -> Self {
    Self::ConfigError(message.to_string())
  }

  pub fn init_error<T: ToString>(message: T) -> Self {
    Self::InitError(message.to_string())
  }

  /// Folds collected errors into one value. `None` when nothing went wrong,
  /// the error itself when there is exactly one.
  pub fn aggregate(mut errors: Vec<Error>) -> Option<Self> {
    match errors.len() {
      0 => None,
      1 => errors.pop(),
      _ => Some(Self::Multiple(errors)),
    }
  }

  /// Errors that abort the status computation instead of degrading it.
  pub fn is_fatal(&self) -> bool {
    match self {
      Self::SizeExceeded(_) | Self::ClusterApi(_) | Self::InitError(_) => true,
      Self::Multiple(errors) => errors.iter().any(|e| e.is_fatal()),
      _ => false,
    }
  }

  pub fn is_not_ready(&self) -> bool {
    matches!(self, Self::NotReady(_))
  }

  pub fn errors(&self) -> Vec<&Error> {
    match self {
      Self::Multiple(errors) => errors.iter().collect(),
      other => vec![other],
    }
  }
}

// implement PartialEq for Error so that we can compare errors in tests
impl PartialEq for Error {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::DecodeError(a), Self::DecodeError(b)) => a == b,
      (Self::InvalidResult(a), Self::InvalidResult(b)) => a == b,
      (Self::InvalidResultName(a), Self::InvalidResultName(b)) => a == b,
      (
        Self::InvalidResultValue {
          name: a,
          message: m,
        },
        Self::InvalidResultValue {
          name: b,
          message: n,
        },
      ) => a == b && m == n,
      (Self::InvalidResultReference(a), Self::InvalidResultReference(b)) => a == b,
      (Self::SizeExceeded(a), Self::SizeExceeded(b)) => a == b,
      (Self::NotReady(a), Self::NotReady(b)) => a == b,
      (Self::ClusterApi(a), Self::ClusterApi(b)) => a == b,
      (Self::ConfigError(a), Self::ConfigError(b)) => a == b,
      (Self::InitError(a), Self::InitError(b)) => a == b,
      (Self::Multiple(a), Self::Multiple(b)) => a == b,
      _ => false,
    }
  }
}

impl From<serde_json::Error> for Error {
  fn from(error: serde_json::Error) -> Self {
    Self::decode_error(error)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_eq() {
    assert_eq!(Error::decode_error("hello"), Error::decode_error("hello"));
    assert_eq!(Error::size_exceeded(4096), Error::size_exceeded(4096));
    assert_eq!(
      Error::invalid_result_value("a", "b"),
      Error::invalid_result_value("a", "b")
    );
    assert_eq!(
      Error::Multiple(vec![Error::not_ready("x"), Error::cluster_api("y")]),
      Error::Multiple(vec![Error::not_ready("x"), Error::cluster_api("y")])
    );
  }

  #[test]
  fn test_ne() {
    assert_ne!(Error::decode_error("hello"), Error::decode_error("world"));
    assert_ne!(Error::size_exceeded(1), Error::size_exceeded(2));
    assert_ne!(Error::not_ready("x"), Error::cluster_api("x"));
    assert_ne!(
      Error::invalid_result_value("a", "b"),
      Error::invalid_result_value("a", "c")
    );
  }

  #[test]
  fn aggregate_collapses_single_error() {
    assert_eq!(Error::aggregate(vec![]), None);
    assert_eq!(
      Error::aggregate(vec![Error::decode_error("boom")]),
      Some(Error::decode_error("boom"))
    );

    let error = Error::aggregate(vec![
      Error::decode_error("boom"),
      Error::invalid_result_name("foo"),
    ])
    .unwrap();

    assert_eq!(error.errors().len(), 2);
    assert_eq!(
      error.to_string(),
      "2 errors occurred: parsing message json: boom; invalid string foo : expected something that looks like <stepName>.<resultName>"
    );
  }

  #[test]
  fn fatal_errors() {
    assert!(Error::size_exceeded(10).is_fatal());
    assert!(Error::cluster_api("forbidden").is_fatal());
    assert!(!Error::decode_error("boom").is_fatal());
    assert!(!Error::not_ready("sidecar").is_fatal());
    assert!(Error::Multiple(vec![Error::decode_error("a"), Error::size_exceeded(1)]).is_fatal());
  }
}
