//! Errors which can occur during setup and execution of a simulation.
pub use crate::storage::StorageError;
use core::fmt::Display;
use substrate_raza_concepts::*;

macro_rules! impl_error_variant {
    ($name: ident, $($err_var: ident),+) => {
        // Implement Display for ErrorVariant
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$err_var(message) => write!(f, "{}", message),
                    )+
                }
            }
        }
    }
}

macro_rules! impl_from_error {
    ($name: ident, $(($err_var: ident, $err_type: ty)),+) => {
        $(
            // Implement conversion from error to errorvariant
            impl From<$err_type> for $name {
                fn from(err: $err_type) -> Self {
                    $name::$err_var(err)
                }
            }
        )+
    }
}

/// Covers all errors which can occur while setting up and running a solver.
///
/// The errors are listed from very likely to be a user error to almost certainly an internal
/// error.
#[derive(Debug)]
pub enum SolverError {
    // Very likely to be user errors
    /// See [ConfigError]
    ConfigError(ConfigError),
    /// See [SetupError]
    SetupError(SetupError),
    /// See [BoundaryError]
    BoundaryError(BoundaryError),
    /// See [BackendError]
    BackendError(BackendError),
    /// See [TimeError]
    TimeError(TimeError),

    // Less likely but possible to be user errors
    /// See [StorageError]
    StorageError(StorageError),

    // Highly unlikely to be user errors
    /// See [IndexError]
    IndexError(IndexError),
    /// Reading or writing files failed
    IoError(std::io::Error),
    /// The thread pool of the [Rayon](crate::execution::Rayon) policy could not be built
    ThreadingError(rayon::ThreadPoolBuildError),
}

impl_from_error! {SolverError,
    (ConfigError, ConfigError),
    (SetupError, SetupError),
    (BoundaryError, BoundaryError),
    (BackendError, BackendError),
    (TimeError, TimeError),
    (StorageError, StorageError),
    (IndexError, IndexError),
    (IoError, std::io::Error),
    (ThreadingError, rayon::ThreadPoolBuildError)
}

impl_error_variant! {SolverError,
    ConfigError,
    SetupError,
    BoundaryError,
    BackendError,
    TimeError,
    StorageError,
    IndexError,
    IoError,
    ThreadingError
}

impl std::error::Error for SolverError {}

#[cfg(test)]
mod test_solver_error {
    use super::*;

    fn fails() -> Result<(), SolverError> {
        Err(BackendError("no backend named \"gpu\"".into()))?;
        Ok(())
    }

    #[test]
    fn question_mark_converts() {
        match fails() {
            Err(SolverError::BackendError(e)) => assert!(e.0.contains("gpu")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn display_forwards_message() {
        let err = SolverError::from(ConfigError("missing <domain>".into()));
        assert_eq!(format!("{}", err), "missing <domain>");
    }
}
