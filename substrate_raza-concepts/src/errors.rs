use core::fmt::Display;
use std::error::Error;

macro_rules! define_errors {
    ($(($err_name: ident, $err_descr: expr)),+) => {
        $(
            #[doc = $err_descr]
            #[derive(Debug,Clone)]
            pub struct $err_name(
                #[doc = "Error message associated with "]
                #[doc = stringify!($err_name)]
                #[doc = " error type."]
                pub String,
            );

            impl Display for $err_name {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl Error for $err_name {}
        )+
    }
}

define_errors!(
    (SetupError, "Occurs while assembling a microenvironment and its solver"),
    (
        TimeError,
        "Error related to advancing the simulation time or displaying its progress"
    ),
    (
        BoundaryError,
        "Invalid mesh bounds or positions which can not be mapped onto the mesh"
    ),
    (
        IndexError,
        "A voxel, substrate or agent index lies outside of its valid range"
    ),
    (
        ConfigError,
        "A configuration file is missing, malformed or references unknown entities"
    ),
    (
        BackendError,
        "The requested solver backend was not registered or could not be created"
    )
);

impl From<String> for TimeError {
    fn from(value: String) -> Self {
        TimeError(value)
    }
}

impl From<BoundaryError> for SetupError {
    fn from(value: BoundaryError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<IndexError> for SetupError {
    fn from(value: IndexError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<ConfigError> for SetupError {
    fn from(value: ConfigError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<BackendError> for SetupError {
    fn from(value: BackendError) -> Self {
        SetupError(format!("{}", value))
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError(format!("could not read configuration: {}", value))
    }
}

/// For internal use: formats an error message to include a link to the bug tracker on github.
#[macro_export]
macro_rules! format_error_message(
    (@function) => {
        {
            fn f() {}
            let name = std::any::type_name_of_val(&f);
            match name.strip_suffix("::f") {
                Some(stripped) => stripped,
                None => name,
            }
        }
    };
    ($bug_title:expr, $error_msg:expr) => {
        {
            let title = $bug_title.replace(" ", "%20");
            let mut body = String::from($error_msg);
            body = body + &format!("%0A%0AFile: {}", file!());
            body = body + &format!("%0ALine: {}", line!());
            body = body + &format!("%0AColumn: {}", column!());
            body = body.replace(" ", "%20");
            format!("Internal Error in file {} function {}: +++ {} +++ Please file a bug-report: \
                https://github.com/jonaspleyer/cellular_raza/issues/new?\
                title={}&body={}",
                file!(),
                $crate::format_error_message!(@function),
                $error_msg,
                title,
                body,
            )
        }
    };
);
