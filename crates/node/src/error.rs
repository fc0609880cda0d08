//! A bunch of wrap errors.

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
/// The error type can be expressed in decimal, where the high decs represent
/// the error category and the low decs represent the error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[repr(u32)]
pub enum Error {
    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String) = 100,
    #[error("Invalid input: {0}")]
    InvalidInput(String) = 102,
    #[error("Create File Error: {0}")]
    CreateFileError(String) = 200,
    #[error("Open File Error: {0}")]
    OpenFileError(String) = 201,
    #[error("Cannot find home directory")]
    HomeDirError = 202,
    #[error("Cannot find parent directory")]
    ParentDirError = 203,
    #[error("Serde yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error) = 300,
}

impl Error {
    fn discriminant(&self) -> u32 {
        // SAFETY: Because `Self` is marked `repr(u32)`, its layout is a `repr(C)` `union`
        // between `repr(C)` structs, each of which has the `u32` discriminant as its first
        // field, so we can read the discriminant without offsetting the pointer.
        // ref: https://doc.rust-lang.org/std/mem/fn.discriminant.html
        unsafe { *<*const _>::from(self).cast::<u32>() }
    }

    /// Numeric code of the error, stable across releases.
    pub fn code(&self) -> u32 {
        self.discriminant()
    }
}
