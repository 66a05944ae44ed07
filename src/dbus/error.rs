//! D-Bus error replies.

use crate::error::Error;

/// Errors as sent back to D-Bus callers.
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "org.freedesktop")]
pub enum SecretError {
    #[zbus(error)]
    ZBus(zbus::Error),

    #[zbus(name = "Secret.Error.NoSuchObject")]
    NoSuchObject(String),

    #[zbus(name = "Secret.Error.NoSession")]
    NoSession(String),

    #[zbus(name = "Secret.Error.IsLocked")]
    IsLocked(String),

    #[zbus(name = "DBus.Error.NotSupported")]
    NotSupported(String),

    #[zbus(name = "DBus.Error.InvalidArgs")]
    InvalidArgs(String),

    #[zbus(name = "DBus.Error.Failed")]
    Failed(String),
}

impl From<Error> for SecretError {
    fn from(error: Error) -> Self {
        let message = error.to_string();
        match error {
            Error::NoSuchObject(_) => SecretError::NoSuchObject(message),
            Error::NoSession(_) => SecretError::NoSession(message),
            Error::IsLocked(_) => SecretError::IsLocked(message),
            Error::NotSupported(_) => SecretError::NotSupported(message),
            Error::InvalidArgument(_) => SecretError::InvalidArgs(message),
            _ => SecretError::Failed(message),
        }
    }
}

impl From<zbus::zvariant::Error> for SecretError {
    fn from(error: zbus::zvariant::Error) -> Self {
        SecretError::InvalidArgs(error.to_string())
    }
}

/// Errors for property setters, which reply with `org.freedesktop.DBus.Error.*`.
pub(super) fn fdo(error: Error) -> zbus::fdo::Error {
    match error {
        Error::NoSuchObject(path) => zbus::fdo::Error::UnknownObject(path),
        Error::InvalidArgument(message) => zbus::fdo::Error::InvalidArgs(message),
        other => zbus::fdo::Error::Failed(other.to_string()),
    }
}

pub(super) fn transport(error: zbus::Error) -> Error {
    Error::Transport(error.to_string())
}
