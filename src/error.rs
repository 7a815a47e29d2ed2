//! Holds all error types aside from those related to metadata parsing
//! (those live in [`crate::metadata::error`]).

use std::path::PathBuf;

pub use crate::database::error::{ConditionEvaluationError, MetadataRetrievalError};
pub use crate::plugin::error::PluginDataError;
use crate::plugin::error::PluginValidationError;
pub use crate::sorting::error::SortingError;
use crate::sorting::error::display_cycle;
use crate::{Vertex, escape_ascii};

/// The taxonomy named in spec §7: every error type in this crate can be
/// classified into one of these five kinds, for callers that don't need the
/// full detail of the concrete error enum.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    FileAccess,
    ParseFormat,
    ConditionSyntax,
    Sorting,
    InvalidArgument,
}

/// Represents an error that occurred while trying to create a
/// [`Game`][crate::Game] handle.
#[derive(Debug)]
#[non_exhaustive]
pub enum GameHandleCreationError {
    NotADirectory(PathBuf),
    LoadOrderError(LoadOrderError),
}

impl GameHandleCreationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotADirectory(_) => ErrorKind::InvalidArgument,
            Self::LoadOrderError(_) => ErrorKind::FileAccess,
        }
    }
}

impl std::fmt::Display for GameHandleCreationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotADirectory(p) => write!(
                f,
                "the path \"{}\" does not resolve to a directory",
                escape_ascii(p)
            ),
            Self::LoadOrderError(_) => {
                write!(f, "failed to initialise the load order game settings")
            }
        }
    }
}

impl std::error::Error for GameHandleCreationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotADirectory(_) => None,
            Self::LoadOrderError(e) => Some(e),
        }
    }
}

impl From<loadorder::Error> for GameHandleCreationError {
    fn from(value: loadorder::Error) -> Self {
        GameHandleCreationError::LoadOrderError(value.into())
    }
}

/// Represents an error that occurred while trying to interact with the load
/// order.
#[derive(Debug)]
pub struct LoadOrderError(Box<loadorder::Error>);

impl std::fmt::Display for LoadOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "load order interaction failed")
    }
}

impl std::error::Error for LoadOrderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<loadorder::Error> for LoadOrderError {
    fn from(value: loadorder::Error) -> Self {
        LoadOrderError(Box::new(value))
    }
}

/// Indicates that a lock guarding shared state has been poisoned and the
/// guarded value may be in an inconsistent state.
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LockPoisonError;

impl std::fmt::Display for LockPoisonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a lock guarding shared state has been poisoned")
    }
}

impl std::error::Error for LockPoisonError {}

impl<T> From<std::sync::PoisonError<T>> for LockPoisonError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LockPoisonError
    }
}

/// Represents an error that occurred while loading plugins.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadPluginsError {
    LockPoisoned,
    PluginValidationError(Box<dyn std::error::Error + Send + Sync + 'static>),
    PluginDataError(PluginDataError),
}

impl LoadPluginsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LockPoisoned | Self::PluginDataError(_) => ErrorKind::FileAccess,
            Self::PluginValidationError(_) => ErrorKind::InvalidArgument,
        }
    }
}

impl std::fmt::Display for LoadPluginsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockPoisoned => LockPoisonError.fmt(f),
            Self::PluginValidationError(_) => write!(f, "failed validation of input plugin paths"),
            Self::PluginDataError(_) => write!(f, "failed to read loaded plugin data"),
        }
    }
}

impl std::error::Error for LoadPluginsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LockPoisoned => None,
            Self::PluginValidationError(e) => Some(e.as_ref()),
            Self::PluginDataError(e) => Some(e),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LoadPluginsError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LoadPluginsError::LockPoisoned
    }
}

impl From<LockPoisonError> for LoadPluginsError {
    fn from(_: LockPoisonError) -> Self {
        LoadPluginsError::LockPoisoned
    }
}

impl From<PluginValidationError> for LoadPluginsError {
    fn from(value: PluginValidationError) -> Self {
        LoadPluginsError::PluginValidationError(Box::new(value))
    }
}

impl From<PluginDataError> for LoadPluginsError {
    fn from(value: PluginDataError) -> Self {
        LoadPluginsError::PluginDataError(value)
    }
}

/// Represents an error that occurred while trying to refresh the current
/// load order state.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadOrderStateError {
    LockPoisoned,
    LoadOrderError(LoadOrderError),
}

impl LoadOrderStateError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FileAccess
    }
}

impl std::fmt::Display for LoadOrderStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockPoisoned => LockPoisonError.fmt(f),
            Self::LoadOrderError(_) => write!(f, "failed to load the current load order state"),
        }
    }
}

impl std::error::Error for LoadOrderStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LockPoisoned => None,
            Self::LoadOrderError(e) => Some(e),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LoadOrderStateError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        LoadOrderStateError::LockPoisoned
    }
}

impl From<loadorder::Error> for LoadOrderStateError {
    fn from(value: loadorder::Error) -> Self {
        LoadOrderStateError::LoadOrderError(value.into())
    }
}

/// Represents an error that occurred during sorting.
#[derive(Debug)]
#[non_exhaustive]
pub enum SortPluginsError {
    LockPoisoned,
    PluginNotLoaded(String),
    MetadataRetrievalError(MetadataRetrievalError),
    CycleFound(Vec<Vertex>),
    CycleFoundInvolving(String),
    PluginDataError(PluginDataError),
}

impl SortPluginsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LockPoisoned | Self::PluginDataError(_) => ErrorKind::FileAccess,
            Self::PluginNotLoaded(_) => ErrorKind::InvalidArgument,
            Self::MetadataRetrievalError(_) => ErrorKind::ConditionSyntax,
            Self::CycleFound(_) | Self::CycleFoundInvolving(_) => ErrorKind::Sorting,
        }
    }
}

impl std::fmt::Display for SortPluginsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LockPoisoned => LockPoisonError.fmt(f),
            Self::PluginNotLoaded(n) => write!(f, "the plugin \"{n}\" has not been loaded"),
            Self::CycleFound(c) => write!(f, "found a cycle: {}", display_cycle(c)),
            Self::CycleFoundInvolving(n) => write!(f, "found a cycle involving \"{n}\""),
            Self::PluginDataError(_) => write!(f, "failed to read loaded plugin data"),
            Self::MetadataRetrievalError(_) => write!(f, "failed to retrieve plugin metadata"),
        }
    }
}

impl std::error::Error for SortPluginsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MetadataRetrievalError(e) => Some(e),
            Self::PluginDataError(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for SortPluginsError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        SortPluginsError::LockPoisoned
    }
}

impl From<LockPoisonError> for SortPluginsError {
    fn from(_: LockPoisonError) -> Self {
        SortPluginsError::LockPoisoned
    }
}

impl From<SortingError> for SortPluginsError {
    fn from(value: SortingError) -> Self {
        match value {
            SortingError::CycleFound(c) => Self::CycleFound(c.into_cycle()),
            SortingError::CycleInvolving(n) => Self::CycleFoundInvolving(n),
            SortingError::PluginDataError(e) => Self::PluginDataError(e),
            SortingError::PluginNotLoaded(n) => Self::PluginNotLoaded(n),
        }
    }
}

impl From<PluginDataError> for SortPluginsError {
    fn from(value: PluginDataError) -> Self {
        SortPluginsError::PluginDataError(value)
    }
}

impl From<MetadataRetrievalError> for SortPluginsError {
    fn from(value: MetadataRetrievalError) -> Self {
        SortPluginsError::MetadataRetrievalError(value)
    }
}

impl From<ConditionEvaluationError> for SortPluginsError {
    fn from(value: ConditionEvaluationError) -> Self {
        SortPluginsError::MetadataRetrievalError(value.into())
    }
}
