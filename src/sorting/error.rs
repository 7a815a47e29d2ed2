use std::fmt::Display;

use crate::{plugin::error::PluginDataError, sorting::vertex::Vertex};

/// Represents a cycle that was found between plugins while sorting.
#[derive(Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CyclicInteractionError {
    cycle: Vec<Vertex>,
}

impl CyclicInteractionError {
    pub(crate) fn new(cycle: Vec<Vertex>) -> Self {
        Self { cycle }
    }

    pub(crate) fn into_cycle(self) -> Vec<Vertex> {
        self.cycle
    }
}

impl Display for CyclicInteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cycle = display_cycle(&self.cycle);
        write!(f, "cyclic interaction detected: {cycle}")
    }
}

impl std::error::Error for CyclicInteractionError {}

pub(crate) fn display_cycle(cycle: &[Vertex]) -> String {
    cycle
        .iter()
        .map(|v| {
            if let Some(edge_type) = v.out_edge_type() {
                format!("{} --[{}]-> ", v.name(), edge_type)
            } else {
                v.name().to_owned()
            }
        })
        .chain(cycle.first().iter().map(|v| v.name().to_owned()))
        .collect()
}

/// Represents an error that occurred while sorting a game's plugins.
#[derive(Debug)]
#[non_exhaustive]
pub enum SortingError {
    CycleFound(CyclicInteractionError),
    CycleInvolving(String),
    PluginDataError(PluginDataError),
    PluginNotLoaded(String),
}

impl Display for SortingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleFound(_) => write!(f, "found a cycle"),
            Self::CycleInvolving(n) => write!(f, "found a cycle involving \"{n}\""),
            Self::PluginDataError(_) => write!(f, "failed to read plugin data"),
            Self::PluginNotLoaded(n) => write!(f, "the plugin \"{n}\" has not been loaded"),
        }
    }
}

impl std::error::Error for SortingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CycleFound(e) => Some(e),
            Self::CycleInvolving(_) | Self::PluginNotLoaded(_) => None,
            Self::PluginDataError(e) => Some(e),
        }
    }
}

impl From<CyclicInteractionError> for SortingError {
    fn from(value: CyclicInteractionError) -> Self {
        SortingError::CycleFound(value)
    }
}

impl From<PluginDataError> for SortingError {
    fn from(value: PluginDataError) -> Self {
        SortingError::PluginDataError(value)
    }
}
