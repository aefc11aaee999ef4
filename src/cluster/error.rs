//! Cluster construction errors.

use std::fmt;

use thiserror::Error;

/// Position of a node in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Primary,
    Replica,
}

impl NodeRole {
    /// Role of the handle at `index` (index 0 is always the primary).
    pub fn of(index: usize) -> Self {
        if index == 0 {
            NodeRole::Primary
        } else {
            NodeRole::Replica
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Primary => "primary",
            NodeRole::Replica => "replica",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building a cluster connection.
#[derive(Debug, Error)]
pub enum ConnectError<E>
where
    E: std::error::Error + 'static,
{
    /// Cluster configuration names no driver.
    #[error("cluster config has an empty driver name")]
    MissingDriverName,

    /// The supplied driver is not the one the config asks for.
    #[error("cluster config requires driver `{requested}`, got `{provided}`")]
    DriverMismatch { requested: String, provided: String },

    /// A node could not be opened or failed its liveness check.
    #[error("{role} node {index} unreachable: {source}")]
    Node {
        index: usize,
        role: NodeRole,
        #[source]
        source: E,
    },
}

impl<E> ConnectError<E>
where
    E: std::error::Error + 'static,
{
    /// Index of the failing node, if a node failed.
    pub fn node_index(&self) -> Option<usize> {
        match self {
            ConnectError::Node { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The driver error of the failing node, if a node failed.
    pub fn into_node_error(self) -> Option<E> {
        match self {
            ConnectError::Node { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_of_index() {
        assert_eq!(NodeRole::of(0), NodeRole::Primary);
        assert_eq!(NodeRole::of(3), NodeRole::Replica);
    }

    #[test]
    fn test_error_display() {
        let err: ConnectError<std::io::Error> = ConnectError::Node {
            index: 2,
            role: NodeRole::Replica,
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "replica node 2 unreachable: refused");
        assert_eq!(err.node_index(), Some(2));

        let err: ConnectError<std::io::Error> = ConnectError::DriverMismatch {
            requested: "postgres".into(),
            provided: "mysql".into(),
        };
        assert!(err.to_string().contains("postgres"));
        assert_eq!(err.node_index(), None);
    }
}
