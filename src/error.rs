//! Error types shared by every solver stage.

use crate::geometry::Bounds;

pub type Result<T> = std::result::Result<T, RouterError>;

/// Reasons a solver stage can fail.
///
/// Errors are cloneable so a parent solver can surface a child solver's
/// failure unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    /// The generated jumper grid does not fit the node it was generated for.
    #[error("baseGraph bounds {graph} exceed node bounds {node}")]
    BoundsViolation { graph: Bounds, node: Bounds },

    /// Fewer than two terminal nodes could be resolved for a connection.
    #[error("not enough nodes for connection \"{connection}\", only {found} found")]
    InsufficientEndpoints { connection: String, found: usize },

    /// The graph path solver gave up on a connection.
    #[error("could not route connection \"{connection}\"")]
    Unroutable { connection: String },

    /// A stepped solver exhausted its iteration budget.
    #[error("ran out of iterations (max {max_iterations})")]
    IterationBudgetExceeded { max_iterations: usize },

    #[error("solver state could not be built: {0}")]
    Uninitialized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_violation_names_both_boxes() {
        let err = RouterError::BoundsViolation {
            graph: Bounds::new(-1.0, -1.0, 6.0, 6.0),
            node: Bounds::new(0.0, 0.0, 5.0, 5.0),
        };
        assert_eq!(
            err.to_string(),
            "baseGraph bounds (-1.00, -1.00, 6.00, 6.00) exceed node bounds (0.00, 0.00, 5.00, 5.00)"
        );
    }

    #[test]
    fn insufficient_endpoints_display() {
        let err = RouterError::InsufficientEndpoints {
            connection: "net1".to_string(),
            found: 1,
        };
        assert_eq!(err.to_string(), "not enough nodes for connection \"net1\", only 1 found");
    }
}
