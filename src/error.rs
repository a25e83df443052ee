// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error kinds the planner must distinguish, per the error-handling design:
//! configuration errors (bad XML, invalid ranges) are surfaced before a
//! pipeline starts; computation failures and pathfinding failures are
//! surfaced as events with the previous good state preserved; cancellation
//! is distinct from failure.

#[derive(thiserror::Error, Debug)]
pub enum PlannerError {
    #[error("invalid input data: {0}")]
    InvalidInputData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("computation failed: {0}")]
    ComputationFailed(String),

    #[error("pathfinding failed: {0}")]
    PathfindingFailed(String),

    #[error("operation was cancelled")]
    Cancelled,

    #[error("instrument mesh is stale, call update_path_mesh() first")]
    MeshNotValid,

    #[error("voronoi backend rejected input: {0}")]
    VoronoiBackend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
