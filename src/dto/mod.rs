//! Serializable projections of session state handed to status queries and
//! the presenter.

/// Status summaries, question snapshots, and review projections.
pub mod game;
/// Publicly visible phase projection.
pub mod phase;
