/// Engine-facing command surface.
pub mod game_service;
/// Phase driving and timer coordination.
pub mod lifecycle;
/// Presenter payload assembly.
pub mod presenter_events;
/// Answer recording and question evaluation.
pub mod scoring;
