// =============================================================================
// Alerts Module
// =============================================================================
//
// The notification gate: decides which recommendations surface as user-facing
// alerts, keeps the bounded alert history with read / target-reached state,
// and emits alert artifacts for the presentation layer to render.

pub mod center;

pub use center::{AlertArtifact, AlertCenter, ArtifactKind, SkipReason, StoredAlert};
