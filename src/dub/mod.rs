pub mod assemble;
pub mod cache;
pub mod reconcile;

pub use assemble::{
    plan_track, AssembledTrack, PlacedClip, TimedClip, TrackAssembler, TrackPiece, TrackPlan,
    SOURCE_TOLERANCE_MS,
};
pub use cache::{ArtifactStore, CachedArtifact, DirectoryStore, SegmentCache};
pub use reconcile::{compute_speed, DurationReconciler, Reconciled, SpeedCorrection, SPEED_MAX, SPEED_MIN};
