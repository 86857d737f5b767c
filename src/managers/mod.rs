pub mod meet;
pub mod meet_logger;
pub mod meet_store;

// Re-exports from meet modules
pub use meet::{Field, FieldValue, LocalTrack, MeetState, Participant, RemoteUser, TrackKind};
pub use meet_store::{MeetEvent, MeetStore};
