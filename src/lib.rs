//! State container for a video-meeting session: instructor, students,
//! remote participants and local media tracks.
//!
//! The owning session creates a [`MeetStore`], shares it as `Arc<MeetStore>`
//! and observes changes through [`MeetStore::subscribe`].

pub mod commands;
pub mod logging;
pub mod managers;
pub mod settings;

pub use managers::{
    Field, FieldValue, LocalTrack, MeetEvent, MeetState, MeetStore, Participant, RemoteUser,
    TrackKind,
};
pub use settings::StoreSettings;
