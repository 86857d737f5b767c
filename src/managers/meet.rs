//! Meeting state record shared by the meeting UI, the signaling client and
//! the media-capture module.
//!
//! The record only describes shape. All mutation goes through
//! [`MeetStore`](super::meet_store::MeetStore).

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use specta::Type;
use std::fmt;
use std::str::FromStr;

/// A meeting attendee known to the local application (instructor or student).
#[derive(Clone, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Participant {
    /// Stable identifier assigned by the signaling layer
    pub id: String,

    /// Name shown in the participant grid, if known
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Handle for another attendee's connection, as published by the signaling client.
#[derive(Clone, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RemoteUser {
    pub uid: String,
    #[serde(default, alias = "has_audio")]
    pub has_audio: bool,
    #[serde(default, alias = "has_video")]
    pub has_video: bool,
}

impl RemoteUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            has_audio: false,
            has_video: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to a locally captured media source.
///
/// The handle only identifies the track; the capture pipeline that owns the
/// samples lives elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocalTrack {
    /// Unique identifier for the track (UUID format)
    pub id: String,
    pub kind: TrackKind,
    /// Device label, e.g. "FaceTime HD Camera"
    pub label: String,
    pub enabled: bool,
}

impl LocalTrack {
    /// Creates an enabled track handle with a fresh UUID.
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            enabled: true,
        }
    }
}

/// The meeting state record.
///
/// Serialized in camelCase, which is the shape the front-end reads.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeetState {
    #[serde(default)]
    pub instructor: Option<Participant>,
    #[serde(default)]
    pub students: Vec<Participant>,
    #[serde(default)]
    pub remote_users: Vec<RemoteUser>,
    #[serde(default)]
    pub local_video_track: Option<LocalTrack>,
    #[serde(default)]
    pub local_audio_track: Option<LocalTrack>,
}

impl MeetState {
    /// Returns the current value of a single field.
    pub fn field(&self, field: Field) -> FieldValue {
        match field {
            Field::Instructor => FieldValue::Instructor(self.instructor.clone()),
            Field::Students => FieldValue::Students(self.students.clone()),
            Field::RemoteUsers => FieldValue::RemoteUsers(self.remote_users.clone()),
            Field::LocalVideoTrack => FieldValue::LocalVideoTrack(self.local_video_track.clone()),
            Field::LocalAudioTrack => FieldValue::LocalAudioTrack(self.local_audio_track.clone()),
        }
    }

    /// Overwrites the field named by `value`. Other fields are untouched.
    pub fn apply(&mut self, value: FieldValue) {
        match value {
            FieldValue::Instructor(v) => self.instructor = v,
            FieldValue::Students(v) => self.students = v,
            FieldValue::RemoteUsers(v) => self.remote_users = v,
            FieldValue::LocalVideoTrack(v) => self.local_video_track = v,
            FieldValue::LocalAudioTrack(v) => self.local_audio_track = v,
        }
    }
}

/// Names of the fields of [`MeetState`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Instructor,
    Students,
    RemoteUsers,
    LocalVideoTrack,
    LocalAudioTrack,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Instructor,
        Field::Students,
        Field::RemoteUsers,
        Field::LocalVideoTrack,
        Field::LocalAudioTrack,
    ];

    /// Front-end name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Instructor => "instructor",
            Field::Students => "students",
            Field::RemoteUsers => "remoteUsers",
            Field::LocalVideoTrack => "localVideoTrack",
            Field::LocalAudioTrack => "localAudioTrack",
        }
    }

    /// Decodes a JSON value into this field's value type.
    pub fn value_from_json(&self, value: serde_json::Value) -> Result<FieldValue> {
        let decoded = match self {
            Field::Instructor => FieldValue::Instructor(serde_json::from_value(value)?),
            Field::Students => FieldValue::Students(serde_json::from_value(value)?),
            Field::RemoteUsers => FieldValue::RemoteUsers(serde_json::from_value(value)?),
            Field::LocalVideoTrack => FieldValue::LocalVideoTrack(serde_json::from_value(value)?),
            Field::LocalAudioTrack => FieldValue::LocalAudioTrack(serde_json::from_value(value)?),
        };
        Ok(decoded)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    /// Accepts both the front-end names (`remoteUsers`) and snake_case (`remote_users`).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "instructor" => Ok(Field::Instructor),
            "students" => Ok(Field::Students),
            "remoteUsers" | "remote_users" => Ok(Field::RemoteUsers),
            "localVideoTrack" | "local_video_track" => Ok(Field::LocalVideoTrack),
            "localAudioTrack" | "local_audio_track" => Ok(Field::LocalAudioTrack),
            other => Err(anyhow!("Unknown meet state field: {}", other)),
        }
    }
}

/// A value for exactly one field of [`MeetState`].
///
/// The variant selects the field, so field and value can never disagree.
#[derive(Clone, Debug, Serialize, Deserialize, Type, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    Instructor(Option<Participant>),
    Students(Vec<Participant>),
    RemoteUsers(Vec<RemoteUser>),
    LocalVideoTrack(Option<LocalTrack>),
    LocalAudioTrack(Option<LocalTrack>),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Instructor(_) => Field::Instructor,
            FieldValue::Students(_) => Field::Students,
            FieldValue::RemoteUsers(_) => Field::RemoteUsers,
            FieldValue::LocalVideoTrack(_) => Field::LocalVideoTrack,
            FieldValue::LocalAudioTrack(_) => Field::LocalAudioTrack,
        }
    }

    /// Encodes just the value, without the field tag.
    pub fn to_json(&self) -> serde_json::Value {
        let encoded = match self {
            FieldValue::Instructor(v) => serde_json::to_value(v),
            FieldValue::Students(v) => serde_json::to_value(v),
            FieldValue::RemoteUsers(v) => serde_json::to_value(v),
            FieldValue::LocalVideoTrack(v) => serde_json::to_value(v),
            FieldValue::LocalAudioTrack(v) => serde_json::to_value(v),
        };
        // Plain derived structs with string keys always encode.
        encoded.unwrap_or(serde_json::Value::Null)
    }
}
