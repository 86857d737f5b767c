//! The meet store: owner of one [`MeetState`] plus the change channel.
//!
//! Each store is an independent instance. There is no global registry; the
//! owning session creates the store and hands out `Arc<MeetStore>` to the
//! components that read or write it.

use log::debug;
use serde::Serialize;
use specta::Type;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use super::meet::{Field, FieldValue, LocalTrack, MeetState, Participant, RemoteUser};
use super::meet_logger::MeetLogContext;
use crate::settings::StoreSettings;

/// Change notification published after every applied mutation.
///
/// Serialized with a `type` tag so a host can forward it to the front-end
/// as an event payload.
#[derive(Clone, Debug, Serialize, Type, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MeetEvent {
    /// One field was assigned
    FieldChanged {
        revision: u64,
        value: FieldValue,
        #[serde(rename = "changedAt")]
        changed_at: i64,
    },
    /// Several fields were assigned as one change
    Patched {
        revision: u64,
        fields: Vec<Field>,
        #[serde(rename = "changedAt")]
        changed_at: i64,
    },
    /// All fields were restored to their defaults
    Reset {
        revision: u64,
        #[serde(rename = "changedAt")]
        changed_at: i64,
    },
}

impl MeetEvent {
    pub fn revision(&self) -> u64 {
        match self {
            MeetEvent::FieldChanged { revision, .. }
            | MeetEvent::Patched { revision, .. }
            | MeetEvent::Reset { revision, .. } => *revision,
        }
    }
}

struct Inner {
    state: MeetState,
    revision: u64,
}

pub struct MeetStore {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<MeetEvent>,
    log_changes: bool,
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl MeetStore {
    /// Name of the store, used as the log prefix
    pub const ID: &'static str = "meet";

    pub fn new() -> Self {
        Self::with_settings(&StoreSettings::default())
    }

    pub fn with_settings(settings: &StoreSettings) -> Self {
        let (sender, _) = broadcast::channel(settings.channel_capacity());
        debug!(
            "Creating meet store (event_capacity={}, log_changes={})",
            settings.channel_capacity(),
            settings.log_changes
        );

        Self {
            inner: RwLock::new(Inner {
                state: MeetState::default(),
                revision: 0,
            }),
            sender,
            log_changes: settings.log_changes,
        }
    }

    // The record has no cross-field invariants, so a writer that panicked
    // mid-assignment cannot leave it inconsistent.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: MeetEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                log::trace!("Meet event published to {} subscribers", receiver_count);
            }
            Err(_) => {
                log::trace!("Meet event published with no subscribers");
            }
        }
    }

    fn log_ctx(&self, operation: &str) -> Option<MeetLogContext> {
        self.log_changes
            .then(|| crate::meet_log!(Self::ID, operation))
    }

    /// Returns a snapshot of the current state.
    pub fn get(&self) -> MeetState {
        self.read().state.clone()
    }

    pub fn get_field(&self, field: Field) -> FieldValue {
        self.read().state.field(field)
    }

    /// Number of changes applied since the store was created.
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// Assigns one field. No validation is performed.
    pub fn set(&self, value: FieldValue) {
        let mut inner = self.write();
        self.assign(&mut inner, value, "set");
    }

    // Published under the lock so subscribers see revision order.
    fn assign(&self, inner: &mut Inner, value: FieldValue, operation: &str) {
        inner.state.apply(value.clone());
        inner.revision += 1;
        let revision = inner.revision;

        if let Some(ctx) = self.log_ctx(operation) {
            ctx.log_field_change(revision, &value);
        }

        self.publish(MeetEvent::FieldChanged {
            revision,
            value,
            changed_at: now_ms(),
        });
    }

    pub fn set_instructor(&self, instructor: Option<Participant>) {
        self.set(FieldValue::Instructor(instructor));
    }

    pub fn set_students(&self, students: Vec<Participant>) {
        self.set(FieldValue::Students(students));
    }

    pub fn set_remote_users(&self, remote_users: Vec<RemoteUser>) {
        self.set(FieldValue::RemoteUsers(remote_users));
    }

    pub fn set_local_video_track(&self, track: Option<LocalTrack>) {
        self.set(FieldValue::LocalVideoTrack(track));
    }

    pub fn set_local_audio_track(&self, track: Option<LocalTrack>) {
        self.set(FieldValue::LocalAudioTrack(track));
    }

    /// Applies several assignments as a single change.
    ///
    /// Later values for the same field win. An empty patch changes nothing
    /// and publishes nothing.
    pub fn patch(&self, values: impl IntoIterator<Item = FieldValue>) {
        let values: Vec<FieldValue> = values.into_iter().collect();
        if values.is_empty() {
            if let Some(ctx) = self.log_ctx("patch") {
                ctx.log_debug("empty patch ignored");
            }
            return;
        }

        let mut fields: Vec<Field> = Vec::with_capacity(values.len());
        let mut inner = self.write();
        for value in values {
            let field = value.field();
            if !fields.contains(&field) {
                fields.push(field);
            }
            inner.state.apply(value);
        }
        inner.revision += 1;
        let revision = inner.revision;

        if let Some(ctx) = self.log_ctx("patch") {
            ctx.log_fields_changed(revision, &fields);
        }

        self.publish(MeetEvent::Patched {
            revision,
            fields,
            changed_at: now_ms(),
        });
    }

    /// Restores every field to its default.
    pub fn reset(&self) {
        let mut inner = self.write();
        inner.state = MeetState::default();
        inner.revision += 1;
        let revision = inner.revision;

        if let Some(ctx) = self.log_ctx("reset") {
            ctx.log_success(format!("rev={} all fields cleared", revision));
        }

        self.publish(MeetEvent::Reset {
            revision,
            changed_at: now_ms(),
        });
    }

    /// Appends a student to the end of the list.
    pub fn add_student(&self, student: Participant) {
        let mut inner = self.write();
        let mut students = inner.state.students.clone();
        students.push(student);
        self.assign(&mut inner, FieldValue::Students(students), "add_student");
    }

    /// Removes every student with the given id. Returns false if none matched.
    pub fn remove_student(&self, id: &str) -> bool {
        let mut inner = self.write();
        if !inner.state.students.iter().any(|s| s.id == id) {
            if let Some(ctx) = self.log_ctx("remove_student") {
                ctx.log_warning(format!("no student with id {}", id));
            }
            return false;
        }

        let students: Vec<Participant> = inner
            .state
            .students
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        self.assign(&mut inner, FieldValue::Students(students), "remove_student");
        true
    }

    /// Replaces the remote user with the same uid in place, or appends it.
    pub fn upsert_remote_user(&self, user: RemoteUser) {
        let mut inner = self.write();
        let mut users = inner.state.remote_users.clone();
        match users.iter_mut().find(|u| u.uid == user.uid) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
        self.assign(&mut inner, FieldValue::RemoteUsers(users), "upsert_remote_user");
    }

    /// Removes the remote user with the given uid. Returns false if absent.
    pub fn remove_remote_user(&self, uid: &str) -> bool {
        let mut inner = self.write();
        if !inner.state.remote_users.iter().any(|u| u.uid == uid) {
            if let Some(ctx) = self.log_ctx("remove_remote_user") {
                ctx.log_warning(format!("no remote user with uid {}", uid));
            }
            return false;
        }

        let users: Vec<RemoteUser> = inner
            .state
            .remote_users
            .iter()
            .filter(|u| u.uid != uid)
            .cloned()
            .collect();
        self.assign(&mut inner, FieldValue::RemoteUsers(users), "remove_remote_user");
        true
    }

    /// Subscribes to change events.
    ///
    /// The receiver only sees changes applied after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MeetEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MeetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::meet::TrackKind;
    use std::sync::Arc;

    #[test]
    fn test_new_store_has_defaults() {
        let store = MeetStore::new();
        let state = store.get();

        assert!(state.students.is_empty());
        assert!(state.remote_users.is_empty());
        assert_eq!(state.instructor, None);
        assert_eq!(state.local_video_track, None);
        assert_eq!(state.local_audio_track, None);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_set_then_get_every_field() {
        let store = MeetStore::new();
        let values = vec![
            FieldValue::Instructor(Some(Participant::new("t1").with_display_name("Ms. T"))),
            FieldValue::Students(vec![Participant::new("s1")]),
            FieldValue::RemoteUsers(vec![RemoteUser::new("r1")]),
            FieldValue::LocalVideoTrack(Some(LocalTrack::new(TrackKind::Video, "cam"))),
            FieldValue::LocalAudioTrack(Some(LocalTrack::new(TrackKind::Audio, "mic"))),
        ];

        for value in values {
            store.set(value.clone());
            assert_eq!(store.get_field(value.field()), value);
        }
        assert_eq!(store.revision(), 5);
    }

    #[test]
    fn test_students_keep_order() {
        let store = MeetStore::new();
        let s1 = Participant::new("s1");
        let s2 = Participant::new("s2");

        store.set_students(vec![s1.clone(), s2.clone()]);

        assert_eq!(store.get().students, vec![s1, s2]);
    }

    #[test]
    fn test_fields_are_independent() {
        let store = MeetStore::new();
        store.set_local_video_track(Some(LocalTrack::new(TrackKind::Video, "cam")));

        assert_eq!(store.get().instructor, None);
        assert_eq!(store.get_field(Field::Instructor), FieldValue::Instructor(None));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = MeetStore::new();
        let b = MeetStore::new();

        a.set_students(vec![Participant::new("s1")]);

        assert_eq!(a.get().students.len(), 1);
        assert!(b.get().students.is_empty());
        assert_eq!(b.revision(), 0);
    }

    #[test]
    fn test_patch_is_one_revision() {
        let store = MeetStore::new();
        store.patch(vec![
            FieldValue::Instructor(Some(Participant::new("t1"))),
            FieldValue::Students(vec![Participant::new("s1")]),
            FieldValue::Students(vec![Participant::new("s2")]),
        ]);

        let state = store.get();
        assert_eq!(state.instructor, Some(Participant::new("t1")));
        assert_eq!(state.students, vec![Participant::new("s2")]);
        assert_eq!(store.revision(), 1);

        store.patch(Vec::new());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = MeetStore::new();
        store.set_instructor(Some(Participant::new("t1")));
        store.upsert_remote_user(RemoteUser::new("r1"));

        store.reset();

        assert_eq!(store.get(), MeetState::default());
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_add_and_remove_student() {
        let store = MeetStore::new();
        store.add_student(Participant::new("s1"));
        store.add_student(Participant::new("s2"));

        assert!(store.remove_student("s1"));
        assert_eq!(store.get().students, vec![Participant::new("s2")]);

        let revision = store.revision();
        assert!(!store.remove_student("missing"));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_upsert_remote_user_replaces_in_place() {
        let store = MeetStore::new();
        store.upsert_remote_user(RemoteUser::new("r1"));
        store.upsert_remote_user(RemoteUser::new("r2"));

        let mut updated = RemoteUser::new("r1");
        updated.has_video = true;
        store.upsert_remote_user(updated.clone());

        let users = store.get().remote_users;
        assert_eq!(users.len(), 2);
        assert_eq!(users[0], updated);
        assert_eq!(users[1].uid, "r2");
    }

    #[test]
    fn test_remove_remote_user() {
        let store = MeetStore::new();
        store.upsert_remote_user(RemoteUser::new("r1"));

        assert!(store.remove_remote_user("r1"));
        assert!(store.get().remote_users.is_empty());
        assert!(!store.remove_remote_user("r1"));
    }

    #[test]
    fn test_set_without_subscribers_succeeds() {
        let store = MeetStore::new();
        assert_eq!(store.subscriber_count(), 0);

        store.set_instructor(Some(Participant::new("t1")));
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_receives_field_change() {
        let store = MeetStore::new();
        let mut receiver = store.subscribe();

        store.set_students(vec![Participant::new("s1")]);

        match receiver.recv().await {
            Ok(MeetEvent::FieldChanged {
                revision, value, ..
            }) => {
                assert_eq!(revision, 1);
                assert_eq!(value, FieldValue::Students(vec![Participant::new("s1")]));
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_events_arrive_in_revision_order() {
        let store = MeetStore::new();
        let mut receiver = store.subscribe();

        store.set_instructor(Some(Participant::new("t1")));
        store.patch(vec![FieldValue::RemoteUsers(vec![RemoteUser::new("r1")])]);
        store.reset();

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        let third = receiver.recv().await.unwrap();

        assert_eq!(first.revision(), 1);
        assert!(matches!(
            second,
            MeetEvent::Patched { revision: 2, ref fields, .. } if fields == &vec![Field::RemoteUsers]
        ));
        assert!(matches!(third, MeetEvent::Reset { revision: 3, .. }));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let store = MeetStore::new();
        let mut receiver1 = store.subscribe();
        let mut receiver2 = store.subscribe();

        store.set_local_audio_track(None);

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_no_event_for_noop_removal() {
        let store = MeetStore::new();
        let mut receiver = store.subscribe();

        assert!(!store.remove_remote_user("ghost"));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lagged_subscriber_resyncs() {
        let settings = StoreSettings {
            event_capacity: 0,
            ..StoreSettings::default()
        };
        let store = MeetStore::with_settings(&settings);
        let mut receiver = store.subscribe();

        store.add_student(Participant::new("s1"));
        store.add_student(Participant::new("s2"));

        match receiver.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => assert_eq!(skipped, 1),
            other => panic!("Expected lag, got {:?}", other),
        }

        // Resync from the snapshot
        assert_eq!(
            store.get().students,
            vec![Participant::new("s1"), Participant::new("s2")]
        );
        assert_eq!(receiver.recv().await.unwrap().revision(), 2);
    }

    #[tokio::test]
    async fn test_with_settings_applies_capacity() {
        let settings = StoreSettings {
            event_capacity: 2,
            log_changes: false,
            ..StoreSettings::default()
        };
        let store = MeetStore::with_settings(&settings);
        assert!(!store.log_changes);

        let mut receiver = store.subscribe();
        store.set_instructor(Some(Participant::new("t1")));
        store.set_instructor(None);
        assert_eq!(receiver.recv().await.unwrap().revision(), 1);
        assert_eq!(receiver.recv().await.unwrap().revision(), 2);

        store.set_students(Vec::new());
        store.set_students(Vec::new());
        store.set_students(Vec::new());
        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(store.revision(), 5);
    }

    #[test]
    fn test_event_serialization() {
        let event = MeetEvent::FieldChanged {
            revision: 3,
            value: FieldValue::Students(vec![Participant::new("s1")]),
            changed_at: 1705340400000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "fieldChanged",
                "revision": 3,
                "value": {
                    "field": "students",
                    "value": [{ "id": "s1", "displayName": null }]
                },
                "changedAt": 1705340400000i64
            })
        );

        let event = MeetEvent::Reset {
            revision: 4,
            changed_at: 0,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"reset\""));
    }

    #[test]
    fn test_concurrent_writers_all_apply() {
        let store = Arc::new(MeetStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.set_instructor(Some(Participant::new(format!("t{}", i))));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.revision(), 8);
        assert!(store.get().instructor.is_some());
    }
}
