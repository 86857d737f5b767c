use crate::managers::meet::{Field, MeetState, RemoteUser};
use crate::managers::MeetStore;
use log::info;

/// Gets the full meet state.
///
/// # Returns
/// * `MeetState` - Snapshot of every field
pub fn get_meet_state(store: &MeetStore) -> MeetState {
    info!("get_meet_state command called");
    store.get()
}

/// Gets a single field by its front-end name.
///
/// # Arguments
/// * `field` - Field name, e.g. "remoteUsers" or "local_video_track"
///
/// # Returns
/// * `Ok(Value)` - The field value as JSON
/// * `Err(String)` - If the field name is unknown
pub fn get_meet_field(store: &MeetStore, field: String) -> Result<serde_json::Value, String> {
    info!("get_meet_field command called: field={}", field);

    let field: Field = field
        .parse()
        .map_err(|e| format!("Failed to get meet field: {}", e))?;
    Ok(store.get_field(field).to_json())
}

/// Assigns a single field by its front-end name.
///
/// The value is decoded into the field's type before anything is written,
/// so a rejected call leaves the store untouched.
///
/// # Arguments
/// * `field` - Field name, e.g. "students"
/// * `value` - New value as JSON (`null` clears optional fields)
///
/// # Returns
/// * `Ok(())` - If the field was assigned
/// * `Err(String)` - If the field is unknown or the value has the wrong shape
pub fn set_meet_field(
    store: &MeetStore,
    field: String,
    value: serde_json::Value,
) -> Result<(), String> {
    info!("set_meet_field command called: field={}", field);

    let field: Field = field
        .parse()
        .map_err(|e| format!("Failed to set meet field: {}", e))?;
    let value = field
        .value_from_json(value)
        .map_err(|e| format!("Invalid value for {}: {}", field, e))?;

    store.set(value);
    Ok(())
}

/// Restores every field of the meet state to its default.
pub fn reset_meet_state(store: &MeetStore) {
    info!("reset_meet_state command called");
    store.reset();
}

/// Adds or replaces a remote user, keyed by uid.
pub fn upsert_remote_user(store: &MeetStore, user: RemoteUser) {
    info!("upsert_remote_user command called: uid={}", user.uid);
    store.upsert_remote_user(user);
}

/// Removes a remote user.
///
/// # Returns
/// * `true` - If a user with that uid was present and removed
/// * `false` - If no such user existed
pub fn remove_remote_user(store: &MeetStore, uid: String) -> bool {
    info!("remove_remote_user command called: uid={}", uid);
    store.remove_remote_user(&uid)
}
