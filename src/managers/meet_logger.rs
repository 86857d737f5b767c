//! Structured logging helpers for meet store operations.
//!
//! Every line carries the store id and the operation so changes from
//! several stores can be told apart in one log.
use log::{debug, info, warn};

use super::meet::{Field, FieldValue};

/// Log context for meet store operations
#[derive(Debug, Clone)]
pub struct MeetLogContext {
    pub store_id: String,
    pub operation: String,
}

impl MeetLogContext {
    pub fn new(store_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            operation: operation.into(),
        }
    }

    pub fn log_success(&self, message: impl AsRef<str>) {
        info!(
            "[MEET] [{}] {} - Success: {}",
            self.store_id,
            self.operation,
            message.as_ref()
        );
    }

    pub fn log_warning(&self, warning: impl AsRef<str>) {
        warn!(
            "[MEET] [{}] {} - Warning: {}",
            self.store_id,
            self.operation,
            warning.as_ref()
        );
    }

    pub fn log_debug(&self, message: impl AsRef<str>) {
        debug!(
            "[MEET] [{}] {} - {}",
            self.store_id,
            self.operation,
            message.as_ref()
        );
    }

    /// Log a single field assignment with a short summary of the new value
    pub fn log_field_change(&self, revision: u64, value: &FieldValue) {
        info!(
            "[MEET] [{}] {} - rev={} {} = {}",
            self.store_id,
            self.operation,
            revision,
            value.field(),
            summarize(value)
        );
    }

    pub fn log_fields_changed(&self, revision: u64, fields: &[Field]) {
        let names: Vec<&str> = fields.iter().map(Field::as_str).collect();
        info!(
            "[MEET] [{}] {} - rev={} fields=[{}]",
            self.store_id,
            self.operation,
            revision,
            names.join(", ")
        );
    }
}

/// Macro for creating a meet log context
#[macro_export]
macro_rules! meet_log {
    ($store_id:expr, $operation:expr) => {
        $crate::managers::meet_logger::MeetLogContext::new($store_id, $operation)
    };
}

/// Short, log-friendly rendering of a field value. Track ids and
/// participant ids are kept, bulky details are dropped.
pub fn summarize(value: &FieldValue) -> String {
    match value {
        FieldValue::Instructor(Some(p)) => p.id.clone(),
        FieldValue::Students(list) => format!("{} students", list.len()),
        FieldValue::RemoteUsers(list) => format!("{} remote users", list.len()),
        FieldValue::LocalVideoTrack(Some(t)) | FieldValue::LocalAudioTrack(Some(t)) => {
            format!("track {} ({})", t.id, t.label)
        }
        FieldValue::Instructor(None)
        | FieldValue::LocalVideoTrack(None)
        | FieldValue::LocalAudioTrack(None) => "none".to_string(),
    }
}
