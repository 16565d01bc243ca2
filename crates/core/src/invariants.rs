//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use crate::models::RoomRecord;
use crate::status::Status;

/// Validate that a playback status is usable for projection
pub fn assert_status_invariants(status: &Status) {
    debug_assert!(
        status.seek.is_finite(),
        "Status seek {} is not finite",
        status.seek
    );

    debug_assert!(
        status.rate.is_finite(),
        "Status rate {} is not finite",
        status.rate
    );
}

/// Validate a freshly built room record before it is stored
pub fn assert_room_record_invariants(record: &RoomRecord) {
    // Name must not be empty
    debug_assert!(
        !record.name.trim().is_empty(),
        "Room {} has empty name",
        record.id
    );

    debug_assert!(
        !record.id.is_nil(),
        "Room {} has nil id",
        record.name
    );
}
