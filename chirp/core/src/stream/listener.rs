use super::{StreamError, StreamState};
use crate::model::{Status, StatusDeletionNotice};

/// Receives records and signals from a supervised stream
///
/// All callbacks run on the supervisor thread, one at a time and in arrival
/// order. The next line is not read until the current callback returns.
#[allow(unused_variables)]
pub trait StatusListener: Send + Sync {
    /// A status arrived
    fn on_status(&self, status: Status);

    /// A previously streamed status was deleted
    fn on_deletion_notice(&self, notice: StatusDeletionNotice) {}

    /// `withheld` matching statuses were not delivered because of a track limit
    fn on_track_limitation_notice(&self, withheld: u64) {}

    /// Opening failed, the connection dropped, or a line was unreadable
    fn on_exception(&self, error: &StreamError) {}

    /// The supervisor moved to a new state
    fn on_state_change(&self, state: StreamState) {}
}
