/*!
Row reconciliation for debate tournaments that are run from a spreadsheet.

The matches sheet is the database: one row per match, with fixed column ranges
for meetings, ballots and the other generated documents. Every operation in
this crate reads that sheet, decides per row what already exists and what has
to be created, and writes the derived cells back in one bulk write.

The remote services are reached through three traits:

- [`TableClient`]: the spreadsheet (read, write, append, delete rows, dropdown validation)
- [`DocumentStore`]: copying template documents into folders
- [`MeetingProvider`]: the video-conference provider

The binary crate provides HTTP implementations of these traits. Everything in
here runs against any implementation, which is how the tests run it.
*/

mod config;
pub mod formula;
mod forge;
mod layout;
mod meeting;
mod reconcile;
mod row;
pub mod schedule;
mod table;
mod vote;

#[cfg(test)]
mod testing;

use snafu::Snafu;

pub use crate::config::*;
pub use crate::forge::*;
pub use crate::layout::*;
pub use crate::meeting::*;
pub use crate::reconcile::*;
pub use crate::row::*;
pub use crate::table::*;
pub use crate::vote::*;

/// A failed call to one of the remote services, as classified by the adapter
/// that made it.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum RemoteError {
    #[snafu(display("not found: {what}"))]
    NotFound { what: String },
    #[snafu(display("rejected with status {status}: {body}"))]
    Rejected { status: u16, body: String },
    #[snafu(display("transport error: {message}"))]
    Transport { message: String },
}

/// Errors that stop an operation.
///
/// Per-row provisioning failures are not in here: they are logged and turned
/// into empty cells by the driver.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SyncError {
    #[snafu(display("{operation} failed: {source}"))]
    Remote {
        operation: String,
        source: RemoteError,
    },
    #[snafu(display("missing or malformed date header: {content:?}"))]
    DateHeader { content: String },
    #[snafu(display("livestream association failed for meeting {meeting_id}: {source}"))]
    Livestream {
        meeting_id: String,
        source: RemoteError,
    },
    #[snafu(display("could not delete meeting {meeting_id}: {source}"))]
    Deletion {
        meeting_id: String,
        source: RemoteError,
    },
    #[snafu(display("invalid A1 address {address:?}"))]
    InvalidAddress { address: String },
    #[snafu(display("invalid configuration: {message}"))]
    InvalidConfig { message: String },
}

pub type SyncResult<T> = Result<T, SyncError>;
