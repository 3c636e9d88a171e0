// ********* Meeting provisioning **********

use chrono::NaiveDate;
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::row::{MatchRow, MeetingTriple};
use crate::schedule::{Slot, MEETING_TIMEZONE};
use crate::{DeletionSnafu, LivestreamSnafu, RemoteError, RemoteSnafu, SyncResult};

pub const PASSWORD_LENGTH: usize = 6;
/// Meeting type of a meeting scheduled at a fixed time.
pub const SCHEDULED_MEETING: u8 = 2;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct HostUser {
    pub id: String,
    pub email: String,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct MeetingRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub start_time: String,
    pub duration: u32,
    pub timezone: String,
    pub password: String,
    pub agenda: String,
    pub settings: JSValue,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CreatedMeeting {
    pub join_url: String,
    pub id: String,
    pub password: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Livestream {
    pub stream_url: String,
    pub stream_key: String,
    pub page_url: String,
}

/// The operations this crate needs from the video-conference provider.
pub trait MeetingProvider {
    fn active_users(&self) -> Result<Vec<HostUser>, RemoteError>;

    /// Schedules a meeting. `host` is the provider's user id; `None` is passed
    /// through for the provider to reject or substitute.
    fn create_meeting(
        &self,
        host: Option<&str>,
        request: &MeetingRequest,
    ) -> Result<CreatedMeeting, RemoteError>;

    fn meeting(&self, meeting_id: &str) -> Result<CreatedMeeting, RemoteError>;

    /// Fails with [`RemoteError::NotFound`] when there is no such meeting.
    fn delete_meeting(&self, meeting_id: &str) -> Result<(), RemoteError>;

    fn update_livestream(&self, meeting_id: &str, stream: &Livestream) -> Result<(), RemoteError>;
}

/// A numeric password drawn from the thread-local CSPRNG.
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Creates and removes the meetings of the matches.
pub struct MeetingProvisioner<'p> {
    provider: &'p dyn MeetingProvider,
    prefix: String,
    settings: JSValue,
    date: NaiveDate,
    // Fetched on first use: runs where every row is satisfied make no call.
    users: Option<Vec<HostUser>>,
}

impl<'p> MeetingProvisioner<'p> {
    pub fn new(
        provider: &'p dyn MeetingProvider,
        prefix: &str,
        settings: JSValue,
        date: NaiveDate,
    ) -> MeetingProvisioner<'p> {
        MeetingProvisioner {
            provider,
            prefix: prefix.to_string(),
            settings,
            date,
            users: None,
        }
    }

    fn host_id(&mut self, email: &str) -> SyncResult<Option<String>> {
        if self.users.is_none() {
            let users = self.provider.active_users().context(RemoteSnafu {
                operation: "listing active users",
            })?;
            debug!("host_id: {} active users", users.len());
            self.users = Some(users);
        }
        let found = self
            .users
            .iter()
            .flatten()
            .find(|u| u.email == email)
            .map(|u| u.id.clone());
        if found.is_none() {
            warn!("host {:?} is not an active user, creating without a host", email);
        }
        Ok(found)
    }

    /// The meeting of a row: the existing triple when it is complete, else a
    /// newly created meeting, else an empty triple when creation failed.
    ///
    /// Only the user directory lookup can fail the call.
    pub fn ensure_room(&mut self, row: &MatchRow) -> SyncResult<MeetingTriple> {
        if row.meeting.is_satisfied() {
            debug!("ensure_room: {} already has meeting {}", row.match_name, row.meeting.id);
            return Ok(row.meeting.clone());
        }

        let host = self.host_id(&row.host_email)?;

        let slot = Slot::new(self.date, &row.start_time, &row.end_time);
        let Some((slot, start_time)) = slot.and_then(|s| s.start_time().map(|t| (s, t))) else {
            warn!(
                "ensure_room: {}: cannot schedule {:?} - {:?}",
                row.match_name, row.start_time, row.end_time
            );
            return Ok(MeetingTriple::default());
        };

        let name = format!("{}{}", self.prefix, row.match_name);
        let request = MeetingRequest {
            topic: name.clone(),
            kind: SCHEDULED_MEETING,
            start_time,
            duration: slot.duration_minutes,
            timezone: MEETING_TIMEZONE.to_string(),
            password: generate_password(PASSWORD_LENGTH),
            agenda: name,
            settings: self.settings.clone(),
        };

        match self.provider.create_meeting(host.as_deref(), &request) {
            Ok(m) => {
                info!("ensure_room: {} -> meeting {}", row.match_name, m.id);
                Ok(MeetingTriple {
                    url: m.join_url,
                    id: m.id,
                    password: m.password,
                })
            }
            Err(e) => {
                warn!("ensure_room: creating meeting for {} failed: {}", row.match_name, e);
                Ok(MeetingTriple::default())
            }
        }
    }
}

/// `true` when the meeting was deleted, `false` when it was already gone.
pub fn delete_room(provider: &dyn MeetingProvider, meeting_id: &str) -> SyncResult<bool> {
    match provider.delete_meeting(meeting_id) {
        Ok(()) => {
            info!("delete_room: deleted {}", meeting_id);
            Ok(true)
        }
        Err(RemoteError::NotFound { .. }) => {
            info!("delete_room: {} was already deleted", meeting_id);
            Ok(false)
        }
        Err(source) => Err(source).context(DeletionSnafu { meeting_id }),
    }
}

/// Points the meeting's live stream at the given destination. Every failure
/// is an error: a half-configured stream must stop the run.
pub fn associate_livestream(
    provider: &dyn MeetingProvider,
    meeting_id: &str,
    stream_url: &str,
    stream_key: &str,
    page_url: &str,
) -> SyncResult<()> {
    let meeting = provider
        .meeting(meeting_id)
        .context(LivestreamSnafu { meeting_id })?;
    let stream = Livestream {
        stream_url: stream_url.to_string(),
        stream_key: stream_key.to_string(),
        page_url: page_url.to_string(),
    };
    provider
        .update_livestream(&meeting.id, &stream)
        .context(LivestreamSnafu { meeting_id })?;
    info!("associate_livestream: {} -> {}", meeting_id, stream_url);
    Ok(())
}
