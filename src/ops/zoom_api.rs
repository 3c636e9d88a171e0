use log::{debug, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value as JSValue;

use match_sheet::{
    CreatedMeeting, HostUser, Livestream, MeetingProvider, MeetingRequest, RemoteError,
};

use crate::ops::rest::{endpoint, send_empty, send_json};

pub const ZOOM_BASE: &str = "https://api.zoom.us/v2";
const USERS_PAGE_SIZE: &str = "300";
/// Path alias of the user owning the token.
const TOKEN_OWNER: &str = "me";

/// Zoom v2 over REST, authenticated with an account credentials token.
pub struct ZoomApi {
    http: Client,
    token: String,
    base: String,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    page_count: u32,
    #[serde(default)]
    page_number: u32,
    #[serde(default)]
    users: Vec<HostUser>,
}

#[derive(Deserialize)]
struct ZoomMeeting {
    // A JSON number too large for some clients; kept as text.
    id: JSValue,
    #[serde(default)]
    join_url: String,
    #[serde(default)]
    password: String,
}

impl ZoomMeeting {
    fn into_created(self) -> CreatedMeeting {
        let id = match self.id {
            JSValue::String(s) => s,
            other => other.to_string(),
        };
        CreatedMeeting {
            join_url: self.join_url,
            id,
            password: self.password,
        }
    }
}

/// The path user of a meeting creation. Without a host the meeting goes to
/// the account owning the token.
fn meeting_owner<'a>(host: Option<&'a str>, topic: &str) -> &'a str {
    match host {
        Some(id) => id,
        None => {
            warn!("create_meeting: {} has no host, creating it as the token owner", topic);
            TOKEN_OWNER
        }
    }
}

impl ZoomApi {
    pub fn new(http: Client, token: String) -> ZoomApi {
        ZoomApi {
            http,
            token,
            base: ZOOM_BASE.to_string(),
        }
    }

    fn users_page(&self, page_number: u32) -> Result<UsersPage, RemoteError> {
        let url = endpoint(&self.base, &["users"])?;
        let page = page_number.to_string();
        let request = self.http.get(url).bearer_auth(&self.token).query(&[
            ("status", "active"),
            ("page_size", USERS_PAGE_SIZE),
            ("page_number", page.as_str()),
        ]);
        send_json(request, "users")
    }
}

impl MeetingProvider for ZoomApi {
    fn active_users(&self) -> Result<Vec<HostUser>, RemoteError> {
        let mut users: Vec<HostUser> = Vec::new();
        let mut page_number = 1;
        loop {
            let page = self.users_page(page_number)?;
            users.extend(page.users);
            debug!(
                "active_users: page {} of {}",
                page.page_number, page.page_count
            );
            if page.page_number >= page.page_count {
                break;
            }
            page_number = page.page_number + 1;
        }
        Ok(users)
    }

    fn create_meeting(
        &self,
        host: Option<&str>,
        request: &MeetingRequest,
    ) -> Result<CreatedMeeting, RemoteError> {
        let user = meeting_owner(host, &request.topic);
        let url = endpoint(&self.base, &["users", user, "meetings"])?;
        let r = self.http.post(url).bearer_auth(&self.token).json(request);
        let meeting: ZoomMeeting = send_json(r, &format!("user {}", user))?;
        Ok(meeting.into_created())
    }

    fn meeting(&self, meeting_id: &str) -> Result<CreatedMeeting, RemoteError> {
        let url = endpoint(&self.base, &["meetings", meeting_id])?;
        let request = self.http.get(url).bearer_auth(&self.token);
        let meeting: ZoomMeeting = send_json(request, &format!("meeting {}", meeting_id))?;
        Ok(meeting.into_created())
    }

    fn delete_meeting(&self, meeting_id: &str) -> Result<(), RemoteError> {
        let url = endpoint(&self.base, &["meetings", meeting_id])?;
        let request = self.http.delete(url).bearer_auth(&self.token);
        send_empty(request, &format!("meeting {}", meeting_id))
    }

    fn update_livestream(&self, meeting_id: &str, stream: &Livestream) -> Result<(), RemoteError> {
        let url = endpoint(&self.base, &["meetings", meeting_id, "livestream"])?;
        let request = self.http.patch(url).bearer_auth(&self.token).json(stream);
        send_empty(request, &format!("meeting {}", meeting_id))
    }
}
