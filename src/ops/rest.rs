// Shared response handling of the REST adapters.

use log::debug;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use match_sheet::RemoteError;

pub fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        message: e.to_string(),
    }
}

/// Maps a failed response onto the error kinds the reconciler distinguishes.
pub fn classify(status: StatusCode, body: String, what: &str) -> RemoteError {
    if status == StatusCode::NOT_FOUND {
        RemoteError::NotFound {
            what: what.to_string(),
        }
    } else {
        RemoteError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let invalid = || RemoteError::Transport {
        message: format!("invalid base url {}", base),
    };
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn checked(request: RequestBuilder, what: &str) -> Result<Response, RemoteError> {
    let response = request.send().map_err(transport)?;
    let status = response.status();
    debug!("{}: {}", what, status);
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().unwrap_or_default();
        Err(classify(status, body, what))
    }
}

pub fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> Result<T, RemoteError> {
    checked(request, what)?.json::<T>().map_err(transport)
}

pub fn send_empty(request: RequestBuilder, what: &str) -> Result<(), RemoteError> {
    checked(request, what).map(|_| ())
}
