use std::path::Path;
use std::time::Duration;

use log::info;
use snafu::prelude::*;

use match_sheet::{ColumnLayout, DocumentForge, Reconciler, SyncError, Window, Worksheet};

use crate::args::{Args, Command};
use crate::ops::config_reader::*;
use crate::ops::drive_api::DriveApi;
use crate::ops::sheets_api::SheetsApi;
use crate::ops::zoom_api::ZoomApi;

pub mod auth;
pub mod config_reader;
pub mod drive_api;
pub mod rest;
pub mod sheets_api;
pub mod zoom_api;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum OpsError {
    #[snafu(display("Error opening file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing {path}"))]
    ParsingYaml {
        source: serde_yaml::Error,
        path: String,
    },
    #[snafu(display("Error parsing service account key {path}"))]
    ParsingKey {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error signing the token request"))]
    SigningToken { source: jsonwebtoken::errors::Error },
    #[snafu(display("Error requesting an access token from {url}"))]
    TokenRequest { source: reqwest::Error, url: String },
    #[snafu(display("Token request to {url} rejected with status {status}: {body}"))]
    TokenRejected {
        url: String,
        status: u16,
        body: String,
    },
    #[snafu(display("Error building the HTTP client"))]
    HttpClient { source: reqwest::Error },
    #[snafu(display("The configuration has no {name} section"))]
    MissingSection { name: String },
    #[snafu(display("{source}"))]
    Sync { source: SyncError },
}

pub type OpsResult<T> = Result<T, OpsError>;

fn http_client() -> OpsResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context(HttpClientSnafu)
}

fn connect_zoom(http: &reqwest::blocking::Client, key_path: &str) -> OpsResult<ZoomApi> {
    let key = read_zoom_key(key_path)?;
    let token = auth::zoom_access_token(http, &key)?;
    Ok(ZoomApi::new(http.clone(), token))
}

fn section<'a, T>(value: &'a Option<T>, name: &str) -> OpsResult<&'a T> {
    value.as_ref().context(MissingSectionSnafu { name })
}

/// Runs one command and returns the number of data rows it processed.
pub fn run(args: &Args) -> OpsResult<usize> {
    let config = read_main_config(&args.config)?;
    info!(
        "run: {} on {} (layout {:?}, {} judges, {} staff)",
        args.command.name(),
        config.file_id,
        config.layout,
        config.judge_num,
        config.staff_num
    );

    let http = http_client()?;
    let key_path = config.key_file_path(Path::new(&args.config));
    let google_token = auth::google_access_token(&http, &key_path)?;
    let sheets = SheetsApi::new(http.clone(), google_token.clone());

    let layout = ColumnLayout::new(config.judge_num, config.staff_num, config.layout);
    let matches =
        Worksheet::open(&sheets, &config.file_id, config.sheets.matches).context(SyncSnafu)?;
    let reconciler = Reconciler::new(
        matches,
        layout,
        &config.prefix,
        Window::new(args.offset, args.limit),
        config.default_year(),
    );

    let drive = DriveApi::new(http.clone(), google_token);
    let forge = DocumentForge::new(&drive, &sheets, Duration::from_millis(config.pacing_ms));
    let processed = match args.command {
        Command::GenerateRoom => {
            let zoom = connect_zoom(&http, &args.key)?;
            let settings = read_meeting_settings(&args.settings)?;
            reconciler.generate_rooms(&zoom, settings)
        }
        Command::ClearRoom => reconciler.clear_rooms(&connect_zoom(&http, &args.key)?),
        Command::UpdateLive => reconciler.update_live(&connect_zoom(&http, &args.key)?),
        Command::GenerateBallot | Command::UpdateBallot => {
            let spec = section(&config.ballot, "ballot")?;
            let votes = Worksheet::open(&sheets, &config.file_id, config.sheets.votes)
                .context(SyncSnafu)?;
            if args.command == Command::GenerateBallot {
                reconciler.generate_ballots(&forge, spec, &votes)
            } else {
                reconciler.update_ballots(&forge, spec, &votes)
            }
        }
        Command::GenerateMemberList => {
            reconciler.generate_member_lists(&forge, section(&config.member_list, "member_list")?)
        }
        Command::GenerateAdvice => {
            reconciler.generate_advice(&forge, section(&config.advice, "advice")?)
        }
        Command::GenerateAggregate => {
            reconciler.generate_aggregates(&forge, section(&config.aggregate, "aggregate")?)
        }
    };
    processed.context(SyncSnafu)
}
