use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use match_sheet::{AggregateSpec, ArtifactSpec, BallotSpec, LayoutVersion};

use crate::ops::{OpeningConfigSnafu, OpsResult, ParsingYamlSnafu};

pub const DEFAULT_PACING_MS: u64 = 1000;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Service account key of the spreadsheet owner, relative to the config file.
    pub key_file: String,
}

/// Positions of the sheets inside the spreadsheet.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SheetIndices {
    #[serde(default)]
    pub matches: usize,
    #[serde(default = "default_votes_sheet")]
    pub votes: usize,
}

fn default_votes_sheet() -> usize {
    1
}

impl Default for SheetIndices {
    fn default() -> Self {
        SheetIndices {
            matches: 0,
            votes: default_votes_sheet(),
        }
    }
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING_MS
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MainConfig {
    pub auth: AuthConfig,
    pub file_id: String,
    #[serde(default)]
    pub sheets: SheetIndices,
    /// Prepended to every meeting topic and document title.
    #[serde(default)]
    pub prefix: String,
    pub judge_num: usize,
    #[serde(default)]
    pub staff_num: usize,
    #[serde(default)]
    pub layout: LayoutVersion,
    /// Year of the date header when it only has month and day.
    pub year: Option<i32>,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    pub ballot: Option<BallotSpec>,
    pub member_list: Option<ArtifactSpec>,
    pub aggregate: Option<AggregateSpec>,
    pub advice: Option<ArtifactSpec>,
}

impl MainConfig {
    pub fn default_year(&self) -> i32 {
        self.year.unwrap_or_else(|| Local::now().year())
    }

    pub fn key_file_path(&self, config_path: &Path) -> PathBuf {
        let key = Path::new(&self.auth.key_file);
        match config_path.parent() {
            Some(dir) if key.is_relative() => dir.join(key),
            _ => key.to_path_buf(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ZoomKey {
    #[serde(rename = "client-id")]
    pub client_id: String,
    #[serde(rename = "client-secret")]
    pub client_secret: String,
    #[serde(rename = "account-id")]
    pub account_id: String,
}

fn read_file(path: &str) -> OpsResult<String> {
    fs::read_to_string(path).context(OpeningConfigSnafu { path })
}

pub fn parse_main_config(contents: &str, path: &str) -> OpsResult<MainConfig> {
    serde_yaml::from_str(contents).context(ParsingYamlSnafu { path })
}

pub fn read_main_config(path: &str) -> OpsResult<MainConfig> {
    let config = parse_main_config(&read_file(path)?, path)?;
    debug!("read_main_config: {:?}", config);
    Ok(config)
}

pub fn read_zoom_key(path: &str) -> OpsResult<ZoomKey> {
    serde_yaml::from_str(&read_file(path)?).context(ParsingYamlSnafu { path })
}

/// The settings object sent with every created meeting. An empty file means
/// no settings.
pub fn parse_meeting_settings(contents: &str, path: &str) -> OpsResult<JSValue> {
    if contents.trim().is_empty() {
        return Ok(json!({}));
    }
    let settings: JSValue = serde_yaml::from_str(contents).context(ParsingYamlSnafu { path })?;
    Ok(match settings {
        JSValue::Null => json!({}),
        s => s,
    })
}

pub fn read_meeting_settings(path: &str) -> OpsResult<JSValue> {
    parse_meeting_settings(&read_file(path)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_sheet::LinkSpec;

    const CONFIG: &str = r#"
auth:
  key_file: service-account.json
file_id: 1AbC
prefix: "R1-"
judge_num: 3
staff_num: 2
year: 2026
ballot:
  template_id: tpl-ballot
  folder_id: dir-ballot
  sheet_title: Ballot
  winner_cell: Ballot!B3
  vote_imports: [Ballot!P1, Ballot!P2]
  links:
    - kind: literal
      column: 0
      dest: B1
    - kind: literal
      column: 5
      dest: B2
      per_judge: true
    - kind: rendered
      cell: B1
      dest: B4
    - kind: choice
      columns: [3, 4]
      dest: B3
aggregate:
  template_id: tpl-agg
  folder_id: dir-agg
  points:
    - source: Ballot!P1
      dest: C5
  tally:
    source: Ballot!B3
    affirmative_dest: C8
    negative_dest: D8
"#;

    #[test]
    fn main_config() {
        let config = parse_main_config(CONFIG, "config.yaml").unwrap();
        assert_eq!(config.file_id, "1AbC");
        assert_eq!(config.judge_num, 3);
        assert_eq!(config.staff_num, 2);
        assert_eq!(config.layout, LayoutVersion::Full);
        assert_eq!(config.sheets, SheetIndices::default());
        assert_eq!(config.pacing_ms, DEFAULT_PACING_MS);
        assert_eq!(config.default_year(), 2026);
        assert!(config.member_list.is_none());
        assert!(config.advice.is_none());

        let ballot = config.ballot.unwrap();
        assert_eq!(ballot.winner_cell, "Ballot!B3");
        assert_eq!(ballot.vote_imports.len(), 2);
        assert_eq!(ballot.artifact.sheet_title.as_deref(), Some("Ballot"));
        assert_eq!(
            ballot.artifact.links[1],
            LinkSpec::Literal {
                column: 5,
                dest: "B2".to_string(),
                per_judge: true,
            }
        );
        assert_eq!(
            ballot.artifact.links[3],
            LinkSpec::Choice {
                columns: vec![3, 4],
                dest: "B3".to_string(),
            }
        );

        let aggregate = config.aggregate.unwrap();
        assert_eq!(aggregate.points[0].dest, "C5");
        assert_eq!(aggregate.tally.unwrap().negative_dest, "D8");
        assert!(aggregate.artifact.links.is_empty());
    }

    #[test]
    fn room_only_layout() {
        let config = parse_main_config(
            "auth: {key_file: k.json}\nfile_id: x\njudge_num: 2\nlayout: room-only\npacing_ms: 0\n",
            "config.yaml",
        )
        .unwrap();
        assert_eq!(config.layout, LayoutVersion::RoomOnly);
        assert_eq!(config.pacing_ms, 0);
        assert_eq!(config.prefix, "");
    }

    #[test]
    fn missing_judge_num_is_rejected() {
        assert!(parse_main_config("auth: {key_file: k}\nfile_id: x\n", "config.yaml").is_err());
    }

    #[test]
    fn key_file_is_relative_to_config() {
        let config = parse_main_config(
            "auth: {key_file: sa.json}\nfile_id: x\njudge_num: 1\n",
            "conf/config.yaml",
        )
        .unwrap();
        assert_eq!(
            config.key_file_path(Path::new("conf/config.yaml")),
            PathBuf::from("conf/sa.json")
        );
    }

    #[test]
    fn zoom_key() {
        let key: ZoomKey =
            serde_yaml::from_str("client-id: cid\nclient-secret: secret\naccount-id: acc\n")
                .unwrap();
        assert_eq!(key.client_id, "cid");
        assert_eq!(key.client_secret, "secret");
        assert_eq!(key.account_id, "acc");
    }

    #[test]
    fn meeting_settings() {
        let settings = parse_meeting_settings(
            "waiting_room: true\nauto_recording: cloud\nalternative_hosts: \"\"\n",
            "zoom-setting.yaml",
        )
        .unwrap();
        assert_eq!(
            settings,
            json!({"waiting_room": true, "auto_recording": "cloud", "alternative_hosts": ""})
        );
        assert_eq!(parse_meeting_settings("", "s.yaml").unwrap(), json!({}));
    }
}
