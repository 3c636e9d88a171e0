use clap::{Parser, ValueEnum};

/// Runs one operation of a debate tournament against its matches spreadsheet.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// The operation to run.
    #[clap(value_enum)]
    pub command: Command,

    /// (file path, default config.yaml) The main configuration: spreadsheet, layout and templates.
    #[clap(short, long, value_parser, default_value = "config.yaml")]
    pub config: String,

    /// (file path, default zoom-key.yaml) The credentials of the meeting provider.
    #[clap(short, long, value_parser, default_value = "zoom-key.yaml")]
    pub key: String,

    /// (file path, default zoom-setting.yaml) The settings forwarded to every created meeting.
    #[clap(short, long, value_parser, default_value = "zoom-setting.yaml")]
    pub settings: String,

    /// (default 0) Number of data rows to skip. Use it to resume an interrupted run.
    #[clap(long, value_parser, default_value_t = 0)]
    pub offset: usize,

    /// (optional) Exclusive upper bound on the data row index. Rows from the offset up to it are processed.
    #[clap(long, value_parser)]
    pub limit: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    GenerateRoom,
    ClearRoom,
    GenerateBallot,
    GenerateMemberList,
    GenerateAggregate,
    GenerateAdvice,
    UpdateLive,
    UpdateBallot,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GenerateRoom => "generate-room",
            Command::ClearRoom => "clear-room",
            Command::GenerateBallot => "generate-ballot",
            Command::GenerateMemberList => "generate-member-list",
            Command::GenerateAggregate => "generate-aggregate",
            Command::GenerateAdvice => "generate-advice",
            Command::UpdateLive => "update-live",
            Command::UpdateBallot => "update-ballot",
        }
    }
}
