use std::ops::Range;

use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value as JSValue;

use match_sheet::{
    a1_to_rowcol, split_range, Grid, InputMode, RemoteError, SheetProps, TableClient, ValueRender,
};

use crate::ops::rest::{endpoint, send_empty, send_json};

pub const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 over REST.
pub struct SheetsApi {
    http: Client,
    token: String,
    base: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JSValue>>,
}

fn render_option(render: ValueRender) -> &'static str {
    match render {
        ValueRender::Formatted => "FORMATTED_VALUE",
        ValueRender::Formula => "FORMULA",
    }
}

fn input_option(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Raw => "RAW",
        InputMode::UserEntered => "USER_ENTERED",
    }
}

/// Formula reads return numbers and booleans unformatted.
fn cell_text(v: &JSValue) -> String {
    match v {
        JSValue::String(s) => s.clone(),
        JSValue::Null => String::new(),
        JSValue::Bool(true) => "TRUE".to_string(),
        JSValue::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

fn to_grid(range: ValueRange) -> Grid {
    range
        .values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect()
}

fn delete_requests(sheet_id: i64, rows: &[Range<u32>]) -> JSValue {
    let requests: Vec<JSValue> = rows
        .iter()
        .map(|r| {
            json!({"deleteDimension": {"range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": r.start,
                "endIndex": r.end,
            }}})
        })
        .collect();
    json!({ "requests": requests })
}

fn choice_request(sheet_id: i64, row: u32, col: u32, options: &[String]) -> JSValue {
    let values: Vec<JSValue> = options
        .iter()
        .map(|o| json!({ "userEnteredValue": o }))
        .collect();
    json!({"requests": [{"setDataValidation": {
        "range": {
            "sheetId": sheet_id,
            "startRowIndex": row - 1,
            "endRowIndex": row,
            "startColumnIndex": col - 1,
            "endColumnIndex": col,
        },
        "rule": {
            "condition": {"type": "ONE_OF_LIST", "values": values},
            "strict": true,
            "showCustomUi": true,
        },
    }}]})
}

impl SheetsApi {
    pub fn new(http: Client, token: String) -> SheetsApi {
        SheetsApi {
            http,
            token,
            base: SHEETS_BASE.to_string(),
        }
    }

    fn sheets(&self, spreadsheet_id: &str) -> Result<Vec<SheetProps>, RemoteError> {
        let url = endpoint(&self.base, &[spreadsheet_id])?;
        let request = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties")]);
        let what = format!("spreadsheet {}", spreadsheet_id);
        let meta: SpreadsheetMeta = send_json(request, &what)?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| SheetProps {
                sheet_id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect())
    }

    fn batch_update(&self, spreadsheet_id: &str, body: &JSValue) -> Result<(), RemoteError> {
        let method = format!("{}:batchUpdate", spreadsheet_id);
        let url = endpoint(&self.base, &[method.as_str()])?;
        let request = self.http.post(url).bearer_auth(&self.token).json(body);
        send_empty(request, &format!("batch update of {}", spreadsheet_id))
    }
}

impl TableClient for SheetsApi {
    fn sheet_props(&self, spreadsheet_id: &str, index: usize) -> Result<SheetProps, RemoteError> {
        self.sheets(spreadsheet_id)?
            .into_iter()
            .nth(index)
            .ok_or_else(|| RemoteError::NotFound {
                what: format!("sheet {} of {}", index, spreadsheet_id),
            })
    }

    fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        render: ValueRender,
    ) -> Result<Grid, RemoteError> {
        let url = endpoint(&self.base, &[spreadsheet_id, "values", range])?;
        let request = self.http.get(url).bearer_auth(&self.token).query(&[
            ("valueRenderOption", render_option(render)),
            ("majorDimension", "ROWS"),
        ]);
        let values: ValueRange = send_json(request, range)?;
        let grid = to_grid(values);
        debug!("read_values: {} -> {} rows", range, grid.len());
        Ok(grid)
    }

    fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError> {
        let url = endpoint(&self.base, &[spreadsheet_id, "values", range])?;
        let request = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", input_option(mode))])
            .json(&json!({"range": range, "majorDimension": "ROWS", "values": values}));
        send_empty(request, range)
    }

    fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
        mode: InputMode,
    ) -> Result<(), RemoteError> {
        let method = format!("{}:append", range);
        let url = endpoint(&self.base, &[spreadsheet_id, "values", method.as_str()])?;
        let request = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .query(&[
                ("valueInputOption", input_option(mode)),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({"majorDimension": "ROWS", "values": rows}));
        send_empty(request, range)
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        rows: &[Range<u32>],
    ) -> Result<(), RemoteError> {
        self.batch_update(spreadsheet_id, &delete_requests(sheet_id, rows))
    }

    fn set_choice_validation(
        &self,
        spreadsheet_id: &str,
        cell: &str,
        options: &[String],
    ) -> Result<(), RemoteError> {
        let (title, a1) = split_range(cell);
        let (row, col) = a1
            .and_then(a1_to_rowcol)
            .ok_or_else(|| RemoteError::Rejected {
                status: 400,
                body: format!("not a cell address: {}", cell),
            })?;
        let sheets = self.sheets(spreadsheet_id)?;
        let sheet = match &title {
            Some(t) => sheets.iter().find(|s| &s.title == t),
            None => sheets.first(),
        }
        .ok_or_else(|| RemoteError::NotFound {
            what: format!("sheet of {} in {}", cell, spreadsheet_id),
        })?;
        self.batch_update(
            spreadsheet_id,
            &choice_request(sheet.sheet_id, row, col, options),
        )
    }
}
