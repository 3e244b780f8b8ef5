use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identity of a created spreadsheet, as reported by the Sheets API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetInfo {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    /// Numeric grid id of the first sheet, needed for formatting requests.
    #[serde(default)]
    pub sheet_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSpreadsheetResponse {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SheetEntry {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveFileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveFile {
    pub id: String,
}

/// Body for a values update/append call: a rectangular block of cells.
pub(crate) fn value_range(range: &str, values: &[Vec<String>]) -> Value {
    json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": values,
    })
}

/// batchUpdate request that bolds the header row and paints its background.
pub(crate) fn header_format_request(sheet_id: i64, columns: usize) -> Value {
    json!({
        "requests": [{
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": 0,
                    "endColumnIndex": columns,
                },
                "cell": {
                    "userEnteredFormat": {
                        "textFormat": { "bold": true },
                        "backgroundColor": { "red": 0.91, "green": 0.94, "blue": 0.996 },
                    }
                },
                "fields": "userEnteredFormat(textFormat,backgroundColor)",
            }
        }]
    })
}
