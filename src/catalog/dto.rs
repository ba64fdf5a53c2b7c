use serde::Deserialize;

/// One row of the sheet's CSV export. The sheet may carry extra columns (the
/// first one is usually a row index); only the named headers are read.
#[derive(Debug, Deserialize)]
pub struct SheetRow {
    pub url: String,
    pub certified: String,
    #[serde(default)]
    pub course_hour: Option<f64>,
}
