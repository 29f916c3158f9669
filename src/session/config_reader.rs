use crate::session::*;

use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OfficialSourceConfig {
    /// spreadsheet, csv or image
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
}

/// Replaces parts of the default column locator settings.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocatorOverrides {
    #[serde(rename = "primaryKeywords")]
    pub primary_keywords: Option<Vec<String>>,
    #[serde(rename = "secondaryKeywords")]
    pub secondary_keywords: Option<Vec<String>>,
    #[serde(rename = "ignoreKeywords")]
    pub ignore_keywords: Option<Vec<String>>,
    #[serde(rename = "headerScanRows")]
    pub header_scan_rows: Option<usize>,
    #[serde(rename = "sampleRows")]
    pub sample_rows: Option<usize>,
}

fn lowercase_all(l: &[String]) -> Vec<String> {
    l.iter().map(|s| s.trim().to_lowercase()).collect()
}

impl LocatorOverrides {
    pub fn apply(&self, base: LocatorConfig) -> LocatorConfig {
        let mut res = base;
        // Header cells are compared in lower case.
        if let Some(l) = &self.primary_keywords {
            res.primary_keywords = lowercase_all(l);
        }
        if let Some(l) = &self.secondary_keywords {
            res.secondary_keywords = lowercase_all(l);
        }
        if let Some(l) = &self.ignore_keywords {
            res.ignore_keywords = lowercase_all(l);
        }
        if let Some(x) = self.header_scan_rows {
            res.header_scan_rows = x;
        }
        if let Some(x) = self.sample_rows {
            res.sample_rows = x;
        }
        res
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReviewActions {
    #[serde(default)]
    pub reject: Vec<String>,
    #[serde(rename = "markPresent", default)]
    pub mark_present: Vec<String>,
    #[serde(rename = "markAbsent", default)]
    pub mark_absent: Vec<String>,
    #[serde(rename = "markUnexpected", default)]
    pub mark_unexpected: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(rename = "officialSource")]
    pub official_source: Option<OfficialSourceConfig>,
    #[serde(rename = "participantSources", default)]
    pub participant_sources: Vec<ParticipantSource>,
    pub sensitivity: Option<String>,
    pub locator: Option<LocatorOverrides>,
    pub review: Option<ReviewActions>,
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
}

pub fn read_config(path: &str) -> SessionResult<SessionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SessionConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

/// Reads a reference report.
pub fn read_summary(path: &str) -> SessionResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {} bytes", contents.len());
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
