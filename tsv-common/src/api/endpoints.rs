//! Validation Service endpoint derivation
//!
//! The service exposes one validation endpoint and two fixed,
//! parameterless report downloads. All of them hang off a single base URL.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Multipart field carrying the term sheet
pub const TERM_SHEET_FIELD: &str = "termsheet";

/// Multipart field carrying the master sheet
pub const MASTER_SHEET_FIELD: &str = "mastersheet";

const VALIDATE_PATH: &str = "api/validate";
const DOWNLOAD_PATH: &str = "api/download";

/// Downloadable report produced by the service for the latest cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Pdf,
    Excel,
}

impl ReportKind {
    /// Path segment used by `GET /api/download/<kind>`
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Pdf => "pdf",
            ReportKind::Excel => "excel",
        }
    }

    /// File name the service suggests when none is sent back
    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReportKind::Pdf => "term_sheet_validation.pdf",
            ReportKind::Excel => "term_sheet_validation.xlsx",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ReportKind::Pdf),
            "excel" | "xlsx" => Ok(ReportKind::Excel),
            other => Err(Error::InvalidInput(format!(
                "Unknown report kind '{}' (expected pdf or excel)",
                other
            ))),
        }
    }
}

/// Endpoints of one Validation Service instance
///
/// # Examples
///
/// ```
/// use tsv_common::ServiceEndpoints;
///
/// let endpoints = ServiceEndpoints::parse("http://127.0.0.1:5000").unwrap();
/// assert_eq!(endpoints.validate().as_str(), "http://127.0.0.1:5000/api/validate");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    base: Url,
}

impl ServiceEndpoints {
    /// Parse a base URL, keeping any path prefix the service is mounted under
    pub fn parse(base: &str) -> Result<Self> {
        let mut url = Url::parse(base.trim())
            .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", base, e)))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Service URL must be an http(s) URL: {}",
                base
            )));
        }

        // Url::join replaces the last segment unless the path ends in '/'
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { base: url })
    }

    /// Base URL (always ends with '/')
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST /api/validate`
    pub fn validate(&self) -> Url {
        self.join(VALIDATE_PATH)
    }

    /// `GET /api/download/<kind>`
    pub fn download(&self, kind: ReportKind) -> Url {
        self.join(&format!("{}/{}", DOWNLOAD_PATH, kind.as_str()))
    }

    fn join(&self, path: &str) -> Url {
        // Relative paths without a scheme always join onto a valid base
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_bare_host() {
        let endpoints = ServiceEndpoints::parse("http://localhost:5000").unwrap();
        assert_eq!(
            endpoints.download(ReportKind::Pdf).as_str(),
            "http://localhost:5000/api/download/pdf"
        );
        assert_eq!(
            endpoints.download(ReportKind::Excel).as_str(),
            "http://localhost:5000/api/download/excel"
        );
    }

    #[test]
    fn test_endpoints_keep_path_prefix() {
        let endpoints = ServiceEndpoints::parse("https://example.com/termsheets").unwrap();
        assert_eq!(
            endpoints.validate().as_str(),
            "https://example.com/termsheets/api/validate"
        );
    }

    #[test]
    fn test_endpoints_reject_non_http() {
        assert!(ServiceEndpoints::parse("ftp://example.com").is_err());
        assert!(ServiceEndpoints::parse("not a url").is_err());
        assert!(ServiceEndpoints::parse("mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_report_kind_parse() {
        assert_eq!("PDF".parse::<ReportKind>().unwrap(), ReportKind::Pdf);
        assert_eq!("xlsx".parse::<ReportKind>().unwrap(), ReportKind::Excel);
        assert!("html".parse::<ReportKind>().is_err());
    }
}
