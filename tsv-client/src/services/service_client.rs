//! Validation Service HTTP client
//!
//! One multipart `POST /api/validate` per cycle, plus the two fixed report
//! downloads. Failures are classified into [`ValidationError`] here so the
//! orchestrator never sees a raw reqwest error.

use crate::error::ValidationError;
use crate::models::{FileBlob, ValidationRequest};
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION};
use reqwest::multipart::{Form, Part};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tsv_common::api::ReportKind;
use tsv_common::ServiceEndpoints;

const USER_AGENT: &str = concat!("tsv-client/", env!("CARGO_PKG_VERSION"));

/// Seam between the orchestrator and the network
///
/// Returns the raw body of a 2xx response; every other outcome is already
/// classified.
pub trait ValidationTransport: Send + Sync {
    fn dispatch(
        &self,
        request: &ValidationRequest,
    ) -> impl Future<Output = Result<Vec<u8>, ValidationError>> + Send;

    fn endpoints(&self) -> &ServiceEndpoints;
}

/// Report fetched from a download endpoint
#[derive(Debug, Clone)]
pub struct DownloadedReport {
    pub kind: ReportKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DownloadedReport {
    /// Write into `dir` under the served file name
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// reqwest-backed client for one Validation Service
pub struct ServiceClient {
    http_client: reqwest::Client,
    endpoints: ServiceEndpoints,
    timeout: Duration,
}

impl ServiceClient {
    pub fn new(endpoints: ServiceEndpoints, timeout: Duration) -> Result<Self, ValidationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ValidationError::RequestSetup(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoints,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch one report from its fixed endpoint
    pub async fn download_report(&self, kind: ReportKind) -> Result<DownloadedReport, ValidationError> {
        let url = self.endpoints.download(kind);
        tracing::debug!(%url, "Downloading report");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ValidationError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ValidationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| kind.default_file_name().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ValidationError::from_reqwest(e, self.timeout))?;

        tracing::info!(report = %kind, file = %file_name, size = bytes.len(), "Report downloaded");

        Ok(DownloadedReport {
            kind,
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

impl ValidationTransport for ServiceClient {
    async fn dispatch(&self, request: &ValidationRequest) -> Result<Vec<u8>, ValidationError> {
        let mut form = Form::new();
        for (kind, file) in request.parts() {
            form = form.part(kind.field_name(), file_part(file)?);
        }

        let url = self.endpoints.validate();
        tracing::debug!(
            %url,
            term_sheet = %request.term_sheet.name,
            master_sheet = %request.master_sheet.name,
            "Sending validation request"
        );

        let response = self
            .http_client
            .post(url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ValidationError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            // The status is the classification; an unreadable body stays empty
            let body = response.text().await.unwrap_or_default();
            return Err(ValidationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ValidationError::from_reqwest(e, self.timeout))?;

        Ok(body.to_vec())
    }

    fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }
}

fn file_part(file: &FileBlob) -> Result<Part, ValidationError> {
    Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(mime_for(&file.name))
        .map_err(|e| ValidationError::RequestSetup(format!("{}: {}", file.name, e)))
}

fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "csv" => "text/csv",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// `filename` parameter of a Content-Disposition header, path components stripped
fn attachment_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|v| v.trim_matches('"'))
        .and_then(|v| Path::new(v).file_name())
        .and_then(|v| v.to_str())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let endpoints = ServiceEndpoints::parse("http://127.0.0.1:5000").unwrap();
        let client = ServiceClient::new(endpoints, Duration::from_secs(5));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_mime_for_known_types() {
        assert_eq!(mime_for("ts.PDF"), "application/pdf");
        assert_eq!(mime_for("ms.csv"), "text/csv");
        assert_eq!(mime_for("scan.tiff"), "image/tiff");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(
            attachment_file_name(r#"attachment; filename="term_sheet_validation.pdf""#).as_deref(),
            Some("term_sheet_validation.pdf")
        );
        assert_eq!(
            attachment_file_name("attachment; filename=report.xlsx").as_deref(),
            Some("report.xlsx")
        );
        assert_eq!(
            attachment_file_name(r#"attachment; filename="../../etc/passwd""#).as_deref(),
            Some("passwd")
        );
        assert_eq!(attachment_file_name("inline"), None);
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = DownloadedReport {
            kind: ReportKind::Pdf,
            file_name: "term_sheet_validation.pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        };

        let path = report.save_to(&dir.path().join("reports")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF");
    }
}
