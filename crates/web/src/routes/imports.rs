//! Bulk vessel import.
//!
//! Uploads a CSV or Excel file to the API, which imports row by row and
//! reports created rows and per-row failures. A partially failed import
//! still keeps the rows that succeeded.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::{ActiveOrg, PageShell, fetch_profile, require_org_admin};
use crate::api::ImportReport;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OrgSelection, RequireAuth};
use crate::state::AppState;

const IMPORT_PAGE: &str = "/settings/vessels/import";

/// Accepted spreadsheet extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Import form and report template.
#[derive(Template, WebTemplate)]
#[template(path = "imports/index.html")]
pub struct ImportTemplate {
    pub shell: PageShell,
    pub report: Option<ReportView>,
}

/// Import report display data.
#[derive(Clone)]
pub struct ReportView {
    pub success: bool,
    pub created_count: u32,
    pub error_count: u32,
    pub created: Vec<String>,
    pub errors: Vec<RowErrorView>,
}

/// One failed row.
#[derive(Clone)]
pub struct RowErrorView {
    pub row: String,
    pub error: String,
}

impl From<&ImportReport> for ReportView {
    fn from(report: &ImportReport) -> Self {
        Self {
            success: report.success,
            created_count: report.created_count,
            error_count: report.error_count,
            created: report.created.iter().map(|v| v.name.clone()).collect(),
            errors: report
                .errors
                .iter()
                .map(|e| RowErrorView {
                    // Row 0 is a whole-file failure, not a spreadsheet row.
                    row: if e.row == 0 {
                        "file".to_string()
                    } else {
                        e.row.to_string()
                    },
                    error: e.error.clone(),
                })
                .collect(),
        }
    }
}

fn has_allowed_extension(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| e.eq_ignore_ascii_case(allowed))
        })
}

/// Display the upload form.
#[instrument(skip(state, session, user))]
pub async fn form(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
) -> Response {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    if let Err(response) =
        require_org_admin(&session, &user, &profile, selection, IMPORT_PAGE).await
    {
        return response;
    }

    let shell = match PageShell::build(&session, &user, None).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };

    ImportTemplate {
        shell,
        report: None,
    }
    .into_response()
}

/// Handle the upload and render the report.
///
/// A transport failure is folded into the report as a single synthetic
/// whole-file error so the page always shows something actionable.
#[instrument(skip(state, session, user, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let org: ActiveOrg =
        match require_org_admin(&session, &user, &profile, selection, IMPORT_PAGE).await {
            Ok(org) => org,
            Err(response) => return Ok(response),
        };

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .ok_or_else(|| AppError::BadRequest("Missing file name".to_string()))?
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((filename, bytes.to_vec()));
        }
    }

    let Some((filename, bytes)) = file else {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    };

    let org_name = org.name.clone();
    let report = if has_allowed_extension(&filename) {
        match state
            .api()
            .import_vessels(&user.api_token, org.id, filename, bytes)
            .await
        {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(error = %error, "Vessel import upload failed");
                ImportReport::transport_failure(error.toast_message())
            }
        }
    } else {
        ImportReport::transport_failure(
            "Unsupported file type. Upload a .csv, .xlsx, or .xls file.".to_string(),
        )
    };

    let shell = PageShell::build(&session, &user, Some(org_name)).await?;
    Ok(ImportTemplate {
        shell,
        report: Some(ReportView::from(&report)),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_check() {
        assert!(has_allowed_extension("fleet.csv"));
        assert!(has_allowed_extension("Fleet List.XLSX"));
        assert!(has_allowed_extension("old.xls"));
        assert!(!has_allowed_extension("fleet.pdf"));
        assert!(!has_allowed_extension("fleet"));
        assert!(!has_allowed_extension("csv"));
    }

    #[test]
    fn test_report_view_marks_whole_file_errors() {
        let report = ImportReport::transport_failure("connection reset".to_string());
        let view = ReportView::from(&report);
        assert_eq!(view.errors.len(), 1);
        assert_eq!(view.errors.first().map(|e| e.row.as_str()), Some("file"));
        assert!(!view.success);
    }
}
