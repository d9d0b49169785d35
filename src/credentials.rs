//! Service credentials.
//!
//! A wrapper either carries an explicit service-account key file or relies on the
//! ambient default credentials of the environment it runs in. Provider bindings read
//! the chosen variant when they build their client.

use crate::cloud::helpers::IntoCloudError;
use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind, JsonMap};
use std::path::{Path, PathBuf};

const APPLICATION_DEFAULT: &str = "application-default";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Key file of a service account
    ServiceAccountFile(PathBuf),
    /// Whatever the environment provides (metadata server, gcloud login, ...)
    #[default]
    ApplicationDefault,
}

impl Credentials {
    pub fn from_option(path: Option<impl Into<PathBuf>>) -> Self {
        path.map_or(Self::ApplicationDefault, |p| {
            Self::ServiceAccountFile(p.into())
        })
    }

    /// Service account email, or `"application-default"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key file cannot be read or is malformed
    pub fn identifier(&self) -> CloudResult<String> {
        match self {
            Self::ApplicationDefault => Ok(APPLICATION_DEFAULT.to_string()),
            Self::ServiceAccountFile(path) => read_client_email(path),
        }
    }

    /// Checks that a service-account key file exists and names a client email
    ///
    /// # Errors
    ///
    /// Returns an `Authentication` error if the file is missing or malformed
    pub fn validate(&self) -> CloudResult<()> {
        self.identifier().map(|_| ())
    }
}

fn read_client_email(path: &Path) -> CloudResult<String> {
    let raw = std::fs::read_to_string(path)
        .into_cloud_error(ErrorKind::Authentication)
        .map_err(|e| e.with_context(path.display().to_string()))?;
    let key: JsonMap = serde_json::from_str(&raw).into_cloud_error(ErrorKind::Authentication)?;

    key.get("client_email")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CloudIOError::new(
                ErrorKind::Authentication,
                format!("{} has no client_email", path.display()),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_application_default() {
        let creds = Credentials::from_option(None::<PathBuf>);
        assert_eq!(creds, Credentials::ApplicationDefault);
        assert_eq!(creds.identifier().unwrap(), "application-default");
    }

    #[test]
    fn test_service_account_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "service_account", "client_email": "svc@proj.iam.gserviceaccount.com"}}"#
        )
        .unwrap();

        let creds = Credentials::from_option(Some(file.path()));
        assert_eq!(
            creds.identifier().unwrap(),
            "svc@proj.iam.gserviceaccount.com"
        );
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_invalid_service_account_files() {
        let missing = Credentials::ServiceAccountFile(PathBuf::from("/no/such/key.json"));
        assert_eq!(
            missing.validate().unwrap_err().kind,
            ErrorKind::Authentication
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"type": "service_account"}}"#).unwrap();
        let no_email = Credentials::ServiceAccountFile(file.path().to_path_buf());
        assert_eq!(
            no_email.validate().unwrap_err().kind,
            ErrorKind::Authentication
        );
    }
}
