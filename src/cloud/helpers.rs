//! Resource path construction and validation shared by the service wrappers.

use crate::cloud::traits::{CloudIOError, CloudResult, ErrorKind};

// ============================================================================
// Resource Paths
// ============================================================================

/// Fully qualified topic path, `projects/{project}/topics/{topic}`
///
/// # Errors
///
/// Returns an error if the project id is empty or the topic name is invalid
pub fn topic_path(project_id: &str, topic: &str) -> CloudResult<String> {
    resource_path(project_id, "topics", topic)
}

/// Fully qualified subscription path, `projects/{project}/subscriptions/{subscription}`
///
/// # Errors
///
/// Returns an error if the project id is empty or the subscription name is invalid
pub fn subscription_path(project_id: &str, subscription: &str) -> CloudResult<String> {
    resource_path(project_id, "subscriptions", subscription)
}

fn resource_path(project_id: &str, collection: &str, name: &str) -> CloudResult<String> {
    if project_id.is_empty() {
        return Err(CloudIOError::invalid_input("Project id cannot be empty"));
    }
    validate_resource_name(name)?;
    Ok(format!("projects/{project_id}/{collection}/{name}"))
}

// ============================================================================
// Error Conversion Helpers
// ============================================================================

/// Convert common error types to `CloudIOError`
pub trait IntoCloudError<T> {
    /// Convert a standard Result to a cloud IO Result
    ///
    /// # Errors
    ///
    /// Returns a `CloudIOError` with the specified kind if the Result is an error
    fn into_cloud_error(self, kind: ErrorKind) -> CloudResult<T>;
}

impl<T, E: std::error::Error> IntoCloudError<T> for Result<T, E> {
    fn into_cloud_error(self, kind: ErrorKind) -> CloudResult<T> {
        self.map_err(|e| CloudIOError::new(kind, e.to_string()))
    }
}

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate a topic or subscription name
///
/// # Errors
///
/// Returns an error if:
/// - The resource name is empty
/// - The resource name exceeds 255 characters
/// - The resource name contains characters other than alphanumerics and `-_.~+%`
pub fn validate_resource_name(name: &str) -> CloudResult<()> {
    if name.is_empty() {
        return Err(CloudIOError::invalid_input("Resource name cannot be empty"));
    }

    if name.len() > 255 {
        return Err(CloudIOError::invalid_input(
            "Resource name too long (max 255 characters)",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '+' | '%'))
    {
        return Err(CloudIOError::invalid_input(format!(
            "Resource name contains invalid characters: {name}"
        )));
    }

    Ok(())
}

/// Validate an object path
///
/// # Errors
///
/// Returns an error if:
/// - The key path is empty
/// - The key path starts with a forward slash
pub fn validate_key_path(path: &str) -> CloudResult<()> {
    if path.is_empty() {
        return Err(CloudIOError::invalid_input("Key path cannot be empty"));
    }

    if path.starts_with('/') {
        return Err(CloudIOError::invalid_input("Key path cannot start with '/'"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_paths() {
        assert_eq!(
            topic_path("my-project", "orders").unwrap(),
            "projects/my-project/topics/orders"
        );
        assert_eq!(
            subscription_path("my-project", "orders-sub").unwrap(),
            "projects/my-project/subscriptions/orders-sub"
        );
        assert_eq!(
            topic_path("", "orders").unwrap_err().kind,
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_validate_resource_name() {
        assert!(validate_resource_name("my-resource").is_ok());
        assert!(validate_resource_name("my_resource.v2").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("invalid name with spaces").is_err());
        assert!(validate_resource_name("a/b").is_err());
        assert!(validate_resource_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_key_path() {
        assert!(validate_key_path("path/to/key").is_ok());
        assert!(validate_key_path("key").is_ok());
        assert!(validate_key_path("").is_err());
        assert!(validate_key_path("/absolute/path").is_err());
    }

    #[test]
    fn test_into_cloud_error() {
        let parsed: CloudResult<i32> = "nope".parse::<i32>().into_cloud_error(ErrorKind::InvalidInput);
        assert_eq!(parsed.unwrap_err().kind, ErrorKind::InvalidInput);
    }
}
