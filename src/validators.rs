//! Validation functions for template fields and configuration values.

/// Validate that the title is present.
/// Returns an error message if validation fails, None if valid.
pub fn validate_title(title: &str) -> Option<String> {
    if title.trim().is_empty() {
        Some("Title is required".to_string())
    } else {
        None
    }
}

/// Validate that the description is present.
/// Returns an error message if validation fails, None if valid.
pub fn validate_description(description: &str) -> Option<String> {
    if description.trim().is_empty() {
        Some("Description is required".to_string())
    } else {
        None
    }
}

/// Validate that the template has at least one block.
pub fn validate_blocks(count: usize) -> Option<String> {
    if count == 0 {
        Some("Add at least one block".to_string())
    } else {
        None
    }
}

/// Validate that at least one category is selected.
pub fn validate_categories(count: usize) -> Option<String> {
    if count == 0 {
        Some("Select at least one category".to_string())
    } else {
        None
    }
}

/// Every reason a template cannot be saved, in field order.
pub fn validate_template(template: &crate::template::Template) -> Vec<String> {
    [
        validate_title(&template.title),
        validate_description(&template.description),
        validate_blocks(template.blocks.len()),
        validate_categories(template.category.len()),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Validate a chat message body.
pub fn validate_message(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        Some("Message cannot be empty".to_string())
    } else {
        None
    }
}

/// Validate that a URL looks like an HTTP(S) endpoint.
pub fn validate_endpoint_url(url: &str) -> Option<String> {
    if url.is_empty() {
        return Some("URL cannot be empty".to_string());
    }
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Some("URL must start with http:// or https://".to_string());
    }
    None
}

/// Check if metadata indicates a valid directory (pure function).
/// Returns an error message if validation fails, None if valid.
fn check_directory_metadata(is_dir: bool) -> Option<String> {
    if !is_dir {
        Some("Path is not a directory".to_string())
    } else {
        None
    }
}

/// Convert an I/O error to an appropriate error message for directory validation.
fn directory_error_message(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => "Directory not found".to_string(),
        std::io::ErrorKind::PermissionDenied => "Cannot access directory".to_string(),
        _ => "Invalid path".to_string(),
    }
}

/// Validate that the parent directory of a file path exists.
/// Returns an error message if validation fails, None if valid.
pub fn validate_parent_directory(path: &std::path::Path) -> Option<String> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return None,
    };

    match std::fs::metadata(parent) {
        Ok(metadata) => check_directory_metadata(metadata.is_dir()),
        Err(e) => Some(directory_error_message(&e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title(""), Some("Title is required".to_string()));
        assert_eq!(validate_title(" \t "), Some("Title is required".to_string()));
        assert_eq!(validate_title("Summarizer"), None);
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(
            validate_description(""),
            Some("Description is required".to_string())
        );
        assert_eq!(validate_description("Does things"), None);
    }

    #[test]
    fn test_validate_counts() {
        assert!(validate_blocks(0).is_some());
        assert!(validate_blocks(1).is_none());
        assert!(validate_categories(0).is_some());
        assert!(validate_categories(3).is_none());
    }

    #[test]
    fn test_validate_template_lists_all_problems() {
        let template = crate::template::Template::new();
        assert_eq!(
            validate_template(&template),
            vec![
                "Title is required".to_string(),
                "Description is required".to_string(),
                "Add at least one block".to_string(),
                "Select at least one category".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_message() {
        assert!(validate_message("  ").is_some());
        assert!(validate_message("hi #prompts").is_none());
    }

    #[test]
    fn test_validate_endpoint_url() {
        assert!(validate_endpoint_url("").is_some());
        assert!(validate_endpoint_url("ftp://example.com").is_some());
        assert!(validate_endpoint_url("https://api.openai.com/v1/chat/completions").is_none());
        assert!(validate_endpoint_url("http://localhost:8080/v1").is_none());
    }

    // Tests for check_directory_metadata (pure function)

    #[test]
    fn test_check_directory_metadata_valid_directory() {
        assert_eq!(check_directory_metadata(true), None);
    }

    #[test]
    fn test_check_directory_metadata_not_a_directory() {
        assert_eq!(
            check_directory_metadata(false),
            Some("Path is not a directory".to_string())
        );
    }

    #[test]
    fn test_directory_error_message_not_found() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        assert_eq!(directory_error_message(&error), "Directory not found");
    }

    #[test]
    fn test_directory_error_message_other_error() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "other");
        assert_eq!(directory_error_message(&error), "Invalid path");
    }

    #[test]
    fn test_validate_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_parent_directory(&dir.path().join("db.sqlite")), None);
        assert_eq!(
            validate_parent_directory(&dir.path().join("missing").join("db.sqlite")),
            Some("Directory not found".to_string())
        );
        // Bare file names resolve against the working directory
        assert_eq!(validate_parent_directory(std::path::Path::new("db.sqlite")), None);
    }
}
