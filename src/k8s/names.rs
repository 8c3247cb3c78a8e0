//! Object name helpers

/// Lowercase a name and strip the whitespace users tend to paste in
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r' | '\t'))
        .collect()
}

/// Validate an RFC 1123 DNS label (volume, container and port names)
pub fn validate_dns_label(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name.len() > 63 {
        return Err(format!("name must be at most 63 characters, got {}", name.len()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("name must consist of lowercase alphanumerics or '-'".to_string());
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err("name must start and end with an alphanumeric character".to_string());
    }
    Ok(())
}

/// Return the first non-empty value
pub fn first_non_empty<'a>(values: &[&'a str]) -> &'a str {
    values.iter().copied().find(|v| !v.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" My Data\n"), "mydata");
        assert_eq!(normalize("config\tmap"), "configmap");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_validate_dns_label() {
        assert!(validate_dns_label("data").is_ok());
        assert!(validate_dns_label("pg-wal-0").is_ok());
        assert!(validate_dns_label("").is_err());
        assert!(validate_dns_label("-data").is_err());
        assert!(validate_dns_label("data_dir").is_err());
        assert!(validate_dns_label(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty(&["", "demo", "default"]), "demo");
        assert_eq!(first_non_empty(&["", ""]), "");
    }
}
