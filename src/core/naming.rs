//! Filename and batch-directory sanitization (§6 "Persisted state layout").
//!
//! Pure functions lifted from the original upload contract: strip control
//! characters and path-hostile punctuation, trim stray dots/spaces, and cap
//! length. Non-ASCII text, including CJK, is preserved untouched.

use once_cell::sync::Lazy;
use regex::Regex;

static FORBIDDEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Sanitize a user-supplied filename: strip control characters and the
/// reserved punctuation set, trim leading/trailing dots and spaces, and
/// truncate to 100 characters. Falls back to `"file"` if the result is
/// empty.
pub fn sanitize_filename(name: &str) -> String {
    sanitize(name, 100)
}

/// Sanitize a user-supplied batch directory name using the same rules as
/// [`sanitize_filename`], capped to 50 characters.
pub fn sanitize_batch_directory_name(name: &str) -> String {
    sanitize(name, 50)
}

/// Generate a fallback batch directory name when none was supplied:
/// `batch_<unix_secs>_<8 hex>`.
pub fn generate_batch_directory_name(unix_secs: u64) -> String {
    let suffix: String = (0..8)
        .map(|_| {
            let n = fastrand::u8(0..16);
            std::char::from_digit(n as u32, 16).unwrap()
        })
        .collect();
    format!("batch_{}_{}", unix_secs, suffix)
}

fn sanitize(name: &str, max_len: usize) -> String {
    let no_control: String = name.chars().filter(|c| !c.is_control()).collect();
    let stripped = FORBIDDEN_PATTERN.replace_all(&no_control, "");
    let trimmed = stripped.trim_matches(|c: char| c == '.' || c == ' ');
    let truncated: String = trimmed.chars().take(max_len).collect();
    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_cjk_characters() {
        assert_eq!(sanitize_filename("报告 v1.md"), "报告 v1.md");
    }

    #[test]
    fn strips_forbidden_punctuation() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?.md"), "abcde.md");
    }

    #[test]
    fn trims_leading_and_trailing_dots_and_spaces() {
        assert_eq!(sanitize_filename("  ..report..  "), "report");
    }

    #[test]
    fn truncates_to_one_hundred_characters() {
        let long_name = "x".repeat(150);
        assert_eq!(sanitize_filename(&long_name).chars().count(), 100);
    }

    #[test]
    fn empty_result_falls_back_to_file() {
        assert_eq!(sanitize_filename("***"), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn batch_directory_name_caps_at_fifty() {
        let long_name = "y".repeat(80);
        assert_eq!(sanitize_batch_directory_name(&long_name).chars().count(), 50);
    }

    #[test]
    fn generated_batch_directory_name_has_expected_shape() {
        let name = generate_batch_directory_name(1_700_000_000);
        assert!(name.starts_with("batch_1700000000_"));
        assert_eq!(name.len(), "batch_1700000000_".len() + 8);
    }
}
