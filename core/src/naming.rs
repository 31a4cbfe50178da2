//! File names derived from user input.

/// Reduces a user-supplied name to a safe single path component: ASCII
/// only, separators and whitespace runs become `_`, characters outside
/// `[A-Za-z0-9._-]` are dropped, leading and trailing `.`/`_` are stripped.
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;

    for ch in name.chars() {
        if ch.is_whitespace() || ch == '/' || ch == '\\' {
            pending_sep = true;
            continue;
        }
        if !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')) {
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.push(ch);
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `{tag}_{tagType}_v2.{index}{extension}`, sanitized.
pub fn partition_file_name(tag: &str, tag_type: &str, index: usize, extension: &str) -> Option<String> {
    sanitize_file_name(&format!("{tag}_{tag_type}_v2.{index}{extension}"))
}

#[cfg(test)]
mod tests {
    use super::{partition_file_name, sanitize_file_name};

    #[test]
    fn sanitize_strips_traversal_and_unsafe_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("etc_passwd"));
        assert_eq!(sanitize_file_name("My Sales  Data.csv").as_deref(), Some("My_Sales_Data.csv"));
        assert_eq!(sanitize_file_name("café<>|.xlsx").as_deref(), Some("caf.xlsx"));
        assert_eq!(sanitize_file_name("../"), None);
        assert_eq!(sanitize_file_name("   "), None);
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let once = sanitize_file_name(" a b/c._ ").expect("usable name");
        assert_eq!(sanitize_file_name(&once).as_deref(), Some(once.as_str()));
    }

    #[test]
    fn partition_names_follow_version_convention() {
        assert_eq!(partition_file_name("A", "X", 1, ".csv").as_deref(), Some("A_X_v2.1.csv"));
        assert_eq!(
            partition_file_name("North/East", "Tag Type", 12, ".xlsx").as_deref(),
            Some("North_East_Tag_Type_v2.12.xlsx")
        );
    }
}
