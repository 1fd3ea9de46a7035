//! Column tags on record fields.
//!
//! A tag is a comma-delimited string such as `"user_id,omitempty"`. The first
//! token names the column the field binds to; later tokens are ignored.

/// Returns the column name declared by `tag`, or `None` when the field has no
/// usable tag (empty tag, or an empty first token as in `",opt"`).
///
/// # Examples
///
/// ```
/// use rowmap::record::tag::column_name;
///
/// assert_eq!(column_name("name"), Some("name"));
/// assert_eq!(column_name("created_at,omitempty"), Some("created_at"));
/// assert_eq!(column_name(""), None);
/// ```
pub fn column_name(tag: &str) -> Option<&str> {
    tag.split(',').next().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tag() {
        assert_eq!(column_name("id"), Some("id"));
    }

    #[test]
    fn first_token_wins() {
        assert_eq!(column_name("id,primary,omitempty"), Some("id"));
    }

    #[test]
    fn missing_name() {
        assert_eq!(column_name(""), None);
        assert_eq!(column_name(",omitempty"), None);
    }

    #[test]
    fn whitespace_is_not_trimmed() {
        assert_eq!(column_name(" id"), Some(" id"));
    }
}
