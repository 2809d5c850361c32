//! Combine rules: clean header levels to one column name.

use tidy_model::CombineRule;

/// Level text treated as absent by the parenthesized rule.
const NONE_TEXT: &str = "None";

/// Reduces the clean levels of a column to a single name.
pub fn combine_levels(rule: &CombineRule, levels: &[String], parenthesis_sep: &str) -> String {
    match rule {
        CombineRule::Parenthesized => parenthesized(levels, parenthesis_sep),
        CombineRule::Underscore => levels.join("_"),
        CombineRule::Custom(f) => f(levels),
    }
}

/// `first (second<sep>third...)`; a lone level has no parentheses.
fn parenthesized(levels: &[String], sep: &str) -> String {
    let mut kept = levels
        .iter()
        .map(|level| level.trim())
        .filter(|level| !level.is_empty() && *level != NONE_TEXT);
    let Some(base) = kept.next() else {
        return String::new();
    };
    let lowers: Vec<&str> = kept.collect();
    if lowers.is_empty() {
        base.to_string()
    } else {
        format!("{base} ({})", lowers.join(sep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parenthesized() {
        let rule = CombineRule::Parenthesized;
        assert_eq!(combine_levels(&rule, &levels(&["A", "b", "c"]), ", "), "A (b, c)");
        assert_eq!(combine_levels(&rule, &levels(&["A", "b", "c"]), "; "), "A (b; c)");
        assert_eq!(combine_levels(&rule, &levels(&["A"]), ", "), "A");
    }

    #[test]
    fn test_parenthesized_skips_none_text() {
        let rule = CombineRule::Parenthesized;
        assert_eq!(combine_levels(&rule, &levels(&["A", "None", "c"]), ", "), "A (c)");
        assert_eq!(combine_levels(&rule, &levels(&["A", "None"]), ", "), "A");
        assert_eq!(combine_levels(&rule, &levels(&["None"]), ", "), "");
    }

    #[test]
    fn test_underscore_and_custom() {
        assert_eq!(
            combine_levels(&CombineRule::Underscore, &levels(&["A", "b"]), ", "),
            "A_b"
        );
        let rule = CombineRule::custom(|levels| levels.join("/").to_uppercase());
        assert_eq!(combine_levels(&rule, &levels(&["a", "b"]), ", "), "A/B");
    }
}
