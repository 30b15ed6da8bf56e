use ammonia;

/// Clean user-authored rich text using the ammonia library.
///
/// Question statements and explanations may embed markup (formatting, math
/// spans, image references). This applies whitelist-based sanitization:
/// safe tags (<b>, <p>, <img>, ...) survive, dangerous tags (<script>,
/// <iframe>) and event-handler attributes are stripped before storage.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tags() {
        let cleaned = clean_html("<p>x = 2<script>alert(1)</script></p>");
        assert_eq!(cleaned, "<p>x = 2</p>");
    }

    #[test]
    fn keeps_plain_text() {
        assert_eq!(clean_html("What is 2 + 2?"), "What is 2 + 2?");
    }
}
