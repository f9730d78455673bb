//! Input cleanup for user-supplied text.

/// Trim, drop `<script>` blocks and strip any remaining tags.
pub fn sanitize_string(input: &str) -> String {
    strip_tags(&strip_script_blocks(input.trim()))
        .trim()
        .to_string()
}

fn strip_script_blocks(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(start) = lower[pos..].find("<script").map(|i| i + pos) {
        out.push_str(&input[pos..start]);
        match lower[start..].find("</script>") {
            Some(end) => pos = start + end + "</script>".len(),
            // Unterminated block: drop the rest.
            None => return out,
        }
    }
    out.push_str(&input[pos..]);
    out
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Sanitize an optional field, collapsing blank values to `None`.
pub fn sanitize_optional(input: Option<&str>) -> Option<String> {
    input.map(sanitize_string).filter(|s| !s.is_empty())
}

/// Accept only absolute http(s) URLs.
pub fn is_http_url(input: &str) -> bool {
    url::Url::parse(input)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}
