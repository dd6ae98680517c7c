/// Windows-safe per-category output name: `{prefix}_{category}.{ext}`.
pub fn category_filename(prefix: &str, category: &str, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", sanitize_component(category))
}

fn sanitize_component(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) || c.is_whitespace() { '_' } else { c })
        .collect();

    // Collapse runs of underscores.
    let mut compacted = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '_' && compacted.ends_with('_') {
            continue;
        }
        compacted.push(c);
    }

    let mut name = compacted.trim_matches(&['_', '.'][..]).to_string();
    if name.is_empty() {
        name = "uncategorized".to_string();
    }
    if name.chars().count() > 40 {
        name = name.chars().take(40).collect();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::category_filename;

    #[test]
    fn category_names_keep_unicode() {
        assert_eq!(category_filename("tv_sources", "央视", "m3u"), "tv_sources_央视.m3u");
    }

    #[test]
    fn forbidden_characters_are_replaced() {
        assert_eq!(
            category_filename("tv_sources", "News / Sport: HD", "txt"),
            "tv_sources_News_Sport_HD.txt"
        );
        assert_eq!(category_filename("tv_sources", "??", "txt"), "tv_sources_uncategorized.txt");
        assert_eq!(category_filename("tv_sources", "con", "m3u"), "tv_sources_con_.m3u");
    }
}
