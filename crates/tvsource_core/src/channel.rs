/// Appended to the channel name when no keyword variants are configured.
pub const DEFAULT_KEYWORD_SUFFIX: &str = "直播源";

/// A named live-stream target, e.g. a TV station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub group: String,
    pub keywords: Vec<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Search keywords for this channel, in configured order.
    ///
    /// Blank and duplicate variants are dropped and the list is capped at
    /// `max_keywords` (never below one). A channel without usable variants
    /// searches for `"<name> 直播源"`.
    pub fn search_terms(&self, max_keywords: usize) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for keyword in &self.keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() || terms.iter().any(|t| t == keyword) {
                continue;
            }
            terms.push(keyword.to_string());
        }
        if terms.is_empty() {
            terms.push(format!("{} {DEFAULT_KEYWORD_SUFFIX}", self.name.trim()));
        }
        terms.truncate(max_keywords.max(1));
        terms
    }
}

/// A discovered, unverified stream URL for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub channel: String,
    pub url: String,
}

impl Candidate {
    pub fn new(channel: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Channel;

    #[test]
    fn default_keyword_is_used_without_variants() {
        let channel = Channel::new("CCTV1", "央视");
        assert_eq!(channel.search_terms(3), vec!["CCTV1 直播源".to_string()]);
    }

    #[test]
    fn keywords_are_trimmed_deduplicated_and_capped() {
        let channel = Channel::new("CCTV1", "央视").with_keywords([
            " CCTV-1 ",
            "CCTV-1",
            "",
            "CCTV1综合",
            "CCTV 1",
        ]);
        assert_eq!(
            channel.search_terms(2),
            vec!["CCTV-1".to_string(), "CCTV1综合".to_string()]
        );
    }

    #[test]
    fn zero_keyword_cap_still_searches_once() {
        let channel = Channel::new("翡翠台", "香港").with_keywords(["TVB翡翠", "TVB"]);
        assert_eq!(channel.search_terms(0), vec!["TVB翡翠".to_string()]);
    }
}
