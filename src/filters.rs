//! Structured search filters and their compilation into query operators.
//!
//! A [`Filters`] value is built once through [`FiltersBuilder`], validated at
//! `build()` time and immutable afterwards. [`Filters::compile`] turns it into
//! the operator string appended to the free-text query.

use crate::{Result, SearchError};
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static FILETYPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{2,10}$").expect("valid filetype pattern"));
static KEYWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+$").expect("valid keyword pattern"));
static TLD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.[a-zA-Z]{2,}$").expect("valid tld pattern"));

/// One or more filter values.
///
/// Built from a single string or from any list of strings, so builder calls read
/// the same for both: `.sites("a.com")` and `.sites(["a.com", "b.com"])`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values(Vec<String>);

impl Values {
    fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// Splits every value on whitespace; used by the word-list families.
    fn words(self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|value| value.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    /// Drops blank entries.
    fn non_blank(self) -> Vec<String> {
        self.0
            .into_iter()
            .filter(|value| !value.trim().is_empty())
            .collect()
    }
}

impl From<&str> for Values {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Values {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<&String> for Values {
    fn from(value: &String) -> Self {
        Self(vec![value.clone()])
    }
}

impl<T: Into<String>> From<Vec<T>> for Values {
    fn from(values: Vec<T>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for Values {
    fn from(values: [T; N]) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }
}

impl From<&[&str]> for Values {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| v.to_string()).collect())
    }
}

/// The fields shared by the include and the exclude side of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FilterGroup {
    sites: Vec<String>,
    tlds: Vec<String>,
    filetypes: Vec<String>,
    keywords: Vec<String>,
    exact_phrases: Vec<String>,
    https: bool,
    title_words: Vec<String>,
    url_words: Vec<String>,
    text_words: Vec<String>,
    all_title_words: Vec<String>,
    all_url_words: Vec<String>,
    all_text_words: Vec<String>,
    before: Option<NaiveDate>,
    after: Option<NaiveDate>,
    related: Vec<String>,
    news_source: Option<String>,
}

impl FilterGroup {
    fn validate(&self, prefix: &str) -> Result<()> {
        for filetype in &self.filetypes {
            if !FILETYPE_PATTERN.is_match(filetype) {
                return Err(SearchError::validation(
                    format!("{prefix}filetypes"),
                    format!("`{filetype}` must be 2-10 ASCII letters or digits"),
                ));
            }
        }

        for keyword in &self.keywords {
            if !KEYWORD_PATTERN.is_match(keyword) {
                return Err(SearchError::validation(
                    format!("{prefix}keywords"),
                    format!("`{keyword}` must be a single token without whitespace"),
                ));
            }
        }

        for tld in &self.tlds {
            if !TLD_PATTERN.is_match(tld) || !crate::tld::is_recognized(tld) {
                return Err(SearchError::validation(
                    format!("{prefix}tlds"),
                    format!("`{tld}` is not a recognized top-level domain"),
                ));
            }
        }

        Ok(())
    }

    /// Appends the terms of this group to `terms`, in compilation order.
    fn compile_into(&self, negate: bool, terms: &mut Vec<String>) {
        let sign = if negate { "-" } else { "" };

        push_family(terms, "site", &self.sites, negate);
        push_family(terms, "site", &self.tlds, negate);
        push_family(terms, "filetype", &self.filetypes, negate);
        push_keywords(terms, &self.keywords, negate);

        terms.extend(self.exact_phrases.iter().map(|p| format!("{sign}\"{p}\"")));

        if self.https {
            terms.push(format!("{sign}inurl:https"));
        }

        for (op, words) in [
            ("intitle", &self.title_words),
            ("inurl", &self.url_words),
            ("intext", &self.text_words),
        ] {
            terms.extend(words.iter().map(|w| format!("{sign}{op}:{w}")));
        }

        for (op, words) in [
            ("allintitle", &self.all_title_words),
            ("allinurl", &self.all_url_words),
            ("allintext", &self.all_text_words),
        ] {
            if !words.is_empty() {
                terms.push(format!("{sign}{op}:{}", words.join(" ")));
            }
        }

        if let Some(date) = self.before {
            terms.push(format!("{sign}before:{}", date.format("%Y-%m-%d")));
        }
        if let Some(date) = self.after {
            terms.push(format!("{sign}after:{}", date.format("%Y-%m-%d")));
        }

        terms.extend(self.related.iter().map(|s| format!("{sign}related:{s}")));

        if let Some(source) = &self.news_source {
            terms.push(format!("{sign}source:{source}"));
        }
    }
}

/// `op:v`, `(op:v1 | op:v2)` or, negated, `-op:v1 -op:v2`.
fn push_family(terms: &mut Vec<String>, op: &str, values: &[String], negate: bool) {
    match values {
        [] => {}
        _ if negate => terms.extend(values.iter().map(|v| format!("-{op}:{v}"))),
        [single] => terms.push(format!("{op}:{single}")),
        _ => {
            let alternatives = values
                .iter()
                .map(|v| format!("{op}:{v}"))
                .collect::<Vec<_>>()
                .join(" | ");
            terms.push(format!("({alternatives})"));
        }
    }
}

/// `v`, `("v1" | "v2")` or, negated, `-v1 -v2`.
fn push_keywords(terms: &mut Vec<String>, values: &[String], negate: bool) {
    match values {
        [] => {}
        _ if negate => terms.extend(values.iter().map(|v| format!("-{v}"))),
        [single] => terms.push(single.clone()),
        _ => {
            let alternatives = values
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(" | ");
            terms.push(format!("({alternatives})"));
        }
    }
}

/// A validated, immutable set of search constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    include: FilterGroup,
    exclude: FilterGroup,
}

impl Filters {
    /// Starts a new builder with every filter unset.
    pub fn builder() -> FiltersBuilder {
        FiltersBuilder::default()
    }

    /// Whether no filter is set.
    pub fn is_empty(&self) -> bool {
        self.compile().is_empty()
    }

    /// Serializes the filters into the search engine's operator grammar.
    ///
    /// Include terms come first, then exclude terms, each side in a fixed field
    /// order. The same filters always compile to the same string.
    ///
    /// # Returns
    ///
    /// The space-joined terms, or an empty string when nothing is set.
    pub fn compile(&self) -> String {
        let mut terms = Vec::new();
        self.include.compile_into(false, &mut terms);
        self.exclude.compile_into(true, &mut terms);

        terms.retain(|term| !term.is_empty());
        terms.join(" ")
    }
}

impl fmt::Display for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile())
    }
}

macro_rules! list_filters {
    ($($(#[$doc:meta])* $include:ident / $exclude:ident => $field:ident, $convert:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $include(mut self, values: impl Into<Values>) -> Self {
                self.include.$field = values.into().$convert();
                self
            }

            #[doc = concat!("Exclude counterpart of [`Self::", stringify!($include), "`].")]
            pub fn $exclude(mut self, values: impl Into<Values>) -> Self {
                self.exclude.$field = values.into().$convert();
                self
            }
        )*
    };
}

/// Collects filter values and validates them into a [`Filters`].
#[derive(Debug, Clone, Default)]
pub struct FiltersBuilder {
    include: FilterGroup,
    exclude: FilterGroup,
}

impl FiltersBuilder {
    list_filters! {
        /// Only show results from these domains.
        sites / exclude_sites => sites, non_blank;
        /// Only show results from these top-level domains, e.g. `.gov`.
        tlds / exclude_tlds => tlds, non_blank;
        /// Only show documents of these file types, e.g. `pdf`.
        filetypes / exclude_filetypes => filetypes, non_blank;
        /// Require these single-token words anywhere in the page.
        keywords / exclude_keywords => keywords, into_inner;
        /// Require these exact phrases.
        exact_phrases / exclude_exact_phrases => exact_phrases, non_blank;
        /// Require each of these words in the title.
        title_words / exclude_title_words => title_words, words;
        /// Require each of these words in the URL.
        url_words / exclude_url_words => url_words, words;
        /// Require each of these words in the page text.
        text_words / exclude_text_words => text_words, words;
        /// Require all of these words in the title, as one `allintitle:` term.
        all_title_words / exclude_all_title_words => all_title_words, words;
        /// Require all of these words in the URL, as one `allinurl:` term.
        all_url_words / exclude_all_url_words => all_url_words, words;
        /// Require all of these words in the page text, as one `allintext:` term.
        all_text_words / exclude_all_text_words => all_text_words, words;
        /// Show pages related to these sites.
        related / exclude_related => related, non_blank;
    }

    /// Only show filetypes of a single kind. Same as [`Self::filetypes`].
    pub fn filetype(self, filetype: &str) -> Self {
        self.filetypes(filetype)
    }

    /// Only show pages served over HTTPS.
    pub fn https_only(mut self, enabled: bool) -> Self {
        self.include.https = enabled;
        self
    }

    /// Exclude pages served over HTTPS.
    pub fn exclude_https(mut self, enabled: bool) -> Self {
        self.exclude.https = enabled;
        self
    }

    /// Only show results published before this date.
    pub fn before(mut self, date: NaiveDate) -> Self {
        self.include.before = Some(date);
        self
    }

    pub fn exclude_before(mut self, date: NaiveDate) -> Self {
        self.exclude.before = Some(date);
        self
    }

    /// Only show results published after this date.
    pub fn after(mut self, date: NaiveDate) -> Self {
        self.include.after = Some(date);
        self
    }

    pub fn exclude_after(mut self, date: NaiveDate) -> Self {
        self.exclude.after = Some(date);
        self
    }

    /// Restrict news results to one source.
    pub fn news_source(mut self, source: impl Into<String>) -> Self {
        self.include.news_source = Some(source.into()).filter(|s| !s.trim().is_empty());
        self
    }

    pub fn exclude_news_source(mut self, source: impl Into<String>) -> Self {
        self.exclude.news_source = Some(source.into()).filter(|s| !s.trim().is_empty());
        self
    }

    /// Validates the collected values.
    ///
    /// # Returns
    ///
    /// The immutable `Filters`, or a `SearchError::Validation` naming the first
    /// offending field.
    pub fn build(self) -> Result<Filters> {
        self.include.validate("")?;
        self.exclude.validate("exclude_")?;

        Ok(Filters {
            include: self.include,
            exclude: self.exclude,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(builder: FiltersBuilder) -> String {
        builder.build().unwrap().compile()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_filters() {
        let filters = Filters::builder().build().unwrap();
        assert_eq!(filters.compile(), "");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_sites_and_tlds() {
        assert_eq!(compile(Filters::builder().sites("a.com")), "site:a.com");
        assert_eq!(
            compile(Filters::builder().sites(["a.com", "b.com"])),
            "(site:a.com | site:b.com)"
        );
        assert_eq!(compile(Filters::builder().sites(vec!["a.com"])), "site:a.com");
        assert_eq!(compile(Filters::builder().tlds(".gov")), "site:.gov");
        assert_eq!(
            compile(Filters::builder().tlds([".gov", ".edu"])),
            "(site:.gov | site:.edu)"
        );
    }

    #[test]
    fn test_delegated_generic_tlds_are_accepted() {
        for tld in [".ninja", ".london", ".google", ".fyi", ".nyc"] {
            let filters = Filters::builder().tlds(tld).build();
            assert!(filters.is_ok(), "{tld} should be accepted");
        }
        assert_eq!(
            compile(Filters::builder().exclude_tlds(".ninja")),
            "-site:.ninja"
        );
    }

    #[test]
    fn test_keywords_and_phrases() {
        assert_eq!(compile(Filters::builder().keywords("ai")), "ai");
        assert_eq!(compile(Filters::builder().keywords(["ai", "ml"])), "(\"ai\" | \"ml\")");
        assert_eq!(
            compile(Filters::builder().exact_phrases("openai api")),
            "\"openai api\""
        );
        assert_eq!(
            compile(Filters::builder().exact_phrases(["foo bar", "baz qux"])),
            "\"foo bar\" \"baz qux\""
        );
    }

    #[test]
    fn test_word_families() {
        assert_eq!(compile(Filters::builder().title_words("research")), "intitle:research");
        assert_eq!(
            compile(Filters::builder().title_words(["ai", "ml"])),
            "intitle:ai intitle:ml"
        );
        assert_eq!(compile(Filters::builder().url_words("api ref")), "inurl:api inurl:ref");
        assert_eq!(
            compile(Filters::builder().text_words(["world", "vector"])),
            "intext:world intext:vector"
        );
        assert_eq!(
            compile(Filters::builder().all_title_words(["rust", "async"])),
            "allintitle:rust async"
        );
        assert_eq!(
            compile(Filters::builder().exclude_all_text_words("cookie banner")),
            "-allintext:cookie banner"
        );
    }

    #[test]
    fn test_flags_and_dates() {
        assert_eq!(compile(Filters::builder().https_only(true)), "inurl:https");
        assert_eq!(compile(Filters::builder().exclude_https(true)), "-inurl:https");
        assert_eq!(
            compile(Filters::builder().before(date(2023, 6, 15))),
            "before:2023-06-15"
        );
        assert_eq!(compile(Filters::builder().before(date(1999, 12, 31))), "before:1999-12-31");
        assert_eq!(compile(Filters::builder().after(date(2100, 1, 1))), "after:2100-01-01");
    }

    #[test]
    fn test_related_and_source() {
        assert_eq!(
            compile(Filters::builder().related(["a.com", "b.com"])),
            "related:a.com related:b.com"
        );
        assert_eq!(compile(Filters::builder().news_source("reuters")), "source:reuters");
        assert_eq!(compile(Filters::builder().exclude_news_source("tabloid")), "-source:tabloid");
    }

    #[test]
    fn test_excludes_repeat_the_operator() {
        assert_eq!(compile(Filters::builder().exclude_sites("spam.com")), "-site:spam.com");
        assert_eq!(
            compile(Filters::builder().exclude_sites(["a.com", "b.com"])),
            "-site:a.com -site:b.com"
        );
        assert_eq!(
            compile(Filters::builder().exclude_tlds([".xyz", ".info"])),
            "-site:.xyz -site:.info"
        );
        assert_eq!(
            compile(Filters::builder().exclude_filetypes(["bin", "dat"])),
            "-filetype:bin -filetype:dat"
        );
        assert_eq!(
            compile(Filters::builder().exclude_keywords(["spam", "click"])),
            "-spam -click"
        );
        assert_eq!(
            compile(Filters::builder().exclude_exact_phrases(["fake news", "scam"])),
            "-\"fake news\" -\"scam\""
        );
        assert_eq!(
            compile(Filters::builder().exclude_title_words(["clickbait", "ad"])),
            "-intitle:clickbait -intitle:ad"
        );
    }

    #[test]
    fn test_full_ordering() {
        let filters = Filters::builder()
            .exclude_keywords("ads")
            .text_words("hello")
            .sites("a.com")
            .tlds(".edu")
            .filetype("pdf")
            .keywords("ai")
            .exact_phrases("deep learning")
            .https_only(true)
            .after(date(2022, 11, 30))
            .exclude_sites("b.com")
            .build()
            .unwrap();

        assert_eq!(
            filters.compile(),
            "site:a.com site:.edu filetype:pdf ai \"deep learning\" inurl:https \
             intext:hello after:2022-11-30 -site:b.com -ads"
        );
        assert_eq!(filters.compile(), filters.compile());
        assert_eq!(filters.to_string(), filters.compile());
    }

    #[test]
    fn test_blank_values_are_dropped() {
        assert_eq!(compile(Filters::builder().sites(["", "a.com", "  "])), "site:a.com");
        assert_eq!(compile(Filters::builder().news_source(" ")), "");
    }

    #[test]
    fn test_invalid_values_name_the_field() {
        let cases: Vec<(FiltersBuilder, &str)> = vec![
            (Filters::builder().filetype("toolongfilename123"), "filetypes"),
            (Filters::builder().filetype("we!rd"), "filetypes"),
            (Filters::builder().exclude_filetypes(["bad!", "!!"]), "exclude_filetypes"),
            (Filters::builder().keywords("with space"), "keywords"),
            (Filters::builder().keywords(["ok", "bad word"]), "keywords"),
            (Filters::builder().keywords(""), "keywords"),
            (Filters::builder().exclude_keywords(["fine", "break this"]), "exclude_keywords"),
            (Filters::builder().tlds(".invalidtld"), "tlds"),
            (Filters::builder().tlds([".edu", ".badzone"]), "tlds"),
            (Filters::builder().tlds("gov"), "tlds"),
            (Filters::builder().exclude_tlds([".edu", ".badzone"]), "exclude_tlds"),
        ];

        for (builder, expected) in cases {
            match builder.build() {
                Err(SearchError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected validation error for {expected}, got {other:?}"),
            }
        }
    }
}
