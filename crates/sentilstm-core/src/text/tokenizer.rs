//! # Word Tokenizer
//!
//! Splits sentences into word-level tokens following the Penn Treebank
//! conventions: contractions and clitics are detached, punctuation becomes
//! its own token, and double quotes are rewritten to opening/closing forms.
//! Abbreviations such as `U.S.` or `Mr.` keep their periods and fused forms
//! like `cannot` or `gonna` are split in two.

use regex::Regex;

use crate::error::Result;

/// Treebank-style word tokenizer.
///
/// Tokens are case-sensitive and returned in sentence order.
#[derive(Debug, Clone)]
pub struct WordTokenizer {
    fused: Vec<Regex>,
    negation: Regex,
    clitic: Regex,
    token: Regex,
}

impl WordTokenizer {
    /// Compile the tokenizer patterns.
    pub fn new() -> Result<Self> {
        let fused = [
            ("can", "not"),
            ("gim", "me"),
            ("gon", "na"),
            ("got", "ta"),
            ("lem", "me"),
            ("wan", "na"),
        ]
        .iter()
        .map(|(head, tail)| Regex::new(&format!(r"(?i)\b({head})({tail})\b")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            fused,
            negation: Regex::new(r"(?i)\b(\w+)(n't)\b")?,
            clitic: Regex::new(r"(?i)(\w)'(s|m|d|ll|re|ve)\b")?,
            token: Regex::new(
                r#"(?ix)
                  n't
                | '(?:s|m|d|ll|re|ve)\b
                | \d+(?:[.,]\d+)+
                | \b(?:mr|mrs|ms|dr|prof|jr|sr|st|vs)\.
                | \w+(?:\.\w+)+\.?
                | \w+(?:[-']\w+)*
                | \.\.\.
                | --
                | [^\w\s]
                "#,
            )?,
        })
    }

    /// Tokenize a sentence.
    ///
    /// # Examples
    /// ```
    /// use sentilstm_core::text::WordTokenizer;
    ///
    /// let tokenizer = WordTokenizer::new().unwrap();
    /// let tokens = tokenizer.tokenize("I don't like it, at all!");
    /// assert_eq!(tokens, ["I", "do", "n't", "like", "it", ",", "at", "all", "!"]);
    /// ```
    pub fn tokenize(&self, sentence: &str) -> Vec<String> {
        let mut split = sentence.to_string();
        for re in &self.fused {
            split = re.replace_all(&split, "$1 $2").into_owned();
        }
        let split = self.negation.replace_all(&split, "$1 $2");
        let split = self.clitic.replace_all(&split, "$1 '$2");

        self.token
            .find_iter(&split)
            .map(|m| {
                if m.as_str() == "\"" {
                    let opening = split[..m.start()]
                        .chars()
                        .next_back()
                        .is_none_or(|c| c.is_whitespace() || "([{<".contains(c));
                    if opening { "``" } else { "''" }.to_string()
                } else {
                    m.as_str().to_string()
                }
            })
            .collect()
    }

    /// Number of tokens in a sentence.
    pub fn count(&self, sentence: &str) -> usize {
        self.tokenize(sentence).len()
    }
}
