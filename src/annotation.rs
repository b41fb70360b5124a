//! Square-bracket mention markup, as the server reads it when automatic
//! mention detection is off.
//!
//! `[la hierba de [Wimbledon]]` marks two mentions, the outer one spanning
//! four tokens. Brackets are tokens of their own even when glued to a word,
//! so `[Kinshasa]],` yields the tokens `[`, `Kinshasa`, `]`, `]`, `,`.

use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AnnotatedMention {
    /// Index of the first word token covered.
    pub start: usize,
    /// Index of the last word token covered, inclusive.
    pub end: usize,
    /// Covered tokens joined by single spaces.
    pub text: String,
}

/// Problems found in the markup.
///
/// `UnclosedMention` and `UnexpectedClose` abort the parse; the server cannot
/// read such text either. The others are reported as warnings and skipped.
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum AnnotationError {
    #[error("mention opened at byte {offset} is never closed")]
    UnclosedMention { offset: usize },
    #[error("closing bracket at byte {offset} comes before any token")]
    UnexpectedClose { offset: usize },
    #[error("closing bracket at byte {offset} has no open mention")]
    StrayClose { offset: usize },
    #[error("mention closed at byte {offset} covers no tokens")]
    EmptyMention { offset: usize },
}

/// Mentions read from the markup plus the problems skipped along the way.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ManualMarkup {
    pub mentions: Vec<AnnotatedMention>,
    pub warnings: Vec<AnnotationError>,
}

enum Token<'a> {
    Open(usize),
    Close(usize),
    Word(&'a str),
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() || ch == '[' || ch == ']' {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&text[start..offset]));
            }
            match ch {
                '[' => tokens.push(Token::Open(offset)),
                ']' => tokens.push(Token::Close(offset)),
                _ => {}
            }
        } else if word_start.is_none() {
            word_start = Some(offset);
        }
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&text[start..]));
    }
    tokens
}

/// Lists the manually marked mentions, ordered by first token with the
/// outermost mention first when several open on the same token.
///
/// A `]` with no open mention is skipped once a token has been read, as the
/// server attaches it to the previous token and carries on.
pub fn manual_mentions(text: &str) -> Result<ManualMarkup, AnnotationError> {
    let mut words: Vec<&str> = Vec::new();
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut warnings = Vec::new();

    for token in tokenize(text) {
        match token {
            Token::Word(word) => words.push(word),
            Token::Open(offset) => open.push((words.len(), offset)),
            Token::Close(offset) => match open.pop() {
                None if words.is_empty() => {
                    return Err(AnnotationError::UnexpectedClose { offset });
                }
                None => warnings.push(AnnotationError::StrayClose { offset }),
                Some((start, _)) if start == words.len() => {
                    warnings.push(AnnotationError::EmptyMention { offset });
                }
                Some((start, _)) => spans.push((start, words.len() - 1)),
            },
        }
    }
    if let Some(&(_, offset)) = open.first() {
        return Err(AnnotationError::UnclosedMention { offset });
    }

    spans.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
    let mentions = spans
        .into_iter()
        .map(|(start, end)| AnnotatedMention {
            start,
            end,
            text: words[start..=end].join(" "),
        })
        .collect();
    Ok(ManualMarkup { mentions, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(text: &str) -> Vec<String> {
        manual_mentions(text)
            .unwrap()
            .mentions
            .into_iter()
            .map(|mention| mention.text)
            .collect()
    }

    #[test]
    fn nested_mentions_list_outer_first() {
        assert_eq!(
            texts("En [la hierba de [Wimbledon]], [Ecuador]."),
            ["la hierba de Wimbledon", "Wimbledon", "Ecuador"]
        );
    }

    #[test]
    fn shared_start_token_orders_longest_first() {
        let markup = manual_mentions("con [[Tim_Henman], [Greg_Rusedski]]").unwrap();
        let spans: Vec<_> = markup.mentions.iter().map(|m| (m.start, m.end)).collect();
        assert_eq!(spans, [(1, 3), (1, 1), (3, 3)]);
        assert_eq!(markup.mentions[0].text, "Tim_Henman , Greg_Rusedski");
        assert!(markup.warnings.is_empty());
    }

    #[test]
    fn bundled_examples_lint() {
        let catalog = crate::ExampleCatalog::builtin();
        for language in crate::Language::ALL {
            for text in catalog.examples(language) {
                assert!(!manual_mentions(text).unwrap().mentions.is_empty());
            }
        }

        // The Wimbledon example carries one stray closing bracket.
        let wimbledon = &catalog.examples(crate::Language::Spanish)[0];
        let markup = manual_mentions(wimbledon).unwrap();
        assert_eq!(markup.warnings.len(), 1);
        assert!(matches!(
            markup.warnings[0],
            AnnotationError::StrayClose { .. }
        ));
        let texts: Vec<_> = markup.mentions.iter().map(|m| m.text.as_str()).collect();
        assert!(texts.contains(&"Wimbledon"));
        assert!(texts.contains(&"Barry_Cowan"));
        assert!(texts.contains(&"Nicolás_Lapentti"));
    }

    #[test]
    fn stray_close_after_text_is_skipped() {
        let markup = manual_mentions("a] [b]").unwrap();
        assert_eq!(markup.warnings, [AnnotationError::StrayClose { offset: 1 }]);
        assert_eq!(
            markup.mentions,
            [AnnotatedMention {
                start: 1,
                end: 1,
                text: "b".to_string(),
            }]
        );
    }

    #[test]
    fn empty_pair_is_skipped() {
        let markup = manual_mentions("a [] [b]").unwrap();
        assert_eq!(markup.warnings, [AnnotationError::EmptyMention { offset: 3 }]);
        assert_eq!(markup.mentions.len(), 1);
    }

    #[test]
    fn unreadable_markup_is_an_error() {
        assert_eq!(
            manual_mentions("[O avião explodiu"),
            Err(AnnotationError::UnclosedMention { offset: 0 })
        );
        assert_eq!(
            manual_mentions("] O avião explodiu"),
            Err(AnnotationError::UnexpectedClose { offset: 0 })
        );
    }

    #[test]
    fn plain_text_has_no_mentions() {
        assert_eq!(manual_mentions("sem marcação"), Ok(ManualMarkup::default()));
    }
}
