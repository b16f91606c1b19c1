//! Structural constraints every published caption must satisfy.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CaptionError;

/// Target platform caption limit, in characters.
pub const MAX_CAPTION_CHARS: usize = 2200;
/// Target platform hashtag limit.
pub const MAX_HASHTAGS: usize = 30;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").expect("valid hashtag regex"));

#[must_use]
pub fn hashtag_count(text: &str) -> usize {
    HASHTAG_RE.find_iter(text).count()
}

/// Check `text` without modifying it: non-empty, at least one hashtag, at
/// most [`MAX_HASHTAGS`] hashtags, at most [`MAX_CAPTION_CHARS`] characters.
///
/// # Errors
///
/// Returns [`CaptionError::Constraint`] naming the first violated rule.
pub fn validate(text: &str) -> Result<(), CaptionError> {
    if text.trim().is_empty() {
        return Err(CaptionError::Constraint("empty caption".to_owned()));
    }
    let tags = hashtag_count(text);
    if tags == 0 {
        return Err(CaptionError::Constraint("no hashtags".to_owned()));
    }
    if tags > MAX_HASHTAGS {
        return Err(CaptionError::Constraint(format!(
            "{tags} hashtags exceeds {MAX_HASHTAGS}"
        )));
    }
    let chars = text.chars().count();
    if chars > MAX_CAPTION_CHARS {
        return Err(CaptionError::Constraint(format!(
            "{chars} characters exceeds {MAX_CAPTION_CHARS}"
        )));
    }
    Ok(())
}

/// Bring generated text into shape: trim it, drop hashtags past
/// [`MAX_HASHTAGS`], then validate.
///
/// # Errors
///
/// Returns [`CaptionError::Constraint`] if the text still violates a rule.
pub fn normalize(text: &str) -> Result<String, CaptionError> {
    let mut seen = 0usize;
    let trimmed = HASHTAG_RE.replace_all(text.trim(), |caps: &regex::Captures<'_>| {
        seen += 1;
        if seen > MAX_HASHTAGS {
            String::new()
        } else {
            caps[0].to_owned()
        }
    });
    let collapsed: String = trimmed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let out = collapsed.trim().to_owned();
    validate(&out)?;
    Ok(out)
}
