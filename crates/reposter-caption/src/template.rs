//! Template captions: the fallback path that cannot fail.
//!
//! Every choice (hook, hashtag count and order, call to action) is seeded
//! from a SHA-256 digest of the candidate id, so the same candidate always
//! gets the same caption.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use reposter_core::{Caption, CaptionMethod};
use sha2::{Digest, Sha256};

use crate::constraints::MAX_CAPTION_CHARS;
use crate::CaptionContext;

const HOOKS: [&str; 10] = [
    "🚀 You have to see this one!",
    "🤯 Did not expect that ending.",
    "💡 Watch this twice.",
    "🔥 The internet cannot stop sharing this.",
    "⚡ Everyone is talking about this right now.",
    "🌟 Today's best find.",
    "🎯 This is exactly what your feed needed.",
    "💥 Wait for it...",
    "🚨 Stop scrolling for a second.",
    "✨ The most satisfying thing you'll see today.",
];

const HASHTAGS: [&str; 30] = [
    "#Viral",
    "#Trending",
    "#Amazing",
    "#Incredible",
    "#MustWatch",
    "#Explore",
    "#ForYou",
    "#Wow",
    "#Epic",
    "#Reels",
    "#ReelsDaily",
    "#Video",
    "#InstaDaily",
    "#InstaGood",
    "#Vibes",
    "#Mood",
    "#Daily",
    "#Satisfying",
    "#Watch",
    "#Share",
    "#Creator",
    "#ContentCreator",
    "#Inspiration",
    "#Motivation",
    "#Lifestyle",
    "#Fun",
    "#Funny",
    "#Wild",
    "#Goals",
    "#ExplorePage",
];

const CALLS_TO_ACTION: [&str; 4] = [
    "Follow for more! 💯",
    "Double tap if this got you! ❤️",
    "Share this with someone who needs it 👇",
    "Save this for later 📌",
];

const MIN_TAGS: usize = 15;
const MAX_TAGS: usize = 20;
const CREDIT_PREFIX: &str = "\n\nvia @";

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCaptioner;

impl TemplateCaptioner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compose a caption from fixed fields. Pure string formatting.
    ///
    /// The author handle is the only free-form input, so it is stripped of
    /// whitespace and `#`, then clipped (or dropped) to keep the caption
    /// within [`MAX_CAPTION_CHARS`].
    #[must_use]
    pub fn compose(&self, ctx: &CaptionContext<'_>) -> Caption {
        let mut rng = StdRng::seed_from_u64(seed_for(&ctx.candidate.id));

        let hook = HOOKS[rng.random_range(0..HOOKS.len())];
        let count = rng.random_range(MIN_TAGS..=MAX_TAGS);
        let tags: Vec<&str> = HASHTAGS.choose_multiple(&mut rng, count).copied().collect();
        let cta = CALLS_TO_ACTION[rng.random_range(0..CALLS_TO_ACTION.len())];

        let body = format!("\n\n{}\n\n{cta}", tags.join(" "));
        let fixed = hook.chars().count() + body.chars().count();
        let room = MAX_CAPTION_CHARS
            .saturating_sub(fixed)
            .saturating_sub(CREDIT_PREFIX.chars().count());

        let mut text = String::from(hook);
        let author = credit_handle(&ctx.candidate.author, room);
        if !author.is_empty() {
            text.push_str(CREDIT_PREFIX);
            text.push_str(&author);
        }
        text.push_str(&body);

        Caption {
            text,
            method: CaptionMethod::Template,
        }
    }
}

fn credit_handle(author: &str, max_chars: usize) -> String {
    author
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '#')
        .take(max_chars)
        .collect()
}

fn seed_for(candidate_id: &str) -> u64 {
    let digest = Sha256::digest(candidate_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
