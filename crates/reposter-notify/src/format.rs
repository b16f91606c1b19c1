//! HTML message bodies for the notification channel.
//!
//! Every field that comes from upstream (author handles, error details,
//! notice text) is clipped so a message stays well under the channel's
//! 4096-character limit.

use reposter_core::{CycleOutcome, CycleReport, PublishOutcome};

use crate::notice::Notice;

const CAPTION_PREVIEW_CHARS: usize = 150;
const TITLE_CHARS: usize = 80;
const AUTHOR_CHARS: usize = 64;
const DETAIL_CHARS: usize = 500;
const NOTICE_CHARS: usize = 3500;

/// Escape the three characters the channel's HTML parse mode reserves.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `1234567` → `1,234,567`.
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// First `max` characters of `text`, with `...` when cut, HTML-escaped.
fn clip(text: &str, max: usize) -> String {
    let mut p: String = text.chars().take(max).collect();
    if text.chars().nth(max).is_some() {
        p.push_str("...");
    }
    escape_html(&p)
}

#[must_use]
pub fn format_report(report: &CycleReport) -> String {
    let heading = match &report.outcome {
        CycleOutcome::Published { .. } => "📸 <b>Repost published</b>",
        CycleOutcome::Skipped { .. } => "⏭️ <b>Cycle skipped</b>",
        CycleOutcome::Failed { .. } => "❌ <b>Repost failed</b>",
    };
    let mut lines = vec![heading.to_owned(), String::new()];

    if let Some(candidate) = &report.candidate {
        lines.push(format!("🎬 <b>Video:</b> {}", clip(&candidate.title(), TITLE_CHARS)));
        lines.push(format!("👤 <b>Author:</b> @{}", clip(&candidate.author, AUTHOR_CHARS)));
        lines.push(format!(
            "❤️ <b>Likes:</b> {} | 👁 <b>Views:</b> {}",
            group_thousands(candidate.like_count),
            group_thousands(candidate.view_count)
        ));
        lines.push(String::new());
    }

    if let Some(caption) = &report.caption {
        lines.push(format!("📝 <b>Caption ({}):</b>", caption.method));
        lines.push(clip(&caption.text, CAPTION_PREVIEW_CHARS));
        lines.push(String::new());
    }

    match &report.outcome {
        CycleOutcome::Published { media_id } => {
            lines.push("✅ <b>Status:</b> published".to_owned());
            lines.push(format!("🆔 <b>Media ID:</b> {}", escape_html(media_id)));
        }
        CycleOutcome::Skipped { batch_size } => {
            lines.push(format!(
                "ℹ️ <b>Status:</b> no eligible candidate among {batch_size} fetched"
            ));
        }
        CycleOutcome::Failed {
            stage,
            kind,
            detail,
        } => {
            lines.push(format!("❌ <b>Status:</b> {kind} failure while {stage}"));
            lines.push(format!("🔴 <b>Error:</b> {}", clip(detail, DETAIL_CHARS)));
        }
    }

    if let Some(publish) = &report.publish {
        if let PublishOutcome::Failed { error } = &publish.outcome {
            if !matches!(report.outcome, CycleOutcome::Failed { .. }) {
                lines.push(format!("🔴 <b>Publish error:</b> {}", clip(error, DETAIL_CHARS)));
            }
        }
        lines.push(format!(
            "📤 <b>Publish phase:</b> {:.1}s",
            publish.duration.as_secs_f64()
        ));
    }

    lines.push(format!(
        "⏰ <b>At:</b> {}",
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!("⚡ <b>Duration:</b> {:.1}s", report.duration_secs()));
    lines.join("\n")
}

#[must_use]
pub fn format_notice(notice: &Notice) -> String {
    format!("{} {}", notice.kind.emoji(), clip(&notice.text, NOTICE_CHARS))
}
