/// Operational messages sent outside the per-cycle report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
    Archive,
}

impl NoticeKind {
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            NoticeKind::Info => "ℹ️",
            NoticeKind::Success => "✅",
            NoticeKind::Warning => "⚠️",
            NoticeKind::Error => "❌",
            NoticeKind::Archive => "📦",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, text)
    }

    /// Download link for an archive bundle built on budget exhaustion.
    #[must_use]
    pub fn archive_ready(download_url: &str, size_bytes: u64, sha256: &str) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let mb = size_bytes as f64 / (1024.0 * 1024.0);
        Self::new(
            NoticeKind::Archive,
            format!(
                "Execution budget exhausted. Scheduling is paused.\n\n\
                 Archive ({mb:.2} MB) is ready:\n{download_url}\n\nSHA-256: {sha256}"
            ),
        )
    }
}
