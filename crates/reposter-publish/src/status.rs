use serde::Serialize;

/// Processing status of a publish container, from its `status_code` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ContainerStatus {
    Finished,
    InProgress,
    Error,
    Expired,
    Published,
    /// Anything else, or no status observed yet.
    Unknown(String),
}

impl ContainerStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FINISHED" => ContainerStatus::Finished,
            "IN_PROGRESS" => ContainerStatus::InProgress,
            "ERROR" => ContainerStatus::Error,
            "EXPIRED" => ContainerStatus::Expired,
            "PUBLISHED" => ContainerStatus::Published,
            _ => ContainerStatus::Unknown(raw.to_owned()),
        }
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerStatus::Finished => f.write_str("FINISHED"),
            ContainerStatus::InProgress => f.write_str("IN_PROGRESS"),
            ContainerStatus::Error => f.write_str("ERROR"),
            ContainerStatus::Expired => f.write_str("EXPIRED"),
            ContainerStatus::Published => f.write_str("PUBLISHED"),
            ContainerStatus::Unknown(raw) if raw.is_empty() => f.write_str("UNKNOWN"),
            ContainerStatus::Unknown(raw) => write!(f, "UNKNOWN({raw})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_codes_case_insensitively() {
        assert_eq!(ContainerStatus::parse("FINISHED"), ContainerStatus::Finished);
        assert_eq!(ContainerStatus::parse("in_progress"), ContainerStatus::InProgress);
        assert_eq!(ContainerStatus::parse("EXPIRED"), ContainerStatus::Expired);
    }

    #[test]
    fn unknown_code_keeps_raw_text() {
        let status = ContainerStatus::parse("QUEUED");
        assert_eq!(status, ContainerStatus::Unknown("QUEUED".to_owned()));
        assert_eq!(status.to_string(), "UNKNOWN(QUEUED)");
    }
}
