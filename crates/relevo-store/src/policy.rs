use thiserror::Error;

/// Upload limits and content-type allow-lists, checked before any byte is
/// persisted.
#[derive(Debug, Clone)]
pub struct MediaPolicy {
    pub chat_max_bytes: usize,
    pub evidence_max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadCategory {
    /// Images and videos attached to chat messages.
    ChatMedia,
    /// Photo evidence attached to a task completion.
    TaskEvidence,
}

#[derive(Debug, Error)]
pub enum PolicyViolation {
    #[error("payload of {size} bytes exceeds the {limit}-byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("content type '{0}' is not allowed")]
    UnsupportedType(String),
}

const CHAT_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
const CHAT_VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime"];
const EVIDENCE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

impl Default for MediaPolicy {
    fn default() -> Self {
        Self {
            chat_max_bytes: 10 * 1024 * 1024,
            evidence_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl MediaPolicy {
    pub fn check(
        &self,
        category: UploadCategory,
        content_type: &str,
        size: usize,
    ) -> Result<(), PolicyViolation> {
        let content_type = content_type.to_ascii_lowercase();
        let (limit, allowed): (usize, &[&[&str]]) = match category {
            UploadCategory::ChatMedia => {
                (self.chat_max_bytes, &[CHAT_IMAGE_TYPES, CHAT_VIDEO_TYPES])
            }
            UploadCategory::TaskEvidence => (self.evidence_max_bytes, &[EVIDENCE_TYPES]),
        };

        // Type first: an oversized payload of a forbidden type reads better
        // as unsupported than as too large.
        if !allowed.iter().any(|list| list.contains(&content_type.as_str())) {
            return Err(PolicyViolation::UnsupportedType(content_type));
        }
        if size > limit {
            return Err(PolicyViolation::TooLarge { size, limit });
        }
        Ok(())
    }
}

/// True when the content type names a still image (as opposed to video).
pub fn is_image_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_policy_accepts_listed_types_within_limit() {
        let policy = MediaPolicy::default();
        assert!(policy
            .check(UploadCategory::ChatMedia, "image/jpeg", 1024)
            .is_ok());
        assert!(policy
            .check(UploadCategory::ChatMedia, "VIDEO/MP4", 1024)
            .is_ok());
    }

    #[test]
    fn chat_policy_rejects_oversize_and_unknown_types() {
        let policy = MediaPolicy::default();
        let too_big = policy.check(UploadCategory::ChatMedia, "video/mp4", 12 * 1024 * 1024);
        assert!(matches!(too_big, Err(PolicyViolation::TooLarge { .. })));

        let bad_type = policy.check(UploadCategory::ChatMedia, "application/pdf", 10);
        assert!(matches!(bad_type, Err(PolicyViolation::UnsupportedType(_))));
    }

    #[test]
    fn evidence_policy_is_stricter() {
        let policy = MediaPolicy::default();
        // Videos are fine for chat but never for evidence.
        assert!(policy
            .check(UploadCategory::TaskEvidence, "video/mp4", 10)
            .is_err());
        assert!(matches!(
            policy.check(UploadCategory::TaskEvidence, "image/png", 6 * 1024 * 1024),
            Err(PolicyViolation::TooLarge { .. })
        ));
        assert!(policy
            .check(UploadCategory::TaskEvidence, "image/webp", 1024)
            .is_ok());
    }
}
