use crate::device::ScanDetail;
use crate::frame::{ContactMask, FrameContent};

/// Everything a session is told before it starts scanning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    pub content: FrameContent,
    pub scan_detail: Option<ScanDetail>,
    pub contacts_mask: Option<ContactMask>,
    pub contacts_min_force: Option<u16>,
    pub max_frame_rate: Option<u16>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::contacts()
    }
}

impl ScanConfig {
    pub fn with_content(content: FrameContent) -> Self {
        Self {
            content,
            scan_detail: None,
            contacts_mask: None,
            contacts_min_force: None,
            max_frame_rate: None,
        }
    }

    pub fn contacts() -> Self {
        Self::with_content(FrameContent::CONTACTS)
    }

    pub fn pressure() -> Self {
        Self::with_content(FrameContent::PRESSURE)
    }

    /// Contacts with every optional field group filled in, plus the force and
    /// label images.
    pub fn everything() -> Self {
        Self {
            content: FrameContent::CONTACTS | FrameContent::PRESSURE | FrameContent::LABELS,
            contacts_mask: Some(ContactMask::all()),
            ..Self::contacts()
        }
    }

    pub fn scan_detail(mut self, detail: ScanDetail) -> Self {
        self.scan_detail = Some(detail);
        self
    }

    pub fn contacts_min_force(mut self, force: u16) -> Self {
        self.contacts_min_force = Some(force);
        self
    }

    pub fn max_frame_rate(mut self, rate: u16) -> Self {
        self.max_frame_rate = Some(rate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requests_contacts_only() {
        let config = ScanConfig::default();
        assert_eq!(config.content, FrameContent::CONTACTS);
        assert_eq!(config.scan_detail, None);
    }

    #[test]
    fn builders_set_optional_fields() {
        let config = ScanConfig::everything()
            .scan_detail(ScanDetail::Medium)
            .contacts_min_force(12)
            .max_frame_rate(250);
        assert!(config.content.contains(FrameContent::LABELS));
        assert_eq!(config.contacts_mask, Some(ContactMask::all()));
        assert_eq!(config.scan_detail, Some(ScanDetail::Medium));
        assert_eq!(config.contacts_min_force, Some(12));
        assert_eq!(config.max_frame_rate, Some(250));
    }
}
