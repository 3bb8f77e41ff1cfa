use crate::image_reference::Image;

#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

#[cfg_attr(not(test), allow(dead_code))]
impl Decision {
    pub fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides the admission outcome from the images found in a workload.
///
/// Only called after every image was extracted successfully; decode and
/// dispatch failures never reach a policy.
pub trait AdmissionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, images: &[Image]) -> Decision;
}

/// Admits everything. Images are reported but not enforced.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AdmissionPolicy for AllowAll {
    fn name(&self) -> &'static str {
        "allow-all"
    }

    fn evaluate(&self, _images: &[Image]) -> Decision {
        Decision::Allow
    }
}
