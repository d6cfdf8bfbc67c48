//! Image name classification.

use crate::registry::WorkloadType;

/// Default label carried by image-builder images.
pub const DEFAULT_IMAGE_BUILDER: &str = "image-builder";
/// Default registry prefix of run images.
pub const DEFAULT_REGISTRY: &str = "registry.runnable.com";

/// Decides which workload an image belongs to.
///
/// Builder images win over registry images; anything matching neither is
/// unclassified. Empty patterns never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadClassifier {
    image_builder: String,
    registry: String,
}

impl Default for WorkloadClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BUILDER, DEFAULT_REGISTRY)
    }
}

impl WorkloadClassifier {
    pub fn new(image_builder: impl Into<String>, registry: impl Into<String>) -> Self {
        Self {
            image_builder: image_builder.into(),
            registry: registry.into(),
        }
    }

    pub fn classify(&self, image: &str) -> Option<WorkloadType> {
        if matches_pattern(image, &self.image_builder) {
            Some(WorkloadType::ContainerBuild)
        } else if matches_pattern(image, &self.registry) {
            Some(WorkloadType::ContainerRun)
        } else {
            None
        }
    }
}

fn matches_pattern(image: &str, pattern: &str) -> bool {
    !pattern.is_empty() && image.contains(pattern)
}
