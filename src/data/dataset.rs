use burn::data::dataset::Dataset;

use crate::data::features::Feature;

/// The converted features of one split.
pub struct DependencyDataset {
    features: Vec<Feature>,
}

impl DependencyDataset {
    pub fn new(features: Vec<Feature>) -> Self { Self { features } }

    pub fn feature_count(&self) -> usize { self.features.len() }

    /// Annotated features, i.e. those that can produce a loss.
    pub fn annotated_count(&self) -> usize {
        self.features.iter().filter(|f| f.labels.is_annotated()).count()
    }

    pub fn features(&self) -> &[Feature] { &self.features }
}

impl Dataset<Feature> for DependencyDataset {
    fn get(&self, index: usize) -> Option<Feature> {
        self.features.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.features.len()
    }
}
