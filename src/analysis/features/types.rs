// Types module - Data structures for extracted features
//
// This module defines the catalog of feature names, the defined/undefined
// value type, and the containers passed between extractors, assembler and
// classifier.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::AnalysisError;

/// Every descriptor the extractors can produce
///
/// The catalog is a superset of what the assembler selects. Each name has a
/// stable snake_case key used in JSON output and lookups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    Duration,
    SampleRate,
    MaxAmplitude,
    MinAmplitude,
    ZeroCrossingRate,
    Rms,
    SpectralEntropy,
    FundamentalFrequency,
    #[serde(rename = "formant_1")]
    Formant1,
    #[serde(rename = "formant_2")]
    Formant2,
    Hnr,
    MelSpectrogramMean,
    SpectralCentroid,
    SpectralRolloff,
    SpectralBandwidth,
    SpectralFlatness,
}

impl FeatureName {
    pub const ALL: [FeatureName; 16] = [
        FeatureName::Duration,
        FeatureName::SampleRate,
        FeatureName::MaxAmplitude,
        FeatureName::MinAmplitude,
        FeatureName::ZeroCrossingRate,
        FeatureName::Rms,
        FeatureName::SpectralEntropy,
        FeatureName::FundamentalFrequency,
        FeatureName::Formant1,
        FeatureName::Formant2,
        FeatureName::Hnr,
        FeatureName::MelSpectrogramMean,
        FeatureName::SpectralCentroid,
        FeatureName::SpectralRolloff,
        FeatureName::SpectralBandwidth,
        FeatureName::SpectralFlatness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Duration => "duration",
            FeatureName::SampleRate => "sample_rate",
            FeatureName::MaxAmplitude => "max_amplitude",
            FeatureName::MinAmplitude => "min_amplitude",
            FeatureName::ZeroCrossingRate => "zero_crossing_rate",
            FeatureName::Rms => "rms",
            FeatureName::SpectralEntropy => "spectral_entropy",
            FeatureName::FundamentalFrequency => "fundamental_frequency",
            FeatureName::Formant1 => "formant_1",
            FeatureName::Formant2 => "formant_2",
            FeatureName::Hnr => "hnr",
            FeatureName::MelSpectrogramMean => "mel_spectrogram_mean",
            FeatureName::SpectralCentroid => "spectral_centroid",
            FeatureName::SpectralRolloff => "spectral_rolloff",
            FeatureName::SpectralBandwidth => "spectral_bandwidth",
            FeatureName::SpectralFlatness => "spectral_flatness",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown feature '{}'", s))
    }
}

/// A single feature value
///
/// `Undefined` marks descriptors that do not exist for this audio (no voiced
/// frame for pitch, no trackable formant). It is never coerced to zero or NaN;
/// the assembler resolves it by explicit policy. `Defined` values are always
/// finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Defined(f64),
    Undefined,
}

impl FeatureValue {
    pub fn as_defined(&self) -> Option<f64> {
        match self {
            FeatureValue::Defined(value) => Some(*value),
            FeatureValue::Undefined => None,
        }
    }
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeatureValue::Defined(value) => serializer.serialize_f64(*value),
            FeatureValue::Undefined => serializer.serialize_none(),
        }
    }
}

/// Named features produced by the extractors
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    values: BTreeMap<FeatureName, FeatureValue>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: FeatureName, value: FeatureValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: FeatureName) -> Option<FeatureValue> {
        self.values.get(&name).copied()
    }

    pub fn remove(&mut self, name: FeatureName) -> Option<FeatureValue> {
        self.values.remove(&name)
    }

    pub fn contains(&self, name: FeatureName) -> bool {
        self.values.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, FeatureValue)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }
}

impl FromIterator<(FeatureName, FeatureValue)> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = (FeatureName, FeatureValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Outcome of running every extractor
///
/// Successful results land in `features`; each failing extractor contributes
/// one error to `failures` without touching the others' values.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub features: FeatureSet,
    pub failures: Vec<AnalysisError>,
}

impl ExtractionReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Surface the first failure, or hand back the feature set
    pub fn into_result(self) -> Result<FeatureSet, AnalysisError> {
        match self.failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.features),
        }
    }
}

/// Ordered numeric input for the classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
