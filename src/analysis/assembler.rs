// Assembler - fixed-order feature vector for the classifier
//
// The model was trained on exactly these 14 descriptors in exactly this order.
// Any missing key or wrong length is a contract violation between stages and
// fails loudly instead of feeding a shifted vector to the model.

use crate::analysis::features::{FeatureName, FeatureSet, FeatureValue, FeatureVector};
use crate::config::UndefinedPolicy;
use crate::error::AnalysisError;

/// Model input order
pub const FEATURE_ORDER: [FeatureName; 14] = [
    FeatureName::Duration,
    FeatureName::FundamentalFrequency,
    FeatureName::MaxAmplitude,
    FeatureName::ZeroCrossingRate,
    FeatureName::Rms,
    FeatureName::SpectralEntropy,
    FeatureName::Formant1,
    FeatureName::Formant2,
    FeatureName::Hnr,
    FeatureName::MelSpectrogramMean,
    FeatureName::SpectralCentroid,
    FeatureName::SpectralRolloff,
    FeatureName::SpectralBandwidth,
    FeatureName::SpectralFlatness,
];

pub const FEATURE_COUNT: usize = FEATURE_ORDER.len();

/// Pitch reported for unvoiced audio (Hz)
pub const UNVOICED_PITCH_HZ: f64 = 0.0;

/// Formant reported when tracking fails (Hz)
pub const UNTRACKED_FORMANT_HZ: f64 = 0.0;

/// Harmonicity floor for aperiodic audio (dB)
pub const APERIODIC_HNR_DB: f64 = -200.0;

/// Substitute used for an undefined feature under `UndefinedPolicy::Substitute`
pub fn substitute_for(name: FeatureName) -> Option<f64> {
    match name {
        FeatureName::FundamentalFrequency => Some(UNVOICED_PITCH_HZ),
        FeatureName::Formant1 | FeatureName::Formant2 => Some(UNTRACKED_FORMANT_HZ),
        FeatureName::Hnr => Some(APERIODIC_HNR_DB),
        _ => None,
    }
}

/// Builds classifier input from a feature set
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorAssembler {
    policy: UndefinedPolicy,
}

impl FeatureVectorAssembler {
    pub fn new(policy: UndefinedPolicy) -> Self {
        Self { policy }
    }

    /// Select `FEATURE_ORDER` from `features` and resolve undefined values
    ///
    /// # Errors
    /// - `IncompleteFeatureSet` listing every absent key
    /// - `UndefinedFeature` under the reject policy, or for a feature with no
    ///   documented substitute
    /// - `DimensionMismatch` if the result is not `FEATURE_COUNT` long
    pub fn assemble(&self, features: &FeatureSet) -> Result<FeatureVector, AnalysisError> {
        let missing: Vec<String> = FEATURE_ORDER
            .iter()
            .filter(|name| !features.contains(**name))
            .map(|name| name.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::IncompleteFeatureSet { missing });
        }

        let values = FEATURE_ORDER
            .iter()
            .filter_map(|&name| features.get(name).map(|value| (name, value)))
            .map(|(name, value)| self.resolve(name, value))
            .collect::<Result<Vec<f64>, AnalysisError>>()?;

        if values.len() != FEATURE_COUNT {
            return Err(AnalysisError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        Ok(FeatureVector::new(values))
    }

    fn resolve(&self, name: FeatureName, value: FeatureValue) -> Result<f64, AnalysisError> {
        let undefined = || AnalysisError::UndefinedFeature {
            feature: name.as_str().to_string(),
        };
        match (value, self.policy) {
            (FeatureValue::Defined(v), _) => Ok(v),
            (FeatureValue::Undefined, UndefinedPolicy::Reject) => Err(undefined()),
            (FeatureValue::Undefined, UndefinedPolicy::Substitute) => {
                substitute_for(name).ok_or_else(undefined)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_set() -> FeatureSet {
        FEATURE_ORDER
            .iter()
            .enumerate()
            .map(|(i, &name)| (name, FeatureValue::Defined(i as f64 + 0.5)))
            .collect()
    }

    #[test]
    fn test_assembles_in_fixed_order() {
        let mut set = complete_set();
        // Catalog-only keys are ignored
        set.insert(FeatureName::SampleRate, FeatureValue::Defined(16_000.0));
        set.insert(FeatureName::MinAmplitude, FeatureValue::Defined(0.0));

        let vector = FeatureVectorAssembler::default().assemble(&set).unwrap();
        assert_eq!(vector.len(), FEATURE_COUNT);
        let expected: Vec<f64> = (0..FEATURE_COUNT).map(|i| i as f64 + 0.5).collect();
        assert_eq!(vector.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_removing_any_key_is_incomplete() {
        let assembler = FeatureVectorAssembler::default();
        for name in FEATURE_ORDER {
            let mut set = complete_set();
            set.remove(name);
            match assembler.assemble(&set) {
                Err(AnalysisError::IncompleteFeatureSet { missing }) => {
                    assert_eq!(missing, vec![name.as_str().to_string()]);
                }
                other => panic!("expected IncompleteFeatureSet for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_empty_set_lists_all_missing() {
        let err = FeatureVectorAssembler::default()
            .assemble(&FeatureSet::new())
            .unwrap_err();
        match err {
            AnalysisError::IncompleteFeatureSet { missing } => assert_eq!(missing.len(), 14),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_substitute_policy_uses_documented_defaults() {
        let mut set = complete_set();
        for name in [
            FeatureName::FundamentalFrequency,
            FeatureName::Formant1,
            FeatureName::Formant2,
            FeatureName::Hnr,
        ] {
            set.insert(name, FeatureValue::Undefined);
        }

        let vector = FeatureVectorAssembler::new(UndefinedPolicy::Substitute)
            .assemble(&set)
            .unwrap();
        let v = vector.as_slice();
        assert_eq!(v[1], UNVOICED_PITCH_HZ);
        assert_eq!(v[6], UNTRACKED_FORMANT_HZ);
        assert_eq!(v[7], UNTRACKED_FORMANT_HZ);
        assert_eq!(v[8], APERIODIC_HNR_DB);
    }

    #[test]
    fn test_reject_policy_names_the_feature() {
        let mut set = complete_set();
        set.insert(FeatureName::Hnr, FeatureValue::Undefined);

        let err = FeatureVectorAssembler::new(UndefinedPolicy::Reject)
            .assemble(&set)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UndefinedFeature {
                feature: "hnr".to_string()
            }
        );
    }

    #[test]
    fn test_undefined_without_substitute_is_rejected() {
        let mut set = complete_set();
        set.insert(FeatureName::Rms, FeatureValue::Undefined);
        let err = FeatureVectorAssembler::new(UndefinedPolicy::Substitute)
            .assemble(&set)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UndefinedFeature { .. }));
    }
}
