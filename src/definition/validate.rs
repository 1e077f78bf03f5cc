use crate::{
    aggregation::validate_groups,
    error::ValidationError,
    models::ComputationDefinition,
};

fn require(variant: &'static str, field: &'static str, present: bool) -> Result<(), ValidationError> {
    if present {
        Ok(())
    } else {
        Err(ValidationError::MissingField { variant, field })
    }
}

fn non_empty(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Check the fields a computation kind cannot run without.
pub(crate) fn validate_definition(definition: &ComputationDefinition) -> Result<(), ValidationError> {
    use ComputationDefinition::*;

    let variant = definition.kind();
    match definition {
        EncryptedAggregation(aggregation) => {
            require(
                variant,
                "aggregateColumns",
                !aggregation.aggregate_columns.is_empty() || aggregation.count,
            )?;
            if let Some(bound) = aggregation.value_bound {
                check_bound(variant, bound)?;
            }
        }
        EncryptedMean(mean) => {
            require(variant, "variables", !mean.variables.is_empty())?;
            if let Some(bound) = mean.value_bound {
                check_bound(variant, bound)?;
            }
        }
        StatisticalAggregation(aggregation) => {
            require(
                variant,
                "aggregationColumns",
                !aggregation.aggregation_columns.is_empty(),
            )?;
            if let Some(bound) = aggregation.value_bound {
                check_bound(variant, bound)?;
            }
        }
        DatasetStatistics(statistics) => {
            require(variant, "statistics", !statistics.statistics.is_empty())?;
            for statistic in &statistics.statistics {
                if !non_empty(&statistic.name) || !non_empty(&statistic.variable) {
                    return Err(ValidationError::InvalidField {
                        variant,
                        field: "statistics",
                        reason: "every statistic needs a name and a variable".to_string(),
                    });
                }
            }
        }
        SurvivalAggregation(survival) => {
            require(variant, "durationColumn", non_empty(&survival.duration_column))?;
            require(variant, "eventColumn", non_empty(&survival.event_column))?;
        }
        EncryptedRegression(regression) => {
            require(variant, "featureColumns", !regression.feature_columns.is_empty())?;
            require(variant, "labelColumns", !regression.label_columns.is_empty())?;
        }
        EncryptedPrediction(prediction) => {
            require(variant, "model", non_empty(&prediction.model))?;
            require(variant, "featureColumns", !prediction.feature_columns.is_empty())?;
        }
        SetIntersection(intersection) => {
            require(
                variant,
                "matchingColumns",
                !intersection.matching_columns.is_empty(),
            )?;
        }
        Gwas(gwas) => {
            require(variant, "targetLabel", non_empty(&gwas.target_label))?;
            require(
                variant,
                "variantsOrganization",
                non_empty(&gwas.variants_organization),
            )?;
        }
        PrivateSearch(search) => {
            require(
                variant,
                "pirDatasetObjectId",
                non_empty(&search.pir_dataset_object_id),
            )?;
            require(
                variant,
                "pirSearchObjectId",
                non_empty(&search.pir_search_object_id),
            )?;
        }
        PrivateSearchSetup(setup) => {
            require(variant, "keyColumns", !setup.key_columns.is_empty())?;
            require(variant, "valueColumns", !setup.value_columns.is_empty())?;
        }
        KeySwitchedComputation(key_switched) => {
            validate_definition(&key_switched.computation)?;
        }
        CollectiveKeySwitch(key_switch) => {
            require(variant, "cipherVector", non_empty(&key_switch.cipher_vector))?;
            require(
                variant,
                "targetPublicKey",
                non_empty(&key_switch.target_public_key),
            )?;
        }
        Bootstrap(bootstrap) => {
            require(variant, "cipherVector", non_empty(&bootstrap.cipher_vector))?;
        }
        Decryption(decryption) => {
            require(variant, "cipherVector", non_empty(&decryption.cipher_vector))?;
        }
        SampleExtraction(extraction) => {
            if extraction.sample_size == 0 {
                return Err(ValidationError::InvalidField {
                    variant,
                    field: "sampleSize",
                    reason: "must be positive".to_string(),
                });
            }
        }
        CollectiveKeyGen(_) | RelinearizationKeyGen(_) | Encryption(_) => {}
    }

    validate_groups(definition.group_specs())?;

    match definition.common().dp_epsilon {
        Some(epsilon) if epsilon <= 0.0 || epsilon.is_nan() => {
            Err(ValidationError::NonPositiveEpsilon(epsilon))
        }
        _ => Ok(()),
    }
}

fn check_bound(variant: &'static str, bound: f64) -> Result<(), ValidationError> {
    if bound > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidField {
            variant,
            field: "valueBound",
            reason: format!("must be positive, got {}", bound),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        definition::{
            Bootstrap,
            CollectiveKeyGen,
            EncryptedAggregation,
            EncryptedRegression,
            Gwas,
            KeySwitchedComputation,
            SampleExtraction,
        },
        ComputationCommon,
        GroupSpec,
    };

    #[test]
    fn missing_variant_fields() {
        let regression: ComputationDefinition = EncryptedRegression {
            feature_columns: vec!["x".into()],
            ..Default::default()
        }
        .into();
        assert_eq!(
            validate_definition(&regression),
            Err(ValidationError::MissingField {
                variant: "encryptedRegression",
                field: "labelColumns"
            })
        );

        let gwas: ComputationDefinition = Gwas {
            target_label: "disease".into(),
            ..Default::default()
        }
        .into();
        assert_eq!(
            validate_definition(&gwas),
            Err(ValidationError::MissingField {
                variant: "gwas",
                field: "variantsOrganization"
            })
        );

        let bootstrap: ComputationDefinition = Bootstrap::default().into();
        assert!(validate_definition(&bootstrap).is_err());

        let extraction: ComputationDefinition = SampleExtraction::default().into();
        assert!(matches!(
            validate_definition(&extraction),
            Err(ValidationError::InvalidField { field: "sampleSize", .. })
        ));
    }

    #[test]
    fn aggregation_needs_columns_or_count() {
        let mut aggregation = EncryptedAggregation::default();
        assert!(validate_definition(&aggregation.clone().into()).is_err());
        aggregation.count = true;
        assert!(validate_definition(&aggregation.clone().into()).is_ok());
        aggregation.groups = vec![GroupSpec::cuts("age", vec![65.0, 18.0])];
        assert!(matches!(
            validate_definition(&aggregation.into()),
            Err(ValidationError::InvalidGroup { .. })
        ));
    }

    #[test]
    fn nested_definitions_are_checked() {
        let definition: ComputationDefinition = KeySwitchedComputation {
            common: ComputationCommon::default(),
            computation: Box::new(EncryptedAggregation::default().into()),
            decrypt_results: false,
            target_public_key: None,
        }
        .into();
        assert!(validate_definition(&definition).is_err());
    }

    #[test]
    fn epsilon_must_be_positive() {
        let mut definition: ComputationDefinition = CollectiveKeyGen::default().into();
        definition.common_mut().dp_epsilon = Some(0.0);
        assert_eq!(
            validate_definition(&definition),
            Err(ValidationError::NonPositiveEpsilon(0.0))
        );
        definition.common_mut().dp_epsilon = Some(0.5);
        assert!(validate_definition(&definition).is_ok());
    }
}
