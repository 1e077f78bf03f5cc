use crate::{error::ValidationError, models::GroupSpec};

/// Check that grouping dimensions are well formed.
pub fn validate_groups(specs: &[GroupSpec]) -> Result<(), ValidationError> {
    for spec in specs {
        let invalid = |reason: &str| ValidationError::InvalidGroup {
            column: spec.column.clone(),
            reason: reason.to_string(),
        };

        if spec.column.trim().is_empty() {
            return Err(invalid("column name is empty"));
        }
        if let Some(cuts) = &spec.cuts {
            if !spec.numeric {
                return Err(invalid("cuts require a numeric column"));
            }
            if cuts.is_empty() {
                return Err(invalid("cuts are empty"));
            }
            if cuts.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(invalid("cuts must be strictly increasing"));
            }
        }
        if let Some(size) = spec.bin_size {
            if !spec.numeric {
                return Err(invalid("bins require a numeric column"));
            }
            if size <= 0.0 {
                return Err(invalid("bin size must be positive"));
            }
        }
        if spec.numeric && spec.cuts.is_none() && spec.bin_size.is_none() {
            return Err(invalid("numeric groups need cuts or a bin size"));
        }
    }
    Ok(())
}

/// Under differential privacy the set of groups must not depend on the data:
/// numeric groups need explicit cuts and categorical groups need their
/// possible values.
pub fn check_dp_compatible(specs: &[GroupSpec]) -> Result<(), ValidationError> {
    for spec in specs {
        if spec.numeric && spec.cuts.is_none() {
            return Err(ValidationError::DpIncompatibleGroup {
                column: spec.column.clone(),
                missing: "cuts",
            });
        }
        if !spec.numeric && spec.possible_values.is_none() {
            return Err(ValidationError::DpIncompatibleGroup {
                column: spec.column.clone(),
                missing: "possibleValues",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_groups() {
        let specs = vec![
            GroupSpec::cuts("age", vec![0.0, 18.0, 65.0]),
            GroupSpec::bins("weight", 10.0, 0.0),
            GroupSpec::categorical("gender"),
        ];
        assert!(validate_groups(&specs).is_ok());
    }

    #[test]
    fn malformed_groups() {
        let unsorted = GroupSpec::cuts("age", vec![18.0, 0.0]);
        assert!(matches!(
            validate_groups(&[unsorted]),
            Err(ValidationError::InvalidGroup { .. })
        ));

        let mut bare_numeric = GroupSpec::bins("age", 1.0, 0.0);
        bare_numeric.bin_size = None;
        assert!(validate_groups(&[bare_numeric]).is_err());

        let mut categorical_cuts = GroupSpec::categorical("gender");
        categorical_cuts.cuts = Some(vec![1.0]);
        assert!(validate_groups(&[categorical_cuts]).is_err());

        assert!(validate_groups(&[GroupSpec::categorical(" ")]).is_err());
    }

    #[test]
    fn dp_requires_static_output_space() {
        assert!(check_dp_compatible(&[
            GroupSpec::cuts("age", vec![0.0, 18.0]),
            GroupSpec::categories("gender", vec!["F".into(), "M".into()]),
        ])
        .is_ok());

        assert_eq!(
            check_dp_compatible(&[GroupSpec::bins("age", 5.0, 0.0)]),
            Err(ValidationError::DpIncompatibleGroup {
                column: "age".into(),
                missing: "cuts"
            })
        );
        assert_eq!(
            check_dp_compatible(&[GroupSpec::categorical("gender")]),
            Err(ValidationError::DpIncompatibleGroup {
                column: "gender".into(),
                missing: "possibleValues"
            })
        );
    }
}
