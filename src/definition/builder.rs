use std::time::Duration;

use tracing::debug;

use super::validate::validate_definition;
use crate::{
    aggregation::check_dp_compatible,
    error::ValidationError,
    models::{
        ComputationDefinition,
        DataSourceParameters,
        DataSourceQuery,
        InputClippingMethod,
        LocalInput,
        PreprocessingChain,
        Project,
    },
};

/// Merges a user supplied computation with the project context and the
/// caller's overrides into a definition ready to be submitted.
///
/// The datasource query applied is the first available of:
///
/// 1. the query set with [`DefinitionBuilder::data_source_query`], or else the
///    one the computation already carries
/// 2. the default query of the project
///
/// If neither exists the server uses its own default. A local input replaces
/// the query altogether.
#[derive(Debug, Clone)]
pub struct DefinitionBuilder {
    max_timeout: Duration,
    project: Option<Project>,
    preprocessing: Option<PreprocessingChain>,
    data_source_query: Option<DataSourceQuery>,
    local_input: Option<LocalInput>,
    clipping: Option<InputClippingMethod>,
    aggregation_bound: Option<f64>,
    dp_epsilon: Option<f64>,
}

impl DefinitionBuilder {
    /// Create a builder. `max_timeout` is how long the client is willing to
    /// wait and becomes the server-side timeout of the computation.
    pub fn new(max_timeout: Duration) -> Self {
        Self {
            max_timeout,
            project: None,
            preprocessing: None,
            data_source_query: None,
            local_input: None,
            clipping: None,
            aggregation_bound: None,
            dp_epsilon: None,
        }
    }

    pub fn project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn preprocessing(mut self, chain: PreprocessingChain) -> Self {
        self.preprocessing = Some(chain);
        self
    }

    pub fn data_source_query(mut self, query: DataSourceQuery) -> Self {
        self.data_source_query = Some(query);
        self
    }

    /// Use `input` instead of this node's datasource. The input is only used
    /// by this node.
    pub fn local_input(mut self, input: LocalInput) -> Self {
        self.local_input = Some(input);
        self
    }

    pub fn clipping(mut self, method: InputClippingMethod) -> Self {
        self.clipping = Some(method);
        self
    }

    /// Bound on the value a single record contributes, for the computation
    /// kinds that aggregate values.
    pub fn aggregation_bound(mut self, bound: f64) -> Self {
        self.aggregation_bound = Some(bound);
        self
    }

    pub fn dp_epsilon(mut self, epsilon: f64) -> Self {
        self.dp_epsilon = Some(epsilon);
        self
    }

    pub fn max_timeout(&self) -> Duration {
        self.max_timeout
    }

    /// Produce the definition to submit.
    ///
    /// # Errors
    ///
    /// Fails with a [`ValidationError`] if a field the computation kind needs
    /// is missing, or if its grouping is not compatible with the differential
    /// privacy policy of the project.
    pub fn build(
        &self,
        model: ComputationDefinition,
    ) -> Result<ComputationDefinition, ValidationError> {
        let mut definition = model;
        let kind = definition.kind();

        if let Some(bound) = self.aggregation_bound {
            match definition.value_bound_mut() {
                Some(value_bound) => *value_bound = Some(bound),
                None => debug!("{} computations take no aggregation bound, ignoring it", kind),
            }
        }

        let common = definition.common_mut();
        if let Some(project) = &self.project {
            common.project_id = Some(project.id.clone());
        }
        common.timeout = Some(self.max_timeout.as_secs());
        common.wait = Some(false);
        if let Some(chain) = &self.preprocessing {
            common.preprocessing_parameters = Some(chain.clone());
        }
        if let Some(method) = self.clipping {
            common.input_clipping_method = Some(method);
        }
        if let Some(epsilon) = self.dp_epsilon {
            common.dp_epsilon = Some(epsilon);
        }

        let existing_query = common
            .data_source_parameters
            .as_mut()
            .and_then(|parameters| parameters.data_source_query.take());
        let query = self
            .data_source_query
            .clone()
            .or(existing_query)
            .or_else(|| {
                self.project
                    .as_ref()
                    .and_then(|project| project.data_source_query.clone())
            });

        match &self.local_input {
            Some(input) => {
                debug!("using local input instead of the datasource query");
                common.local_input = Some(input.clone());
            }
            None => {
                if let Some(query) = query {
                    common
                        .data_source_parameters
                        .get_or_insert_with(DataSourceParameters::default)
                        .data_source_query = Some(query);
                }
            }
        }

        validate_definition(&definition)?;
        if self.project.as_ref().map_or(false, Project::enforces_dp) {
            check_dp(&definition)?;
        }
        Ok(definition)
    }
}

fn check_dp(definition: &ComputationDefinition) -> Result<(), ValidationError> {
    check_dp_compatible(definition.group_specs())?;
    if let ComputationDefinition::KeySwitchedComputation(key_switched) = definition {
        check_dp(&key_switched.computation)?;
    }
    Ok(())
}
