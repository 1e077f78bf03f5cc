#![cfg_attr(docsrs, feature(doc_cfg))]
//! This crate provides a client for a privacy-preserving computation
//! service. The service runs computations (aggregations, regressions, set
//! intersections, GWAS, private searches, ...) over the datasets of several
//! nodes, under encryption. This client declares computations, submits
//! them, waits for them and shapes their results.
//!
//! A computation goes through the following steps:
//!
//! - a [`DefinitionBuilder`] merges the computation with the project it
//!   belongs to and the caller's overrides into a [`ComputationDefinition`]
//! - a [`LifecycleManager`] submits it and polls it with a growing backoff
//!   until it finishes, or until a deadline passes. In the latter case the
//!   computation keeps running on the server and waiting for it can be
//!   resumed with [`LifecycleManager::resume()`]
//! - a [`ResultRouter`] fetches its results, decrypts them if they are
//!   end-to-end encrypted, and hands them to a [`PostProcess`] hook
//! - for grouped aggregations, the [`GroupAggregationDecoder`] rebuilds the
//!   group-by table from the encoded output columns
//!
//! The [`LifecycleManager`] talks to the service through the
//! [`ComputationApi`] trait. A [`Client`] implementing it over HTTP is
//! available, with a `reqwest` backend when compiling with
//! `--features reqwest-client`.
//!
//! ```rust,ignore
//! use privcompute_sdk::{
//!     client::new_client,
//!     models::{definition::EncryptedAggregation, GroupSpec, Project},
//!     router::GroupedAggregation,
//!     settings::LifecycleSettings,
//!     LifecycleManager,
//!     ResultRouter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = new_client("https://node-1.example.org/api", Some("token"))?;
//!     let mut manager = LifecycleManager::new(client, LifecycleSettings::default());
//!
//!     let definition = manager
//!         .definition_builder()
//!         .project(Project::new("project-1"))
//!         .build(
//!             EncryptedAggregation {
//!                 aggregate_columns: vec!["weight".into()],
//!                 count: true,
//!                 average: true,
//!                 groups: vec![GroupSpec::cuts("age", vec![0.0, 18.0, 65.0])],
//!                 ..Default::default()
//!             }
//!             .into(),
//!         )?;
//!     let computation = manager.run(&definition).await?;
//!
//!     let hook = GroupedAggregation::for_definition(&definition, 4).unwrap();
//!     let routed = ResultRouter::new(hook)
//!         .route(manager.api_mut(), &computation)
//!         .await?;
//!     println!("{:?}", routed.value);
//!     Ok(())
//! }
//! ```
//!
//! [`Client`]: crate::client::Client
//! [`ComputationApi`]: crate::client::ComputationApi
//! [`ComputationDefinition`]: crate::models::ComputationDefinition
//! [`PostProcess`]: crate::router::PostProcess

pub mod aggregation;
pub mod blocking;
pub mod client;
pub mod definition;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod router;
pub mod settings;

pub use self::{
    aggregation::GroupAggregationDecoder,
    definition::DefinitionBuilder,
    error::Error,
    lifecycle::LifecycleManager,
    router::ResultRouter,
};
