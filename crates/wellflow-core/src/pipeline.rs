//! Sequential, contract-checked execution of named steps over a table.

use std::fmt;
use std::marker::PhantomData;

use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::contract::StepContract;
use crate::error::{PipelineError, Result};
use crate::options::PipelineOptions;

pub type StepFn = fn(&PipelineOptions, DataFrame) -> Result<DataFrame>;

/// One named transformation and the preconditions it declares.
#[derive(Clone, Copy)]
pub struct StepDefinition {
    pub name: &'static str,
    pub contract: StepContract,
    pub apply: StepFn,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .finish()
    }
}

/// A fixed set of steps a [`Pipeline`] can be assembled from.
pub trait StepLibrary {
    /// Name used in logs and errors, e.g. `"bronze"`.
    const TIER: &'static str;

    fn registry() -> &'static [StepDefinition];

    /// Hook for checks on options that can be done before any table is seen.
    fn validate_options(_options: &PipelineOptions) -> Result<()> {
        Ok(())
    }

    fn step_names() -> Vec<&'static str> {
        Self::registry().iter().map(|step| step.name).collect()
    }

    fn lookup(name: &str) -> Result<&'static StepDefinition> {
        Self::registry()
            .iter()
            .find(|step| step.name == name)
            .ok_or_else(|| PipelineError::UnknownStep {
                tier: Self::TIER,
                step: name.to_string(),
            })
    }
}

/// An ordered list of step names bound to a step library and its options.
pub struct Pipeline<L: StepLibrary> {
    steps: Vec<String>,
    options: PipelineOptions,
    library: PhantomData<L>,
}

impl<L: StepLibrary> fmt::Debug for Pipeline<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("tier", &L::TIER)
            .field("steps", &self.steps)
            .field("options", &self.options)
            .finish()
    }
}

impl<L: StepLibrary> Pipeline<L> {
    pub fn new<S>(steps: impl IntoIterator<Item = S>, options: PipelineOptions) -> Result<Self>
    where
        S: Into<String>,
    {
        let steps: Vec<String> = steps.into_iter().map(Into::into).collect();
        if steps.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{} pipeline needs at least one step",
                L::TIER
            )));
        }
        L::validate_options(&options)?;

        Ok(Self {
            steps,
            options,
            library: PhantomData,
        })
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Contract of a step in this pipeline's library, without needing a table.
    pub fn contract_of(name: &str) -> Result<StepContract> {
        L::lookup(name).map(|step| step.contract)
    }

    pub fn resolve_steps(&self) -> Result<Vec<&'static StepDefinition>> {
        self.steps.iter().map(|name| L::lookup(name)).collect()
    }

    /// Applies every step in order. Each contract is checked against the
    /// table as left by the previous step. The input table is not modified.
    pub fn run(&self, df: &DataFrame) -> Result<DataFrame> {
        let resolved = self.resolve_steps()?;
        let mut current = df.clone();

        for (idx, step) in resolved.iter().enumerate() {
            step.contract.check(step.name, &current, &self.options)?;
            debug!(
                tier = L::TIER,
                step = step.name,
                position = idx,
                rows = current.height(),
                columns = current.width(),
                "applying step"
            );
            current = (step.apply)(&self.options, current)?;
        }

        info!(
            tier = L::TIER,
            steps = resolved.len(),
            rows = current.height(),
            columns = current.width(),
            "pipeline finished"
        );
        Ok(current)
    }
}
