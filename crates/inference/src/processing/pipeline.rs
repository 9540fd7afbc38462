use crate::error::PipelineError;
use crate::processing::{post, pre};
use anyhow::Context;
use meta::StepDescriptor;
use std::fmt;
use std::sync::Arc;
use tensor::Tensor;

type ProcessFn = dyn Fn(&Tensor) -> anyhow::Result<Tensor> + Send + Sync;

/// Which side of the network a chain runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pre,
    Post,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pre => f.write_str("pre-process"),
            Stage::Post => f.write_str("post-process"),
        }
    }
}

/// Named tensor transform. Closes over whatever configuration it was built
/// with and never mutates its input.
#[derive(Clone)]
pub struct Processor {
    name: String,
    func: Arc<ProcessFn>,
}

impl Processor {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Tensor) -> anyhow::Result<Tensor> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, input: &Tensor) -> anyhow::Result<Tensor> {
        (self.func)(input)
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor").field("name", &self.name).finish()
    }
}

/// Ordered chain of processors, applied left to right.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Processor>,
}

impl Pipeline {
    pub fn new(steps: Vec<Processor>) -> Self {
        Self { steps }
    }

    /// Builds the chain described by `descriptors`. Any unknown step name or
    /// malformed parameter set fails the whole build.
    pub fn from_descriptors(
        descriptors: &[StepDescriptor],
        stage: Stage,
    ) -> Result<Self, PipelineError> {
        let steps = descriptors
            .iter()
            .map(|descriptor| match stage {
                Stage::Pre => pre::build_step(descriptor),
                Stage::Post => post::build_step(descriptor),
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            %stage,
            steps = ?steps.iter().map(Processor::name).collect::<Vec<_>>(),
            "Built processing chain"
        );

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Processor::name)
    }

    /// `steps[n-1](...steps[0](input))`. An empty chain returns a copy of
    /// the input.
    pub fn run(&self, input: &Tensor) -> anyhow::Result<Tensor> {
        let mut current = input.clone();
        for step in &self.steps {
            let _s = tracing::debug_span!("step", name = step.name()).entered();
            current = step
                .apply(&current)
                .with_context(|| format!("{} step failed", step.name()))?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(value: f32) -> Processor {
        Processor::new(format!("add_{}", value), move |t: &Tensor| {
            let mut out = t.clone();
            out.iter_mut().for_each(|v| *v += value);
            Ok(out)
        })
    }

    fn mul(value: f32) -> Processor {
        Processor::new(format!("mul_{}", value), move |t: &Tensor| {
            let mut out = t.clone();
            out.iter_mut().for_each(|v| *v *= value);
            Ok(out)
        })
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let input = Tensor::from_vec(vec![2, 2], vec![1.0, -2.0, 3.5, 0.0]);
        let output = Pipeline::default().run(&input).unwrap();
        assert!(output.all_equal(&input));
    }

    #[test]
    fn test_pipeline_applies_left_to_right() {
        let input = Tensor::zeros(vec![2, 2]);

        let output = Pipeline::new(vec![add(1.0), mul(2.0)]).run(&input).unwrap();
        assert!(output.iter().all(|&v| v == 2.0), "expected (0 + 1) * 2");

        let reversed = Pipeline::new(vec![mul(2.0), add(1.0)]).run(&input).unwrap();
        assert!(reversed.iter().all(|&v| v == 1.0), "expected 0 * 2 + 1");
    }

    #[test]
    fn test_pipeline_does_not_mutate_input() {
        let input = Tensor::from_vec(vec![3], vec![1.0, 2.0, 3.0]);
        let _ = Pipeline::new(vec![add(10.0)]).run(&input).unwrap();
        assert_eq!(input.data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_failing_step_is_named_in_error() {
        let failing = Processor::new("always_fails", |_: &Tensor| anyhow::bail!("boom"));
        let err = Pipeline::new(vec![add(1.0), failing])
            .run(&Tensor::zeros(vec![1]))
            .unwrap_err();
        assert_eq!(err.to_string(), "always_fails step failed");
        assert_eq!(err.root_cause().to_string(), "boom");
    }

    #[test]
    fn test_from_descriptors_rejects_unknown_step() {
        let descriptors = vec![
            StepDescriptor::named("DivideBy255"),
            StepDescriptor::named("Sharpen"),
        ];
        let err = Pipeline::from_descriptors(&descriptors, Stage::Pre).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnknownStep { stage: Stage::Pre, ref name } if name == "Sharpen"
        ));
    }

    #[test]
    fn test_from_descriptors_keeps_order() {
        let descriptors = vec![
            StepDescriptor::named("PerImageStandardization"),
            StepDescriptor::named("DivideBy255"),
        ];
        let pipeline = Pipeline::from_descriptors(&descriptors, Stage::Pre).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.step_names().collect::<Vec<_>>(),
            vec!["PerImageStandardization", "DivideBy255"]
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Pre.to_string(), "pre-process");
        assert_eq!(Stage::Post.to_string(), "post-process");
    }
}
