use std::error::Error;
use std::fs;
use std::path::Path;

use dyns_core::SamplerSettings;
use dyns_run::{settings_root, DynamicOptions, RootOptions};
use dyns_sampler::likelihoods::{self, Likelihood};
use dyns_sampler::priors::{self, Prior};
use dyns_sampler::NestedSampler;
use serde::{Deserialize, Serialize};

/// Likelihoods selectable from a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikelihoodKind {
    Gaussian,
    GaussianShell,
    GaussianMix,
    Rastrigin,
    Rosenbrock,
}

impl LikelihoodKind {
    fn name(self) -> &'static str {
        match self {
            LikelihoodKind::Gaussian => "gaussian",
            LikelihoodKind::GaussianShell => "gaussian_shell",
            LikelihoodKind::GaussianMix => "gaussian_mix",
            LikelihoodKind::Rastrigin => "rastrigin",
            LikelihoodKind::Rosenbrock => "rosenbrock",
        }
    }
}

/// Priors selectable from a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorKind {
    Gaussian,
    Uniform,
}

impl PriorKind {
    fn name(self) -> &'static str {
        match self {
            PriorKind::Gaussian => "gaussian",
            PriorKind::Uniform => "uniform",
        }
    }
}

/// Problem the reference sampler is pointed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemConfig {
    #[serde(default = "default_likelihood")]
    pub likelihood: LikelihoodKind,
    #[serde(default = "default_prior")]
    pub prior: PriorKind,
    #[serde(default = "default_ndim")]
    pub ndim: usize,
    #[serde(default = "default_prior_scale")]
    pub prior_scale: f64,
    #[serde(default = "default_num_repeats")]
    pub num_repeats: usize,
}

fn default_likelihood() -> LikelihoodKind {
    LikelihoodKind::Gaussian
}

fn default_prior() -> PriorKind {
    PriorKind::Gaussian
}

fn default_ndim() -> usize {
    2
}

fn default_prior_scale() -> f64 {
    10.0
}

fn default_num_repeats() -> usize {
    20
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            likelihood: default_likelihood(),
            prior: default_prior(),
            ndim: default_ndim(),
            prior_scale: default_prior_scale(),
            num_repeats: default_num_repeats(),
        }
    }
}

type BoxedLikelihood = Box<dyn Fn(&[f64]) -> f64>;
type BoxedPrior = Box<dyn Fn(&[f64]) -> Vec<f64>>;

fn boxed_likelihood<L: Likelihood + 'static>(likelihood: L) -> BoxedLikelihood {
    Box::new(move |theta: &[f64]| likelihood.log_likelihood(theta))
}

fn boxed_prior<P: Prior + 'static>(prior: P) -> BoxedPrior {
    Box::new(move |cube: &[f64]| prior.transform(cube))
}

impl ProblemConfig {
    /// Builds the reference sampler for this problem.
    pub fn sampler(&self) -> NestedSampler<BoxedLikelihood, BoxedPrior> {
        let likelihood = match self.likelihood {
            LikelihoodKind::Gaussian => boxed_likelihood(likelihoods::Gaussian { sigma: 1.0 }),
            LikelihoodKind::GaussianShell => {
                boxed_likelihood(likelihoods::GaussianShell::default())
            }
            LikelihoodKind::GaussianMix => boxed_likelihood(likelihoods::GaussianMix::default()),
            LikelihoodKind::Rastrigin => boxed_likelihood(likelihoods::Rastrigin::default()),
            LikelihoodKind::Rosenbrock => boxed_likelihood(likelihoods::Rosenbrock::default()),
        };
        let prior = match self.prior {
            PriorKind::Gaussian => boxed_prior(priors::Gaussian {
                scale: self.prior_scale,
            }),
            PriorKind::Uniform => boxed_prior(priors::Uniform {
                scale: self.prior_scale,
            }),
        };
        NestedSampler::new(likelihood, prior, self.ndim).with_num_repeats(self.num_repeats)
    }
}

/// Top-level YAML document accepted by `dyns run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    /// Dynamic goal in `[0, 1]`.
    pub goal: f64,
    #[serde(default)]
    pub problem: ProblemConfig,
    #[serde(default)]
    pub settings: SamplerSettings,
    #[serde(default)]
    pub options: DynamicOptions,
    /// Derive `settings.file_root` from the problem and options.
    #[serde(default)]
    pub auto_root: bool,
}

impl RunFile {
    /// Reads a run description from YAML.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parses a run description.
    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        let mut file: RunFile = serde_yaml::from_str(text)?;
        if file.auto_root {
            file.settings.file_root = file.root_name();
        }
        Ok(file)
    }

    /// File root naming this configuration.
    pub fn root_name(&self) -> String {
        let ninit = self.options.ninit;
        let options = RootOptions {
            prior_scale: self.problem.prior_scale,
            dynamic_goal: Some(self.goal),
            nlive_const: self.options.nlive_const(self.settings.nlive),
            nrepeats: self.problem.num_repeats,
            ninit: Some(ninit),
            init_step: Some(self.options.init_step()),
        };
        settings_root(
            self.problem.likelihood.name(),
            self.problem.prior.name(),
            self.problem.ndim,
            &options,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let file = RunFile::from_yaml("goal: 1.0\n").unwrap();
        assert_eq!(file.problem, ProblemConfig::default());
        assert_eq!(file.settings, SamplerSettings::default());
        assert_eq!(file.options, DynamicOptions::default());
    }

    #[test]
    fn auto_root_names_the_configuration() {
        let yaml = "goal: 0.25\nauto_root: true\noptions:\n  ninit: 5\nsettings:\n  nlive: 50\n";
        let file = RunFile::from_yaml(yaml).unwrap();
        assert_eq!(
            file.settings.file_root,
            "gaussian_gaussian_10_dg0_25_5init_5is_2d_50nlive_20nrepeats"
        );
    }

    #[test]
    fn unknown_option_keys_are_rejected() {
        let yaml = "goal: 1.0\noptions:\n  ninit: 5\n  nlive_cnst: 20\n";
        assert!(RunFile::from_yaml(yaml).is_err());
    }

    #[test]
    fn load_reads_yaml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "goal: 0.5\nsettings:\n  seed: 3\n").unwrap();
        let file = RunFile::load(&path).unwrap();
        assert_eq!(file.goal, 0.5);
        assert_eq!(file.settings.seed, 3);
        assert!(RunFile::load(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn problem_builds_a_sampler_of_the_requested_dimension() {
        let yaml = "goal: 0.0\nproblem:\n  likelihood: rosenbrock\n  prior: uniform\n  ndim: 4\n";
        let file = RunFile::from_yaml(yaml).unwrap();
        assert_eq!(file.problem.sampler().ndim(), 4);
    }
}
