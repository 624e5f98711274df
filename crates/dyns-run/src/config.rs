use dyns_core::errors::ErrorInfo;
use dyns_core::DynError;
use serde::{Deserialize, Serialize};

/// Options governing the dynamic procedure on top of the base sampler
/// settings.
///
/// The smoothing filter is not part of this record; it is passed alongside
/// it to [`crate::run_dynamic_ns_with_smoother`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicOptions {
    /// Live points used by the exploratory run.
    #[serde(default = "default_ninit")]
    pub ninit: usize,
    /// Dead points between exploratory checkpoints (defaults to `ninit`).
    #[serde(default)]
    pub init_step: Option<usize>,
    /// Constant live-point count whose sample budget the dynamic run matches
    /// (defaults to the base `nlive`).
    #[serde(default)]
    pub nlive_const: Option<usize>,
    /// Added to non-negative seeds before every sampler invocation.
    #[serde(default = "default_seed_increment")]
    pub seed_increment: i64,
    /// Log the elapsed wall-clock time once the procedure finishes.
    #[serde(default)]
    pub print_time: bool,
    /// Upper bound on exploratory increments before giving up.
    #[serde(default)]
    pub max_init_steps: Option<usize>,
}

fn default_ninit() -> usize {
    10
}

fn default_seed_increment() -> i64 {
    100
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            ninit: default_ninit(),
            init_step: None,
            nlive_const: None,
            seed_increment: default_seed_increment(),
            print_time: false,
            max_init_steps: None,
        }
    }
}

impl DynamicOptions {
    /// Builds options from a loosely typed key/value map.
    ///
    /// Keys outside the recognised set are rejected with a usage error.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, DynError> {
        serde_json::from_value(serde_json::Value::Object(map)).map_err(|err| {
            DynError::Usage(
                ErrorInfo::new("unexpected-option", err.to_string())
                    .with_hint("recognised options: ninit, init_step, nlive_const, seed_increment, print_time, max_init_steps"),
            )
        })
    }

    /// Dead points per exploratory increment.
    pub fn init_step(&self) -> usize {
        self.init_step.unwrap_or(self.ninit)
    }

    /// Constant live-point count used to size the sample budget.
    pub fn nlive_const(&self, base_nlive: usize) -> usize {
        self.nlive_const.unwrap_or(base_nlive)
    }
}
