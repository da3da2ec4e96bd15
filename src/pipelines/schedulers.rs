use std::collections::HashMap;

use serde::Serialize;

use crate::app::models::worker_error::WorkerError;

pub const SD_SCHEDULER_DEFAULT: &str = "K_LMS";
pub const KANDINSKY_22_SCHEDULER_DEFAULT: &str = "DDPM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerFamily {
    StableDiffusion,
    Kandinsky22,
}

/// How the registry builds a scheduler: `FromConfig` inherits the bundle's
/// current numeric configuration, `Fresh` ignores it and starts from defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryStyle {
    FromConfig,
    Fresh,
}

/// Numeric integration config injected per call. Swapping the scheduler never
/// mutates the bundle; every request resolves its own copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerConfig {
    pub name: &'static str,
    pub num_train_timesteps: u32,
    pub beta_start: f32,
    pub beta_end: f32,
    pub beta_schedule: &'static str,
}

impl SchedulerConfig {
    pub fn fresh(name: &'static str) -> Self {
        Self {
            name,
            num_train_timesteps: 1000,
            beta_start: 0.00085,
            beta_end: 0.012,
            beta_schedule: "scaled_linear",
        }
    }
}

lazy_static! {
    static ref SD_SCHEDULERS: HashMap<&'static str, FactoryStyle> = HashMap::from([
        ("K_LMS", FactoryStyle::FromConfig),
        ("PNDM", FactoryStyle::FromConfig),
        ("DDIM", FactoryStyle::FromConfig),
        ("K_EULER", FactoryStyle::FromConfig),
        ("K_EULER_ANCESTRAL", FactoryStyle::FromConfig),
        ("HEUN", FactoryStyle::FromConfig),
        ("DPM++_2M", FactoryStyle::FromConfig),
        ("DPM++_2S", FactoryStyle::FromConfig),
        ("DEIS", FactoryStyle::FromConfig),
        ("UNI_PC", FactoryStyle::FromConfig),
        ("DDPM", FactoryStyle::FromConfig),
    ]);
    static ref KANDINSKY_22_SCHEDULERS: HashMap<&'static str, FactoryStyle> = HashMap::from([
        ("DDPM", FactoryStyle::FromConfig),
        ("DDIM", FactoryStyle::Fresh),
        ("DPM++_2M", FactoryStyle::Fresh),
    ]);
}

fn registry(family: SchedulerFamily) -> &'static HashMap<&'static str, FactoryStyle> {
    match family {
        SchedulerFamily::StableDiffusion => &SD_SCHEDULERS,
        SchedulerFamily::Kandinsky22 => &KANDINSKY_22_SCHEDULERS,
    }
}

pub fn default_for(family: SchedulerFamily) -> &'static str {
    match family {
        SchedulerFamily::StableDiffusion => SD_SCHEDULER_DEFAULT,
        SchedulerFamily::Kandinsky22 => KANDINSKY_22_SCHEDULER_DEFAULT,
    }
}

pub fn is_valid(family: SchedulerFamily, name: &str) -> bool {
    registry(family).contains_key(name)
}

/// Resolves a scheduler name against the bundle's current config. Unknown
/// names are rejected at request validation, so hitting one here means the
/// model was misconfigured.
pub fn resolve(
    family: SchedulerFamily,
    name: &str,
    current: &SchedulerConfig,
) -> Result<SchedulerConfig, WorkerError> {
    match registry(family).get_key_value(name) {
        Some((key, FactoryStyle::FromConfig)) => Ok(SchedulerConfig {
            name: key,
            ..current.clone()
        }),
        Some((key, FactoryStyle::Fresh)) => Ok(SchedulerConfig::fresh(key)),
        None => Err(WorkerError::Configuration(format!(
            "\"{}\" is not in the list of schedulers.",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_from_config_inherits_numeric_configuration() {
        let current = SchedulerConfig {
            name: "K_LMS",
            num_train_timesteps: 1000,
            beta_start: 0.0001,
            beta_end: 0.02,
            beta_schedule: "linear",
        };

        let resolved =
            resolve(SchedulerFamily::StableDiffusion, "K_EULER", &current).unwrap();

        assert_eq!(resolved.name, "K_EULER");
        assert_eq!(resolved.beta_start, 0.0001);
        assert_eq!(resolved.beta_end, 0.02);
        assert_eq!(resolved.beta_schedule, "linear");
    }

    #[test]
    fn resolve_fresh_ignores_current_configuration() {
        let current = SchedulerConfig {
            name: "DDPM",
            num_train_timesteps: 500,
            beta_start: 0.0001,
            beta_end: 0.02,
            beta_schedule: "linear",
        };

        let resolved = resolve(SchedulerFamily::Kandinsky22, "DDIM", &current).unwrap();

        assert_eq!(resolved, SchedulerConfig::fresh("DDIM"));
    }

    #[test]
    fn resolve_unknown_name_is_a_configuration_error() {
        let current = SchedulerConfig::fresh(SD_SCHEDULER_DEFAULT);
        let result = resolve(SchedulerFamily::StableDiffusion, "NOT_A_SCHEDULER", &current);

        assert!(matches!(result, Err(WorkerError::Configuration(_))));
    }

    #[test]
    fn family_membership() {
        assert!(is_valid(SchedulerFamily::StableDiffusion, "UNI_PC"));
        assert!(!is_valid(SchedulerFamily::Kandinsky22, "UNI_PC"));
        assert!(is_valid(SchedulerFamily::Kandinsky22, "DDPM"));
    }
}
