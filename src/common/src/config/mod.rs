use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Deletion order used when the configuration does not provide one.
///
/// Each entry lists API identifiers (plural resource name, API group or kind);
/// an empty entry matches everything not claimed by an earlier phase.
pub fn default_phases() -> Vec<Vec<String>> {
    let phase = |identifiers: &[&str]| identifiers.iter().map(|s| s.to_string()).collect();
    vec![
        // namespaces first, they take their contents with them
        phase(&["Namespace"]),
        // high level objects from operator CRDs
        phase(&[
            "monitoring.coreos.com",
            "kafka.strimzi.io",
            "zookeeper.pravega.io",
            "elasticsearch.k8s.elastic.co",
            "cert-manager.io",
            "bitnami.com",
            "acid.zalan.do",
        ]),
        // generic high level workloads
        phase(&["Deployment", "StatefulSet", "DaemonSet", "Service", "Ingress"]),
        // everything else
        Vec::new(),
    ]
}

/// Pruning configuration.
///
/// Env: KPRUNE__PRUNE__*
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PruneConfig {
    /// Maximum number of delete calls in flight.
    pub concurrency: usize,
    /// Block on every delete until the object is gone.
    pub wait_for_deletion: bool,
    /// Forward deletes as server-side dry runs.
    pub dry_run: bool,
    /// Field manager name this tool applies objects with.
    pub manager_name: String,
    /// Annotation that protects an object from pruning.
    pub skip_delete_annotation: String,
    /// Annotation that protects an object when only some tags were deployed.
    pub skip_delete_if_tags_annotation: String,
    /// Ordered deletion phases.
    pub phases: Vec<Vec<String>>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            wait_for_deletion: true,
            dry_run: false,
            manager_name: "kprune".to_string(),
            skip_delete_annotation: "kprune.io/skip-delete".to_string(),
            skip_delete_if_tags_annotation: "kprune.io/skip-delete-if-tags".to_string(),
            phases: default_phases(),
        }
    }
}

impl PruneConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("Concurrency must be greater than 0");
        }
        if self.manager_name.is_empty() {
            anyhow::bail!("Field manager name cannot be empty");
        }
        if self.skip_delete_annotation.is_empty() || self.skip_delete_if_tags_annotation.is_empty() {
            anyhow::bail!("Skip annotations cannot be empty");
        }
        if self.phases.is_empty() {
            anyhow::bail!("At least one deletion phase is required");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Spinners when stderr is a terminal, log lines otherwise.
    #[default]
    Auto,
    Plain,
    Fancy,
}

/// Status reporting configuration.
///
/// Env: KPRUNE__STATUS__*
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    pub progress: ProgressMode,
    /// Emit trace-level status messages.
    pub trace: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    pub prune: PruneConfig,
    pub status: StatusConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file("kprune.toml"))
            .extract()
            .map_err(Box::new)
    }

    /// Loads an explicitly named file, which must exist.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file_exact(path))
            .extract()
            .map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed("KPRUNE__").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.prune.concurrency, 8);
        assert!(config.prune.wait_for_deletion);
        assert!(!config.prune.dry_run);
        assert_eq!(config.prune.manager_name, "kprune");
        assert_eq!(config.prune.phases.len(), 4);
        assert_eq!(config.prune.phases[0], vec!["Namespace".to_string()]);
        assert!(config.prune.phases[3].is_empty());
        assert_eq!(config.status.progress, ProgressMode::Auto);
    }

    #[test]
    fn test_prune_config_validation() {
        assert!(PruneConfig::default().validate().is_ok());

        let zero = PruneConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let no_phases = PruneConfig {
            phases: Vec::new(),
            ..Default::default()
        };
        let error = no_phases.validate().unwrap_err();
        assert!(error.to_string().contains("phase"));
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.prune.concurrency, 8);
            assert_eq!(config.prune.skip_delete_annotation, "kprune.io/skip-delete");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "kprune.toml",
                r#"
                [prune]
                concurrency = 2
                manager_name = "deployer"
                phases = [["Namespace"], []]

                [status]
                progress = "plain"
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.prune.concurrency, 2);
            assert_eq!(config.prune.manager_name, "deployer");
            assert_eq!(config.prune.phases.len(), 2);
            assert_eq!(config.status.progress, ProgressMode::Plain);
            // untouched keys keep their defaults
            assert!(config.prune.wait_for_deletion);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.set_env("KPRUNE__PRUNE__CONCURRENCY", "16");
            jail.set_env("KPRUNE__PRUNE__DRY_RUN", "true");
            jail.set_env("KPRUNE__STATUS__TRACE", "true");

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.prune.concurrency, 16);
            assert!(config.prune.dry_run);
            assert!(config.status.trace);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_explicit_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[prune]\nwait_for_deletion = false\n")?;

            let config =
                Configuration::load_from_path(Path::new("custom.toml")).map_err(|e| *e)?;
            assert!(!config.prune.wait_for_deletion);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        Jail::expect_with(|_jail| {
            let result = Configuration::load_from_path(Path::new("typo.toml"));
            assert!(result.is_err());
            Ok(())
        });
    }
}
