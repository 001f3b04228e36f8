//! Plugin inputs and their resolution into per-phase test configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::env::{BuildEnv, DEPLOY_URL_VAR};
use crate::error::{Error, Result};
use crate::types::{Browser, Phase};

/// Default readiness timeout when `wait-on-timeout` is not given
pub const DEFAULT_WAIT_ON_TIMEOUT_SECS: f64 = 60.0;

/// Fallback file served for unmatched routes when `spa = true`
pub const DEFAULT_SPA_FILE: &str = "index.html";

/// Inputs for all phases, as written in the plugin configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginInputs {
    #[serde(rename = "preBuild")]
    pub pre_build: PhaseInputs,

    #[serde(rename = "postBuild")]
    pub post_build: PhaseInputs,

    #[serde(rename = "onSuccess")]
    pub on_success: PhaseInputs,
}

impl PluginInputs {
    /// Load inputs from file, missing file means every phase is disabled
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            debug!("no inputs file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn for_phase(&self, phase: Phase) -> &PhaseInputs {
        match phase {
            Phase::PreBuild => &self.pre_build,
            Phase::PostBuild => &self.post_build,
            Phase::OnSuccess => &self.on_success,
        }
    }
}

/// Raw options recognized for one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseInputs {
    /// Run tests in this phase
    pub enable: bool,

    /// Spec file pattern passed to the runner
    pub spec: Option<String>,

    /// Record the run to the dashboard (requires the record key)
    pub record: bool,

    pub group: Option<String>,

    pub tag: Option<String>,

    /// `chromium` or `electron`
    pub browser: Option<String>,

    /// Shell command starting the application under test
    pub start: Option<String>,

    /// URL to wait for before running tests
    #[serde(rename = "wait-on")]
    pub wait_on: Option<String>,

    /// Seconds to wait for `wait-on`
    #[serde(rename = "wait-on-timeout")]
    pub wait_on_timeout: Option<Seconds>,

    /// Single-page-app fallback: `true` or the fallback file name
    pub spa: Option<SpaSetting>,

    /// Custom runner config file
    #[serde(rename = "configFile")]
    pub config_file: Option<PathBuf>,
}

/// Seconds given either as a number or as a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seconds {
    Number(f64),
    Text(String),
}

impl Seconds {
    pub fn to_duration(&self) -> Result<Duration> {
        let secs = match self {
            Seconds::Number(n) => *n,
            Seconds::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::InvalidTimeout(s.clone()))?,
        };
        if !secs.is_finite() || secs <= 0.0 {
            return Err(Error::InvalidTimeout(secs.to_string()));
        }
        Duration::try_from_secs_f64(secs).map_err(|_| Error::InvalidTimeout(secs.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpaSetting {
    Enabled(bool),
    File(String),
}

impl SpaSetting {
    /// Name of the fallback file, if routing fallback is on
    pub fn fallback_file(&self) -> Option<String> {
        match self {
            SpaSetting::Enabled(true) => Some(DEFAULT_SPA_FILE.to_string()),
            SpaSetting::Enabled(false) => None,
            SpaSetting::File(name) if name.trim().is_empty() => None,
            SpaSetting::File(name) => Some(name.clone()),
        }
    }
}

/// Where the base URL handed to the runner comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrlSource {
    /// The readiness URL, also used as the base URL
    WaitOnUrl(String),
    /// The locally bound static server, or a started process assumed to
    /// listen on the same port
    LocalServer,
    /// The deployed site
    DeployedSite(String),
    /// Nothing configured, the runner falls back to its own config
    RunnerConfig,
}

/// Dashboard recording labels, present only when recording is on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub group: String,
    pub tag: Option<String>,
    pub build_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaitOn {
    pub url: String,
    pub timeout: Duration,
}

/// Fully resolved configuration for one phase invocation
#[derive(Debug, Clone, PartialEq)]
pub struct TestPhaseConfig {
    pub phase: Phase,
    pub enabled: bool,
    pub base_url_source: BaseUrlSource,
    pub spec: Option<String>,
    pub recording: Option<Recording>,
    pub browser: Browser,
    pub start: Option<String>,
    pub wait_on: Option<WaitOn>,
    pub spa: Option<String>,
    pub config_file: Option<PathBuf>,
}

impl TestPhaseConfig {
    fn disabled(phase: Phase) -> Self {
        Self {
            phase,
            enabled: false,
            base_url_source: BaseUrlSource::RunnerConfig,
            spec: None,
            recording: None,
            browser: Browser::default(),
            start: None,
            wait_on: None,
            spa: None,
            config_file: None,
        }
    }

    /// Resolve raw inputs against the build environment
    ///
    /// Disabled phases resolve without validation. Enabled phases fail here on
    /// bad browser names, bad timeouts, empty URLs and a missing deployed URL,
    /// before any process or network activity.
    pub fn resolve(phase: Phase, inputs: &PhaseInputs, env: &BuildEnv) -> Result<Self> {
        if !inputs.enable {
            return Ok(Self::disabled(phase));
        }

        let browser = match inputs.browser.as_deref() {
            Some(name) => name.parse::<Browser>()?,
            None => Browser::default(),
        };

        let recording = (inputs.record && env.record_key_present).then(|| Recording {
            group: non_blank(&inputs.group)
                .unwrap_or_else(|| phase.default_group().to_string()),
            tag: non_blank(&inputs.tag).or_else(|| env.context.clone()),
            build_id: env.build_id.clone(),
        });
        if inputs.record && recording.is_none() {
            debug!("{}: recording requested but no record key is set", phase);
        }

        let spec = non_blank(&inputs.spec);
        let config_file = inputs.config_file.clone();

        if phase == Phase::OnSuccess {
            let url = env
                .deploy_url
                .clone()
                .ok_or(Error::MissingEnv(DEPLOY_URL_VAR))?;
            if inputs.start.is_some() || inputs.wait_on.is_some() {
                debug!("onSuccess ignores start and wait-on, testing the deployed site");
            }
            return Ok(Self {
                phase,
                enabled: true,
                base_url_source: BaseUrlSource::DeployedSite(url),
                spec,
                recording,
                browser,
                start: None,
                wait_on: None,
                spa: None,
                config_file,
            });
        }

        let wait_on = match &inputs.wait_on {
            Some(url) if url.trim().is_empty() => {
                return Err(Error::InvalidConfig("wait-on must not be empty".into()))
            }
            Some(url) => Some(WaitOn {
                url: url.trim().to_string(),
                timeout: match &inputs.wait_on_timeout {
                    Some(secs) => secs.to_duration()?,
                    None => Duration::from_secs_f64(DEFAULT_WAIT_ON_TIMEOUT_SECS),
                },
            }),
            None => None,
        };

        let start = non_blank(&inputs.start);

        let base_url_source = match (&wait_on, phase) {
            (Some(w), _) => BaseUrlSource::WaitOnUrl(w.url.clone()),
            (None, Phase::PostBuild) => BaseUrlSource::LocalServer,
            (None, _) => BaseUrlSource::RunnerConfig,
        };

        let spa = if phase == Phase::PostBuild {
            inputs.spa.as_ref().and_then(SpaSetting::fallback_file)
        } else {
            None
        };

        Ok(Self {
            phase,
            enabled: true,
            base_url_source,
            spec,
            recording,
            browser,
            start,
            wait_on,
            spa,
            config_file,
        })
    }

    /// Whether this invocation binds the static server for the publish folder
    pub fn serves_publish_dir(&self) -> bool {
        self.phase == Phase::PostBuild && self.start.is_none()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with_key() -> BuildEnv {
        BuildEnv {
            record_key_present: true,
            context: Some("production".into()),
            build_id: Some("b-1".into()),
            deploy_url: Some("https://example.app".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_inputs_file() {
        let toml = r#"
[preBuild]
enable = true
start = "npm start"
wait-on = "http://localhost:5000"
wait-on-timeout = "30"

[postBuild]
enable = true
record = true
spa = true
browser = "electron"

[onSuccess]
enable = true
spec = "cypress/e2e/smoke.cy.js"
configFile = "cypress.deploy.config.js"
"#;
        let inputs = PluginInputs::from_toml_str(toml).unwrap();
        assert!(inputs.pre_build.enable);
        assert_eq!(inputs.pre_build.start.as_deref(), Some("npm start"));
        assert_eq!(
            inputs.pre_build.wait_on_timeout,
            Some(Seconds::Text("30".into()))
        );
        assert_eq!(inputs.post_build.spa, Some(SpaSetting::Enabled(true)));
        assert_eq!(
            inputs.on_success.config_file,
            Some(PathBuf::from("cypress.deploy.config.js"))
        );
    }

    #[test]
    fn test_numeric_timeout() {
        let inputs = PluginInputs::from_toml_str(
            "[postBuild]\nenable = true\nwait-on = \"http://localhost:3000\"\nwait-on-timeout = 5\n",
        )
        .unwrap();
        let cfg =
            TestPhaseConfig::resolve(Phase::PostBuild, &inputs.post_build, &BuildEnv::default())
                .unwrap();
        assert_eq!(cfg.wait_on.unwrap().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_disables_everything() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = PluginInputs::load(&dir.path().join("sitegate.toml")).unwrap();
        assert_eq!(inputs, PluginInputs::default());
        for phase in Phase::ALL {
            assert!(!inputs.for_phase(phase).enable);
        }
    }

    #[test]
    fn test_disabled_phase_skips_validation() {
        let inputs = PhaseInputs {
            browser: Some("netscape".into()),
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PreBuild, &inputs, &BuildEnv::default()).unwrap();
        assert!(!cfg.enabled);
    }

    #[test]
    fn test_record_without_key_resolves_to_no_recording() {
        let inputs = PhaseInputs {
            enable: true,
            record: true,
            group: Some("g".into()),
            tag: Some("t".into()),
            ..Default::default()
        };
        let env = BuildEnv {
            context: Some("production".into()),
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PostBuild, &inputs, &env).unwrap();
        assert!(cfg.recording.is_none());
    }

    #[test]
    fn test_recording_defaults_group_and_tag() {
        let inputs = PhaseInputs {
            enable: true,
            record: true,
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PostBuild, &inputs, &env_with_key()).unwrap();
        assert_eq!(
            cfg.recording,
            Some(Recording {
                group: "postBuild".into(),
                tag: Some("production".into()),
                build_id: Some("b-1".into()),
            })
        );
    }

    #[test]
    fn test_recording_keeps_explicit_labels() {
        let inputs = PhaseInputs {
            enable: true,
            record: true,
            group: Some("smoke".into()),
            tag: Some("nightly".into()),
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PreBuild, &inputs, &env_with_key()).unwrap();
        let recording = cfg.recording.unwrap();
        assert_eq!(recording.group, "smoke");
        assert_eq!(recording.tag.as_deref(), Some("nightly"));
    }

    #[test]
    fn test_invalid_browser_is_config_error() {
        let inputs = PhaseInputs {
            enable: true,
            browser: Some("firefox".into()),
            ..Default::default()
        };
        let err =
            TestPhaseConfig::resolve(Phase::PostBuild, &inputs, &BuildEnv::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBrowser(_)));
    }

    #[test]
    fn test_invalid_timeouts() {
        for bad in [
            Seconds::Number(0.0),
            Seconds::Number(-3.0),
            Seconds::Number(1e20),
            Seconds::Text("soon".into()),
            Seconds::Text("1e300".into()),
        ] {
            assert!(bad.to_duration().is_err(), "{:?} should be rejected", bad);
        }
        assert_eq!(
            Seconds::Text("1.5".into()).to_duration().unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_oversized_timeout_is_a_config_error() {
        let inputs = PluginInputs::from_toml_str(
            "[postBuild]\nenable = true\nwait-on = \"http://localhost:4000\"\nwait-on-timeout = 1e20\n",
        )
        .unwrap();
        let err = TestPhaseConfig::resolve(Phase::PostBuild, &inputs.post_build, &BuildEnv::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTimeout(_)), "{:?}", err);
    }

    #[test]
    fn test_wait_on_takes_priority_over_local_server() {
        let inputs = PhaseInputs {
            enable: true,
            start: Some("npm run serve".into()),
            wait_on: Some("http://localhost:4000".into()),
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PostBuild, &inputs, &BuildEnv::default()).unwrap();
        assert_eq!(
            cfg.base_url_source,
            BaseUrlSource::WaitOnUrl("http://localhost:4000".into())
        );
        assert!(!cfg.serves_publish_dir());
        assert_eq!(cfg.wait_on.unwrap().timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_post_build_serves_folder_with_spa_fallback() {
        let inputs = PhaseInputs {
            enable: true,
            spa: Some(SpaSetting::File("app.html".into())),
            ..Default::default()
        };
        let cfg = TestPhaseConfig::resolve(Phase::PostBuild, &inputs, &BuildEnv::default()).unwrap();
        assert_eq!(cfg.base_url_source, BaseUrlSource::LocalServer);
        assert_eq!(cfg.spa.as_deref(), Some("app.html"));
        assert!(cfg.serves_publish_dir());
    }

    #[test]
    fn test_on_success_requires_deploy_url() {
        let inputs = PhaseInputs {
            enable: true,
            ..Default::default()
        };
        let err =
            TestPhaseConfig::resolve(Phase::OnSuccess, &inputs, &BuildEnv::default()).unwrap_err();
        assert_eq!(err.to_string(), "Missing DEPLOY_PRIME_URL");

        let cfg = TestPhaseConfig::resolve(Phase::OnSuccess, &inputs, &env_with_key()).unwrap();
        assert_eq!(
            cfg.base_url_source,
            BaseUrlSource::DeployedSite("https://example.app".into())
        );
    }

    #[test]
    fn test_spa_settings() {
        assert_eq!(SpaSetting::Enabled(true).fallback_file().as_deref(), Some("index.html"));
        assert_eq!(SpaSetting::Enabled(false).fallback_file(), None);
        assert_eq!(SpaSetting::File("".into()).fallback_file(), None);
    }
}
