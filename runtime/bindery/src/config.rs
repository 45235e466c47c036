//! Tune how incoming data is decoded.
//!
//! [`DecoderConfig`] is the key type in this module.
//! Pass it explicitly to [`JsonBinding::with_config`], or install it once at startup
//! as the process-wide default via [`DecoderConfig::install`].
//!
//! [`JsonBinding::with_config`]: crate::binding::JsonBinding::with_config
use std::sync::OnceLock;

use crate::decode::BodySizeLimit;

static GLOBAL: OnceLock<DecoderConfig> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
/// Knobs that control the behaviour of the JSON decoder.
///
/// # Example
///
/// ```rust
/// use bindery::config::DecoderConfig;
///
/// let config = DecoderConfig::default()
///     .use_opaque_numeric_tokens(true)
///     .reject_unknown_input_keys(true);
/// assert!(config.rejects_unknown_input_keys());
/// ```
pub struct DecoderConfig {
    use_opaque_numeric_tokens: bool,
    reject_unknown_input_keys: bool,
    body_size_limit: BodySizeLimit,
}

impl DecoderConfig {
    /// Preserve numbers that land in dynamic slots (`serde_json::Value`) as exact
    /// numeric tokens, rather than coercing them to `f64`.
    ///
    /// Disabled by default.
    pub fn use_opaque_numeric_tokens(mut self, enabled: bool) -> Self {
        self.use_opaque_numeric_tokens = enabled;
        self
    }

    /// Fail decoding when the input contains a key that doesn't match any field
    /// of the destination record.
    ///
    /// Disabled by default: unknown keys are dropped.
    ///
    /// Keys that a record hands over to a `#[serde(flatten)]` field can't be checked,
    /// so they fail decoding too ([`FlattenedFieldError`](crate::errors::FlattenedFieldError)).
    pub fn reject_unknown_input_keys(mut self, enabled: bool) -> Self {
        self.reject_unknown_input_keys = enabled;
        self
    }

    /// Set the maximum size of the bodies the decoder is willing to read.
    ///
    /// Defaults to 2 MBs.
    pub fn limit_body_size(mut self, limit: BodySizeLimit) -> Self {
        self.body_size_limit = limit;
        self
    }

    /// Whether numbers in dynamic slots are preserved as exact tokens.
    pub fn uses_opaque_numeric_tokens(&self) -> bool {
        self.use_opaque_numeric_tokens
    }

    /// Whether unknown input keys are rejected.
    pub fn rejects_unknown_input_keys(&self) -> bool {
        self.reject_unknown_input_keys
    }

    /// The maximum size of the bodies the decoder is willing to read.
    pub fn body_size_limit(&self) -> BodySizeLimit {
        self.body_size_limit
    }

    /// Install `self` as the process-wide default configuration.
    ///
    /// Binders created via [`JsonBinding::new`](crate::binding::JsonBinding::new) pick it up.
    /// It can only be installed once: do it at startup, before serving any traffic.
    pub fn install(self) -> Result<(), errors::ConfigAlreadyInstalled> {
        GLOBAL.set(self).map_err(|_| errors::ConfigAlreadyInstalled)?;
        tracing::debug!(config = ?self, "Installed the process-wide decoder configuration");
        Ok(())
    }

    /// The process-wide default configuration.
    ///
    /// It falls back to [`DecoderConfig::default`] if nothing has been installed.
    pub fn global() -> Self {
        GLOBAL.get().copied().unwrap_or_default()
    }
}

#[cfg(feature = "config")]
mod load {
    use std::path::Path;

    use anyhow::Context;
    use figment::{
        Figment,
        providers::{Env, Format, Yaml},
    };

    use super::{DecoderConfig, errors};

    static ENV_PREFIX: &str = "BINDERY_";

    impl DecoderConfig {
        /// Load the decoder configuration by merging together two sources:
        ///
        /// 1. Environment variables (`BINDERY_*`)
        /// 2. A YAML file, if `path` is provided
        ///
        /// Environment variables take precedence over the file.
        /// Nested keys are separated by a double underscore in variable names,
        /// e.g. `BINDERY_BODY_SIZE_LIMIT__ENABLED__MAX_SIZE`.
        /// A missing file is treated as empty.
        pub fn load(path: Option<&Path>) -> Result<Self, errors::ConfigLoadError> {
            let span = tracing::info_span!(
                "Loading decoder configuration",
                configuration.file = path.map(|p| tracing::field::display(p.display())),
            );
            let _guard = span.enter();

            let mut figment = Figment::new();
            if let Some(path) = path {
                figment = figment.merge(Yaml::file(path));
            }
            figment
                .merge(Env::prefixed(ENV_PREFIX).split("__"))
                .extract()
                .context("Failed to load the decoder configuration")
                .map_err(errors::ConfigLoadError)
        }
    }
}

/// Errors that can occur when installing or loading configuration.
pub mod errors {
    #[derive(Debug, thiserror::Error)]
    #[error("The process-wide decoder configuration has already been installed")]
    /// The error returned by [`DecoderConfig::install`](super::DecoderConfig::install)
    /// when it's invoked more than once.
    pub struct ConfigAlreadyInstalled;

    #[cfg(feature = "config")]
    #[derive(Debug, thiserror::Error)]
    #[error("Failed to load configuration")]
    /// The error returned by [`DecoderConfig::load`](super::DecoderConfig::load).
    pub struct ConfigLoadError(#[source] pub(super) anyhow::Error);
}
