//! Tracing configuration and initialization.

use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{
    EnvFilter,
    layer::SubscriberExt as _,
    util::{SubscriberInitExt as _, TryInitError},
};

use crate::term::should_use_color;

const LOG_ENV: &str = "STUDY_VAULT_LOG";

enum TrcMode {
    /// Compact output with spinners for in-flight spans.
    Pretty,
    /// Plain `fmt` output, for when the user chose their own filter.
    Plain,
}

pub struct Trc {
    mode: TrcMode,
    env_filter: EnvFilter,
    color: bool,
}

impl Default for Trc {
    fn default() -> Self {
        let color = should_use_color(&std::io::stderr());
        match EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_from_default_env()) {
            // A hand-written filter means someone is debugging; give them the plain output.
            Ok(env_filter) => Self {
                mode: TrcMode::Plain,
                env_filter,
                color,
            },
            Err(_) => Self {
                mode: TrcMode::Pretty,
                env_filter: EnvFilter::new("info"),
                color,
            },
        }
    }
}

impl Trc {
    /// Force plain output, e.g. when stdout carries machine-readable data.
    #[must_use]
    pub fn plain(mut self) -> Self {
        self.mode = TrcMode::Plain;
        self
    }

    /// Lower the default filter to `warn` unless the user set one.
    #[must_use]
    pub fn quiet(mut self) -> Self {
        if matches!(self.mode, TrcMode::Pretty) {
            self.env_filter = EnvFilter::new("warn");
        }
        self
    }

    pub fn init(self) -> Result<(), TryInitError> {
        match self.mode {
            TrcMode::Plain => self.init_plain_mode(),
            TrcMode::Pretty => self.init_pretty_mode(),
        }
    }

    fn init_plain_mode(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(self.color),
            )
            .try_init()
    }

    fn init_pretty_mode(self) -> Result<(), TryInitError> {
        let indicatif_layer = IndicatifLayer::new();
        tracing_subscriber::registry()
            .with(self.env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(indicatif_layer.get_stderr_writer())
                    .with_ansi(self.color)
                    .with_target(false)
                    .without_time()
                    .compact(),
            )
            .with(indicatif_layer)
            .try_init()
    }
}
