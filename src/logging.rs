// src/logging.rs - Tracing subscriber setup shared by the binaries
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` directives on top of `form_compare=info`; `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("form_compare=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}
