//! stress3d
//!
//! Opens a window and renders the instanced cube stress scene until closed.
//!
//! Usage: `stress3d "count=40000&size=1.2&speed=1.5"`

mod app;
mod host;
mod settings;

use anyhow::{Context, Result};
use app::App;
use settings::HarnessSettings;
use stress_core::StressParameters;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

const QUERY_ENV: &str = "STRESS3D_QUERY";

/// First argument wins over the environment; neither means all defaults.
fn startup_query(arg: Option<String>, env: Option<String>) -> String {
    arg.or(env).unwrap_or_default()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("stress3d v{}", stress_core::VERSION);

    let query = startup_query(std::env::args().nth(1), std::env::var(QUERY_ENV).ok());
    let params = StressParameters::from_query(&query);
    let settings = HarnessSettings::from_env();

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(params, settings);
    event_loop
        .run_app(&mut app)
        .context("event loop exited with an error")?;
    app.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_beats_environment() {
        assert_eq!(
            startup_query(Some("count=5".into()), Some("count=9".into())),
            "count=5"
        );
        assert_eq!(startup_query(None, Some("count=9".into())), "count=9");
        assert_eq!(startup_query(None, None), "");
    }
}
