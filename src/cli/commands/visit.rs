use std::sync::Arc;

use serde_json::json;

use crate::cli::config::FileTokenStore;
use crate::cli::OutputFormat;
use crate::config;
use crate::gate::{
    GateDeps, GateOptions, HttpVerifier, RecordingNavigator, SessionContext, SessionGate, Transition,
};

/// Mount one gate on the first path and navigate through the rest, the way a
/// browser tab would.
pub async fn handle(paths: Vec<String>, verify_url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let gate_config = &config::config().gate;

    let verifier = match verify_url {
        Some(url) => HttpVerifier::new(&url, gate_config.verify_timeout())?,
        None => HttpVerifier::from_config(gate_config)?,
    };
    tracing::debug!("Verifying against {}", verifier.endpoint());

    let navigator = Arc::new(RecordingNavigator::new());
    let deps = GateDeps::new(
        Arc::new(SessionContext::from_config(gate_config)),
        Arc::new(verifier),
        Arc::new(FileTokenStore::open_default()?),
        navigator.clone(),
    );

    let gate = SessionGate::mount(deps, GateOptions::from_config(gate_config), paths.first().map(String::as_str));

    let mut results = Vec::with_capacity(paths.len());
    for path in &paths {
        let transition = gate.navigate(Some(path)).await;
        let redirects = navigator.take();

        if let OutputFormat::Text = output_format {
            let outcome = match transition {
                Transition::Settled(state) => format!("{:?}", state),
                Transition::Skipped => "skipped".to_string(),
                Transition::Discarded => "discarded".to_string(),
            };
            println!("{:<32} {:<16} render={:?}", path, outcome, gate.render());
            for route in &redirects {
                println!("  -> redirect {}", route);
            }
        }

        results.push(json!({
            "path": path,
            "authenticated": gate.decision().authenticated,
            "render": format!("{:?}", gate.render()),
            "redirects": redirects,
        }));
    }

    if let OutputFormat::Json = output_format {
        println!("{}", serde_json::to_string_pretty(&json!({ "navigations": results }))?);
    }

    gate.unmount();
    Ok(())
}
