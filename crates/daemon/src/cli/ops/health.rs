use clap::Args;

use bookwire_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = Vec::new();

        lines.push("Config:".to_string());
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                let keys = match state.server_key_store().load() {
                    Ok(Some(pair)) => format!("OK ({})", pair.kind()),
                    Ok(None) => "not generated yet".to_string(),
                    Err(e) => format!("UNUSABLE ({})", e),
                };
                lines.push(format!("  directory:        {}", state.bookwire_dir.display()));
                lines.push("  config.toml:      OK".to_string());
                lines.push(format!("  keys.json:        {}", keys));
                lines.push(format!("  api_port:         {}", state.config.api_port));
                lines.push(format!("  key_strategy:     {}", state.config.key_strategy));
                lines.push(format!("  signature_policy: {}", state.config.signature_policy));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for probe in ["livez", "readyz"] {
            let url = format!("{}/_status/{}", base.as_str().trim_end_matches('/'), probe);
            let status = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => "OK".to_string(),
                Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", probe), status));
        }

        Ok(lines.join("\n"))
    }
}
