use tracing::{info, warn};

use tracing_extras_fmt::init::{try_init_with_config, FormatConfig};

const CONFIG: &str = r#"{
    "level": "info",
    "template": "{asctime} {level} {shortpath}:{line} {message}",
    "extras_format": "pairs",
    "context": { "service": "billing", "region": "eu-west" }
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = FormatConfig::from_json(CONFIG)?;
    try_init_with_config(config)?;

    info!(user_id = 42, "login");
    warn!(user_id = 42, attempts = 3, "password reset requested");
    Ok(())
}
