use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "Subject user id")]
    pub user_id: String,

    #[arg(long, default_value = "", help = "Display name carried in the token")]
    pub username: String,

    #[arg(long, default_value = "", help = "Tenant id (empty for a platform-scope token)")]
    pub tenant_id: String,

    #[arg(long = "role", help = "Role id carried in the token (repeatable)")]
    pub roles: Vec<String>,

    #[arg(long, help = "Lifetime in hours (defaults to JWT_EXPIRY_HOURS)")]
    pub expiry_hours: Option<u64>,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let expiry_hours = args.expiry_hours.unwrap_or(security.jwt_expiry_hours);
    let username = if args.username.is_empty() {
        args.user_id.clone()
    } else {
        args.username
    };

    let claims = Claims::new(args.user_id, username, args.tenant_id, args.roles, expiry_hours);
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({ "token": token, "expires_at": claims.exp })),
        ),
    }
}
