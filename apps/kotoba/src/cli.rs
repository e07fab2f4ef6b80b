use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "kotoba", about = "Templated HTTP gateway to a Vertex AI language model")]
pub struct Cli {
    /// Bind host.
    #[arg(long, env = "KOTOBA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port.
    #[arg(long, env = "KOTOBA_PORT", default_value_t = 8787)]
    pub port: u16,

    /// Exact origin allowed for CORS; every origin is allowed when unset.
    #[arg(long, env = "KOTOBA_ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,
}
