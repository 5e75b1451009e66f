use std::path::PathBuf;

/// Name of the registry document at the project root.
pub const REGISTRY_FILE: &str = "devboy.config.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub project_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    pub runtime: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let project_dir = match std::env::var("DEVBOY_PROJECT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()?,
        };
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid port number, got '{raw}'"))?,
            Err(_) => 3000,
        };

        Ok(Self {
            project_dir,
            bind: std::env::var("DEVBOY_BIND").unwrap_or_else(|_| "127.0.0.1".into()),
            port,
            runtime: std::env::var("DEVBOY_RUNTIME").unwrap_or_else(|_| "node".into()),
        })
    }

    pub fn registry_path(&self) -> PathBuf {
        self.project_dir.join(REGISTRY_FILE)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
