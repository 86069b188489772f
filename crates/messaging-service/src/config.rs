#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            host: std::env::var("MESSAGING_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("MESSAGING_SERVICE_PORT")
                .unwrap_or_else(|_| "5005".to_string())
                .parse()
                .expect("MESSAGING_SERVICE_PORT must be a valid number"),
        }
    }

    pub fn listen_address(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid host or port")
    }
}
