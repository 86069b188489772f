/// Tuning for the outgoing WhatsApp queue tick loop (component G), loaded
/// the way `original_source`'s scheduler `main.go` reads its environment.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub batch_size: usize,
    pub lease_window_secs: i64,
    pub send_timeout_secs: u64,
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            interval_secs: std::env::var("WHATSAPP_MESSAGE_SCHEDULER_INTERVAL")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("WHATSAPP_MESSAGE_SCHEDULER_INTERVAL must be a valid number"),
            batch_size: std::env::var("WHATSAPP_MESSAGE_SCHEDULER_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .expect("WHATSAPP_MESSAGE_SCHEDULER_BATCH_SIZE must be a valid number"),
            lease_window_secs: std::env::var("WHATSAPP_MESSAGE_SCHEDULER_LEASE_WINDOW")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .expect("WHATSAPP_MESSAGE_SCHEDULER_LEASE_WINDOW must be a valid number"),
            send_timeout_secs: std::env::var("WHATSAPP_MESSAGE_SCHEDULER_SEND_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("WHATSAPP_MESSAGE_SCHEDULER_SEND_TIMEOUT must be a valid number"),
        }
    }
}
