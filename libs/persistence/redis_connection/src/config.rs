pub trait DbConnectConfig: serde::de::DeserializeOwned {
    fn host(&self) -> &str;
    fn port(&self) -> u16;
    fn db(&self) -> u8;
}

#[derive(Debug, serde::Deserialize)]
pub struct RedisDbConfig {
    #[serde(default = "host_default")]
    pub host: String,
    #[serde(default = "port_default")]
    pub port: u16,
    #[serde(default)]
    pub db: u8,
}

impl RedisDbConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("REDIS_HOST")
                .unwrap_or_else(|_| host_default()),
            port: std::env::var("REDIS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(port_default),
            db: 0,
        }
    }
}

impl DbConnectConfig for RedisDbConfig {
    fn host(&self) -> &str { &self.host }

    fn port(&self) -> u16 { self.port }

    fn db(&self) -> u8 { self.db }
}

fn host_default() -> String { "127.0.0.1".to_string() }

fn port_default() -> u16 { 6379 }
