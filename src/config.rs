use serde::{Deserialize, Serialize};

pub const DEFAULT_WHOIS_PORT: u16 = 43;
pub const DEFAULT_ROOT_SERVER: &str = "whois.iana.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub whois_port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub buffer_size: usize,          // Read chunk size per socket read
    pub max_referrals: usize,        // Hop cap for one resolution
    pub concurrent_whois_queries: usize,
    pub root_server: String,
    pub never_cut: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub whois_port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub buffer_size: usize,
    pub max_referrals: usize,
    pub concurrent_whois_queries: usize,
    pub root_server: String,
    pub never_cut: bool,
}

impl Default for Config {
    /// Computed defaults only, no file or environment lookups.
    fn default() -> Self {
        let system_info = Self::detect_system_capabilities(false);
        Config {
            whois_port: DEFAULT_WHOIS_PORT,
            whois_timeout_seconds: system_info.default_timeout,
            max_response_size: system_info.max_response_size,
            buffer_size: system_info.buffer_size,
            max_referrals: system_info.max_referrals,
            concurrent_whois_queries: system_info.concurrent_whois_queries,
            root_server: DEFAULT_ROOT_SERVER.to_string(),
            never_cut: false,
        }
    }
}

impl Config {
    /// Layered load: computed defaults, then `whois-chain.toml` if present, then environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        // A missing .env file is normal
        let _ = dotenvy::dotenv();

        let system_info = Self::detect_system_capabilities(Self::is_production_environment());

        let mut settings = config::Config::builder()
            .set_default("whois_port", DEFAULT_WHOIS_PORT as i64)?
            .set_default("whois_timeout_seconds", system_info.default_timeout)?
            .set_default("max_response_size", system_info.max_response_size as i64)?
            .set_default("buffer_size", system_info.buffer_size as i64)?
            .set_default("max_referrals", system_info.max_referrals as i64)?
            .set_default("concurrent_whois_queries", system_info.concurrent_whois_queries as i64)?
            .set_default("root_server", DEFAULT_ROOT_SERVER)?
            .set_default("never_cut", false)?
            .add_source(config::File::with_name("whois-chain").required(false));

        settings = Self::apply_env_overrides(settings)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;

        Ok(Config {
            whois_port: config_data.whois_port,
            whois_timeout_seconds: config_data.whois_timeout_seconds,
            max_response_size: config_data.max_response_size,
            buffer_size: config_data.buffer_size.max(512),
            max_referrals: config_data.max_referrals.max(1),
            concurrent_whois_queries: config_data.concurrent_whois_queries.max(1),
            root_server: config_data.root_server,
            never_cut: config_data.never_cut,
        })
    }

    fn detect_system_capabilities(is_production: bool) -> SystemCapabilities {
        let available_memory = Self::get_available_memory();

        SystemCapabilities {
            // Registry servers that hang are common; keep the wait short
            default_timeout: if is_production { 10 } else { 5 },
            max_response_size: Self::calculate_max_response_size(available_memory),
            buffer_size: Self::calculate_buffer_size(available_memory),
            max_referrals: 10,
            concurrent_whois_queries: Self::get_cpu_cores().min(8),
        }
    }

    fn get_available_memory() -> u64 {
        #[cfg(target_os = "linux")]
        {
            if let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") {
                for line in meminfo.lines() {
                    if let Some(rest) = line.strip_prefix("MemAvailable:") {
                        if let Some(kb) = rest.split_whitespace().next().and_then(|kb| kb.parse::<u64>().ok()) {
                            return kb * 1024;
                        }
                    }
                }
            }
        }

        // Default fallback: assume 4GB
        4 * 1024 * 1024 * 1024
    }

    fn get_cpu_cores() -> usize {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
    }

    fn is_production_environment() -> bool {
        std::env::var("ENVIRONMENT")
            .or_else(|_| std::env::var("ENV"))
            .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
            .unwrap_or(false)
    }

    fn calculate_max_response_size(available_memory: u64) -> usize {
        // 0.1% of available memory, clamped to 1MB..10MB
        let calculated = (available_memory as f64 * 0.001) as usize;
        calculated.clamp(1024 * 1024, 10 * 1024 * 1024)
    }

    fn calculate_buffer_size(available_memory: u64) -> usize {
        let gb = available_memory / (1024 * 1024 * 1024);
        match gb {
            0..=2 => 4096,
            3..=8 => 8192,
            _ => 16384,
        }
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("WHOIS_PORT", "whois_port"),
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("MAX_RESPONSE_SIZE", "max_response_size"),
            ("BUFFER_SIZE", "buffer_size"),
            ("MAX_REFERRALS", "max_referrals"),
            ("MAX_HOPS", "max_referrals"),
            ("CONCURRENT_WHOIS_QUERIES", "concurrent_whois_queries"),
            ("WHOIS_ROOT_SERVER", "root_server"),
            ("WHOIS_NEVER_CUT", "never_cut"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

struct SystemCapabilities {
    default_timeout: u64,
    max_response_size: usize,
    buffer_size: usize,
    max_referrals: usize,
    concurrent_whois_queries: usize,
}
