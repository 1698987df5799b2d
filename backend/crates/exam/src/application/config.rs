//! Application Configuration
//!
//! Configuration for the exam application layer.

use crate::domain::services::{HeartbeatEngine, TerminationPolicy, ViolationAccountant};
use crate::domain::value_objects::{ExamMode, HeartbeatTiming, ModeRules, ViolationLimits};
use crate::error::{ExamError, ExamResult};
use std::str::FromStr;
use std::time::Duration;

/// Session store bounds
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Maximum live sessions before least recently used ones are evicted
    pub max_entries: usize,
    /// Time since the last write after which a session expires
    pub ttl: Duration,
    /// Period of the background expiry sweep
    pub sweep_interval: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(60 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Integrity monitoring thresholds and heartbeat parameters
#[derive(Debug, Clone)]
pub struct AntiCheatConfig {
    pub max_tab_switch_violations: u32,
    pub max_text_copy_violations: u32,
    pub max_heartbeat_missed: u32,
    /// Aggregate limit over all tampering-class violations
    pub max_tampering_violations: u32,
    pub min_heartbeat_interval_ms: u64,
    pub max_heartbeat_interval_ms: u64,
    pub heartbeat_tolerance_ms: u64,
    pub long_absence_tolerance_ms: u64,
    /// Tokens starting with this prefix initialize the heartbeat protocol
    pub init_token_prefix: String,
    /// HMAC key for heartbeat tokens (32 bytes)
    pub token_secret: [u8; 32],
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        let limits = ViolationLimits::default();
        let timing = HeartbeatTiming::default();
        Self {
            max_tab_switch_violations: limits.max_tab_switch,
            max_text_copy_violations: limits.max_text_copy,
            max_heartbeat_missed: limits.max_heartbeat_missed,
            max_tampering_violations: limits.max_tampering,
            min_heartbeat_interval_ms: timing.min_interval_ms,
            max_heartbeat_interval_ms: timing.max_interval_ms,
            heartbeat_tolerance_ms: timing.tolerance_ms,
            long_absence_tolerance_ms: timing.long_absence_tolerance_ms,
            init_token_prefix: "init_".to_string(),
            token_secret: random_secret(),
        }
    }
}

impl AntiCheatConfig {
    pub fn limits(&self) -> ViolationLimits {
        ViolationLimits {
            max_tab_switch: self.max_tab_switch_violations,
            max_text_copy: self.max_text_copy_violations,
            max_tampering: self.max_tampering_violations,
            max_heartbeat_missed: self.max_heartbeat_missed,
        }
    }

    pub fn timing(&self) -> HeartbeatTiming {
        HeartbeatTiming {
            min_interval_ms: self.min_heartbeat_interval_ms,
            max_interval_ms: self.max_heartbeat_interval_ms,
            tolerance_ms: self.heartbeat_tolerance_ms,
            long_absence_tolerance_ms: self.long_absence_tolerance_ms,
        }
    }

    pub fn heartbeat_engine(&self) -> HeartbeatEngine {
        HeartbeatEngine::new(
            self.timing(),
            TerminationPolicy::new(self.max_heartbeat_missed),
            self.token_secret,
            self.init_token_prefix.clone(),
        )
    }

    pub fn accountant(&self) -> ViolationAccountant {
        ViolationAccountant::new(self.limits())
    }
}

fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&platform::crypto::random_bytes(32));
    secret
}

/// Exam application configuration
#[derive(Debug, Clone)]
pub struct ExamConfig {
    pub store: SessionStoreConfig,
    /// Stripes in each lock pool (client keys and session keys)
    pub lock_stripes: usize,
    pub anti_cheat: AntiCheatConfig,
    pub free_rules: ModeRules,
    pub rating_rules: ModeRules,
    /// Expose `GET /debug/sessions`
    pub debug_endpoints: bool,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            store: SessionStoreConfig::default(),
            lock_stripes: platform::lock::StripedLock::DEFAULT_STRIPES,
            anti_cheat: AntiCheatConfig::default(),
            free_rules: ModeRules::free(),
            rating_rules: ModeRules::rating(),
            debug_endpoints: false,
        }
    }
}

impl ExamConfig {
    /// Create config with a fresh random token secret
    pub fn with_random_secret() -> Self {
        let mut config = Self::default();
        config.anti_cheat.token_secret = random_secret();
        config
    }

    /// Create config for development (debug endpoints, anonymous rated exams)
    pub fn development() -> Self {
        let mut config = Self::with_random_secret();
        config.debug_endpoints = true;
        config.rating_rules.requires_identity = false;
        config
    }

    /// Read overrides from the environment on top of a random-secret default
    pub fn from_env() -> ExamResult<Self> {
        let mut config = Self::with_random_secret();

        if let Some(v) = env_parse("EXAM_STORE_MAX_ENTRIES")? {
            config.store.max_entries = v;
        }
        if let Some(secs) = env_parse::<u64>("EXAM_STORE_TTL_SECS")? {
            config.store.ttl = Duration::from_secs(secs);
        }
        if let Some(v) = env_parse("EXAM_LOCK_STRIPES")? {
            config.lock_stripes = v;
        }

        let ac = &mut config.anti_cheat;
        if let Some(v) = env_parse("EXAM_MAX_TAB_SWITCH")? {
            ac.max_tab_switch_violations = v;
        }
        if let Some(v) = env_parse("EXAM_MAX_TEXT_COPY")? {
            ac.max_text_copy_violations = v;
        }
        if let Some(v) = env_parse("EXAM_MAX_HEARTBEAT_MISSED")? {
            ac.max_heartbeat_missed = v;
        }
        if let Some(v) = env_parse("EXAM_MAX_TAMPERING")? {
            ac.max_tampering_violations = v;
        }
        if let Some(v) = env_parse("EXAM_HEARTBEAT_MIN_MS")? {
            ac.min_heartbeat_interval_ms = v;
        }
        if let Some(v) = env_parse("EXAM_HEARTBEAT_MAX_MS")? {
            ac.max_heartbeat_interval_ms = v;
        }
        if let Some(v) = env_parse("EXAM_HEARTBEAT_TOLERANCE_MS")? {
            ac.heartbeat_tolerance_ms = v;
        }
        if let Ok(encoded) = std::env::var("EXAM_TOKEN_SECRET") {
            ac.token_secret = decode_secret(&encoded)?;
        }
        if let Some(v) = env_parse("EXAM_DEBUG_ENDPOINTS")? {
            config.debug_endpoints = v;
        }
        if let Some(v) = env_parse("EXAM_RATING_REQUIRES_IDENTITY")? {
            config.rating_rules.requires_identity = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ExamResult<()> {
        let ac = &self.anti_cheat;
        if ac.max_heartbeat_interval_ms <= ac.min_heartbeat_interval_ms {
            return Err(ExamError::InvalidConfig(format!(
                "max heartbeat interval ({} ms) must exceed the min ({} ms)",
                ac.max_heartbeat_interval_ms, ac.min_heartbeat_interval_ms
            )));
        }
        if self.store.max_entries == 0 {
            return Err(ExamError::InvalidConfig(
                "session store needs room for at least one entry".to_string(),
            ));
        }
        if ac.init_token_prefix.is_empty() {
            return Err(ExamError::InvalidConfig(
                "init token prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rules(&self, mode: ExamMode) -> &ModeRules {
        match mode {
            ExamMode::Free => &self.free_rules,
            ExamMode::Rating => &self.rating_rules,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> ExamResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ExamError::InvalidConfig(format!("{name} has an invalid value"))),
        Err(_) => Ok(None),
    }
}

fn decode_secret(encoded: &str) -> ExamResult<[u8; 32]> {
    let bytes = platform::crypto::from_base64(encoded.trim())
        .map_err(|_| ExamError::InvalidConfig("EXAM_TOKEN_SECRET is not Base64".to_string()))?;
    bytes.try_into().map_err(|_| {
        ExamError::InvalidConfig("EXAM_TOKEN_SECRET must decode to 32 bytes".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExamConfig::default();
        assert_eq!(config.store.max_entries, 10_000);
        assert_eq!(config.store.ttl, Duration::from_secs(3600));
        assert_eq!(config.lock_stripes, 10_240);
        assert_eq!(config.anti_cheat.limits(), ViolationLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_random_secret_differs() {
        let a = ExamConfig::with_random_secret();
        let b = ExamConfig::with_random_secret();
        assert_ne!(a.anti_cheat.token_secret, b.anti_cheat.token_secret);
    }

    #[test]
    fn test_default_secret_is_not_fixed() {
        let a = AntiCheatConfig::default();
        let b = AntiCheatConfig::default();
        assert_ne!(a.token_secret, [0u8; 32]);
        assert_ne!(a.token_secret, b.token_secret);
    }

    #[test]
    fn test_interval_range_is_validated() {
        let mut config = ExamConfig::default();
        config.anti_cheat.max_heartbeat_interval_ms = config.anti_cheat.min_heartbeat_interval_ms;
        assert!(matches!(config.validate(), Err(ExamError::InvalidConfig(_))));
    }

    #[test]
    fn test_decode_secret() {
        let encoded = platform::crypto::to_base64(&[7u8; 32]);
        assert_eq!(decode_secret(&encoded).unwrap(), [7u8; 32]);
        assert!(decode_secret(&platform::crypto::to_base64(&[7u8; 16])).is_err());
        assert!(decode_secret("not base64!").is_err());
    }
}
