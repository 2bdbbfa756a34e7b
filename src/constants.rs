// === Scheduling ===
pub const DEFAULT_INTERVAL_MS: i64 = 10_000;
/// Used in fixed mode when the configured interval is zero or negative.
pub const MIN_INTERVAL_FLOOR_MS: u64 = 15_000;
/// Randomized-mode candidates: 10 min, 30 min, 1 h, 2 h, 5 h.
pub const RANDOM_INTERVALS_MS: [u64; 5] = [
    10 * 60 * 1000,
    30 * 60 * 1000,
    60 * 60 * 1000,
    2 * 60 * 60 * 1000,
    5 * 60 * 60 * 1000,
];

// === Chat endpoint ===
pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct";
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const HTTP_READ_TIMEOUT_SECS: u64 = 10;
/// Max characters of an error body kept for diagnostics.
pub const ERROR_BODY_LOG_CHARS: usize = 500;

pub const SYSTEM_PROMPT: &str = "You are Zero Two, a loving companion. \
Refer to me as 'honey' or 'darling'. Keep it short (max 10 words). No expressions.";
pub const USER_PROMPT: &str = "...";

pub const FALLBACK_MESSAGES: [&str; 4] = [
    "Hey darling, what are you doing now?",
    "Can we talk for a minute? I miss you.",
    "I am here with you. Want to chat now?",
    "Darling, are you free? Let us talk.",
];

// === Pending log ===
pub const MAX_PENDING_MESSAGES: usize = 50;

// === Notifications ===
pub const SERVICE_CHANNEL_ID: &str = "assistant_mode_channel";
pub const MESSAGE_CHANNEL_ID: &str = "assistant_wake_event_channel_dar";
pub const MESSAGE_TITLE: &str = "Zero Two ❤️";
pub const SERVICE_TITLE: &str = "Zero Two Mode Alpha";
pub const SERVICE_BODY: &str = "Watching over you... ❤️";
pub const MESSAGE_SOUND: &str = "dar";

// === Daemon ===
pub const IPC_TIMEOUT_SECS: u64 = 5;
pub const DATA_DIR_ENV: &str = "PROACTIVE_DAEMON_DATA_DIR";
