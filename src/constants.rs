//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Model request constants
pub mod llm {
    /// Default OpenAI-compatible API base
    pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

    /// Primary chat model
    pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0125";

    /// Secondary model tried once the primary fails
    pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-3.5-turbo";

    /// Completion budget for standard clients
    pub const DEFAULT_MAX_TOKENS: u32 = 1500;

    /// Completion budget ceiling for mobile clients
    pub const MOBILE_MAX_TOKENS: u32 = 1000;

    /// Sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.5;

    /// Per-call timeout for standard clients (seconds)
    pub const STANDARD_TIMEOUT_SECS: u64 = 30;

    /// Per-call timeout for mobile clients (seconds)
    pub const MOBILE_TIMEOUT_SECS: u64 = 60;

    /// Characters of raw model output kept in debug logs and error previews
    pub const LOG_PREVIEW_CHARS: usize = 200;

    /// TCP connect timeout for the HTTP client (seconds); call duration is
    /// bounded separately per client class
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Retry policy presets
pub mod retry {
    pub mod standard {
        pub const MAX_RETRIES: u32 = 2;
        pub const INITIAL_DELAY_MS: u64 = 500;
        pub const MAX_DELAY_MS: u64 = 5_000;
        pub const BACKOFF_FACTOR: f64 = 2.0;
    }

    /// Mobile networks drop more often, so they get more and slower retries
    pub mod mobile {
        pub const MAX_RETRIES: u32 = 4;
        pub const INITIAL_DELAY_MS: u64 = 1_000;
        pub const MAX_DELAY_MS: u64 = 10_000;
        pub const BACKOFF_FACTOR: f64 = 1.5;
    }
}

/// Cache constants
pub mod cache {
    /// Maximum entries in the response cache
    pub const MAX_ENTRIES: usize = 100;

    /// Response cache entry lifetime (seconds)
    pub const TTL_SECS: u64 = 300;

    /// Last successful nutrition plan per user key (seconds)
    pub const LAST_GOOD_TTL_SECS: u64 = 24 * 60 * 60;
}

/// Workout history constants
pub mod history {
    /// Plans remembered per history bucket
    pub const MAX_ENTRIES: usize = 5;

    /// Bucket lifetime since its last update (seconds)
    pub const TTL_SECS: u64 = 7 * 24 * 60 * 60;
}

/// Request sanitization limits
pub mod sanitize {
    /// Maximum characters kept for a free-text field
    pub const MAX_STRING_CHARS: usize = 1000;

    /// Maximum characters kept for each item of a string list
    pub const MAX_LIST_ITEM_CHARS: usize = 100;

    /// Fields forwarded to the model; everything else is dropped
    pub const PAYLOAD_FIELDS: &[&str] = &[
        "weight",
        "height",
        "age",
        "goal",
        "activityLevel",
        "dietaryRestrictions",
        "fitnessGoal",
        "level",
        "duration",
        "equipment",
        "restrictions",
        "estimatedCalories",
        "estimatedMacros",
    ];

    /// Fields echoed back verbatim, never stripped or truncated
    pub const VERBATIM_FIELDS: &[&str] = &["level"];
}

/// Nutrition arithmetic
pub mod nutrition {
    /// Calories used when body metrics are incomplete
    pub const DEFAULT_CALORIES: i64 = 2200;

    /// Body weight assumed when it is missing (kg)
    pub const REFERENCE_WEIGHT_KG: f64 = 70.0;

    /// Activity multiplier used for unknown activity levels
    pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.375;

    /// Share of carbohydrates counted as fiber
    pub const FIBER_RATIO: f64 = 0.3;
}

/// HTTP server constants
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3001;

    /// Buffered SSE frames between the pipeline and the client connection
    pub const STREAM_BUFFER: usize = 64;
}
