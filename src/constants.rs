/// Source literal stamped on every normalized record
pub const GREENHOUSE_SOURCE: &str = "greenhouse";

pub const GREENHOUSE_BASE_URL: &str = "https://boards-api.greenhouse.io/v1/boards";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const DEFAULT_SINK_TABLE: &str = "jobs";

// Metadata entry names as they appear in Greenhouse custom fields
pub const EMPLOYMENT_TYPE_KEY: &str = "Employment Type";
pub const JOB_TYPE_KEY: &str = "Job Type";
pub const EXPERIENCE_LEVEL_KEY: &str = "Experience Level";
pub const INDUSTRY_KEY: &str = "Industry";

/// Board tokens and display names used when no config file is present
pub const DEFAULT_COMPANIES: &[(&str, &str)] = &[
    ("bark", "Bark"),
    ("vitalfarms", "Vital Farms"),
    ("phxproduction", "The Honest Company"),
    ("sweetgreen", "Sweetgreen"),
];
