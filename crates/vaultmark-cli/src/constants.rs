//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success (a prompt dismissed by the user also exits 0)
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells and clap)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (config, store, category, bookmark).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input, or an operation that does not apply to the category.
    pub const INVALID_INPUT: i32 = 4;

    /// Incorrect category password.
    pub const AUTH_FAILED: i32 = 5;

    /// Stored data failed to decrypt or an integrity check found issues.
    pub const INTEGRITY_FAILED: i32 = 6;
}

/// Environment variables read by the CLI.
pub mod env_vars {
    /// Password used for unlock, delete, and current-password prompts.
    pub const PASSWORD: &str = "VAULTMARK_PASSWORD";

    /// Password used when a new category password is requested.
    pub const NEW_PASSWORD: &str = "VAULTMARK_NEW_PASSWORD";

    /// Log filter directives (tracing `EnvFilter` syntax).
    pub const LOG: &str = "VAULTMARK_LOG";
}

/// Directory name used under the XDG config and data homes.
pub const APP_DIR: &str = "vaultmark";
