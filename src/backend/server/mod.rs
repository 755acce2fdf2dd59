//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Environment configuration and pool setup
//! └── init.rs         - App creation and the sweep task
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: environment variables via `ServerConfig`
//! 2. **Database**: pool + migrations (required)
//! 3. **Collaborators**: directory, notifier, mailer behind trait seams
//! 4. **Router Creation**: all routes plus the auth middleware
//! 5. **Background Tasks**: the stale-case sweep interval

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use init::create_app;
pub use state::AppState;
