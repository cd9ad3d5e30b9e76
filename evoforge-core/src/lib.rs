//! # evoforge-core
//!
//! Learning core for an iterative code-generation loop: remembers every
//! attempt, learns from build failures and successful repairs, and turns that
//! history into guidance for the next attempt.
//!
//! This library provides:
//! - Error normalization, log intake, and tiered error categorization
//! - Evolution sessions: an append-only, persisted log of attempts
//! - An incremental fixer with change-impact and rollback checks
//! - A success pattern library learned from repairs that built
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three stages:
//! - **Intake:** raw compiler output becomes [`ErrorRecord`]s and
//!   [`categorize::CategorizedError`]s
//! - **Memory:** attempts are stored in an [`EvolutionSession`]; repairs that
//!   built become [`SuccessPattern`]s
//! - **Guidance:** learning context, targeted feedback, focused fix
//!   instructions, and mechanical fixes are derived from memory
//!
//! ## Example
//!
//! ```rust,no_run
//! use evoforge_core::{Config, EvolutionSession, NewVersion};
//!
//! let config = Config::load().expect("failed to load config");
//! let mut session = EvolutionSession::open_configured(&config, "expert-advisor");
//!
//! let seq = session.next_sequence();
//! session
//!     .add_version(NewVersion::new("int OnInit() { return 0; }", seq).quality(0.4))
//!     .expect("failed to record attempt");
//!
//! println!("{}", session.targeted_feedback());
//! ```

// Re-export commonly used items at the crate root
pub use categorize::{categorize, categorize_all, CategorizedError, PriorityPlan};
pub use config::Config;
pub use error::{Error, Result};
pub use evolution::{EvolutionSession, EvolutionSummary, NewVersion};
pub use fixer::{ChangeImpact, CodeChange, FixOutcome, IncrementalFixer, SourceSnapshot};
pub use patterns::{LearningReport, PatternLibrary, SuccessPattern};
pub use types::*;

// Public modules
pub mod categorize;
pub mod config;
pub mod diff;
pub mod error;
pub mod evolution;
pub mod fixer;
pub mod hash;
pub mod intake;
pub mod logging;
pub mod normalize;
pub mod patterns;
pub mod persist;
pub mod types;
