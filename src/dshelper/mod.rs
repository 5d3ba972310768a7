//! Reader Helper Endpoints
//!
//! Lets the companion reader app poll background jobs and pull the merged
//! configuration of the reading-helper, page-count, reviews-sync and
//! reading-position extensions.
//!
//! # Routes
//!
//! - `GET /status/:job_id` - job status, verbatim from the job tracker
//! - `GET /configuration` - every installed extension
//! - `GET /1/configuration/:library_id` - `_` for global prefs, otherwise
//!   the page-count config of one library
//!
//! An empty `library_id` (`/1/configuration/`) does not match the route and
//! gets the router's plain 404. The aggregator itself treats `""` as an
//! unknown library and answers `{}`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dshelper::dshelper;
//!
//! let app = Router::new()
//!     .nest("/dshelper", dshelper::routes())
//!     .with_state(app_state);
//! ```

mod handler;
mod routes;

pub use routes::routes;
