// Library root
// -----------
// Publishing GNOME Shell extensions to extensions.gnome.org (e.g.o). The
// binary (`main.rs`) parses arguments and maps failures to exit codes; the
// work happens here.
//
// Module responsibilities:
// - `api`: the registry trait and its HTTP client.
// - `consent`: text-pinned confirmation of the registry's upload prompts.
// - `credentials`: where the username and password come from.
// - `session`: token lifetime; logout exactly once, however the run ends.
// - `publish`: the `upload` and `confirm-upload` workflows.
// - `ui`: the console seam and its terminal implementation.
pub mod api;
pub mod artifact;
pub mod config;
pub mod consent;
pub mod credentials;
pub mod error;
pub mod fakes;
pub mod metadata;
pub mod publish;
pub mod session;
pub mod signal;
pub mod telemetry;
pub mod ui;

pub use error::{FailureKind, PublishError};
pub use publish::{Published, Publisher, UploadOptions};
