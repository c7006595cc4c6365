//! Background import jobs.
//!
//! Both importers share the same outer shape: discover the full unit list
//! up front (fixing the progress denominator), process units in a
//! deterministic order, isolate per-unit failures, yield to the event
//! loop once per unit, and observe the cancellation flag at each unit
//! boundary. They differ only in discovery: a filesystem walk vs. the
//! Roon browse API.

pub mod filesystem;
pub mod library;

pub use filesystem::FilesystemImporter;
pub use library::LibraryImporter;

/// How one unit of work was applied to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// A new album was created
    Created,
    /// An existing album was refreshed
    Updated,
    /// The unit carried no usable data
    Skipped,
}
