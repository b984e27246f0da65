pub mod chain;
pub mod config;
pub mod error;
pub mod gctlp;
pub mod gmitlp;
pub mod mitlp;
pub mod primitives;
pub mod squaring;
pub mod tlp;

pub use chain::{ChainedTlp, SolvedIter, SolvedPair};
pub use config::PuzzleConfig;
pub use error::PuzzleError;
pub use gctlp::Gctlp;
pub use gmitlp::Gmitlp;
pub use mitlp::Mitlp;
pub use squaring::CancellationToken;
pub use tlp::Tlp;
