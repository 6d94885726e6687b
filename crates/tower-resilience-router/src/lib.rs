//! Query analysis and engine routing.
//!
//! Three stages, each usable independently: [`classifier::QueryClassifier`]
//! turns a raw query string into a [`search_types::QueryInfo`],
//! [`optimizer::QueryOptimizer`] proposes a rewritten query and spelling
//! suggestions, and [`router::Router`] picks which search engines should
//! handle the request and with what weight.

pub mod classifier;
pub mod optimizer;
pub mod router;
pub mod stopwords;
pub mod synonyms;

pub use classifier::QueryClassifier;
pub use optimizer::{OptimizedQuery, OptimizerStats, QueryOptimizer};
pub use router::Router;
