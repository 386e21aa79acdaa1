pub mod repo_types;

pub use repo_types::Order;
