pub mod documents;
pub mod health;
pub mod indexes;
pub mod search;
