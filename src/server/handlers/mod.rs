pub mod content;
pub mod corpus;
pub mod health;
