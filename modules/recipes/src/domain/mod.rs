pub mod error;
pub mod password;
pub mod recipes;
pub mod repo;
pub mod users;
pub mod validation;
