pub mod engine;
pub mod input;
pub mod replies;
pub mod states;
