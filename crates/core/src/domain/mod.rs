pub mod department;
pub mod message;
pub mod response;
