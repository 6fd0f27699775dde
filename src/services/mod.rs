pub mod encryption_service;
pub mod token_service;
