pub mod health;
pub mod score;
pub mod sse;
pub mod validation;
