pub mod board;
pub mod engine;
pub mod error;
pub mod eval;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod san;
pub mod session;
pub mod status;
pub mod worker;

#[cfg(target_arch = "wasm32")]
mod wasm_api;
