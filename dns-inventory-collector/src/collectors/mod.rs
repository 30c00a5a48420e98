//! Concrete collector implementations.

mod cloudflare;
mod godaddy;

pub use cloudflare::{CloudflareCollector, CloudflareConfig};
pub use godaddy::{GodaddyCollector, GodaddyConfig};
