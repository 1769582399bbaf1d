pub mod env_cache;
pub mod refsyntax;
