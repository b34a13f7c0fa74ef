//! Store adapters. Implement BakeryStore.

pub mod memory_store;
pub mod supabase_repo;

pub use memory_store::MemoryStore;
pub use supabase_repo::SupabaseStore;
