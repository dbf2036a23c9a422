pub mod supabase;

pub use supabase::{SupabaseClient, StorageError};
