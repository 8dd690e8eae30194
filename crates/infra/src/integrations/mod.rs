//! External service integrations

pub mod supabase;

pub use supabase::SupabaseAuth;
