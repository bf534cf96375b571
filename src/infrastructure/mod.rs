pub mod hex_index;
pub mod parcl_client;
