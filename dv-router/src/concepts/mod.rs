pub mod advertised;
pub mod packet;
pub mod peer_table;
pub mod route;
