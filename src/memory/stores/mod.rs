pub mod basic_session;
pub mod tmp;
