//! External delivery channels for buyer notifications.

pub mod email;
