#![doc = include_str!("../README.md")]

pub mod error;
pub mod s_list;

pub use error::{InsertError, LockTimeout};
pub use s_list::{Entry, LinkedList, Ticket};
