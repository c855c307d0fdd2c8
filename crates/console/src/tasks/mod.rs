#![forbid(unsafe_code)]

pub mod bulk;
pub mod load;
pub mod mutate;
pub mod summary;
