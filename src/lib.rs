pub mod record;
pub mod augment;
pub mod filter;
pub mod style;
pub mod format;
pub mod handler;
pub mod layer;

pub mod env;
pub mod init;

#[cfg(test)]
mod test_util;
