mod utils;

mod cache;
mod cli;
mod data_set;
#[cfg(feature = "legacy")]
mod legacy;
mod matching;
