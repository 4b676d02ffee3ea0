pub mod build;
pub mod detect;
pub mod info;
pub mod legacy;
