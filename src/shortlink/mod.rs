pub mod generator;
pub mod service;

pub use generator::{CodeGenerator, RandomCodeGenerator, ALPHABET};
pub use service::{ShortLinkError, ShortLinkService};
