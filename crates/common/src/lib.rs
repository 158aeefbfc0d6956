pub mod diagnosis;
pub mod error;
pub mod token;

pub use diagnosis::{format_percentage, Diagnosis, Label};
pub use error::{Error, Result};
pub use token::SessionToken;
