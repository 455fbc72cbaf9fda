pub mod registration;

pub use registration::{RegisterRequest, RegisterResponse, TokenQuery};

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
