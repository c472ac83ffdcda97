use serde::{Deserialize, Serialize};

/// JWT payload. The subject id is the only claim; tokens carry no expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: u64, // user ID
}
