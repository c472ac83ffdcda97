use serde::{Deserialize, Serialize};

/// User record as stored in the CSV file.
///
/// `password` holds whatever was written on insert: a bcrypt hash for signup
/// accounts, the submitted value for accounts created through `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,        // assigned as max existing id + 1
    pub name: String,
    pub email: String,  // not unique at the store level
    pub password: String,
}

/// Candidate record before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}
