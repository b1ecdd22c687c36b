// Person model
// Every field is derived from the id, so two servers always agree on a record

use serde::{Deserialize, Serialize};

/// Phone numbers share this prefix; the id fills the subscriber part
const PHONE_PREFIX: &str = "+30 6974 ";

/// Width the id is zero-padded to inside the phone number
const PHONE_ID_WIDTH: usize = 6;

/// A person record as served by every endpoint
///
/// ## Rust Learning Notes:
///
/// ### Deriving Serde Traits
/// `Serialize`/`Deserialize` let the same struct be the JSON body the server
/// writes and the body the client parses, so the two sides cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Person {
    /// Build the deterministic record for `id`
    pub fn synthesize(id: i64) -> Self {
        Self {
            id,
            name: format!("Name{}", id),
            email: format!("person{}@test.lo", id),
            phone: format!("{}{:0>width$}", PHONE_PREFIX, id, width = PHONE_ID_WIDTH),
        }
    }
}
