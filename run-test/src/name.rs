use rand::{rngs::OsRng, RngCore};

/// Prefix of every generated schema name. Names starting with `pg_` are reserved by the server.
pub const SCHEMA_PREFIX: &str = "rust_test_";

/// Generates a random schema name: [`SCHEMA_PREFIX`] followed by 8 random bytes as lowercase hex.
///
/// Uniqueness relies on randomness alone; the server is not checked for an existing schema.
///
/// # Panics
///
/// Panics if the operating system cannot supply random bytes.
pub fn random_schema_name() -> String {
    let mut buf = [0u8; 8];
    if let Err(err) = OsRng.try_fill_bytes(&mut buf) {
        panic!("cannot read random bytes: {err}");
    }
    format!("{SCHEMA_PREFIX}{}", hex::encode(buf))
}

/// Quotes an SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes an SQL string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
