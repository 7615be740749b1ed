//! Public record identifiers of the form `oai:<repository>:preprint/<id>`.

#[derive(Clone, Debug)]
pub struct IdentifierCodec {
    prefix: String,
}

impl IdentifierCodec {
    pub fn new(repository_id: &str) -> Self {
        Self {
            prefix: format!("oai:{}:preprint/", repository_id),
        }
    }

    pub fn encode(&self, record_id: i64) -> String {
        format!("{}{}", self.prefix, record_id)
    }

    /// Returns the record id, or `None` if `identifier` is not one of ours.
    ///
    /// The remainder after the prefix must be ASCII digits only, fit in an
    /// `i64` and be strictly positive.
    pub fn decode(&self, identifier: &str) -> Option<i64> {
        let digits = identifier.strip_prefix(&self.prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<i64>().ok().filter(|id| *id > 0)
    }
}
